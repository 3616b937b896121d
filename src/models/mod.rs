//! Data models

pub mod auth;
pub mod role;
pub mod user;

pub use auth::Principal;
pub use role::Role;
pub use user::{User, UserResponse};
