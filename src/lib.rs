//! Catalog service: authentication, sessions and role-based route gating

pub mod auth;
pub mod concurrency;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod services;
pub mod session;
pub mod telemetry;
