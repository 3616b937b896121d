//! Database repository layer

pub mod memory;
pub mod user_repo;

pub use memory::InMemoryUserStore;
pub use user_repo::PgUserRepository;

use async_trait::async_trait;

use crate::models::{Role, User};

/// Storage failures, kept apart from domain errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Identity store contract. The store assigns `id` and `created_at` on insert and
/// enforces username uniqueness.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepositoryError>;

    async fn insert(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User, RepositoryError>;

    /// Readiness probe
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
