//! In-process user store for tests and local runs without a database

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

use super::{RepositoryError, UserStore};
use crate::models::{Role, User};

#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<Vec<User>>,
    inserts: AtomicUsize,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful inserts since creation
    pub fn insert_count(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    /// Drop a user out from under live sessions and tokens
    pub async fn remove(&self, id: i64) -> bool {
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|u| u.id != id);
        users.len() != before
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn insert(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User, RepositoryError> {
        let mut users = self.users.write().await;

        if users.iter().any(|u| u.username == username) {
            return Err(RepositoryError::UniqueViolation(format!("username '{}'", username)));
        }

        let user = User {
            id: self.inserts.load(Ordering::SeqCst) as i64 + 1,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            role,
            created_at: Utc::now(),
        };
        users.push(user.clone());
        self.inserts.fetch_add(1, Ordering::SeqCst);

        Ok(user)
    }
}
