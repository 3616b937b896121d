//! Bounded pool for CPU-heavy blocking work
//! Password hashing runs here so a burst of logins cannot starve the async workers

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("timed out after {waited_secs}s waiting for a {pool} worker")]
    AcquireTimeout { pool: &'static str, waited_secs: u64 },

    #[error("pool closed")]
    Closed,

    #[error("blocking task failed: {0}")]
    TaskFailed(String),
}

/// Runs closures on tokio's blocking threads, at most `workers` at a time
#[derive(Clone)]
pub struct BlockingPool {
    name: &'static str,
    semaphore: Arc<Semaphore>,
    acquire_timeout: Duration,
}

impl BlockingPool {
    pub fn new(name: &'static str, workers: usize, acquire_timeout: Duration) -> Self {
        Self {
            name,
            semaphore: Arc::new(Semaphore::new(workers.max(1))),
            acquire_timeout,
        }
    }

    pub fn available_workers(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub async fn run<F, T>(&self, f: F) -> Result<T, PoolError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = match tokio::time::timeout(
            self.acquire_timeout,
            self.semaphore.clone().acquire_owned(),
        )
        .await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(PoolError::Closed),
            Err(_) => {
                warn!(pool = self.name, "blocking pool saturated");
                return Err(PoolError::AcquireTimeout {
                    pool: self.name,
                    waited_secs: self.acquire_timeout.as_secs(),
                });
            }
        };

        debug!(pool = self.name, available = self.semaphore.available_permits(), "worker acquired");

        let result = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            f()
        })
        .await
        .map_err(|e| PoolError::TaskFailed(e.to_string()))?;

        Ok(result)
    }
}
