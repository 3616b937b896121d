//! Auth service: registration, login, identity lookup and admin seeding

use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::{
    auth::password::PasswordHasher,
    concurrency::BlockingPool,
    error::{AppError, INVALID_CREDENTIALS},
    models::{Role, User, UserResponse},
    repository::{RepositoryError, UserStore},
};

const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 8;
const DECOY_PASSWORD: &str = "decoy-password-for-unknown-users";

pub struct AuthService {
    store: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    pool: BlockingPool,
    /// Hash checked against when the username is unknown, built on first use
    decoy_hash: Arc<OnceCell<String>>,
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>, hasher: PasswordHasher, pool: BlockingPool) -> Self {
        Self {
            store,
            hasher,
            pool,
            decoy_hash: Arc::new(OnceCell::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    /// Create a `USER` account
    pub async fn register(&self, username: &str, password: &str) -> Result<UserResponse, AppError> {
        let username = normalize_username(username);
        validate_username(username)?;
        validate_password(password)?;

        if self.store.find_by_username(username).await?.is_some() {
            return Err(duplicate(username));
        }

        let password_hash = self.hash_password(username, password).await?;
        let user = self.insert(username, &password_hash, Role::User).await?;

        info!(user_id = user.id, username = %user.username, "user registered");
        Ok(user.into())
    }

    /// Check credentials. Unknown user, wrong password and unusable stored hash all
    /// produce the same error.
    pub async fn login(&self, username: &str, password: &str) -> Result<UserResponse, AppError> {
        let username = normalize_username(username);
        validate_username(username)?;
        validate_password(password)?;

        let Some(user) = self.store.find_by_username(username).await? else {
            debug!(username = %username, "login for unknown user");
            self.verify_against_decoy(password).await?;
            return Err(login_failure("unknown_user"));
        };

        let hasher = self.hasher.clone();
        let candidate = password.to_string();
        let stored = user.password_hash.clone();
        let verified = self
            .pool
            .run(move || hasher.verify(&candidate, &stored))
            .await?;

        match verified {
            Ok(true) => {
                info!(user_id = user.id, "login succeeded");
                Ok(user.into())
            }
            Ok(false) => Err(login_failure("wrong_password")),
            Err(e) => {
                error!(user_id = user.id, error = %e, "stored password hash is unusable");
                Err(login_failure("corrupt_hash"))
            }
        }
    }

    pub async fn find_user(&self, id: i64) -> Result<Option<UserResponse>, AppError> {
        Ok(self.store.find_by_id(id).await?.map(UserResponse::from))
    }

    /// Seed an `ADMIN` account. An existing account with that username is left untouched.
    pub async fn ensure_admin_user(&self, username: &str, password: &str) -> Result<(), AppError> {
        let username = normalize_username(username);
        validate_username(username)?;
        validate_password(password)?;

        if let Some(existing) = self.store.find_by_username(username).await? {
            if existing.role != Role::Admin {
                warn!(
                    username = %username,
                    "admin seed skipped: username already used by a non-admin account"
                );
            } else {
                debug!(username = %username, "admin seed skipped: account already exists");
            }
            return Ok(());
        }

        let password_hash = self.hash_password(username, password).await?;
        self.insert(username, &password_hash, Role::Admin).await?;

        info!(username = %username, "seeded default admin account");
        Ok(())
    }

    /// Unknown usernames cost one Argon2 verification, like a wrong password does
    async fn verify_against_decoy(&self, password: &str) -> Result<(), AppError> {
        let hasher = self.hasher.clone();
        let decoy = self.decoy_hash.clone();
        let candidate = password.to_string();

        self.pool
            .run(move || match decoy.get_or_try_init(|| hasher.hash(DECOY_PASSWORD)) {
                Ok(hash) => {
                    let _ = hasher.verify(&candidate, hash);
                }
                Err(e) => warn!(error = %e, "could not build decoy hash"),
            })
            .await?;
        Ok(())
    }

    async fn hash_password(&self, username: &str, password: &str) -> Result<String, AppError> {
        let hasher = self.hasher.clone();
        let plaintext = password.to_string();

        match self.pool.run(move || hasher.hash(&plaintext)).await? {
            Ok(hash) => Ok(hash),
            Err(e) => {
                error!(username = %username, error = %e, "failed to hash password");
                Err(AppError::Validation("Password hashing failed".to_string()))
            }
        }
    }

    async fn insert(&self, username: &str, password_hash: &str, role: Role) -> Result<User, AppError> {
        self.store
            .insert(username, password_hash, role)
            .await
            .map_err(|e| match e {
                // lost a race with a concurrent registration
                RepositoryError::UniqueViolation(_) => duplicate(username),
                other => other.into(),
            })
    }
}

fn normalize_username(username: &str) -> &str {
    username.trim()
}

fn validate_username(username: &str) -> Result<(), AppError> {
    if username.is_empty() {
        return Err(AppError::Validation("Username is required".to_string()));
    }
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(AppError::Validation(format!(
            "Username must be at least {} characters long",
            MIN_USERNAME_LEN
        )));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.trim().is_empty() {
        return Err(AppError::Validation("Password is required".to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

fn duplicate(username: &str) -> AppError {
    AppError::DuplicateUser(format!("Username '{}' is already taken", username))
}

fn login_failure(reason: &'static str) -> AppError {
    metrics::counter!("auth_login_failures_total", "reason" => reason).increment(1);
    AppError::Authentication(INVALID_CREDENTIALS.to_string())
}
