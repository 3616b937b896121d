//! Configuration system
//! Loads everything from environment variables, wrapping sensitive values in `Secret`

use config::{Config, ConfigError, Environment};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

/// Signing secret used when none is configured. Local development only.
pub const INSECURE_DEFAULT_JWT_SECRET: &str = "change-me-at-least-32-chars";

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Listen address, e.g. "0.0.0.0:7000"
    pub addr: String,
    /// Graceful shutdown timeout (seconds)
    pub graceful_shutdown_timeout_secs: u64,
    /// Include diagnostic detail in 5xx error bodies
    pub expose_error_details: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL (wrapped in Secret so it never reaches the logs)
    pub url: Secret<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// trace, debug, info, warn, error
    pub level: String,
    /// json, pretty
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// HMAC key for bearer tokens
    pub jwt_secret: Secret<String>,
    /// Argon2 memory cost in KiB
    pub hash_memory_kib: u32,
    /// Argon2 iteration count
    pub hash_iterations: u32,
    /// Argon2 lanes
    pub hash_parallelism: u32,
    /// Size of the blocking pool that runs hash/verify
    pub hash_workers: usize,
    /// How long a request waits for a free hashing worker
    pub hash_acquire_timeout_secs: u64,
}

impl SecurityConfig {
    pub fn uses_insecure_default_secret(&self) -> bool {
        self.jwt_secret.expose_secret() == INSECURE_DEFAULT_JWT_SECRET
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub cookie_name: String,
    /// Sessions untouched for this long are evicted
    pub idle_timeout_secs: u64,
    pub secure_cookie: bool,
    pub purge_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminSeedConfig {
    pub username: String,
    pub password: Secret<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    pub session: SessionConfig,
    pub admin: AdminSeedConfig,
}

fn default_hash_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl AppConfig {
    /// Load configuration from the environment (prefix `CATALOG_`, nested keys split by `__`)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = Config::builder();

        settings = settings
            .set_default("server.addr", "0.0.0.0:7000")?
            .set_default("server.graceful_shutdown_timeout_secs", 30)?
            .set_default("server.expose_error_details", false)?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout_secs", 30)?
            .set_default("database.idle_timeout_secs", 600)?
            .set_default("database.max_lifetime_secs", 1800)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "json")?
            .set_default("security.jwt_secret", INSECURE_DEFAULT_JWT_SECRET)?
            .set_default("security.hash_memory_kib", 19456)?
            .set_default("security.hash_iterations", 2)?
            .set_default("security.hash_parallelism", 1)?
            .set_default("security.hash_workers", default_hash_workers() as u64)?
            .set_default("security.hash_acquire_timeout_secs", 30)?
            .set_default("session.cookie_name", "SESSION_ID")?
            .set_default("session.idle_timeout_secs", 1800)?
            .set_default("session.secure_cookie", false)?
            .set_default("session.purge_interval_secs", 60)?
            .set_default("admin.username", "admin")?
            .set_default("admin.password", "password")?;

        settings = settings.add_source(
            Environment::with_prefix("CATALOG")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = settings.build()?.try_deserialize()?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(port_str) = self.server.addr.split(':').next_back() {
            if let Ok(port) = port_str.parse::<u16>() {
                if port != 0 && port < 1024 {
                    return Err(ConfigError::Message("Server port should be >= 1024".to_string()));
                }
            }
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                )))
            }
        }

        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log format: {}. Must be one of: json, pretty",
                    self.logging.format
                )))
            }
        }

        if self.database.max_connections < self.database.min_connections {
            return Err(ConfigError::Message(
                "max_connections must be >= min_connections".to_string(),
            ));
        }

        if self.security.jwt_secret.expose_secret().trim().is_empty() {
            return Err(ConfigError::Message("JWT secret must not be empty".to_string()));
        }

        if self.security.hash_workers == 0 {
            return Err(ConfigError::Message("hash_workers must be at least 1".to_string()));
        }

        if self.session.idle_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "session idle_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.session.cookie_name.trim().is_empty() {
            return Err(ConfigError::Message("session cookie_name must not be empty".to_string()));
        }

        Ok(())
    }
}
