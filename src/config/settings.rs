use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;

use crate::auth::password::Argon2Params;
use crate::config::constants::*;
use crate::error::AppError;

/// Main configuration container for the application
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Database configuration settings
    pub database: DatabaseConfig,
    /// Token and credential settings
    pub auth: AuthConfig,
    /// Logging configuration settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from environment variables or use defaults
    pub fn load() -> Self {
        Self {
            database: DatabaseConfig::load(),
            auth: AuthConfig::load(),
            logging: LoggingConfig::load(),
        }
    }

    /// Reject settings the service cannot start with
    pub fn validate(&self) -> Result<(), AppError> {
        if self.auth.secret_key.trim().is_empty() {
            return Err(AppError::Config(
                "TASKAFARIAN_SECRET_KEY must be set".to_string(),
            ));
        }
        if self.auth.environment.trim().is_empty() {
            return Err(AppError::Config("TASKAFARIAN_ENV must not be empty".to_string()));
        }
        if self.database.name.trim().is_empty() {
            return Err(AppError::Config("TASKAFARIAN_DB_NAME must not be empty".to_string()));
        }
        if self.auth.session_ttl_secs <= self.auth.session_expiry_skew_secs {
            return Err(AppError::Config(
                "SESSION_TTL_SECS must exceed SESSION_EXPIRY_SKEW_SECS".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Database configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub user: String,
    pub password: String,
    pub name: String,
    pub host: String,
    pub port: u16,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Connection timeout in seconds
    pub connection_timeout: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            user: DEFAULT_DB_USER.to_string(),
            password: DEFAULT_DB_PASS.to_string(),
            name: DEFAULT_DB_NAME.to_string(),
            host: DEFAULT_DB_HOST.to_string(),
            port: DEFAULT_DB_PORT,
            max_connections: DEFAULT_DB_POOL,
            connection_timeout: DEFAULT_DB_CONN_TIMEOUT_SECS,
        }
    }
}

impl DatabaseConfig {
    /// Load database configuration from environment variables or use defaults
    pub fn load() -> Self {
        Self {
            user: env::var("TASKAFARIAN_DB_USER").unwrap_or_else(|_| DEFAULT_DB_USER.to_string()),
            password: env::var("TASKAFARIAN_DB_PASSWORD")
                .unwrap_or_else(|_| DEFAULT_DB_PASS.to_string()),
            name: env::var("TASKAFARIAN_DB_NAME").unwrap_or_else(|_| DEFAULT_DB_NAME.to_string()),
            host: env::var("TASKAFARIAN_DB_HOST").unwrap_or_else(|_| DEFAULT_DB_HOST.to_string()),
            port: env_or("TASKAFARIAN_DB_PORT", DEFAULT_DB_PORT),
            max_connections: env_or("TASKAFARIAN_DB_POOL", DEFAULT_DB_POOL),
            connection_timeout: env_or(
                "TASKAFARIAN_DB_CONNECTION_TIMEOUT",
                DEFAULT_DB_CONN_TIMEOUT_SECS,
            ),
        }
    }

    /// Generate database URL from individual components
    pub fn url(&self) -> String {
        format!(
            "mysql://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.name
        )
    }
}

/// Session, purpose token and password hashing settings
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC key for purpose tokens
    #[serde(default, skip_serializing)]
    pub secret_key: String,
    /// Deployment environment, used as the purpose token issuer
    pub environment: String,
    pub session_ttl_secs: i64,
    pub session_expiry_skew_secs: i64,
    pub activation_token_ttl_secs: i64,
    pub password_reset_token_ttl_secs: i64,
    /// New accounts start inactive until activated
    pub require_activation: bool,
    pub password_hash: Argon2Params,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            environment: DEFAULT_ENVIRONMENT.to_string(),
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            session_expiry_skew_secs: DEFAULT_SESSION_EXPIRY_SKEW_SECS,
            activation_token_ttl_secs: DEFAULT_ACTIVATION_TOKEN_TTL_SECS,
            password_reset_token_ttl_secs: DEFAULT_PASSWORD_RESET_TOKEN_TTL_SECS,
            require_activation: true,
            password_hash: Argon2Params::default(),
        }
    }
}

impl AuthConfig {
    pub fn load() -> Self {
        Self {
            secret_key: env::var("TASKAFARIAN_SECRET_KEY").unwrap_or_default(),
            environment: env::var("TASKAFARIAN_ENV")
                .unwrap_or_else(|_| DEFAULT_ENVIRONMENT.to_string()),
            session_ttl_secs: env_or("SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS),
            session_expiry_skew_secs: env_or(
                "SESSION_EXPIRY_SKEW_SECS",
                DEFAULT_SESSION_EXPIRY_SKEW_SECS,
            ),
            activation_token_ttl_secs: env_or(
                "ACTIVATION_TOKEN_TTL_SECS",
                DEFAULT_ACTIVATION_TOKEN_TTL_SECS,
            ),
            password_reset_token_ttl_secs: env_or(
                "PASSWORD_RESET_TOKEN_TTL_SECS",
                DEFAULT_PASSWORD_RESET_TOKEN_TTL_SECS,
            ),
            require_activation: env::var("REQUIRE_ACTIVATION")
                .map(|v| v == "1" || v.to_lowercase() == "true")
                .unwrap_or(true),
            password_hash: Argon2Params::new(
                env_or("PASSWORD_HASH_MEMORY_KIB", DEFAULT_HASH_MEMORY_KIB),
                env_or("PASSWORD_HASH_ITERATIONS", DEFAULT_HASH_ITERATIONS),
                env_or("PASSWORD_HASH_PARALLELISM", DEFAULT_HASH_PARALLELISM),
            ),
        }
    }
}

// Keeps the signing key out of logs
impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret_key", &"<redacted>")
            .field("environment", &self.environment)
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("session_expiry_skew_secs", &self.session_expiry_skew_secs)
            .field("activation_token_ttl_secs", &self.activation_token_ttl_secs)
            .field("password_reset_token_ttl_secs", &self.password_reset_token_ttl_secs)
            .field("require_activation", &self.require_activation)
            .field("password_hash", &self.password_hash)
            .finish()
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "compact" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: {}", s)),
        }
    }
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            format: LogFormat::Text,
        }
    }
}

impl LoggingConfig {
    pub fn load() -> Self {
        Self {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string()),
            format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| DEFAULT_LOG_FORMAT.to_string())
                .parse()
                .unwrap_or_default(),
        }
    }
}
