// Centralized configuration defaults

// Database (MySQL)
pub const DEFAULT_DB_USER: &str = "taskafarian";
pub const DEFAULT_DB_PASS: &str = "password";
pub const DEFAULT_DB_NAME: &str = "taskafarian";
pub const DEFAULT_DB_HOST: &str = "localhost";
pub const DEFAULT_DB_PORT: u16 = 3306;
pub const DEFAULT_DB_POOL: u32 = 5;
pub const DEFAULT_DB_CONN_TIMEOUT_SECS: u64 = 30;

// Sessions
/// 1 hour
pub const DEFAULT_SESSION_TTL_SECS: i64 = 3600;
/// Tokens within this margin of expiry no longer resolve
pub const DEFAULT_SESSION_EXPIRY_SKEW_SECS: i64 = 60;
/// Random bytes behind each session token (hex doubles the length)
pub const SESSION_TOKEN_BYTES: usize = 32;

// Purpose tokens
pub const DEFAULT_ENVIRONMENT: &str = "dev";
/// 15 minutes
pub const DEFAULT_ACTIVATION_TOKEN_TTL_SECS: i64 = 15 * 60;
/// 10 minutes
pub const DEFAULT_PASSWORD_RESET_TOKEN_TTL_SECS: i64 = 10 * 60;

// Argon2id cost
pub const DEFAULT_HASH_MEMORY_KIB: u32 = 19 * 1024;
pub const DEFAULT_HASH_ITERATIONS: u32 = 2;
pub const DEFAULT_HASH_PARALLELISM: u32 = 1;

// Listing
pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 100;

// Field limits
pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 32;
pub const MAX_USERNAME_LEN: usize = 64;
pub const MAX_EMAIL_LEN: usize = 255;
pub const MIN_TASK_NAME_LEN: usize = 3;
pub const MAX_TASK_NAME_LEN: usize = 255;

// Logging
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_LOG_FORMAT: &str = "text";
