// Re-export core functionality for external use
pub use async_trait::async_trait;
pub use sqlx;

pub mod app_state;
pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod services;
pub mod storage;
pub mod validation;

pub use error::{AppError, Result};
pub use app_state::AppState;

pub use config::settings::{AuthConfig, Config, DatabaseConfig, LoggingConfig};

pub use storage::{
    init_storage, memory::MemoryStorage, mysql::MySqlStorage, Result as StorageResult, Storage,
    StorageError,
};

pub use models::{
    Account, AccountSummary, Identity, NewTask, NewTimeEntry, SessionToken, Task, TaskChanges,
    TaskList, TimeEntry, TimeEntryChanges,
};

pub use middleware::{AuthMiddleware, RequestContext};
pub use services::{
    AuthService, LoggingDispatcher, SessionService, TaskService, TeamService, TimeEntryService,
    TokenDispatcher,
};

// Version and build information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
