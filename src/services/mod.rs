pub mod auth_service;
pub mod notifier;
pub mod session_service;
pub mod task_service;
pub mod team_service;
pub mod time_entry_service;

pub use auth_service::AuthService;
pub use notifier::{DispatchError, LoggingDispatcher, TokenDispatcher};
pub use session_service::SessionService;
pub use task_service::TaskService;
pub use team_service::TeamService;
pub use time_entry_service::TimeEntryService;
