use std::sync::Arc;
use tracing::info;

use crate::config::settings::Config;
use crate::middleware::AuthMiddleware;
use crate::services::{
    AuthService, SessionService, TaskService, TeamService, TimeEntryService, TokenDispatcher,
};
use crate::storage::Storage;

/// Services wired over one storage backend, shared by every request
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub storage: Arc<dyn Storage>,
    pub sessions: SessionService,
    pub auth: AuthService,
    pub teams: TeamService,
    pub tasks: TaskService,
    pub time_entries: TimeEntryService,
    pub middleware: AuthMiddleware,
}

impl AppState {
    pub fn new(
        config: Config,
        storage: Arc<dyn Storage>,
        dispatcher: Arc<dyn TokenDispatcher>,
    ) -> Self {
        let sessions = SessionService::from_config(storage.clone(), &config.auth);
        let auth = AuthService::new(storage.clone(), sessions.clone(), dispatcher, &config.auth);
        info!(
            require_activation = config.auth.require_activation,
            "application services initialized"
        );

        Self {
            teams: TeamService::new(storage.clone()),
            tasks: TaskService::new(storage.clone()),
            time_entries: TimeEntryService::new(storage.clone()),
            middleware: AuthMiddleware::new(sessions.clone()),
            config: Arc::new(config),
            storage,
            sessions,
            auth,
        }
    }
}
