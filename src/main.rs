use dotenv::dotenv;
use std::sync::Arc;
use tracing::{error, info};

use taskafarian::{
    config::settings::Config, error::Result, logging::init_tracing, storage::init_storage,
    AppState, LoggingDispatcher, NAME, VERSION,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::load();
    init_tracing(&config.logging)?;

    if let Err(e) = config.validate() {
        error!("invalid configuration: {}", e);
        return Err(e);
    }
    info!("starting {} v{}", NAME, VERSION);
    info!(
        "database {}:{}/{}, pool of {}",
        config.database.host, config.database.port, config.database.name, config.database.max_connections
    );

    // schema bootstrap and health check happen inside init_storage
    let storage = init_storage(&config.database).await?;
    let state = AppState::new(config, storage, Arc::new(LoggingDispatcher));
    info!("{} ready", NAME);

    state.storage.close().await?;
    info!("shutdown complete");
    Ok(())
}
