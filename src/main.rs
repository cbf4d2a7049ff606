use clap::Parser;
use std::sync::Arc;
use tracing::{debug, error, info};

mod config;
mod db;
mod llm;
mod sql;
mod util;
mod web;

use crate::config::{AppConfig, CliArgs};
use crate::db::{PgGateway, QueryExecutor};
use crate::llm::LlmManager;
use crate::util::logging::init_tracing;
use crate::web::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    init_tracing();

    // Parse command line arguments
    let args = CliArgs::parse();

    // Load configuration
    let config = match AppConfig::new(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Check the database is reachable before accepting requests
    info!(
        "Checking database at {}:{}/{}",
        config.database.host, config.database.port, config.database.name
    );
    let gateway = PgGateway::new(&config.database);
    if let Err(e) = gateway.ping().await {
        error!("Database is unreachable: {}", e);
        return Err(e.into());
    }

    // Initialize LLM manager
    info!(
        "Initializing LLM manager with backend: {} ({})",
        config.llm.backend, config.llm.model
    );
    let llm_manager = LlmManager::new(&config.llm)?;
    debug!("System prompt:\n{}", llm_manager.system_prompt());

    let app_state = Arc::new(AppState::new(config, llm_manager, Arc::new(gateway)));

    // Start the web server
    let web_config = app_state.config.web.clone();
    info!("Starting employee search on {}:{}", web_config.host, web_config.port);
    match web::run_server(web_config, app_state).await {
        Ok(_) => info!("Server stopped gracefully"),
        Err(e) => {
            error!("Server error: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
