use crate::config::AppConfig;
use crate::db::QueryExecutor;
use crate::llm::LlmManager;
use std::sync::Arc;

/// Shared application state for the web server.
///
/// Built once at startup and never mutated; each request reaches the model
/// service and the database through these handles.
pub struct AppState {
    pub config: AppConfig,
    pub llm_manager: LlmManager,
    pub executor: Arc<dyn QueryExecutor>,
}

impl AppState {
    pub fn new(config: AppConfig, llm_manager: LlmManager, executor: Arc<dyn QueryExecutor>) -> Self {
        Self {
            config,
            llm_manager,
            executor,
        }
    }
}
