pub mod fences;
pub mod prompt;
pub mod providers;

use crate::config::LlmConfig;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("connection error: {0}")]
    ConnectionError(String),
    #[error("response error: {0}")]
    ResponseError(String),
    #[error("configuration error: {0}")]
    ConfigError(String),
}

/// A chat-completion backend that answers a question under a system instruction.
///
/// Implementations return the model's reply text as-is; fence stripping happens
/// in [`LlmManager::translate`].
#[async_trait]
pub trait SqlGenerator: Send + Sync {
    async fn generate_sql(&self, question: &str, system_prompt: &str) -> Result<String, LlmError>;
}

/// Text-to-SQL translator: the configured backend plus the fixed system prompt.
pub struct LlmManager {
    generator: Box<dyn SqlGenerator>,
    system_prompt: String,
}

impl LlmManager {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let generator: Box<dyn SqlGenerator> = match config.backend.as_str() {
            "openai" | "remote" => Box::new(providers::remote::RemoteLlmProvider::new(config)?),
            "ollama" => Box::new(providers::ollama::OllamaProvider::new(config)?),
            _ => {
                return Err(LlmError::ConfigError(format!(
                    "Unsupported LLM backend: {}",
                    config.backend
                )))
            }
        };

        Ok(Self::from_generator(generator, prompt::render_system_prompt()?))
    }

    pub fn from_generator(generator: Box<dyn SqlGenerator>, system_prompt: String) -> Self {
        Self {
            generator,
            system_prompt,
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Turns a natural-language question into a raw SQL string.
    pub async fn translate(&self, question: &str) -> Result<String, LlmError> {
        let reply = self
            .generator
            .generate_sql(question, &self.system_prompt)
            .await?;
        debug!("Raw model reply: {}", reply);

        let sql = fences::strip_code_fences(&reply);
        info!("Generated SQL: {}", sql);
        Ok(sql)
    }
}
