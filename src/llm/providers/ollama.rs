use crate::config::LlmConfig;
use crate::llm::{LlmError, SqlGenerator};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

pub struct OllamaProvider {
    client: reqwest::Client,
    api_url: String,
    model: String,
}

#[derive(Serialize, Debug)]
struct OllamaRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize, Debug)]
struct OllamaMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize, Debug)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Deserialize, Debug)]
struct OllamaResponse {
    message: Option<OllamaReply>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize, Debug)]
struct OllamaReply {
    content: String,
}

impl OllamaProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_url = config
            .api_url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434/api/chat".to_string());

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            api_url,
            model: config.model.clone(),
        })
    }

    fn build_request<'a>(&'a self, question: &'a str, system_prompt: &'a str) -> OllamaRequest<'a> {
        OllamaRequest {
            model: &self.model,
            messages: vec![
                OllamaMessage {
                    role: "system",
                    content: system_prompt,
                },
                OllamaMessage {
                    role: "user",
                    content: question,
                },
            ],
            stream: false, // Explicitly disable streaming
            options: OllamaOptions { temperature: 0.0 },
        }
    }
}

fn reply_content(response_text: &str) -> Result<String, LlmError> {
    let ollama_response = serde_json::from_str::<OllamaResponse>(response_text).map_err(|e| {
        error!("Failed to parse Ollama response: {} - Response was: {}", e, response_text);
        LlmError::ResponseError(format!("Failed to parse Ollama response: {}", e))
    })?;

    if let Some(message) = ollama_response.error {
        return Err(LlmError::ResponseError(message));
    }

    match ollama_response.message {
        Some(reply) if !reply.content.trim().is_empty() => Ok(reply.content),
        _ => Err(LlmError::ResponseError(
            "Ollama returned an empty reply".to_string(),
        )),
    }
}

#[async_trait]
impl SqlGenerator for OllamaProvider {
    async fn generate_sql(&self, question: &str, system_prompt: &str) -> Result<String, LlmError> {
        info!("Sending request to Ollama with model: {}", self.model);
        debug!("API URL: {}", self.api_url);

        let request = self.build_request(question, system_prompt);

        let response = self
            .client
            .post(&self.api_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::ConnectionError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            // Try to get the error message from the response body
            let error_body = match response.text().await {
                Ok(body) => format!(" - Response body: {}", body),
                Err(_) => String::new(),
            };

            error!("Ollama API responded with status code: {}{}", status, error_body);
            return Err(LlmError::ResponseError(format!(
                "Ollama API responded with status code: {}{}",
                status, error_body
            )));
        }

        let response_text = response
            .text()
            .await
            .map_err(|e| LlmError::ResponseError(format!("Failed to read response body: {}", e)))?;

        debug!("Raw response from Ollama: {}", response_text);

        reply_content(&response_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> OllamaProvider {
        OllamaProvider::new(&LlmConfig {
            backend: "ollama".to_string(),
            model: "sqlcoder".to_string(),
            api_key: None,
            api_url: None,
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn request_disables_streaming_and_sampling_noise() {
        let provider = provider();
        let json = serde_json::to_value(provider.build_request("q", "rules")).unwrap();

        assert_eq!(json["model"], "sqlcoder");
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["temperature"], 0.0);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "q");
        assert_eq!(provider.api_url, "http://localhost:11434/api/chat");
    }

    #[test]
    fn chat_reply_is_extracted() {
        let body = r#"{"model":"sqlcoder","created_at":"2024-01-01T00:00:00Z",
            "message":{"role":"assistant","content":"SELECT 1"},"done":true}"#;
        assert_eq!(reply_content(body).unwrap(), "SELECT 1");
    }

    #[test]
    fn error_payloads_surface_as_response_errors() {
        let err = reply_content(r#"{"error":"model 'sqlcoder' not found"}"#).unwrap_err();
        assert_eq!(
            err.to_string(),
            "response error: model 'sqlcoder' not found"
        );

        assert!(matches!(
            reply_content(r#"{"message":{"role":"assistant","content":"  "}}"#),
            Err(LlmError::ResponseError(_))
        ));
    }
}
