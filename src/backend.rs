//! Translation backend client.
//!
//! Wraps an OpenRouter-compatible chat-completions API as the external
//! translation capability. The client reports every transport or upstream
//! failure as a [`BackendError`]; the single bounded retry lives in the
//! pipeline, not here.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::config::AppConfig;

/// Failures talking to the translation backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("translation request failed: {0}")]
    Transport(String),

    #[error("translation request timed out")]
    Timeout,

    #[error("translation backend returned {status}: {detail}")]
    Upstream { status: u16, detail: String },

    #[error("translation backend returned a malformed response")]
    MalformedResponse,
}

/// External text-translation capability.
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// Translate `text` into `target_language`, returning the translated
    /// string.
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, BackendError>;
}

/// OpenRouter chat-completions translation client.
pub struct OpenRouterClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenRouterClient {
    pub fn from_config(config: &AppConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(config.backend_timeout())
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            api_key: config.backend_api_key.clone(),
            base_url: config.backend_url.trim_end_matches('/').to_string(),
            model: config.backend_model.clone(),
        })
    }
}

#[async_trait]
impl TranslationBackend for OpenRouterClient {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, BackendError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt(target_language)},
                {"role": "user", "content": text}
            ],
            "temperature": 0.1
        });

        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::Timeout
                } else {
                    BackendError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(BackendError::Upstream {
                status: status.as_u16(),
                detail: detail.chars().take(200).collect(),
            });
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|_| BackendError::MalformedResponse)?;

        let translated = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();

        if translated.trim().is_empty() {
            return Err(BackendError::MalformedResponse);
        }

        Ok(translated.trim().to_string())
    }
}

fn system_prompt(target_language: &str) -> String {
    format!(
        "You are a professional translator. Translate the user's text to {target_language}. \
         Preserve formatting. Output only the translation, nothing else."
    )
}

// --- Response types ---

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}
