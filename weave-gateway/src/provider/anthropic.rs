//! Anthropic chat adapter: hand-rolled `reqwest` client against the Messages API.
//!
//! Grounded in the pack's `dashflow-anthropic` crate, which deliberately avoids a
//! third-party Anthropic SDK crate in favor of a direct HTTP client built on
//! `reqwest`. Anthropic has no first-party embedding endpoint, so `embed` is
//! served by an OpenAI-compatible endpoint configured via `EMBEDDING_MODEL`
//! (and optionally `OPENAI_BASE_URL`/`OPENAI_API_KEY`), the same fallback the
//! teacher's `OpenAIConfig` supports by pointing its base URL elsewhere (§4.1).

use async_trait::async_trait;
use serde_json::json;

use crate::provider::openai::OpenAiGateway;
use crate::{GatewayError, Message, ModelClass, ModelGateway, Role};
use weave_config::Settings;

const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicGateway {
    http: reqwest::Client,
    api_url: String,
    small_model: String,
    large_model: String,
    embedder: OpenAiGateway,
}

impl AnthropicGateway {
    pub fn new(settings: &Settings) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: std::env::var("ANTHROPIC_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            small_model: settings.small_model.clone(),
            large_model: settings.large_model.clone(),
            embedder: OpenAiGateway::new(settings),
        }
    }

    fn map_status_error(status: reqwest::StatusCode, body: &str) -> GatewayError {
        match status.as_u16() {
            429 => GatewayError::RateLimited(body.to_string()),
            401 | 403 => GatewayError::Configuration(format!("authentication failed: {body}")),
            529 => GatewayError::Provider(format!("overloaded: {body}")),
            _ => GatewayError::Provider(format!("{status}: {body}")),
        }
    }
}

#[async_trait]
impl ModelGateway for AnthropicGateway {
    async fn chat(
        &self,
        model_class: ModelClass,
        messages: &[Message],
    ) -> Result<String, GatewayError> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| GatewayError::Configuration("ANTHROPIC_API_KEY is not set".into()))?;

        let model = match model_class {
            ModelClass::Small => &self.small_model,
            ModelClass::Large => &self.large_model,
        };

        let system: Option<String> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.clone())
            .reduce(|a, b| format!("{a}\n{b}"));

        let turns: Vec<_> = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| {
                json!({
                    "role": if m.role == Role::User { "user" } else { "assistant" },
                    "content": m.content,
                })
            })
            .collect();

        let mut body = json!({
            "model": model,
            "max_tokens": 4096,
            "messages": turns,
        });
        if let Some(sys) = system {
            body["system"] = json!(sys);
        }

        let response = self
            .http
            .post(&self.api_url)
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Provider(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::Provider(e.to_string()))?;

        if !status.is_success() {
            return Err(Self::map_status_error(status, &text));
        }

        let parsed: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| GatewayError::Provider(format!("invalid response JSON: {e}")))?;

        let content = parsed["content"]
            .as_array()
            .and_then(|blocks| blocks.iter().find(|b| b["type"] == "text"))
            .and_then(|b| b["text"].as_str())
            .unwrap_or_default()
            .to_string();

        Ok(content)
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, GatewayError> {
        self.embedder.embed(texts).await
    }
}
