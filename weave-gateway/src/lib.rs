//! Model Gateway (§4.1): a uniform `chat`/`embed` surface over chat-completion and
//! embedding providers, selected once at startup by `LLM_PROVIDER`.

mod error;
mod message;
mod mock;
mod provider;

pub use error::GatewayError;
pub use message::{Message, ModelClass, Role};
pub use mock::MockGateway;

use async_trait::async_trait;
use std::sync::Arc;
use weave_config::{LlmProvider, Settings};

/// Uniform call surface over chat-completion and embedding providers (§4.1).
///
/// The rest of the system treats the gateway as opaque: callers pick a
/// [`ModelClass`] and never know which concrete provider answers it.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    async fn chat(
        &self,
        model_class: ModelClass,
        messages: &[Message],
    ) -> Result<String, GatewayError>;

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, GatewayError>;
}

/// Builds the configured gateway implementation. Fails with
/// [`GatewayError::Configuration`] only when a provider is selected whose
/// required credentials are absent (checked lazily, on first call, per §4.1).
pub fn build_gateway(settings: &Settings) -> Arc<dyn ModelGateway> {
    match settings.llm_provider {
        LlmProvider::OpenAi => Arc::new(provider::openai::OpenAiGateway::new(settings)),
        LlmProvider::Anthropic => Arc::new(provider::anthropic::AnthropicGateway::new(settings)),
        LlmProvider::Ollama => Arc::new(provider::ollama::OllamaGateway::new(settings)),
    }
}
