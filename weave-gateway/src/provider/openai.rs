//! OpenAI chat + embeddings adapter.
//!
//! Chat is grounded in the teacher's `ChatOpenAI` (graphweave `llm::openai`): a
//! thin wrapper over `async-openai`'s `Client<OpenAIConfig>`, reading
//! `OPENAI_BASE_URL`/`OPENAI_API_BASE` for the endpoint the way the teacher does, so
//! the same client also serves any OpenAI-compatible embedding endpoint
//! (used when `LLM_PROVIDER=anthropic` but embeddings still need a provider, §4.1).
//! Embeddings follow the teacher's `OpenAIEmbedder`.

use async_openai::{
    config::OpenAIConfig,
    types::embeddings::CreateEmbeddingRequestArgs,
    types::chat::{
        ChatCompletionRequestAssistantMessage, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;

use crate::{GatewayError, Message, ModelClass, ModelGateway, Role};
use weave_config::Settings;

pub struct OpenAiGateway {
    client: Client<OpenAIConfig>,
    small_model: String,
    large_model: String,
    embedding_model: String,
}

impl OpenAiGateway {
    pub fn new(settings: &Settings) -> Self {
        let mut config = OpenAIConfig::new();
        if let Ok(base) = std::env::var("OPENAI_BASE_URL").or_else(|_| std::env::var("OPENAI_API_BASE")) {
            config = config.with_api_base(base);
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config = config.with_api_key(key);
        }
        Self {
            client: Client::with_config(config),
            small_model: settings.small_model.clone(),
            large_model: settings.large_model.clone(),
            embedding_model: settings.embedding_model.clone(),
        }
    }

    fn messages_to_request(messages: &[Message]) -> Vec<ChatCompletionRequestMessage> {
        messages
            .iter()
            .map(|m| match m.role {
                Role::System => ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessage::from(m.content.as_str()),
                ),
                Role::User => ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessage::from(m.content.as_str()),
                ),
                Role::Assistant => ChatCompletionRequestMessage::Assistant(
                    ChatCompletionRequestAssistantMessage::from(m.content.as_str()),
                ),
            })
            .collect()
    }
}

#[async_trait]
impl ModelGateway for OpenAiGateway {
    async fn chat(
        &self,
        model_class: ModelClass,
        messages: &[Message],
    ) -> Result<String, GatewayError> {
        if std::env::var("OPENAI_API_KEY").is_err() {
            return Err(GatewayError::Configuration(
                "OPENAI_API_KEY is not set".into(),
            ));
        }

        let model = match model_class {
            ModelClass::Small => &self.small_model,
            ModelClass::Large => &self.large_model,
        };

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(model.clone());
        args.messages(Self::messages_to_request(messages));
        let request = args
            .build()
            .map_err(|e| GatewayError::Provider(format!("request build failed: {e}")))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            let msg = e.to_string();
            if msg.contains("429") || msg.to_lowercase().contains("rate limit") {
                GatewayError::RateLimited(msg)
            } else {
                GatewayError::Provider(msg)
            }
        })?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::Provider("OpenAI returned no choices".into()))?;

        Ok(choice.message.content.unwrap_or_default())
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, GatewayError> {
        if std::env::var("OPENAI_API_KEY").is_err() {
            return Err(GatewayError::Configuration(
                "OPENAI_API_KEY is not set".into(),
            ));
        }

        let input: Vec<String> = texts.to_vec();
        let request = CreateEmbeddingRequestArgs::default()
            .model(self.embedding_model.clone())
            .input(input)
            .build()
            .map_err(|e| GatewayError::Provider(format!("embedding request build failed: {e}")))?;

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| GatewayError::Provider(e.to_string()))?;

        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }
}
