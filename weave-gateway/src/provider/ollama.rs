//! Ollama adapter: local/self-hosted models via the `ollama-rs` client.
//!
//! Grounded in the pack's `dashflow-ollama` crate choice (`ollama-rs`, `stream`
//! feature) for talking to a local Ollama daemon instead of a hosted API.
//! Reads `OLLAMA_HOST`/`OLLAMA_PORT` the same way the OpenAI adapter reads its
//! base-URL env vars (§4.1), defaulting to `localhost:11434`.

use async_trait::async_trait;
use ollama_rs::{
    generation::chat::{request::ChatMessageRequest, ChatMessage},
    generation::embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest},
    Ollama,
};

use crate::{GatewayError, Message, ModelClass, ModelGateway, Role};
use weave_config::Settings;

pub struct OllamaGateway {
    client: Ollama,
    small_model: String,
    large_model: String,
    embedding_model: String,
}

impl OllamaGateway {
    pub fn new(settings: &Settings) -> Self {
        let host = std::env::var("OLLAMA_HOST").unwrap_or_else(|_| "http://localhost".to_string());
        let port = std::env::var("OLLAMA_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(11434);

        Self {
            client: Ollama::new(host, port),
            small_model: settings.small_model.clone(),
            large_model: settings.large_model.clone(),
            embedding_model: settings.embedding_model.clone(),
        }
    }

    fn to_chat_message(message: &Message) -> ChatMessage {
        match message.role {
            Role::System => ChatMessage::system(message.content.clone()),
            Role::User => ChatMessage::user(message.content.clone()),
            Role::Assistant => ChatMessage::assistant(message.content.clone()),
        }
    }
}

#[async_trait]
impl ModelGateway for OllamaGateway {
    async fn chat(
        &self,
        model_class: ModelClass,
        messages: &[Message],
    ) -> Result<String, GatewayError> {
        let model = match model_class {
            ModelClass::Small => self.small_model.clone(),
            ModelClass::Large => self.large_model.clone(),
        };

        let chat_messages: Vec<ChatMessage> = messages.iter().map(Self::to_chat_message).collect();
        let request = ChatMessageRequest::new(model, chat_messages);

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| GatewayError::Provider(e.to_string()))?;

        Ok(response
            .message
            .map(|m| m.content)
            .unwrap_or_default())
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, GatewayError> {
        let request = GenerateEmbeddingsRequest::new(
            self.embedding_model.clone(),
            EmbeddingsInput::Multiple(texts.to_vec()),
        );

        let response = self
            .client
            .generate_embeddings(request)
            .await
            .map_err(|e| GatewayError::Provider(e.to_string()))?;

        Ok(response.embeddings)
    }
}
