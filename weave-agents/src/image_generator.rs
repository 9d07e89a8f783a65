//! `image_generator` (tool): the boundary to an external image-generation
//! collaborator (§1 Non-goals: this system orchestrates, it does not host
//! model weights). [`ModelGateway`] has no native image-synthesis op, so this
//! handler asks the chat model to produce a detailed generation prompt and
//! records it as a placeholder image descriptor in `tool_outputs.images` —
//! the shape a real image-provider adapter would fill with an actual URL.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use weave_engine::{AgentError, AgentHandler, AgentRequest, AgentResult};
use weave_gateway::{Message, ModelGateway};

use crate::support::{chat_text, settings_str_or};

pub struct ImageGeneratorHandler {
    gateway: Arc<dyn ModelGateway>,
}

impl ImageGeneratorHandler {
    pub fn new(gateway: Arc<dyn ModelGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl AgentHandler for ImageGeneratorHandler {
    async fn execute(&self, request: AgentRequest) -> Result<AgentResult, AgentError> {
        let style = settings_str_or(&request.settings, "style", "photorealistic");
        let prompt = format!(
            "Write a single, detailed {style} image-generation prompt for: {}",
            request.user_message
        );

        let description = chat_text(self.gateway.as_ref(), request.model_class, &[Message::user(prompt)]).await?;

        let mut result = AgentResult::text(description.clone());
        result.tool_outputs.images.push(json!({
            "prompt": description,
            "style": style,
        }));
        Ok(result)
    }
}
