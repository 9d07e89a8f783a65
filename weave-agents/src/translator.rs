//! `translator` (agent): renders the chained input in
//! `settings.targetLanguage`, writing `translated_content` (§4.7.6).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use weave_engine::{AgentError, AgentHandler, AgentRequest, AgentResult};
use weave_gateway::{Message, ModelGateway};

use crate::support::{chained_input, chat_text, settings_str_or};

const UPSTREAM_KEYS: &[&str] = &["final_answer", "transformed_content", "summary"];

pub struct TranslatorHandler {
    gateway: Arc<dyn ModelGateway>,
}

impl TranslatorHandler {
    pub fn new(gateway: Arc<dyn ModelGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl AgentHandler for TranslatorHandler {
    async fn execute(&self, request: AgentRequest) -> Result<AgentResult, AgentError> {
        let input = chained_input(&request.context, UPSTREAM_KEYS, &request.user_message);
        let target = settings_str_or(&request.settings, "targetLanguage", "English");

        let prompt = format!("Translate the following into {target}, preserving meaning and tone:\n\n{input}");
        let translated = chat_text(self.gateway.as_ref(), request.model_class, &[Message::user(prompt)]).await?;

        let mut patch = HashMap::new();
        patch.insert("translated_content".to_string(), Value::String(translated.clone()));

        Ok(AgentResult { content: translated, context_patch: patch, ..Default::default() })
    }
}
