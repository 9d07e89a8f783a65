//! `transformer` (agent): reshapes the chained input into `settings.toFormat`
//! (e.g. `"bullet-list"`, `"json"`, `"table"`), writing the result to
//! `transformed_content` (§4.7.6).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use weave_engine::{AgentError, AgentHandler, AgentRequest, AgentResult};
use weave_gateway::{Message, ModelGateway};

use crate::support::{chained_input, chat_text, settings_str_or};

const UPSTREAM_KEYS: &[&str] = &["final_answer", "translated_content", "summary"];

pub struct TransformerHandler {
    gateway: Arc<dyn ModelGateway>,
}

impl TransformerHandler {
    pub fn new(gateway: Arc<dyn ModelGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl AgentHandler for TransformerHandler {
    async fn execute(&self, request: AgentRequest) -> Result<AgentResult, AgentError> {
        let input = chained_input(&request.context, UPSTREAM_KEYS, &request.user_message);
        let format = settings_str_or(&request.settings, "toFormat", "plain-text");

        let prompt = format!("Rewrite the following content as {format}, with no commentary:\n\n{input}");
        let transformed = chat_text(self.gateway.as_ref(), request.model_class, &[Message::user(prompt)]).await?;

        let mut patch = HashMap::new();
        patch.insert("transformed_content".to_string(), Value::String(transformed.clone()));

        Ok(AgentResult { content: transformed, context_patch: patch, ..Default::default() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_gateway::MockGateway;

    #[tokio::test]
    async fn writes_transformed_content_using_chained_upstream_value() {
        let gateway: Arc<dyn ModelGateway> = Arc::new(MockGateway::with_reply("- a\n- b"));
        let handler = TransformerHandler::new(gateway);

        let mut context = HashMap::new();
        context.insert("final_answer".to_string(), serde_json::json!("a and b"));

        let request = AgentRequest {
            node_id: "tr".into(),
            user_message: "ignored".into(),
            context,
            settings: serde_json::json!({ "toFormat": "bullet-list" }),
            model_class: weave_gateway::ModelClass::Small,
        };

        let result = handler.execute(request).await.unwrap();
        assert_eq!(result.content, "- a\n- b");
        assert_eq!(
            result.context_patch.get("transformed_content").unwrap().as_str().unwrap(),
            "- a\n- b"
        );
    }
}
