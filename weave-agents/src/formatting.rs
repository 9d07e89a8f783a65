//! `formatting` (agent): the last cosmetic pass over the run's output —
//! headings, spacing, markdown conventions — per `settings.style`, writing
//! `formatted_content` (§4.7.6).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use weave_engine::{AgentError, AgentHandler, AgentRequest, AgentResult};
use weave_gateway::{Message, ModelGateway};

use crate::support::{chained_input, chat_text, settings_str_or};

const UPSTREAM_KEYS: &[&str] = &["final_answer", "translated_content", "transformed_content", "summary"];

pub struct FormattingHandler {
    gateway: Arc<dyn ModelGateway>,
}

impl FormattingHandler {
    pub fn new(gateway: Arc<dyn ModelGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl AgentHandler for FormattingHandler {
    async fn execute(&self, request: AgentRequest) -> Result<AgentResult, AgentError> {
        let input = chained_input(&request.context, UPSTREAM_KEYS, &request.user_message);
        let style = settings_str_or(&request.settings, "style", "markdown");

        let prompt = format!("Reformat the following as clean {style}, preserving all content:\n\n{input}");
        let formatted = chat_text(self.gateway.as_ref(), request.model_class, &[Message::user(prompt)]).await?;

        let mut patch = HashMap::new();
        patch.insert("formatted_content".to_string(), Value::String(formatted.clone()));

        Ok(AgentResult { content: formatted, context_patch: patch, ..Default::default() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_gateway::MockGateway;

    #[tokio::test]
    async fn writes_formatted_content() {
        let gateway: Arc<dyn ModelGateway> = Arc::new(MockGateway::with_reply("# Title\n\nBody"));
        let handler = FormattingHandler::new(gateway);

        let request = AgentRequest {
            node_id: "fmt".into(),
            user_message: "title: body".into(),
            context: HashMap::new(),
            settings: Value::Null,
            model_class: weave_gateway::ModelClass::Small,
        };

        let result = handler.execute(request).await.unwrap();
        assert_eq!(result.content, "# Title\n\nBody");
    }
}
