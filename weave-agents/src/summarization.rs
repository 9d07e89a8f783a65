//! `summarization` (agent): condenses the chained input, respecting an
//! optional `settings.maxWords`, writing `summary` (§4.7.6).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use weave_engine::{AgentError, AgentHandler, AgentRequest, AgentResult};
use weave_gateway::{Message, ModelGateway};

use crate::support::chat_text;

const UPSTREAM_KEYS: &[&str] = &["semantic_results", "final_answer", "transformed_content"];

pub struct SummarizationHandler {
    gateway: Arc<dyn ModelGateway>,
}

impl SummarizationHandler {
    pub fn new(gateway: Arc<dyn ModelGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl AgentHandler for SummarizationHandler {
    async fn execute(&self, request: AgentRequest) -> Result<AgentResult, AgentError> {
        let input = crate::support::chained_input(&request.context, UPSTREAM_KEYS, &request.user_message);

        let mut prompt = format!("Summarize the following:\n\n{input}");
        if let Some(max_words) = request.settings.get("maxWords").and_then(Value::as_u64) {
            prompt.push_str(&format!("\n\nKeep the summary to at most {max_words} words."));
        }

        let summary = chat_text(self.gateway.as_ref(), request.model_class, &[Message::user(prompt)]).await?;

        let mut patch = HashMap::new();
        patch.insert("summary".to_string(), Value::String(summary.clone()));

        Ok(AgentResult { content: summary, context_patch: patch, ..Default::default() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_gateway::MockGateway;

    #[tokio::test]
    async fn writes_summary() {
        let gateway: Arc<dyn ModelGateway> = Arc::new(MockGateway::with_reply("short version"));
        let handler = SummarizationHandler::new(gateway);

        let request = AgentRequest {
            node_id: "sm".into(),
            user_message: "a very long document".into(),
            context: HashMap::new(),
            settings: Value::Null,
            model_class: weave_gateway::ModelClass::Large,
        };

        let result = handler.execute(request).await.unwrap();
        assert_eq!(result.content, "short version");
        assert_eq!(result.context_patch.get("summary").unwrap().as_str().unwrap(), "short version");
    }
}
