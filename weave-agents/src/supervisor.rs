//! `supervisor` (agent): the top-of-graph planning step. Drafts a short
//! execution plan for the downstream nodes to work from, honoring
//! `settings.planningStyle` and the `autoRAG` toggle that tells it whether a
//! retrieval step is already wired into the graph (§4.7.1).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use weave_engine::{AgentError, AgentHandler, AgentRequest, AgentResult};
use weave_gateway::{Message, ModelGateway};

use crate::support::{chat_text, settings_bool_or, settings_str_or};

pub struct SupervisorHandler {
    gateway: Arc<dyn ModelGateway>,
}

impl SupervisorHandler {
    pub fn new(gateway: Arc<dyn ModelGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl AgentHandler for SupervisorHandler {
    async fn execute(&self, request: AgentRequest) -> Result<AgentResult, AgentError> {
        let style = settings_str_or(&request.settings, "planningStyle", "concise");
        let auto_rag = settings_bool_or(&request.settings, "autoRAG", false);

        let mut prompt = format!(
            "Draft a {style} step-by-step plan for handling this request:\n\n{}",
            request.user_message
        );
        if auto_rag {
            prompt.push_str(
                "\n\nA knowledge base retrieval step runs automatically before this plan reaches \
                 downstream agents; assume relevant context will already be available to them.",
            );
        }

        let plan = chat_text(self.gateway.as_ref(), request.model_class, &[Message::user(prompt)]).await?;

        let mut patch = HashMap::new();
        patch.insert("supervisor_plan".to_string(), Value::String(plan.clone()));

        Ok(AgentResult { content: plan, context_patch: patch, ..Default::default() })
    }
}
