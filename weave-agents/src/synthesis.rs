//! `synthesis` (agent): combines whatever upstream nodes have written —
//! supervisor plan, semantic search hits, sampler candidates — into the
//! run's `final_answer`, honoring an optional `settings.maxWords` cap
//! (§4.7.4).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use weave_engine::{AgentError, AgentHandler, AgentRequest, AgentResult};
use weave_gateway::{Message, ModelGateway};

use crate::support::{chained_input, chat_text};

const UPSTREAM_KEYS: &[&str] = &["semantic_results", "candidates", "supervisor_plan"];

pub struct SynthesisHandler {
    gateway: Arc<dyn ModelGateway>,
}

impl SynthesisHandler {
    pub fn new(gateway: Arc<dyn ModelGateway>) -> Self {
        Self { gateway }
    }
}

fn truncate_to_words(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        text.to_string()
    } else {
        words[..max_words].join(" ")
    }
}

#[async_trait]
impl AgentHandler for SynthesisHandler {
    async fn execute(&self, request: AgentRequest) -> Result<AgentResult, AgentError> {
        let context_excerpt = chained_input(&request.context, UPSTREAM_KEYS, "");

        let prompt = if context_excerpt.is_empty() {
            request.user_message.clone()
        } else {
            format!(
                "Using this context:\n{context_excerpt}\n\nAnswer the request:\n{}",
                request.user_message
            )
        };

        let mut answer = chat_text(self.gateway.as_ref(), request.model_class, &[Message::user(prompt)]).await?;

        if let Some(max_words) = request.settings.get("maxWords").and_then(Value::as_u64) {
            answer = truncate_to_words(&answer, max_words as usize);
        }

        let mut patch = HashMap::new();
        patch.insert("final_answer".to_string(), Value::String(answer.clone()));

        Ok(AgentResult { content: answer, context_patch: patch, ..Default::default() })
    }
}
