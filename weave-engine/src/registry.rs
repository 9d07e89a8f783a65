//! Agent handler contract and the lookup table the engine dispatches
//! through (§4.4, §4.7.5).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use weave_gateway::ModelClass;
use weave_stream::ToolOutputs;

use crate::context::ContextSnapshot;
use crate::error::AgentError;
use crate::retry::RetryPolicy;

/// Everything a handler needs to act, assembled by the engine just before
/// dispatch (§4.7.5): the top-level user message, an owned context snapshot,
/// the node's opaque `settings` payload, and the resolved model class.
#[derive(Clone)]
pub struct AgentRequest {
    pub node_id: String,
    pub user_message: String,
    pub context: ContextSnapshot,
    pub settings: Value,
    pub model_class: ModelClass,
}

/// What a handler hands back: the text to record for this step, a context
/// patch merged into the shared store, and any tool-output contribution
/// (§4.7.7) to fold into the run's aggregate `ToolOutputs`.
#[derive(Default)]
pub struct AgentResult {
    pub content: String,
    pub context_patch: HashMap<String, Value>,
    pub model: Option<String>,
    pub tool_outputs: ToolOutputs,
}

impl AgentResult {
    pub fn text(content: impl Into<String>) -> Self {
        Self { content: content.into(), ..Default::default() }
    }
}

#[async_trait]
pub trait AgentHandler: Send + Sync {
    async fn execute(&self, request: AgentRequest) -> Result<AgentResult, AgentError>;

    /// Per-node-type retry policy (§4.8 supplement); defaults to the spec's
    /// literal one-retry/100ms-then-500ms schedule.
    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
    }
}

/// Maps a node type name (`Node::as_str`, e.g. `"synthesis"`) to the handler
/// that implements it.
#[derive(Default, Clone)]
pub struct AgentRegistry {
    handlers: HashMap<String, Arc<dyn AgentHandler>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self { handlers: HashMap::new() }
    }

    pub fn register(&mut self, node_type: &'static str, handler: Arc<dyn AgentHandler>) {
        self.handlers.insert(node_type.to_string(), handler);
    }

    pub fn get(&self, node_type: &str) -> Option<Arc<dyn AgentHandler>> {
        self.handlers.get(node_type).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl AgentHandler for Echo {
        async fn execute(&self, request: AgentRequest) -> Result<AgentResult, AgentError> {
            Ok(AgentResult::text(request.user_message))
        }
    }

    #[tokio::test]
    async fn register_then_get_dispatches_to_the_right_handler() {
        let mut registry = AgentRegistry::new();
        registry.register("synthesis", Arc::new(Echo));

        assert!(registry.get("sampler").is_none());
        let handler = registry.get("synthesis").unwrap();
        let result = handler
            .execute(AgentRequest {
                node_id: "n1".into(),
                user_message: "hi".into(),
                context: HashMap::new(),
                settings: Value::Null,
                model_class: ModelClass::Small,
            })
            .await
            .unwrap();
        assert_eq!(result.content, "hi");
    }
}
