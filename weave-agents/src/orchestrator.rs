//! `orchestrator` (agent): the branch router (§4.7.2, §9). Inspects the set
//! of tool node ids the workflow author wired as this node's candidates —
//! carried in `settings.availableTools`, since the handler contract
//! (`execute(user_message, context, settings, model_class)`, §4.4) gives it
//! no direct view of the graph — and asks the small model class to choose
//! the subset relevant to the user's request. The choice is published as
//! `selected_tools`, which the Execution Engine's exclusion policy consumes
//! directly; this handler has no engine-side special case.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use weave_engine::{AgentError, AgentHandler, AgentRequest, AgentResult, SELECTED_TOOLS_KEY};
use weave_gateway::{Message, ModelGateway};

use crate::support::chat_text;

const PROMPT_HEADER: &str =
    "You are routing a request to a subset of available tools. Reply with a JSON array of \
     the tool ids that should run, and nothing else. If none apply, reply with [].";

pub struct OrchestratorHandler {
    gateway: Arc<dyn ModelGateway>,
}

impl OrchestratorHandler {
    pub fn new(gateway: Arc<dyn ModelGateway>) -> Self {
        Self { gateway }
    }
}

fn available_tools(settings: &Value) -> Vec<String> {
    settings
        .get("availableTools")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

/// Tries a JSON array first (the prompted format), then falls back to
/// scanning the raw text for any of the candidate ids (§4.7.8: "agent-local
/// fallback to a best-effort parse"). Returns `None` only when neither
/// yields a single candidate match — the "impossible to parse" case.
fn parse_selection(response: &str, candidates: &[String]) -> Option<Vec<String>> {
    if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(response.trim()) {
        let ids: Vec<String> = items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect();
        let valid: Vec<String> = ids.into_iter().filter(|id| candidates.contains(id)).collect();
        return Some(valid);
    }

    let found: Vec<String> = candidates.iter().filter(|id| response.contains(id.as_str())).cloned().collect();
    if found.is_empty() {
        None
    } else {
        Some(found)
    }
}

#[async_trait]
impl AgentHandler for OrchestratorHandler {
    async fn execute(&self, request: AgentRequest) -> Result<AgentResult, AgentError> {
        let candidates = available_tools(&request.settings);
        if candidates.is_empty() {
            // Nothing configured to choose among: leave `selected_tools`
            // unset so the exclusion policy doesn't prune anything.
            return Ok(AgentResult::text(request.user_message));
        }

        let mut prompt = format!("{PROMPT_HEADER}\n\nRequest: {}\n\nTool ids:\n", request.user_message);
        for id in &candidates {
            prompt.push_str(&format!("- {id}\n"));
        }

        let response = chat_text(self.gateway.as_ref(), request.model_class, &[Message::user(prompt)]).await?;

        let mut patch = HashMap::new();
        let selected = match parse_selection(&response, &candidates) {
            Some(selected) => selected,
            None => {
                // Fail open: no determination could be made, so don't
                // publish `selected_tools` at all and let every tool run.
                return Ok(AgentResult::text(response));
            }
        };

        let deduped: Vec<String> = selected.into_iter().collect::<HashSet<_>>().into_iter().collect();
        patch.insert(SELECTED_TOOLS_KEY.to_string(), json!(deduped));

        Ok(AgentResult { content: response, context_patch: patch, ..Default::default() })
    }
}
