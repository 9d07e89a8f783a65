//! Event payload types (§3, §4.7, §4.8).

use serde::Serialize;
use serde_json::Value;

/// One step recorded for a node that was scheduled (run or excluded).
#[derive(Clone, Debug, Serialize)]
pub struct AgentStep {
    pub node_id: String,
    pub model: Option<String>,
    pub action: String,
    pub content: String,
    pub excluded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
}

/// Tool outputs bundle surfaced on the `Done` event (§4.7.7).
#[derive(Clone, Debug, Default, Serialize)]
pub struct ToolOutputs {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub web_results: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub docs: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculations: Option<Value>,
}

/// Terminal result carried by the `Done` event.
#[derive(Clone, Debug, Serialize)]
pub struct DoneResult {
    pub final_answer: String,
    pub output_format: String,
    pub tool_outputs: ToolOutputs,
    pub steps: Vec<AgentStep>,
    pub latency_ms: u64,
}

/// One event on the execution stream. Matches the wire tags of §6.1 exactly
/// (`agent_start`, `agent_complete`, `done`, `error`) via `#[serde(tag = "type")]`.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    AgentStart { node_id: String },
    AgentComplete { step: AgentStep },
    Done { result: DoneResult },
    Error { message: String },
}

impl Event {
    /// SSE `event:` tag for this variant (§6.1).
    pub fn sse_tag(&self) -> &'static str {
        match self {
            Event::AgentStart { .. } => "agent_start",
            Event::AgentComplete { .. } => "agent_complete",
            Event::Done { .. } => "done",
            Event::Error { .. } => "error",
        }
    }

    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sse_tag_matches_wire_protocol() {
        assert_eq!(
            Event::AgentStart { node_id: "n1".into() }.sse_tag(),
            "agent_start"
        );
        assert_eq!(
            Event::Error { message: "x".into() }.sse_tag(),
            "error"
        );
    }

    #[test]
    fn to_json_includes_tag() {
        let ev = Event::AgentStart { node_id: "n1".into() };
        let v = ev.to_json().unwrap();
        assert_eq!(v["type"], "agent_start");
        assert_eq!(v["node_id"], "n1");
    }

    #[test]
    fn done_result_serializes_nested_steps() {
        let ev = Event::Done {
            result: DoneResult {
                final_answer: "hi".into(),
                output_format: "text".into(),
                tool_outputs: ToolOutputs::default(),
                steps: vec![AgentStep {
                    node_id: "n1".into(),
                    model: Some("small".into()),
                    action: "respond".into(),
                    content: "hi".into(),
                    excluded: false,
                    error: None,
                    metadata: Value::Null,
                }],
                latency_ms: 12,
            },
        };
        let v = ev.to_json().unwrap();
        assert_eq!(v["type"], "done");
        assert_eq!(v["result"]["steps"][0]["node_id"], "n1");
    }
}
