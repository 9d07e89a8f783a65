//! Small helpers shared by every handler: reading a node's opaque `settings`
//! payload, turning a gateway/retrieval failure into the engine's typed
//! error, and picking the best already-written context value for a handler
//! that chains off a prior step's output.

use serde_json::Value;
use weave_engine::{AgentError, ContextSnapshot};
use weave_gateway::{GatewayError, Message, ModelClass, ModelGateway};
use weave_retrieval::RetrievalError;

pub fn settings_str<'a>(settings: &'a Value, key: &str) -> Option<&'a str> {
    settings.get(key).and_then(Value::as_str)
}

pub fn settings_str_or<'a>(settings: &'a Value, key: &str, default: &'a str) -> &'a str {
    settings_str(settings, key).unwrap_or(default)
}

pub fn settings_usize_or(settings: &Value, key: &str, default: usize) -> usize {
    settings
        .get(key)
        .and_then(Value::as_u64)
        .map(|v| v as usize)
        .unwrap_or(default)
}

pub fn settings_bool_or(settings: &Value, key: &str, default: bool) -> bool {
    settings.get(key).and_then(Value::as_bool).unwrap_or(default)
}

/// Issues one `chat` call, converting a transport/provider failure into a
/// [`AgentError::Recoverable`] per §4.7.8 — the engine's retry policy is the
/// thing that decides whether to try again, not the handler.
pub async fn chat_text(
    gateway: &dyn ModelGateway,
    model_class: ModelClass,
    messages: &[Message],
) -> Result<String, AgentError> {
    gateway.chat(model_class, messages).await.map_err(gateway_error_to_agent_error)
}

pub fn gateway_error_to_agent_error(err: GatewayError) -> AgentError {
    match err {
        GatewayError::Configuration(_) => AgentError::Fatal(err.to_string()),
        _ => AgentError::Recoverable(err.to_string()),
    }
}

pub fn retrieval_error_to_agent_error(err: RetrievalError) -> AgentError {
    match err {
        RetrievalError::Gateway(e) => gateway_error_to_agent_error(e),
        other => AgentError::Recoverable(other.to_string()),
    }
}

/// Reads the first populated string context key from `keys`, in order,
/// falling back to the effective user message (§3: most handlers chain off
/// whatever the previous agent/transformer/translator node last wrote).
pub fn chained_input(context: &ContextSnapshot, keys: &[&str], user_message: &str) -> String {
    for key in keys {
        if let Some(value) = context.get(*key).and_then(Value::as_str) {
            if !value.trim().is_empty() {
                return value.to_string();
            }
        }
    }
    user_message.to_string()
}
