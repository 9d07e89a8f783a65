//! The run-scoped key/value store agent handlers read and write (§4.6).
//!
//! Handlers never see a live reference to the store — they receive an owned
//! [`ContextSnapshot`] taken just before they run, per §4.7.5's literal
//! "(user_message, context_snapshot, settings, model_class)" handler
//! signature. This keeps the middleware chain free of borrow-checker
//! gymnastics around boxed futures.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde_json::Value;

/// Canonical key an orchestrator writes to steer the exclusion policy (§4.7.2).
/// Value is a JSON array of the tool node ids selected for this run.
pub const SELECTED_TOOLS_KEY: &str = "selected_tools";

/// Canonical key holding the effective message handlers act on (§3, §4.7.4):
/// seeded from the request's top-level message, then overwritable by prompt
/// and upload input nodes.
pub const USER_MESSAGE_KEY: &str = "user_message";

/// An immutable, owned view of the context at the moment a node runs.
pub type ContextSnapshot = HashMap<String, Value>;

#[derive(Default)]
pub struct Context {
    inner: Mutex<HashMap<String, Value>>,
}

impl Context {
    pub fn new() -> Self {
        Self { inner: Mutex::new(HashMap::new()) }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.lock().get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.inner.lock().insert(key.into(), value);
    }

    /// Shallow-merges `patch`'s keys into the store, overwriting on conflict.
    /// This is how a handler's structured output (e.g. an orchestrator's
    /// `selected_tools` decision) lands in the shared context.
    pub fn merge(&self, patch: HashMap<String, Value>) {
        self.inner.lock().extend(patch);
    }

    /// A point-in-time owned copy, handed to the next node's handler.
    pub fn snapshot(&self) -> ContextSnapshot {
        self.inner.lock().clone()
    }

    pub fn selected_tools(&self) -> Option<Vec<String>> {
        let value = self.get(SELECTED_TOOLS_KEY)?;
        let array = value.as_array()?;
        Some(
            array
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
        )
    }
}
