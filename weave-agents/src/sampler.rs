//! `sampler` (agent): draws `settings.samples` independent completions for
//! the same prompt and exposes them as `candidates`, so a downstream
//! synthesis/formatting node can pick or merge among them (§4.7.3).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use weave_engine::{AgentError, AgentHandler, AgentRequest, AgentResult};
use weave_gateway::{Message, ModelGateway};

use crate::support::{chat_text, settings_usize_or};

const DEFAULT_SAMPLES: usize = 3;

pub struct SamplerHandler {
    gateway: Arc<dyn ModelGateway>,
}

impl SamplerHandler {
    pub fn new(gateway: Arc<dyn ModelGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl AgentHandler for SamplerHandler {
    async fn execute(&self, request: AgentRequest) -> Result<AgentResult, AgentError> {
        let samples = settings_usize_or(&request.settings, "samples", DEFAULT_SAMPLES).max(1);
        let message = Message::user(request.user_message.clone());

        let mut candidates = Vec::with_capacity(samples);
        for _ in 0..samples {
            let reply = chat_text(self.gateway.as_ref(), request.model_class, std::slice::from_ref(&message)).await?;
            candidates.push(reply);
        }

        let mut patch = HashMap::new();
        patch.insert("candidates".to_string(), json!(candidates));

        Ok(AgentResult {
            content: candidates.first().cloned().unwrap_or_default(),
            context_patch: patch,
            ..Default::default()
        })
    }
}
