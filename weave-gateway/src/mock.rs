//! Mock gateway for tests: fixed responses, no network calls.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{GatewayError, Message, ModelClass, ModelGateway};

/// Returns a fixed chat reply and a fixed, deterministic embedding per input text.
///
/// Mirrors the teacher's `MockLlm`: a fixed response by default, with an
/// optional stateful mode (first call differs from later calls) for testing
/// multi-round agent behavior.
pub struct MockGateway {
    reply: String,
    second_reply: Option<String>,
    call_count: AtomicUsize,
    dimension: usize,
}

impl MockGateway {
    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            second_reply: None,
            call_count: AtomicUsize::new(0),
            dimension: 8,
        }
    }

    pub fn stateful(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            reply: first.into(),
            second_reply: Some(second.into()),
            call_count: AtomicUsize::new(0),
            dimension: 8,
        }
    }

    /// Deterministic pseudo-embedding: hashes the text into `dimension` floats
    /// in [-1, 1] so cosine similarity is stable across test runs.
    fn fake_embed(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dimension];
        for (i, byte) in text.bytes().enumerate() {
            let slot = i % self.dimension;
            v[slot] += (byte as f32) / 255.0;
        }
        v
    }
}

#[async_trait]
impl ModelGateway for MockGateway {
    async fn chat(
        &self,
        _model_class: ModelClass,
        _messages: &[Message],
    ) -> Result<String, GatewayError> {
        let n = self.call_count.fetch_add(1, Ordering::SeqCst);
        if n == 0 || self.second_reply.is_none() {
            Ok(self.reply.clone())
        } else {
            Ok(self.second_reply.clone().unwrap())
        }
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, GatewayError> {
        Ok(texts.iter().map(|t| self.fake_embed(t)).collect())
    }
}
