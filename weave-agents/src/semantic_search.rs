//! `semantic_search` (tool): runs the Retriever (§4.3) against the run's
//! knowledge base and attaches relevance-ranked snippets to the context.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use weave_engine::{AgentError, AgentHandler, AgentRequest, AgentResult};
use weave_retrieval::{Document, Hit, Retriever};

use crate::support::{retrieval_error_to_agent_error, settings_bool_or, settings_usize_or};

const DEFAULT_TOP_K: usize = 5;
const DEFAULT_CORPUS: &str = "default";

/// Every corpus known to this process, loaded and synced once at startup
/// (§6.3) and shared read-only across concurrent runs (§5).
pub struct SemanticSearchHandler {
    retriever: Arc<Retriever>,
    corpora: Arc<HashMap<String, Vec<Document>>>,
}

impl SemanticSearchHandler {
    pub fn new(retriever: Arc<Retriever>, corpora: Arc<HashMap<String, Vec<Document>>>) -> Self {
        Self { retriever, corpora }
    }

    fn corpus_name(&self, request: &AgentRequest) -> String {
        if let Some(explicit) = request.settings.get("corpus").and_then(Value::as_str) {
            return explicit.to_string();
        }
        if let Some(kb) = request.context.get("knowledge_base").and_then(Value::as_str) {
            return kb.to_string();
        }
        DEFAULT_CORPUS.to_string()
    }
}

fn hit_to_json(hit: &Hit) -> Value {
    json!({
        "title": hit.title,
        "snippet": hit.snippet,
        "score": hit.score,
        "source": hit.source,
    })
}

fn render_hits(hits: &[Hit]) -> String {
    if hits.is_empty() {
        return String::new();
    }
    hits.iter()
        .map(|h| format!("{} ({}): {}", h.title, h.source, h.snippet))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl AgentHandler for SemanticSearchHandler {
    async fn execute(&self, request: AgentRequest) -> Result<AgentResult, AgentError> {
        let k = settings_usize_or(&request.settings, "topK", DEFAULT_TOP_K);
        let rerank = settings_bool_or(&request.settings, "rerank", false);
        let rerank_k = settings_usize_or(&request.settings, "rerankK", (k * 2).max(k));
        let corpus = self.corpus_name(&request);

        let empty = Vec::new();
        let documents = self.corpora.get(&corpus).unwrap_or(&empty);

        let hits = self
            .retriever
            .retrieve(&corpus, &request.user_message, k, rerank, rerank_k, documents)
            .await
            .map_err(retrieval_error_to_agent_error)?;

        let mut patch = HashMap::new();
        patch.insert(
            "semantic_results".to_string(),
            Value::Array(hits.iter().map(hit_to_json).collect()),
        );

        let mut result = AgentResult {
            content: render_hits(&hits),
            context_patch: patch,
            ..Default::default()
        };
        result.tool_outputs.docs = hits.iter().map(hit_to_json).collect();
        Ok(result)
    }
}
