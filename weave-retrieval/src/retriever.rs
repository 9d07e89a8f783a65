//! Query embedding, candidate search, optional LLM rerank, and snippet
//! materialization — the pipeline behind a `semantic_search` node.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::RetrievalError;
use crate::store::EmbeddingStore;
use crate::types::{Document, Hit};
use weave_gateway::{Message, ModelClass, ModelGateway};

const SNIPPET_CHAR_BUDGET: usize = 320;

const RERANK_PROMPT_HEADER: &str =
    "Rank the following snippets by relevance to the query. Reply with a comma-separated \
     permutation of the snippet numbers, most relevant first, and nothing else.";

pub struct Retriever {
    store: Arc<dyn EmbeddingStore>,
    gateway: Arc<dyn ModelGateway>,
}

impl Retriever {
    pub fn new(store: Arc<dyn EmbeddingStore>, gateway: Arc<dyn ModelGateway>) -> Self {
        Self { store, gateway }
    }

    /// `documents` is the full, currently-synced document set for `corpus`;
    /// callers hold this from the corpus load performed at startup (§6.3).
    pub async fn retrieve(
        &self,
        corpus: &str,
        query_text: &str,
        k: usize,
        rerank_flag: bool,
        rerank_k: usize,
        documents: &[Document],
    ) -> Result<Vec<Hit>, RetrievalError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_vectors = self.gateway.embed(&[query_text.to_string()]).await?;
        let query_vector = match query_vectors.into_iter().next() {
            Some(v) if v.iter().any(|x| *x != 0.0) => v,
            _ => return Ok(Vec::new()),
        };

        let candidate_count = if rerank_flag { rerank_k.max(k) } else { k };
        let candidates = self.store.search(corpus, &query_vector, candidate_count).await?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let by_id: HashMap<&str, &Document> =
            documents.iter().map(|d| (d.id.as_str(), d)).collect();

        let ordered_ids: Vec<String> = if rerank_flag {
            self.rerank(query_text, &candidates, &by_id, k).await
        } else {
            candidates.iter().map(|(id, _)| id.clone()).collect()
        };

        let scores: HashMap<&str, f32> = candidates.iter().map(|(id, s)| (id.as_str(), *s)).collect();

        let hits = ordered_ids
            .into_iter()
            .take(k)
            .filter_map(|id| {
                let doc = by_id.get(id.as_str())?;
                let score = *scores.get(id.as_str()).unwrap_or(&0.0);
                Some(Hit {
                    title: doc.title.clone(),
                    snippet: snippet_of(&doc.content, SNIPPET_CHAR_BUDGET),
                    score,
                    source: doc.source.clone(),
                })
            })
            .collect();

        Ok(hits)
    }

    /// Asks the small model class to permute the candidate snippets by
    /// relevance; falls back to the pre-rerank order on any parse failure.
    async fn rerank(
        &self,
        query_text: &str,
        candidates: &[(String, f32)],
        by_id: &HashMap<&str, &Document>,
        k: usize,
    ) -> Vec<String> {
        let fallback: Vec<String> = candidates.iter().map(|(id, _)| id.clone()).collect();

        let mut prompt = format!("{RERANK_PROMPT_HEADER}\n\nQuery: {query_text}\n\n");
        for (i, (id, _)) in candidates.iter().enumerate() {
            let snippet = by_id
                .get(id.as_str())
                .map(|d| snippet_of(&d.content, SNIPPET_CHAR_BUDGET))
                .unwrap_or_default();
            prompt.push_str(&format!("{}. {}\n", i + 1, snippet));
        }

        let response = match self
            .gateway
            .chat(ModelClass::Small, &[Message::user(prompt)])
            .await
        {
            Ok(text) => text,
            Err(_) => return fallback,
        };

        match parse_permutation(&response, candidates.len()) {
            Some(order) if order.len() >= k => order
                .into_iter()
                .filter_map(|i| candidates.get(i).map(|(id, _)| id.clone()))
                .collect(),
            _ => fallback,
        }
    }
}

fn snippet_of(content: &str, char_budget: usize) -> String {
    if content.chars().count() <= char_budget {
        content.trim().to_string()
    } else {
        let truncated: String = content.chars().take(char_budget).collect();
        format!("{}…", truncated.trim())
    }
}

/// Parses a comma/whitespace separated 1-indexed permutation, e.g. "3, 1, 2".
/// Returns `None` if the text doesn't parse cleanly into distinct in-range indices.
fn parse_permutation(text: &str, candidate_count: usize) -> Option<Vec<usize>> {
    let mut seen = std::collections::HashSet::new();
    let mut indices = Vec::new();

    for token in text.split(|c: char| c == ',' || c.is_whitespace()) {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let n: usize = token.parse().ok()?;
        if n == 0 || n > candidate_count {
            return None;
        }
        let idx = n - 1;
        if !seen.insert(idx) {
            return None;
        }
        indices.push(idx);
    }

    if indices.is_empty() {
        None
    } else {
        Some(indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_permutation_accepts_comma_separated_indices() {
        let parsed = parse_permutation("3, 1, 2", 3).unwrap();
        assert_eq!(parsed, vec![2, 0, 1]);
    }

    #[test]
    fn parse_permutation_rejects_out_of_range_index() {
        assert!(parse_permutation("1, 5", 3).is_none());
    }

    #[test]
    fn parse_permutation_rejects_duplicate_index() {
        assert!(parse_permutation("1, 1, 2", 3).is_none());
    }

    #[test]
    fn parse_permutation_rejects_unparseable_text() {
        assert!(parse_permutation("the best one is snippet two", 3).is_none());
    }

    #[test]
    fn snippet_of_truncates_long_content_with_ellipsis() {
        let content = "x".repeat(400);
        let snippet = snippet_of(&content, 320);
        assert!(snippet.ends_with('…'));
        assert_eq!(snippet.chars().count(), 321);
    }

    #[test]
    fn snippet_of_passes_short_content_through() {
        assert_eq!(snippet_of("hello", 320), "hello");
    }

    #[tokio::test]
    async fn retrieve_end_to_end_returns_best_match_first() {
        use crate::store::{EmbeddingStore, FileEmbeddingStore};
        use weave_gateway::MockGateway;

        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn EmbeddingStore> = Arc::new(FileEmbeddingStore::new(dir.path()));
        let gateway: Arc<dyn ModelGateway> = Arc::new(MockGateway::with_reply("unused"));

        let documents = vec![
            Document {
                id: "a".into(),
                corpus: "test".into(),
                title: "Doc A".into(),
                content: "rust programming language".into(),
                source: "a.txt".into(),
            },
            Document {
                id: "b".into(),
                corpus: "test".into(),
                title: "Doc B".into(),
                content: "baking sourdough bread".into(),
                source: "b.txt".into(),
            },
        ];

        store
            .sync("test", &documents, gateway.as_ref(), 16)
            .await
            .unwrap();

        let retriever = Retriever::new(store, gateway);
        let hits = retriever
            .retrieve("test", "rust programming", 1, false, 1, &documents)
            .await
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].source, "a.txt");
    }

    #[tokio::test]
    async fn retrieve_with_k_zero_returns_empty() {
        use crate::store::{EmbeddingStore, FileEmbeddingStore};
        use weave_gateway::MockGateway;

        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn EmbeddingStore> = Arc::new(FileEmbeddingStore::new(dir.path()));
        let gateway: Arc<dyn ModelGateway> = Arc::new(MockGateway::with_reply("unused"));
        let retriever = Retriever::new(store, gateway);

        let hits = retriever
            .retrieve("empty", "anything", 0, false, 5, &[])
            .await
            .unwrap();
        assert!(hits.is_empty());
    }
}
