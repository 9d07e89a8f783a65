use serde::{Deserialize, Serialize};

/// A document discovered on disk within a corpus directory.
#[derive(Clone, Debug)]
pub struct Document {
    pub id: String,
    pub corpus: String,
    pub title: String,
    pub content: String,
    pub source: String,
}

/// A cached embedding, valid only while `content_hash` matches the document's
/// current hash. Stale records are evicted the next time the corpus is synced.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub document_id: String,
    pub corpus: String,
    pub content_hash: String,
    pub vector: Vec<f32>,
}

/// A single retrieval result returned from [`crate::Retriever::retrieve`].
#[derive(Clone, Debug, PartialEq)]
pub struct Hit {
    pub title: String,
    pub snippet: String,
    pub score: f32,
    pub source: String,
}
