//! Document retrieval: content-addressed embedding cache over one or more
//! corpora, with top-K cosine search and optional LLM-based reranking.

mod corpus;
pub mod extract;
mod error;
mod hash;
mod retriever;
mod store;
mod types;

pub use corpus::load_corpus;
pub use error::RetrievalError;
pub use retriever::Retriever;
pub use store::{EmbeddingStore, FileEmbeddingStore, SqliteVecEmbeddingStore};
pub use types::{Document, EmbeddingRecord, Hit};
