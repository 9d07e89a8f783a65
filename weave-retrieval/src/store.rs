//! Persistence backends for embedding records, keyed by `(corpus, document_id)`.
//!
//! The file backend follows the teacher's plain-JSON persistence style
//! (`memory::in_memory_store`/`sqlite_saver`), generalized to one file per
//! corpus with an atomic write-then-rename. The SQLite backend is a direct
//! generalization of the teacher's `SqliteVecStore`: the same dual-table
//! design (a metadata table plus a `vec0` virtual table for the nearest
//! neighbour index), but keyed by `(corpus, document_id)` instead of a
//! namespace/key pair.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};
use tokio::sync::Mutex;

use crate::error::RetrievalError;
use crate::hash::content_hash;
use crate::types::{Document, EmbeddingRecord};
use weave_gateway::ModelGateway;

#[async_trait]
pub trait EmbeddingStore: Send + Sync {
    /// Re-embeds stale or missing documents, drops records for documents no
    /// longer present, and writes the corpus table back out. Idempotent: a
    /// second call with the same `documents` is a no-op.
    async fn sync(
        &self,
        corpus: &str,
        documents: &[Document],
        gateway: &dyn ModelGateway,
        batch_size: usize,
    ) -> Result<(), RetrievalError>;

    /// Returns the `k` highest cosine similarities to `query_vector`, ties
    /// broken by ascending document id.
    async fn search(
        &self,
        corpus: &str,
        query_vector: &[f32],
        k: usize,
    ) -> Result<Vec<(String, f32)>, RetrievalError>;

    async fn count(&self, corpus: &str) -> Result<usize, RetrievalError>;
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

fn top_k(scored: Vec<(String, f32)>, k: usize) -> Vec<(String, f32)> {
    let mut scored = scored;
    scored.sort_by(|a, b| match b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal) {
        std::cmp::Ordering::Equal => a.0.cmp(&b.0),
        other => other,
    });
    scored.truncate(k);
    scored
}

#[derive(Serialize, Deserialize, Default)]
struct CorpusFile {
    documents_hash: String,
    embeddings: Vec<EmbeddingEntry>,
}

#[derive(Serialize, Deserialize, Clone)]
struct EmbeddingEntry {
    doc_id: String,
    content_hash: String,
    embedding: Vec<f32>,
}

fn aggregate_hash(documents: &[Document]) -> String {
    let mut ids_and_hashes: Vec<String> = documents
        .iter()
        .map(|d| format!("{}:{}", d.id, content_hash(&d.content)))
        .collect();
    ids_and_hashes.sort();
    content_hash(&ids_and_hashes.join("|"))
}

/// One JSON file per corpus; atomic write via temp file + rename. Sync is
/// serialized per corpus with a `tokio::sync::Mutex`, mirroring the teacher's
/// `Once`-guarded single-writer pattern for its vector store.
pub struct FileEmbeddingStore {
    base_dir: PathBuf,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl FileEmbeddingStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            locks: DashMap::new(),
        }
    }

    fn corpus_path(&self, corpus: &str) -> PathBuf {
        self.base_dir.join(format!("{corpus}.embeddings.json"))
    }

    fn lock_for(&self, corpus: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(corpus.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn read_corpus(&self, corpus: &str) -> Result<CorpusFile, RetrievalError> {
        let path = self.corpus_path(corpus);
        if !path.exists() {
            return Ok(CorpusFile::default());
        }
        let raw = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn write_corpus(&self, corpus: &str, file: &CorpusFile) -> Result<(), RetrievalError> {
        std::fs::create_dir_all(&self.base_dir)?;
        let path = self.corpus_path(corpus);
        let tmp_path = path.with_extension("json.tmp");
        let raw = serde_json::to_string(file)?;
        std::fs::write(&tmp_path, raw)?;
        std::fs::rename(&tmp_path, &path)?;
        Ok(())
    }
}

#[async_trait]
impl EmbeddingStore for FileEmbeddingStore {
    async fn sync(
        &self,
        corpus: &str,
        documents: &[Document],
        gateway: &dyn ModelGateway,
        batch_size: usize,
    ) -> Result<(), RetrievalError> {
        let lock = self.lock_for(corpus);
        let _guard = lock.lock().await;

        let new_aggregate = aggregate_hash(documents);
        let mut existing = self.read_corpus(corpus)?;

        if existing.documents_hash == new_aggregate && documents.len() == existing.embeddings.len() {
            return Ok(());
        }

        let existing_by_id: std::collections::HashMap<String, EmbeddingEntry> = existing
            .embeddings
            .drain(..)
            .map(|e| (e.doc_id.clone(), e))
            .collect();

        let mut stale: Vec<&Document> = Vec::new();
        let mut fresh: Vec<EmbeddingEntry> = Vec::new();

        for doc in documents {
            let hash = content_hash(&doc.content);
            match existing_by_id.get(&doc.id) {
                Some(entry) if entry.content_hash == hash => fresh.push(entry.clone()),
                _ => stale.push(doc),
            }
        }

        // §4.2: a batch that still fails after one retry is marked failed and
        // skipped — sync proceeds with the remaining batches rather than
        // aborting the whole corpus on one bad batch.
        let mut synced_aggregate = new_aggregate.clone();
        for batch in stale.chunks(batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|d| d.content.clone()).collect();
            match retry_embed(gateway, &texts).await {
                Ok(vectors) => {
                    for (doc, vector) in batch.iter().zip(vectors.into_iter()) {
                        fresh.push(EmbeddingEntry {
                            doc_id: doc.id.clone(),
                            content_hash: content_hash(&doc.content),
                            embedding: vector,
                        });
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        corpus,
                        batch_size = batch.len(),
                        error = %err,
                        "embedding batch failed after one retry; leaving its documents unsynced"
                    );
                    // The aggregate hash must not record these documents as
                    // synced, or a later `sync` call with the same input
                    // would short-circuit on the unchanged-hash fast path
                    // and never retry the failed batch.
                    synced_aggregate = String::new();
                }
            }
        }

        self.write_corpus(
            corpus,
            &CorpusFile {
                documents_hash: synced_aggregate,
                embeddings: fresh,
            },
        )
    }

    async fn search(
        &self,
        corpus: &str,
        query_vector: &[f32],
        k: usize,
    ) -> Result<Vec<(String, f32)>, RetrievalError> {
        let file = self.read_corpus(corpus)?;
        let scored: Vec<(String, f32)> = file
            .embeddings
            .iter()
            .map(|e| (e.doc_id.clone(), cosine_similarity(query_vector, &e.embedding)))
            .collect();
        Ok(top_k(scored, k))
    }

    async fn count(&self, corpus: &str) -> Result<usize, RetrievalError> {
        Ok(self.read_corpus(corpus)?.embeddings.len())
    }
}

/// One retry on embedding failure, matching the Execution Engine's uniform
/// retry policy (§4.7.8-equivalent: one retry, short fixed backoff) rather
/// than inventing a separate policy for the retrieval path.
async fn retry_embed(
    gateway: &dyn ModelGateway,
    texts: &[String],
) -> Result<Vec<Vec<f32>>, RetrievalError> {
    match gateway.embed(texts).await {
        Ok(v) => Ok(v),
        Err(_) => {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            Ok(gateway.embed(texts).await?)
        }
    }
}

static SQLITE_VEC_INIT: Once = Once::new();

/// SQLite-backed embedding store selected via `DATABASE_URL`. Generalizes the
/// teacher's `SqliteVecStore`: a metadata table keyed by `(corpus, doc_id)`
/// plus a `vec0` virtual table holding the embeddings.
pub struct SqliteVecEmbeddingStore {
    db_path: PathBuf,
    dimension: std::sync::OnceLock<usize>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SqliteVecEmbeddingStore {
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self, RetrievalError> {
        SQLITE_VEC_INIT.call_once(|| unsafe {
            rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
                sqlite_vec::sqlite3_vec_init as *const (),
            )));
        });

        let db_path = db_path.as_ref().to_path_buf();
        let conn = rusqlite::Connection::open(&db_path)
            .map_err(|e| RetrievalError::Storage(e.to_string()))?;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS embedding_meta (
                id INTEGER PRIMARY KEY,
                corpus TEXT NOT NULL,
                doc_id TEXT NOT NULL,
                content_hash TEXT NOT NULL,
                UNIQUE(corpus, doc_id)
            )
            "#,
            [],
        )
        .map_err(|e| RetrievalError::Storage(e.to_string()))?;

        Ok(Self {
            db_path,
            dimension: std::sync::OnceLock::new(),
            locks: DashMap::new(),
        })
    }

    fn lock_for(&self, corpus: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(corpus.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn ensure_vec_table(&self, conn: &rusqlite::Connection, dimension: usize) -> Result<(), RetrievalError> {
        let sql = format!(
            "CREATE VIRTUAL TABLE IF NOT EXISTS embedding_vectors USING vec0(embedding float[{dimension}])"
        );
        conn.execute(&sql, [])
            .map_err(|e| RetrievalError::Storage(e.to_string()))?;
        Ok(())
    }
}

fn vector_to_json(v: &[f32]) -> String {
    let parts: Vec<String> = v.iter().map(|f| f.to_string()).collect();
    format!("[{}]", parts.join(","))
}

#[async_trait]
impl EmbeddingStore for SqliteVecEmbeddingStore {
    async fn sync(
        &self,
        corpus: &str,
        documents: &[Document],
        gateway: &dyn ModelGateway,
        batch_size: usize,
    ) -> Result<(), RetrievalError> {
        let lock = self.lock_for(corpus);
        let _guard = lock.lock().await;

        let db_path = self.db_path.clone();
        let corpus_owned = corpus.to_string();
        let conn = rusqlite::Connection::open(&db_path)
            .map_err(|e| RetrievalError::Storage(e.to_string()))?;

        let existing_hashes: std::collections::HashMap<String, String> = {
            let mut stmt = conn
                .prepare("SELECT doc_id, content_hash FROM embedding_meta WHERE corpus = ?1")
                .map_err(|e| RetrievalError::Storage(e.to_string()))?;
            let rows = stmt
                .query_map(rusqlite::params![corpus_owned], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })
                .map_err(|e| RetrievalError::Storage(e.to_string()))?;
            rows.collect::<Result<_, _>>()
                .map_err(|e| RetrievalError::Storage(e.to_string()))?
        };

        let mut stale: Vec<&Document> = Vec::new();
        for doc in documents {
            let hash = content_hash(&doc.content);
            if existing_hashes.get(&doc.id) != Some(&hash) {
                stale.push(doc);
            }
        }

        let present_ids: std::collections::HashSet<&str> =
            documents.iter().map(|d| d.id.as_str()).collect();
        for (doc_id, _) in existing_hashes.iter() {
            if !present_ids.contains(doc_id.as_str()) {
                conn.execute(
                    "DELETE FROM embedding_meta WHERE corpus = ?1 AND doc_id = ?2",
                    rusqlite::params![corpus_owned, doc_id],
                )
                .map_err(|e| RetrievalError::Storage(e.to_string()))?;
            }
        }

        if stale.is_empty() {
            return Ok(());
        }

        for batch in stale.chunks(batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|d| d.content.clone()).collect();
            let vectors = match retry_embed(gateway, &texts).await {
                Ok(v) => v,
                Err(err) => {
                    tracing::warn!(
                        corpus,
                        batch_size = batch.len(),
                        error = %err,
                        "embedding batch failed after one retry; leaving its documents unsynced"
                    );
                    continue;
                }
            };
            let dimension = vectors.first().map(|v| v.len()).unwrap_or(0);
            if dimension > 0 {
                self.dimension.get_or_init(|| dimension);
                self.ensure_vec_table(&conn, dimension)?;
            }

            for (doc, vector) in batch.iter().zip(vectors.into_iter()) {
                let hash = content_hash(&doc.content);
                conn.execute(
                    "INSERT INTO embedding_meta (corpus, doc_id, content_hash) VALUES (?1, ?2, ?3)
                     ON CONFLICT(corpus, doc_id) DO UPDATE SET content_hash = excluded.content_hash",
                    rusqlite::params![corpus_owned, doc.id, hash],
                )
                .map_err(|e| RetrievalError::Storage(e.to_string()))?;

                let id: i64 = conn
                    .query_row(
                        "SELECT id FROM embedding_meta WHERE corpus = ?1 AND doc_id = ?2",
                        rusqlite::params![corpus_owned, doc.id],
                        |row| row.get(0),
                    )
                    .map_err(|e| RetrievalError::Storage(e.to_string()))?;

                conn.execute(
                    "DELETE FROM embedding_vectors WHERE rowid = ?1",
                    rusqlite::params![id],
                )
                .ok();
                conn.execute(
                    "INSERT INTO embedding_vectors (rowid, embedding) VALUES (?1, ?2)",
                    rusqlite::params![id, vector_to_json(&vector)],
                )
                .map_err(|e| RetrievalError::Storage(e.to_string()))?;
            }
        }

        Ok(())
    }

    async fn search(
        &self,
        corpus: &str,
        query_vector: &[f32],
        k: usize,
    ) -> Result<Vec<(String, f32)>, RetrievalError> {
        let conn = rusqlite::Connection::open(&self.db_path)
            .map_err(|e| RetrievalError::Storage(e.to_string()))?;
        let vec_json = vector_to_json(query_vector);

        let mut stmt = conn
            .prepare("SELECT rowid, distance FROM embedding_vectors WHERE embedding MATCH ?1 AND k = ?2")
            .map_err(|e| RetrievalError::Storage(e.to_string()))?;
        let rows = stmt
            .query_map(rusqlite::params![vec_json, (k * 4).max(50) as i64], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?))
            })
            .map_err(|e| RetrievalError::Storage(e.to_string()))?;
        let rowid_distances: Vec<(i64, f64)> = rows
            .collect::<Result<_, _>>()
            .map_err(|e| RetrievalError::Storage(e.to_string()))?;

        let mut scored = Vec::new();
        for (rowid, distance) in rowid_distances {
            let found: Option<(String, String)> = conn
                .query_row(
                    "SELECT corpus, doc_id FROM embedding_meta WHERE id = ?1",
                    rusqlite::params![rowid],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .ok();
            if let Some((row_corpus, doc_id)) = found {
                if row_corpus == corpus {
                    scored.push((doc_id, 1.0 / (1.0 + distance as f32)));
                }
            }
        }

        Ok(top_k(scored, k))
    }

    async fn count(&self, corpus: &str) -> Result<usize, RetrievalError> {
        let conn = rusqlite::Connection::open(&self.db_path)
            .map_err(|e| RetrievalError::Storage(e.to_string()))?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM embedding_meta WHERE corpus = ?1",
                rusqlite::params![corpus],
                |row| row.get(0),
            )
            .map_err(|e| RetrievalError::Storage(e.to_string()))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_gateway::MockGateway;

    fn doc(id: &str, content: &str) -> Document {
        Document {
            id: id.to_string(),
            corpus: "test".to_string(),
            title: id.to_string(),
            content: content.to_string(),
            source: format!("{id}.txt"),
        }
    }

    #[tokio::test]
    async fn file_store_sync_then_search_returns_ranked_hits() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileEmbeddingStore::new(dir.path());
        let gateway = MockGateway::with_reply("unused");

        let docs = vec![doc("a", "hello world"), doc("b", "rust programming")];
        store.sync("test", &docs, &gateway, 16).await.unwrap();

        assert_eq!(store.count("test").await.unwrap(), 2);

        let query_vec = gateway.embed(&["rust".to_string()]).await.unwrap().remove(0);
        let hits = store.search("test", &query_vec, 1).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn file_store_sync_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileEmbeddingStore::new(dir.path());
        let gateway = MockGateway::with_reply("unused");
        let docs = vec![doc("a", "hello world")];

        store.sync("test", &docs, &gateway, 16).await.unwrap();
        store.sync("test", &docs, &gateway, 16).await.unwrap();

        assert_eq!(store.count("test").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn file_store_sync_evicts_removed_documents() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileEmbeddingStore::new(dir.path());
        let gateway = MockGateway::with_reply("unused");

        store
            .sync("test", &[doc("a", "one"), doc("b", "two")], &gateway, 16)
            .await
            .unwrap();
        store.sync("test", &[doc("a", "one")], &gateway, 16).await.unwrap();

        assert_eq!(store.count("test").await.unwrap(), 1);
    }

    struct AlwaysFailsGateway;

    #[async_trait]
    impl ModelGateway for AlwaysFailsGateway {
        async fn chat(
            &self,
            _model_class: weave_gateway::ModelClass,
            _messages: &[weave_gateway::Message],
        ) -> Result<String, weave_gateway::GatewayError> {
            Err(weave_gateway::GatewayError::Provider("down".into()))
        }

        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, weave_gateway::GatewayError> {
            Err(weave_gateway::GatewayError::Provider("down".into()))
        }
    }

    #[tokio::test]
    async fn file_store_sync_survives_a_failed_batch_and_retries_it_next_time() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileEmbeddingStore::new(dir.path());
        let docs = vec![doc("a", "one")];

        store.sync("test", &docs, &AlwaysFailsGateway, 16).await.unwrap();
        assert_eq!(store.count("test").await.unwrap(), 0);

        // The failed sync must not have recorded a matching aggregate hash,
        // so a subsequent sync with a working gateway still retries "a".
        let gateway = MockGateway::with_reply("unused");
        store.sync("test", &docs, &gateway, 16).await.unwrap();
        assert_eq!(store.count("test").await.unwrap(), 1);
    }

    #[test]
    fn cosine_similarity_identical_vectors_is_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn top_k_breaks_ties_by_ascending_id() {
        let scored = vec![
            ("b".to_string(), 0.5),
            ("a".to_string(), 0.5),
            ("c".to_string(), 0.9),
        ];
        let ranked = top_k(scored, 3);
        assert_eq!(ranked[0].0, "c");
        assert_eq!(ranked[1].0, "a");
        assert_eq!(ranked[2].0, "b");
    }
}
