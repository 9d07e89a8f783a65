//! Startup corpus discovery (§6.3): each immediate subdirectory of
//! `CORPUS_DIR` is one corpus, named after the directory. Every corpus is
//! loaded and synced into the embedding store once, before the server
//! starts accepting requests; the result is shared read-only across
//! concurrent runs (§5).

use std::collections::HashMap;
use std::path::Path;

use weave_config::Settings;
use weave_gateway::ModelGateway;
use weave_retrieval::{load_corpus, Document, EmbeddingStore};

/// Walks `settings.corpus_dir` one level deep; each subdirectory becomes a
/// corpus. A sync failure for one corpus is logged and that corpus is left
/// out of the returned map rather than aborting startup (§4.7.8: embedding
/// sync failures are non-fatal).
pub async fn discover_and_sync(
    settings: &Settings,
    gateway: &dyn ModelGateway,
    store: &dyn EmbeddingStore,
) -> HashMap<String, Vec<Document>> {
    let root = Path::new(&settings.corpus_dir);
    let mut corpora = HashMap::new();

    let Ok(entries) = std::fs::read_dir(root) else {
        tracing::info!(corpus_dir = %settings.corpus_dir, "no corpus directory found; starting with no corpora");
        return corpora;
    };

    let mut dirs: Vec<_> = entries.filter_map(|e| e.ok()).filter(|e| e.path().is_dir()).collect();
    dirs.sort_by_key(|e| e.file_name());

    for entry in dirs {
        let name = entry.file_name().to_string_lossy().to_string();
        let documents = match load_corpus(&name, &entry.path()) {
            Ok(docs) => docs,
            Err(err) => {
                tracing::warn!(corpus = %name, error = %err, "failed to load corpus directory; skipping");
                continue;
            }
        };

        if let Err(err) = store.sync(&name, &documents, gateway, settings.embedding_batch_size).await {
            tracing::warn!(corpus = %name, error = %err, "embedding sync failed; proceeding with whatever is indexed");
        }

        tracing::info!(corpus = %name, documents = documents.len(), "corpus synced");
        corpora.insert(name, documents);
    }

    corpora
}
