//! Corpus directory walking and per-file text extraction.
//!
//! A `DocumentExtractor` maps a file extension to plain text. `.pdf` uses
//! `pdf-extract` (grounded in the pack's `ravituringworks-generic-ai-agent`
//! and `ProdByBuddha-rust_agency` manifests, both of which pull this crate in
//! for the same purpose) and `.docx` uses `docx-rs` (no pack example covers
//! DOCX directly; picked as the closest real-crate equivalent, noted in the
//! grounding ledger). Markdown and text pass through unchanged.

use std::path::Path;

use crate::error::RetrievalError;
use crate::extract::{extract_docx, extract_pdf};
use crate::types::Document;

const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md", "pdf", "docx"];

/// Walks `corpus_dir` one level deep and extracts every supported file into a
/// [`Document`]. Title is the first `# H1` heading for Markdown, else the
/// file stem.
pub fn load_corpus(corpus: &str, corpus_dir: &Path) -> Result<Vec<Document>, RetrievalError> {
    let mut documents = Vec::new();

    if !corpus_dir.exists() {
        return Ok(documents);
    }

    let mut entries: Vec<_> = std::fs::read_dir(corpus_dir)?
        .filter_map(|e| e.ok())
        .collect();
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(ext) = path.extension().and_then(|e| e.to_str()).map(str::to_lowercase) else {
            continue;
        };
        if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
            continue;
        }

        let content = extract_text(&path, &ext)?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("untitled")
            .to_string();
        let title = if ext == "md" {
            first_heading(&content).unwrap_or(stem.clone())
        } else {
            stem.clone()
        };

        documents.push(Document {
            id: stem,
            corpus: corpus.to_string(),
            title,
            content,
            source: path.display().to_string(),
        });
    }

    Ok(documents)
}

fn extract_text(path: &Path, ext: &str) -> Result<String, RetrievalError> {
    match ext {
        "txt" | "md" => Ok(std::fs::read_to_string(path)?),
        "pdf" => extract_pdf(&std::fs::read(path)?),
        "docx" => extract_docx(&std::fs::read(path)?),
        _ => Ok(String::new()),
    }
}

fn first_heading(markdown: &str) -> Option<String> {
    markdown.lines().find_map(|line| {
        let trimmed = line.trim();
        trimmed.strip_prefix("# ").map(|h| h.trim().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_corpus_picks_h1_title_for_markdown() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.md"), "# My Title\n\nbody text").unwrap();

        let docs = load_corpus("test", dir.path()).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].title, "My Title");
    }

    #[test]
    fn load_corpus_uses_file_stem_for_txt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "plain text").unwrap();

        let docs = load_corpus("test", dir.path()).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].title, "notes");
    }

    #[test]
    fn load_corpus_skips_unsupported_extensions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("image.png"), [0u8; 4]).unwrap();

        let docs = load_corpus("test", dir.path()).unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn load_corpus_of_missing_directory_is_empty() {
        let docs = load_corpus("test", Path::new("/nonexistent/corpus/dir")).unwrap();
        assert!(docs.is_empty());
    }
}
