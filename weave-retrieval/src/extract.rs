//! Byte-level text extraction shared by corpus loading (§6.3) and uploaded-file
//! decoding (§6.2). Kept separate from [`crate::corpus`] so the Execution Engine's
//! upload pipeline can reuse the same extractors without re-reading from disk.

use crate::error::RetrievalError;

/// Extracts plain text from PDF bytes via `pdf-extract` (grounded in the pack's
/// `ravituringworks-generic-ai-agent` and `ProdByBuddha-rust_agency` manifests).
pub fn extract_pdf(bytes: &[u8]) -> Result<String, RetrievalError> {
    pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| RetrievalError::Storage(format!("pdf extraction failed: {e}")))
}

/// Extracts plain text from DOCX bytes via `docx-rs`.
pub fn extract_docx(bytes: &[u8]) -> Result<String, RetrievalError> {
    docx_rs::read_docx(bytes)
        .map(|docx| docx_text(&docx))
        .map_err(|e| RetrievalError::Storage(format!("docx extraction failed: {e:?}")))
}

pub(crate) fn docx_text(docx: &docx_rs::Docx) -> String {
    docx.document
        .children
        .iter()
        .filter_map(|child| {
            if let docx_rs::DocumentChild::Paragraph(p) = child {
                Some(paragraph_text(p))
            } else {
                None
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn paragraph_text(paragraph: &docx_rs::Paragraph) -> String {
    paragraph
        .children
        .iter()
        .filter_map(|child| {
            if let docx_rs::ParagraphChild::Run(run) = child {
                Some(
                    run.children
                        .iter()
                        .filter_map(|rc| {
                            if let docx_rs::RunChild::Text(t) = rc {
                                Some(t.text.clone())
                            } else {
                                None
                            }
                        })
                        .collect::<Vec<_>>()
                        .join(""),
                )
            } else {
                None
            }
        })
        .collect::<Vec<_>>()
        .join("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_pdf_rejects_non_pdf_bytes() {
        assert!(extract_pdf(b"not a pdf").is_err());
    }

    #[test]
    fn extract_docx_rejects_non_docx_bytes() {
        assert!(extract_docx(b"not a docx").is_err());
    }
}
