//! Corpus construction from prospectus PDFs.
//!
//! Each corpus document holds the text of exactly one source page; a page
//! that extracts to empty text is dropped, and a document never concatenates
//! text from two different pages. Unreadable PDFs are skipped with a logged
//! warning so a single bad file cannot abort ingestion.

use crate::error::{BenchError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// A single-page document in the retrieval corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusDocument {
    /// Stable content-derived identifier.
    pub id: String,
    /// Name of the source PDF file.
    pub source_file: String,
    /// 1-indexed page number within the source file.
    pub page_no: usize,
    /// Extracted text of that page.
    pub content: String,
}

impl CorpusDocument {
    /// Page identifier used for page-level retrieval matching.
    pub fn page_id(&self) -> String {
        page_id(&self.source_file, self.page_no)
    }
}

/// Canonical page identifier: `<source_file>_page_<page_no>`.
pub fn page_id(source_file: &str, page_no: usize) -> String {
    format!("{}_page_{}", source_file, page_no)
}

/// Derive a short, stable document id from file name, page number and a
/// content prefix.
fn short_id(source_file: &str, page_no: usize, content: &str) -> String {
    let prefix: String = content.chars().take(100).collect();
    let digest = Sha256::digest(format!("{}_page_{}_{}", source_file, page_no, prefix));
    hex::encode(&digest[..12])
}

/// Extract per-page text from a single PDF file.
///
/// Returns one `(page_no, content)` pair per non-empty page, 1-indexed.
pub fn extract_pdf_pages(path: &Path) -> Result<Vec<(usize, String)>> {
    let pages = pdf_extract::extract_text_by_pages(path).map_err(|e| BenchError::Pdf {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    Ok(pages
        .into_iter()
        .enumerate()
        .filter_map(|(i, text)| {
            let text = text.trim().to_string();
            if text.is_empty() {
                None
            } else {
                Some((i + 1, text))
            }
        })
        .collect())
}

/// Build a corpus from every PDF in a directory.
///
/// Files that cannot be parsed are skipped with a warning; the run only
/// fails if the directory is invalid or produces no documents at all.
pub fn build_corpus(doc_dir: &Path) -> Result<Vec<CorpusDocument>> {
    if !doc_dir.is_dir() {
        return Err(BenchError::InvalidDocPath(doc_dir.to_path_buf()));
    }

    let mut pdf_files: Vec<_> = WalkDir::new(doc_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .map(|e| e.into_path())
        .collect();
    pdf_files.sort();

    if pdf_files.is_empty() {
        return Err(BenchError::EmptyCorpus(doc_dir.to_path_buf()));
    }

    tracing::info!(count = pdf_files.len(), "found PDF files");

    let mut corpus = Vec::new();
    for pdf_file in &pdf_files {
        let file_name = pdf_file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown.pdf")
            .to_string();

        match extract_pdf_pages(pdf_file) {
            Ok(pages) => {
                tracing::info!(file = %file_name, pages = pages.len(), "processed PDF");
                for (page_no, content) in pages {
                    corpus.push(CorpusDocument {
                        id: short_id(&file_name, page_no, &content),
                        source_file: file_name.clone(),
                        page_no,
                        content,
                    });
                }
            }
            Err(e) => {
                tracing::warn!(file = %file_name, error = %e, "skipping unreadable PDF");
            }
        }
    }

    if corpus.is_empty() {
        return Err(BenchError::EmptyCorpus(doc_dir.to_path_buf()));
    }

    Ok(corpus)
}

/// Save a corpus to a JSON file, creating parent directories as needed.
pub fn save_corpus(corpus: &[CorpusDocument], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| BenchError::io(parent, e))?;
        }
    }

    let data = serde_json::to_string_pretty(corpus)?;
    fs::write(path, data).map_err(|e| BenchError::io(path, e))?;
    Ok(())
}

/// Load a corpus from a JSON file.
pub fn load_corpus(path: &Path) -> Result<Vec<CorpusDocument>> {
    let content = fs::read_to_string(path).map_err(|e| BenchError::io(path, e))?;
    let corpus = serde_json::from_str(&content)?;
    Ok(corpus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_corpus() -> Vec<CorpusDocument> {
        vec![
            CorpusDocument {
                id: short_id("a.pdf", 1, "第一页内容"),
                source_file: "a.pdf".to_string(),
                page_no: 1,
                content: "第一页内容".to_string(),
            },
            CorpusDocument {
                id: short_id("a.pdf", 2, "第二页内容"),
                source_file: "a.pdf".to_string(),
                page_no: 2,
                content: "第二页内容".to_string(),
            },
        ]
    }

    #[test]
    fn test_page_id_format() {
        let doc = &sample_corpus()[0];
        assert_eq!(doc.page_id(), "a.pdf_page_1");
    }

    #[test]
    fn test_short_id_is_stable_and_distinct() {
        let a = short_id("a.pdf", 1, "content");
        let b = short_id("a.pdf", 1, "content");
        let c = short_id("a.pdf", 2, "content");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 24);
    }

    #[test]
    fn test_short_id_handles_multibyte_prefix() {
        // Prefix truncation is by character, not byte.
        let content = "财".repeat(200);
        let id = short_id("a.pdf", 1, &content);
        assert_eq!(id.len(), 24);
    }

    #[test]
    fn test_every_document_has_single_page() {
        for doc in sample_corpus() {
            assert!(doc.page_no >= 1);
            assert!(!doc.content.is_empty());
        }
    }

    #[test]
    fn test_corpus_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out/corpus.json");

        let corpus = sample_corpus();
        save_corpus(&corpus, &path).unwrap();
        let loaded = load_corpus(&path).unwrap();

        assert_eq!(loaded, corpus);
    }

    #[test]
    fn test_build_corpus_rejects_missing_dir() {
        let result = build_corpus(Path::new("/nonexistent/docs"));
        assert!(matches!(result, Err(BenchError::InvalidDocPath(_))));
    }

    #[test]
    fn test_build_corpus_rejects_empty_dir() {
        let dir = TempDir::new().unwrap();
        let result = build_corpus(dir.path());
        assert!(matches!(result, Err(BenchError::EmptyCorpus(_))));
    }
}
