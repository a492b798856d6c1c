//! Question set loading.
//!
//! Question sets are flat YAML / JSON / JSONL files; the format is picked by
//! file extension. Order in the file is the canonical evaluation order and is
//! preserved by id lookup.

use crate::error::{BenchError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A prior conversation turn for multi-turn questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: String,
    pub content: String,
}

/// A reference to a source page backing a golden answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedDocument {
    /// Name of the source PDF file.
    pub source_file: String,
    /// 1-indexed page number within the source file.
    pub page_no: usize,
    /// The span of page text supporting the answer.
    #[serde(default)]
    pub content: String,
}

impl RelatedDocument {
    /// Page identifier used for page-level retrieval matching.
    pub fn page_id(&self) -> String {
        crate::corpus::page_id(&self.source_file, self.page_no)
    }
}

/// A single benchmark question with its golden answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionItem {
    pub id: String,
    /// Free-form dataset metadata (category, modality, ...), kept verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub query: String,
    /// Prior turns for multi-turn questions; empty for single-turn.
    #[serde(default)]
    pub history: Vec<HistoryTurn>,
    #[serde(default)]
    pub golden_answer: String,
    #[serde(default)]
    pub related_documents: Vec<RelatedDocument>,
}

/// An ordered set of questions.
#[derive(Debug, Clone, Default)]
pub struct QuestionSet {
    pub items: Vec<QuestionItem>,
}

impl QuestionSet {
    /// Load a question set, dispatching on file extension.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| BenchError::io(path, e))?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let items = match extension.as_str() {
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            "jsonl" => {
                let mut items = Vec::new();
                for (line_no, line) in content.lines().enumerate() {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let item: QuestionItem = serde_json::from_str(line).map_err(|e| {
                        BenchError::Serialization(format!(
                            "invalid JSONL at line {}: {}",
                            line_no + 1,
                            e
                        ))
                    })?;
                    items.push(item);
                }
                items
            }
            _ => return Err(BenchError::UnsupportedFormat(path.to_path_buf())),
        };

        Ok(Self { items })
    }

    /// Number of questions.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Find a question by id.
    pub fn get(&self, id: &str) -> Option<&QuestionItem> {
        self.items.iter().find(|q| q.id == id)
    }

    /// Keep only the question with the given id.
    pub fn retain_id(&mut self, id: &str) {
        self.items.retain(|q| q.id == id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_load_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("questions.json");
        write(
            &path,
            r#"[
              {
                "id": "q-1",
                "query": "公司注册资本是多少？",
                "history": [],
                "golden_answer": "15000万元",
                "related_documents": [
                  {"source_file": "a.pdf", "page_no": 3, "content": "注册资本15000万元"}
                ]
              }
            ]"#,
        );

        let set = QuestionSet::load(&path).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.items[0].id, "q-1");
        assert_eq!(set.items[0].related_documents[0].page_id(), "a.pdf_page_3");
    }

    #[test]
    fn test_load_yaml_preserves_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("questions.yaml");
        write(
            &path,
            "- id: q-2\n  query: 问题二\n  golden_answer: 答案二\n- id: q-1\n  query: 问题一\n  golden_answer: 答案一\n",
        );

        let set = QuestionSet::load(&path).unwrap();
        assert_eq!(set.items[0].id, "q-2");
        assert_eq!(set.items[1].id, "q-1");
    }

    #[test]
    fn test_load_jsonl() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("questions.jsonl");
        write(
            &path,
            "{\"id\": \"q-1\", \"query\": \"问题一\"}\n\n{\"id\": \"q-2\", \"query\": \"问题二\"}\n",
        );

        let set = QuestionSet::load(&path).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.items[0].golden_answer.is_empty());
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("questions.txt");
        write(&path, "not a question set");

        let result = QuestionSet::load(&path);
        assert!(matches!(result, Err(BenchError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_get_and_retain() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("questions.json");
        write(
            &path,
            r#"[{"id": "a", "query": "qa"}, {"id": "b", "query": "qb"}]"#,
        );

        let mut set = QuestionSet::load(&path).unwrap();
        assert!(set.get("b").is_some());
        assert!(set.get("c").is_none());

        set.retain_id("b");
        assert_eq!(set.len(), 1);
        assert_eq!(set.items[0].id, "b");
    }
}
