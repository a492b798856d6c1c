//! BM25 retrieval index over the corpus.
//!
//! Ranking is delegated to tantivy's BM25 scoring; Chinese text is tokenized
//! with jieba. Queries are tokenized the same way and scored disjunctively
//! over their terms. The index lives in a directory on disk and a build is
//! deterministic for a fixed corpus and tokenizer.

use crate::corpus::CorpusDocument;
use crate::error::{BenchError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Query, TermQuery};
use tantivy::schema::{
    Field, INDEXED, IndexRecordOption, STORED, STRING, Schema, TextFieldIndexing, TextOptions,
    Value,
};
use tantivy::tokenizer::{TokenStream, Tokenizer};
use tantivy::{Index, IndexReader, IndexWriter, TantivyDocument, Term, doc};

/// Tokenizer name registered on the index.
const TOKENIZER: &str = "jieba";

/// Writer heap budget during index build.
const WRITER_HEAP_BYTES: usize = 50_000_000;

/// A retrieved passage with its normalized relevance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    /// Name of the source PDF file.
    pub source_file: String,
    /// 1-indexed page number within the source file.
    pub page_no: usize,
    /// Page text.
    pub content: String,
    /// Relevance score normalized to [0, 1].
    pub score: f32,
}

impl ScoredDocument {
    /// Page identifier used for page-level retrieval matching.
    pub fn page_id(&self) -> String {
        crate::corpus::page_id(&self.source_file, self.page_no)
    }
}

/// BM25 index over single-page corpus documents.
///
/// Holds one `IndexReader`; searches reuse it instead of opening a reader
/// per query.
pub struct BmIndex {
    reader: IndexReader,
    source_file: Field,
    page_no: Field,
    content: Field,
}

impl BmIndex {
    /// Build a fresh index from a corpus, replacing any index already in
    /// the directory.
    pub fn build(corpus: &[CorpusDocument], dir: &Path) -> Result<Self> {
        if corpus.is_empty() {
            return Err(BenchError::EmptyCorpus(dir.to_path_buf()));
        }

        if dir.exists() {
            fs::remove_dir_all(dir).map_err(|e| BenchError::io(dir, e))?;
        }
        fs::create_dir_all(dir).map_err(|e| BenchError::io(dir, e))?;

        let schema = Self::schema();
        let index = Index::create_in_dir(dir, schema)?;
        index
            .tokenizers()
            .register(TOKENIZER, tantivy_jieba::JiebaTokenizer {});

        {
            let schema = index.schema();
            let source_file = schema.get_field("source_file")?;
            let page_no = schema.get_field("page_no")?;
            let content = schema.get_field("content")?;

            let mut writer: IndexWriter = index.writer(WRITER_HEAP_BYTES)?;
            for document in corpus {
                writer.add_document(doc!(
                    source_file => document.source_file.as_str(),
                    page_no => document.page_no as u64,
                    content => document.content.as_str(),
                ))?;
            }
            writer.commit()?;
        }

        tracing::info!(documents = corpus.len(), dir = %dir.display(), "BM25 index built");
        Self::from_index(index)
    }

    /// Open an existing index directory.
    pub fn open(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(BenchError::IndexNotFound(dir.to_path_buf()));
        }

        let index = Index::open_in_dir(dir)?;
        index
            .tokenizers()
            .register(TOKENIZER, tantivy_jieba::JiebaTokenizer {});
        Self::from_index(index)
    }

    fn from_index(index: Index) -> Result<Self> {
        let schema = index.schema();
        let source_file = schema.get_field("source_file")?;
        let page_no = schema.get_field("page_no")?;
        let content = schema.get_field("content")?;
        let reader = index.reader()?;
        Ok(Self {
            reader,
            source_file,
            page_no,
            content,
        })
    }

    fn schema() -> Schema {
        let mut builder = Schema::builder();
        builder.add_text_field("source_file", STRING | STORED);
        builder.add_u64_field("page_no", INDEXED | STORED);

        let indexing = TextFieldIndexing::default()
            .set_tokenizer(TOKENIZER)
            .set_index_option(IndexRecordOption::WithFreqsAndPositions);
        let content_options = TextOptions::default()
            .set_indexing_options(indexing)
            .set_stored();
        builder.add_text_field("content", content_options);

        builder.build()
    }

    /// Tokenize a query the way indexed content is tokenized.
    fn query_terms(&self, query: &str) -> Vec<Term> {
        let mut tokenizer = tantivy_jieba::JiebaTokenizer {};
        let mut stream = tokenizer.token_stream(query);

        let mut terms = Vec::new();
        while stream.advance() {
            let text = stream.token().text.trim();
            if !text.is_empty() {
                terms.push(Term::from_field_text(self.content, text));
            }
        }
        terms
    }

    /// Retrieve the top-k passages for a query.
    ///
    /// The query is jieba-tokenized and scored as a disjunction over its
    /// terms, so a page matching any subset of the terms ranks by BM25
    /// without requiring the exact token sequence. Raw scores are normalized
    /// per query by the maximum score, so the result list is in [0, 1] and
    /// sorted descending.
    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<ScoredDocument>> {
        let terms = self.query_terms(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let clauses: Vec<Box<dyn Query>> = terms
            .into_iter()
            .map(|term| {
                Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs)) as Box<dyn Query>
            })
            .collect();
        let parsed = BooleanQuery::union(clauses);

        let searcher = self.reader.searcher();
        let hits = searcher.search(&parsed, &TopDocs::with_limit(top_k))?;
        let max_score = hits.first().map(|(score, _)| *score).unwrap_or(0.0);

        let mut results = Vec::with_capacity(hits.len());
        for (score, address) in hits {
            let stored: TantivyDocument = searcher.doc(address)?;
            let source_file = stored
                .get_first(self.source_file)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let page_no = stored
                .get_first(self.page_no)
                .and_then(|v| v.as_u64())
                .unwrap_or(0) as usize;
            let content = stored
                .get_first(self.content)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();

            let normalized = if max_score > 0.0 {
                (score / max_score).clamp(0.0, 1.0)
            } else {
                0.0
            };

            results.push(ScoredDocument {
                source_file,
                page_no,
                content,
                score: normalized,
            });
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_corpus() -> Vec<CorpusDocument> {
        let pages = [
            (1, "本公司注册资本为15000万元人民币，主营太阳能组件的生产与销售。"),
            (2, "2008年度无形资产投资1526.45万元，计入重大资本性支出。"),
            (3, "公司实际控制人为邹承慧先生，同时担任法定代表人。"),
        ];
        pages
            .iter()
            .map(|(page_no, content)| CorpusDocument {
                id: format!("doc-{}", page_no),
                source_file: "prospectus.pdf".to_string(),
                page_no: *page_no,
                content: content.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_build_and_search() {
        let dir = TempDir::new().unwrap();
        let index_dir = dir.path().join("index");

        let index = BmIndex::build(&sample_corpus(), &index_dir).unwrap();
        let results = index.search("无形资产投资金额是多少", 3).unwrap();

        assert!(!results.is_empty());
        assert_eq!(results[0].page_no, 2);
        assert_eq!(results[0].source_file, "prospectus.pdf");
    }

    #[test]
    fn test_single_term_and_full_question_retrieve_same_page() {
        let dir = TempDir::new().unwrap();
        let index_dir = dir.path().join("index");

        let index = BmIndex::build(&sample_corpus(), &index_dir).unwrap();

        let by_term = index.search("投资", 3).unwrap();
        assert!(!by_term.is_empty());
        assert_eq!(by_term[0].page_no, 2);

        // A natural question whose tokens are not consecutive in the page
        // must still retrieve it via term scoring.
        let by_question = index.search("无形资产的投资金额一共是多少万元", 3).unwrap();
        assert!(!by_question.is_empty());
        assert_eq!(by_question[0].page_no, 2);
    }

    #[test]
    fn test_query_without_tokens_returns_empty() {
        let dir = TempDir::new().unwrap();
        let index_dir = dir.path().join("index");

        let index = BmIndex::build(&sample_corpus(), &index_dir).unwrap();
        assert!(index.search("", 3).unwrap().is_empty());
        assert!(index.search("   ", 3).unwrap().is_empty());
    }

    #[test]
    fn test_scores_normalized_and_descending() {
        let dir = TempDir::new().unwrap();
        let index_dir = dir.path().join("index");

        let index = BmIndex::build(&sample_corpus(), &index_dir).unwrap();
        let results = index.search("公司注册资本", 3).unwrap();

        assert!((results[0].score - 1.0).abs() < f32::EPSILON);
        for window in results.windows(2) {
            assert!(window[0].score >= window[1].score);
        }
        for result in &results {
            assert!(result.score >= 0.0 && result.score <= 1.0);
        }
    }

    #[test]
    fn test_open_existing_index() {
        let dir = TempDir::new().unwrap();
        let index_dir = dir.path().join("index");

        BmIndex::build(&sample_corpus(), &index_dir).unwrap();
        let reopened = BmIndex::open(&index_dir).unwrap();
        let results = reopened.search("实际控制人", 1).unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].page_no, 3);
    }

    #[test]
    fn test_open_missing_index() {
        let result = BmIndex::open(Path::new("/nonexistent/index"));
        assert!(matches!(result, Err(BenchError::IndexNotFound(_))));
    }

    #[test]
    fn test_rebuild_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let first_dir = dir.path().join("a");
        let second_dir = dir.path().join("b");

        let first = BmIndex::build(&sample_corpus(), &first_dir).unwrap();
        let second = BmIndex::build(&sample_corpus(), &second_dir).unwrap();

        let query = "太阳能组件销售";
        assert_eq!(
            first.search(query, 3).unwrap(),
            second.search(query, 3).unwrap()
        );
    }
}
