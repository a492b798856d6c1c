//! Benchmark harness for retrieval-augmented QA over Chinese prospectus PDFs.
//!
//! The pipeline has five stages, each a CLI subcommand:
//!
//! 1. **process**: extract per-page text from PDFs into a corpus file
//! 2. **index**: build a BM25 index over the corpus
//! 3. **qa**: answer benchmark questions with retrieval plus an LLM
//! 4. **eval**: score retrieval (Recall/MRR@K) and generation (CRAG buckets)
//! 5. **review**: human review of judged answers in a web UI

pub mod config;
pub mod corpus;
pub mod error;
pub mod eval;
pub mod index;
pub mod llm;
pub mod qa;
pub mod questions;
pub mod review;

pub use config::Config;
pub use corpus::{CorpusDocument, build_corpus, load_corpus, save_corpus};
pub use error::{BenchError, Result};
pub use eval::{CragLabel, EvaluationReport, Evaluator, Judgment};
pub use index::{BmIndex, ScoredDocument};
pub use llm::LlmClient;
pub use qa::{AnswerRecord, QaRunner};
pub use questions::{QuestionItem, QuestionSet};
