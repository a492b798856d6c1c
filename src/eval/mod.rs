//! Benchmark evaluation: retrieval metrics, LLM judging, CRAG scoring.

pub mod evaluator;
pub mod judge;
pub mod metrics;
pub mod similarity;

pub use evaluator::{
    DEFAULT_K_VALUES, DEFAULT_SIMILARITY_THRESHOLD, DetailedResult, EvaluationReport,
    EvaluationSample, Evaluator, GenerationMetrics,
};
pub use judge::{CragLabel, GenerationJudge, Judgment, ManualJudgment};
pub use metrics::RetrievalMetrics;
pub use similarity::content_similarity;
