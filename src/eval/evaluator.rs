//! End-to-end benchmark evaluation.
//!
//! Joins a question set with its QA results, computes retrieval metrics per
//! sample, judges generation quality with the judge model, and aggregates
//! everything into a single report. Samples follow question-file order;
//! questions without a QA result are skipped with a warning.

use super::judge::{CragLabel, GenerationJudge, Judgment, ManualJudgment};
use super::metrics::{
    RetrievalMetrics, content_mrr_at_k, content_recall_at_k, mrr_at_k, recall_at_k,
};
use crate::error::{BenchError, Result};
use crate::index::ScoredDocument;
use crate::llm::LlmClient;
use crate::qa::AnswerRecord;
use crate::questions::{QuestionSet, RelatedDocument};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Default rank cutoffs for retrieval metrics.
pub const DEFAULT_K_VALUES: &[usize] = &[1, 3, 5, 10];

/// Default content similarity threshold.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.7;

/// One question joined with its QA result.
#[derive(Debug, Clone)]
pub struct EvaluationSample {
    pub id: String,
    pub query: String,
    pub answer: String,
    pub golden_answer: String,
    pub retrieved_documents: Vec<ScoredDocument>,
    pub related_documents: Vec<RelatedDocument>,
}

/// Aggregated generation quality over all judged samples.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationMetrics {
    /// Fraction of answers judged correct.
    pub correctness: f64,
    /// Fraction of answers judged complete.
    pub completeness: f64,
    /// Fraction of answers judged faithful.
    pub faithfulness: f64,
    /// Mean CRAG score over all samples, in [-1, 1].
    pub crag_score: f64,
    /// Sample count per CRAG bucket.
    pub crag_buckets: HashMap<String, usize>,
}

/// Per-sample evaluation record in the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedResult {
    pub id: String,
    pub query: String,
    pub answer: String,
    pub golden_answer: String,
    pub retrieved_documents: Vec<ScoredDocument>,
    pub related_documents: Vec<RelatedDocument>,
    pub retrieval_metrics: RetrievalMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judgment: Option<Judgment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crag_label: Option<CragLabel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crag_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    /// Filled in by the review UI, never by the evaluator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_judgment: Option<ManualJudgment>,
}

/// Full evaluation report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub sample_count: usize,
    pub retrieval_metrics: RetrievalMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_metrics: Option<GenerationMetrics>,
    pub detailed_results: Vec<DetailedResult>,
}

impl EvaluationReport {
    /// Save the report as JSON, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| BenchError::io(parent, e))?;
            }
        }
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data).map_err(|e| BenchError::io(path, e))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| BenchError::io(path, e))?;
        let report = serde_json::from_str(&content)?;
        Ok(report)
    }

    /// Print a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n=== 评估结果 ===");
        println!("样本数: {}", self.sample_count);

        println!("\n检索指标:");
        for (k, value) in &self.retrieval_metrics.page_recall {
            println!("  page_recall@{:<3} = {:.4}", k, value);
        }
        for (k, value) in &self.retrieval_metrics.page_mrr {
            println!("  page_mrr@{:<3}    = {:.4}", k, value);
        }
        for (k, value) in &self.retrieval_metrics.content_recall {
            println!("  content_recall@{:<3} = {:.4}", k, value);
        }
        for (k, value) in &self.retrieval_metrics.content_mrr {
            println!("  content_mrr@{:<3}    = {:.4}", k, value);
        }

        if let Some(generation) = &self.generation_metrics {
            println!("\n生成指标:");
            println!("  correctness  = {:.4}", generation.correctness);
            println!("  completeness = {:.4}", generation.completeness);
            println!("  faithfulness = {:.4}", generation.faithfulness);
            println!("  crag_score   = {:.4}", generation.crag_score);
            let mut buckets: Vec<_> = generation.crag_buckets.iter().collect();
            buckets.sort();
            for (label, count) in buckets {
                println!("  crag[{}] = {}", label, count);
            }
        }
    }
}

/// Benchmark evaluator.
pub struct Evaluator {
    k_values: Vec<usize>,
    similarity_threshold: f64,
    batch_size: usize,
}

impl Evaluator {
    pub fn new(k_values: Vec<usize>, similarity_threshold: f64, batch_size: usize) -> Self {
        Self {
            k_values,
            similarity_threshold,
            batch_size: batch_size.max(1),
        }
    }

    /// Join questions with their QA results, preserving question order.
    pub fn create_samples(
        &self,
        questions: &QuestionSet,
        answers: &[AnswerRecord],
    ) -> Vec<EvaluationSample> {
        let by_id: HashMap<&str, &AnswerRecord> =
            answers.iter().map(|r| (r.id.as_str(), r)).collect();

        let mut samples = Vec::with_capacity(questions.len());
        for question in &questions.items {
            let Some(record) = by_id.get(question.id.as_str()) else {
                tracing::warn!(id = %question.id, "question has no QA result, skipping");
                continue;
            };

            samples.push(EvaluationSample {
                id: question.id.clone(),
                query: record.query.clone(),
                answer: record.answer.clone(),
                golden_answer: question.golden_answer.clone(),
                retrieved_documents: record.documents.clone(),
                related_documents: question.related_documents.clone(),
            });
        }
        samples
    }

    /// Compute retrieval metrics for a single sample.
    fn sample_retrieval_metrics(&self, sample: &EvaluationSample) -> RetrievalMetrics {
        let retrieved_pages: Vec<String> = sample
            .retrieved_documents
            .iter()
            .map(|d| d.page_id())
            .collect();
        let retrieved_contents: Vec<String> = sample
            .retrieved_documents
            .iter()
            .map(|d| d.content.trim().to_string())
            .collect();
        let related_pages: Vec<String> = sample
            .related_documents
            .iter()
            .map(|d| d.page_id())
            .collect();
        let related_contents: Vec<String> = sample
            .related_documents
            .iter()
            .map(|d| d.content.trim().to_string())
            .collect();

        let mut metrics = RetrievalMetrics::new(&self.k_values);
        for &k in &self.k_values {
            metrics
                .page_recall
                .insert(k, recall_at_k(&retrieved_pages, &related_pages, k));
            metrics
                .page_mrr
                .insert(k, mrr_at_k(&retrieved_pages, &related_pages, k));
            metrics.content_recall.insert(
                k,
                content_recall_at_k(
                    &retrieved_contents,
                    &related_contents,
                    k,
                    self.similarity_threshold,
                ),
            );
            metrics.content_mrr.insert(
                k,
                content_mrr_at_k(
                    &retrieved_contents,
                    &related_contents,
                    k,
                    self.similarity_threshold,
                ),
            );
        }
        metrics
    }

    /// Retrieval-only evaluation; no LLM calls.
    pub fn evaluate_retrieval(&self, samples: &[EvaluationSample]) -> EvaluationReport {
        let mut detailed_results = Vec::with_capacity(samples.len());
        let mut per_sample = Vec::with_capacity(samples.len());

        for sample in samples {
            let metrics = self.sample_retrieval_metrics(sample);
            per_sample.push(metrics.clone());
            detailed_results.push(DetailedResult {
                id: sample.id.clone(),
                query: sample.query.clone(),
                answer: sample.answer.clone(),
                golden_answer: sample.golden_answer.clone(),
                retrieved_documents: sample.retrieved_documents.clone(),
                related_documents: sample.related_documents.clone(),
                retrieval_metrics: metrics,
                judgment: None,
                crag_label: None,
                crag_score: None,
                rationale: None,
                manual_judgment: None,
            });
        }

        EvaluationReport {
            sample_count: samples.len(),
            retrieval_metrics: RetrievalMetrics::mean_of(&per_sample, &self.k_values),
            generation_metrics: None,
            detailed_results,
        }
    }

    /// Judge one sample's answer.
    ///
    /// An answer that matches the golden answer verbatim needs no judge
    /// model and is accepted on all three dimensions directly.
    async fn judge_sample(client: &LlmClient, sample: &EvaluationSample) -> Judgment {
        if !sample.golden_answer.trim().is_empty()
            && sample.answer.trim() == sample.golden_answer.trim()
        {
            return Judgment::all_true();
        }

        GenerationJudge::new(client)
            .judge(&sample.query, &sample.answer, &sample.golden_answer)
            .await
    }

    /// Full evaluation: retrieval metrics plus LLM-judged generation quality.
    pub async fn evaluate(
        &self,
        samples: &[EvaluationSample],
        client: &LlmClient,
    ) -> EvaluationReport {
        let mut report = self.evaluate_retrieval(samples);

        let total = samples.len();
        let mut judged: Vec<(usize, Judgment)> =
            futures::stream::iter(samples.iter().enumerate().map(|(position, sample)| {
                async move {
                    let judgment = Self::judge_sample(client, sample).await;
                    tracing::info!(id = %sample.id, position = position + 1, total, "judged answer");
                    (position, judgment)
                }
            }))
            .buffer_unordered(self.batch_size)
            .collect()
            .await;
        judged.sort_by_key(|(position, _)| *position);

        let mut correct = 0usize;
        let mut complete = 0usize;
        let mut faithful = 0usize;
        let mut crag_total = 0.0;
        let mut crag_buckets: HashMap<String, usize> = HashMap::new();

        for ((_, judgment), detail) in judged.iter().zip(report.detailed_results.iter_mut()) {
            let label = CragLabel::derive(&detail.answer, judgment);

            correct += judgment.correctness as usize;
            complete += judgment.completeness as usize;
            faithful += judgment.faithfulness as usize;
            crag_total += label.score();
            *crag_buckets
                .entry(format!("{:?}", label).to_lowercase())
                .or_insert(0) += 1;

            detail.judgment = Some(*judgment);
            detail.crag_label = Some(label);
            detail.crag_score = Some(label.score());
            detail.rationale = Some(judgment.rationale());
        }

        let n = samples.len().max(1) as f64;
        report.generation_metrics = Some(GenerationMetrics {
            correctness: correct as f64 / n,
            completeness: complete as f64 / n,
            faithfulness: faithful as f64 / n,
            crag_score: crag_total / n,
            crag_buckets,
        });

        report
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(DEFAULT_K_VALUES.to_vec(), DEFAULT_SIMILARITY_THRESHOLD, 3)
    }
}
