//! Persistent state behind the human review UI.
//!
//! The store wraps an evaluation report: the input file holds the automatic
//! evaluation, the output file accumulates manual judgments. Every submitted
//! verdict is written to disk immediately, so a crashed session resumes at
//! the first unreviewed item.

use crate::error::{BenchError, Result};
use crate::eval::{EvaluationReport, ManualJudgment};
use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Review progress and quality statistics.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewStats {
    pub total_samples: usize,
    pub reviewed_samples: usize,
    /// Automatic judge rates over all samples, in [0, 1].
    pub auto_correctness_rate: f64,
    pub auto_completeness_rate: f64,
    pub auto_faithfulness_rate: f64,
    /// Manual rates over reviewed samples only, in [0, 1].
    pub manual_correctness_rate: f64,
    pub manual_completeness_rate: f64,
    pub manual_faithfulness_rate: f64,
    /// Fraction of reviewed samples where the reviewer agreed with the
    /// automatic judge on all three dimensions.
    pub agreement_rate: f64,
}

/// Review session over an evaluation report.
pub struct ReviewStore {
    report: EvaluationReport,
    output_file: PathBuf,
    cursor: usize,
}

impl ReviewStore {
    /// Open a review session.
    ///
    /// If the output file exists it takes precedence so earlier manual work
    /// is never lost; otherwise the report is loaded from the input file and
    /// every item gets an empty manual judgment.
    pub fn open(input_file: &Path, output_file: &Path) -> Result<Self> {
        let mut report = if output_file.exists() {
            EvaluationReport::load(output_file)?
        } else {
            EvaluationReport::load(input_file)?
        };

        if report.detailed_results.is_empty() {
            return Err(BenchError::Config(format!(
                "no samples to review in {}",
                input_file.display()
            )));
        }

        for detail in &mut report.detailed_results {
            if detail.manual_judgment.is_none() {
                detail.manual_judgment = Some(ManualJudgment::default());
            }
        }

        let mut store = Self {
            report,
            output_file: output_file.to_path_buf(),
            cursor: 0,
        };
        store.cursor = store.resume_cursor();
        Ok(store)
    }

    /// Index of the first unreviewed item, or the last item if all are done.
    pub fn resume_cursor(&self) -> usize {
        self.report
            .detailed_results
            .iter()
            .position(|d| {
                d.manual_judgment
                    .as_ref()
                    .is_none_or(|m| !m.is_reviewed())
            })
            .unwrap_or(self.report.detailed_results.len() - 1)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.report.detailed_results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.report.detailed_results.is_empty()
    }

    /// The sample under review.
    pub fn current(&self) -> &crate::eval::DetailedResult {
        &self.report.detailed_results[self.cursor]
    }

    pub fn report(&self) -> &EvaluationReport {
        &self.report
    }

    /// Move to the previous sample.
    pub fn prev(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// Move to the next sample.
    pub fn next(&mut self) {
        if self.cursor + 1 < self.len() {
            self.cursor += 1;
        }
    }

    /// Jump to a specific sample.
    pub fn seek(&mut self, index: usize) {
        self.cursor = index.min(self.len() - 1);
    }

    /// Record a manual verdict for the current sample and advance.
    ///
    /// Resubmitting a reviewed sample overwrites the earlier verdict.
    pub fn submit(
        &mut self,
        correctness: bool,
        completeness: bool,
        faithfulness: bool,
        notes: String,
    ) -> Result<()> {
        let detail = &mut self.report.detailed_results[self.cursor];
        detail.manual_judgment = Some(ManualJudgment {
            correctness: Some(correctness),
            completeness: Some(completeness),
            faithfulness: Some(faithfulness),
            judge_time: Some(Utc::now().to_rfc3339()),
            notes,
        });

        self.save()?;
        self.next();
        Ok(())
    }

    /// Accept the automatic judgment as the manual verdict and advance.
    pub fn accept(&mut self) -> Result<()> {
        let judgment = self.current().judgment.unwrap_or(crate::eval::Judgment {
            correctness: false,
            completeness: false,
            faithfulness: false,
        });
        self.submit(
            judgment.correctness,
            judgment.completeness,
            judgment.faithfulness,
            String::new(),
        )
    }

    /// Write the report with manual judgments to the output file.
    pub fn save(&self) -> Result<()> {
        self.report.save(&self.output_file)
    }

    /// Compute review statistics.
    pub fn stats(&self) -> ReviewStats {
        let total = self.len();
        let mut reviewed = 0usize;
        let mut auto = [0usize; 3];
        let mut manual = [0usize; 3];
        let mut agree = 0usize;

        for detail in &self.report.detailed_results {
            let auto_judgment = detail.judgment;
            if let Some(j) = auto_judgment {
                auto[0] += j.correctness as usize;
                auto[1] += j.completeness as usize;
                auto[2] += j.faithfulness as usize;
            }

            let Some(m) = detail.manual_judgment.as_ref().filter(|m| m.is_reviewed()) else {
                continue;
            };
            reviewed += 1;
            manual[0] += m.correctness.unwrap_or(false) as usize;
            manual[1] += m.completeness.unwrap_or(false) as usize;
            manual[2] += m.faithfulness.unwrap_or(false) as usize;

            let (ac, ap, af) = auto_judgment
                .map(|j| (j.correctness, j.completeness, j.faithfulness))
                .unwrap_or((false, false, false));
            if m.correctness == Some(ac) && m.completeness == Some(ap) && m.faithfulness == Some(af)
            {
                agree += 1;
            }
        }

        let over = |count: usize, denom: usize| {
            if denom > 0 {
                count as f64 / denom as f64
            } else {
                0.0
            }
        };

        ReviewStats {
            total_samples: total,
            reviewed_samples: reviewed,
            auto_correctness_rate: over(auto[0], total),
            auto_completeness_rate: over(auto[1], total),
            auto_faithfulness_rate: over(auto[2], total),
            manual_correctness_rate: over(manual[0], reviewed),
            manual_completeness_rate: over(manual[1], reviewed),
            manual_faithfulness_rate: over(manual[2], reviewed),
            agreement_rate: over(agree, reviewed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{DetailedResult, Judgment, RetrievalMetrics};
    use tempfile::TempDir;

    fn sample_report(n: usize) -> EvaluationReport {
        let detailed_results = (0..n)
            .map(|i| DetailedResult {
                id: format!("q-{}", i + 1),
                query: "问题".to_string(),
                answer: "回答".to_string(),
                golden_answer: "标准答案".to_string(),
                retrieved_documents: Vec::new(),
                related_documents: Vec::new(),
                retrieval_metrics: RetrievalMetrics::new(&[1]),
                judgment: Some(Judgment {
                    correctness: true,
                    completeness: i % 2 == 0,
                    faithfulness: true,
                }),
                crag_label: None,
                crag_score: None,
                rationale: None,
                manual_judgment: None,
            })
            .collect();

        EvaluationReport {
            sample_count: n,
            retrieval_metrics: RetrievalMetrics::new(&[1]),
            generation_metrics: None,
            detailed_results,
        }
    }

    fn open_store(dir: &TempDir, n: usize) -> ReviewStore {
        let input = dir.path().join("eval.json");
        let output = dir.path().join("review.json");
        sample_report(n).save(&input).unwrap();
        ReviewStore::open(&input, &output).unwrap()
    }

    #[test]
    fn test_open_initializes_manual_judgments() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, 3);

        assert_eq!(store.len(), 3);
        assert_eq!(store.cursor(), 0);
        assert!(store.current().manual_judgment.as_ref().unwrap().judge_time.is_none());
    }

    #[test]
    fn test_submit_persists_and_advances() {
        let dir = TempDir::new().unwrap();
        let mut store = open_store(&dir, 3);

        store.submit(true, false, true, "备注".to_string()).unwrap();
        assert_eq!(store.cursor(), 1);

        let saved = EvaluationReport::load(&dir.path().join("review.json")).unwrap();
        let manual = saved.detailed_results[0].manual_judgment.as_ref().unwrap();
        assert_eq!(manual.correctness, Some(true));
        assert_eq!(manual.completeness, Some(false));
        assert!(manual.judge_time.is_some());
        assert_eq!(manual.notes, "备注");
    }

    #[test]
    fn test_resume_at_first_unreviewed() {
        let dir = TempDir::new().unwrap();
        let mut store = open_store(&dir, 3);
        store.submit(true, true, true, String::new()).unwrap();
        store.submit(false, false, false, String::new()).unwrap();
        drop(store);

        let reopened =
            ReviewStore::open(&dir.path().join("eval.json"), &dir.path().join("review.json"))
                .unwrap();
        assert_eq!(reopened.cursor(), 2);
    }

    #[test]
    fn test_accept_copies_auto_judgment() {
        let dir = TempDir::new().unwrap();
        let mut store = open_store(&dir, 2);

        store.accept().unwrap();
        let saved = EvaluationReport::load(&dir.path().join("review.json")).unwrap();
        let manual = saved.detailed_results[0].manual_judgment.as_ref().unwrap();
        assert_eq!(manual.correctness, Some(true));
        assert_eq!(manual.completeness, Some(true));
    }

    #[test]
    fn test_stats_rates_and_agreement() {
        let dir = TempDir::new().unwrap();
        let mut store = open_store(&dir, 2);

        // Item 0 auto judgment is all-true; agreeing verdict.
        store.submit(true, true, true, String::new()).unwrap();
        // Item 1 auto completeness is false; disagreeing verdict.
        store.submit(true, true, true, String::new()).unwrap();

        let stats = store.stats();
        assert_eq!(stats.total_samples, 2);
        assert_eq!(stats.reviewed_samples, 2);
        assert_eq!(stats.auto_correctness_rate, 1.0);
        assert_eq!(stats.auto_completeness_rate, 0.5);
        assert_eq!(stats.manual_completeness_rate, 1.0);
        assert_eq!(stats.agreement_rate, 0.5);
    }

    #[test]
    fn test_navigation_bounds() {
        let dir = TempDir::new().unwrap();
        let mut store = open_store(&dir, 2);

        store.prev();
        assert_eq!(store.cursor(), 0);
        store.next();
        store.next();
        assert_eq!(store.cursor(), 1);
        store.seek(10);
        assert_eq!(store.cursor(), 1);
    }
}
