//! LLM-assisted answer judging and CRAG scoring.
//!
//! A generated answer is judged on three boolean dimensions (correctness,
//! completeness, faithfulness) by the judge model, then mapped to a CRAG
//! bucket with a fixed score in {1, 0.5, 0, -1}.

use crate::error::Result;
use crate::llm::{LlmClient, Prompts};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

fn result_tag() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?is)<result>(.*?)</result>").unwrap())
}

/// The three judged dimensions of one answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Judgment {
    pub correctness: bool,
    pub completeness: bool,
    pub faithfulness: bool,
}

impl Judgment {
    pub fn all_true() -> Self {
        Self {
            correctness: true,
            completeness: true,
            faithfulness: true,
        }
    }

    /// Human-readable rationale for the verdict.
    pub fn rationale(&self) -> String {
        let yn = |v: bool| if v { "是" } else { "否" };
        format!(
            "正确性：{}；完整性：{}；忠诚度：{}",
            yn(self.correctness),
            yn(self.completeness),
            yn(self.faithfulness)
        )
    }
}

/// CRAG answer quality bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CragLabel {
    Perfect,
    Acceptable,
    Missing,
    Incorrect,
}

impl CragLabel {
    /// The fixed CRAG score for this bucket.
    pub fn score(&self) -> f64 {
        match self {
            CragLabel::Perfect => 1.0,
            CragLabel::Acceptable => 0.5,
            CragLabel::Missing => 0.0,
            CragLabel::Incorrect => -1.0,
        }
    }

    /// Derive the bucket from the answer text and its judgment.
    ///
    /// An empty answer, the batch failure marker, or an explicit refusal is
    /// `Missing` regardless of the judgment.
    pub fn derive(answer: &str, judgment: &Judgment) -> Self {
        let answer = answer.trim();
        if answer.is_empty() || answer == crate::qa::FAILURE_ANSWER || answer.contains("无法回答")
        {
            return CragLabel::Missing;
        }

        if judgment.correctness && judgment.completeness {
            CragLabel::Perfect
        } else if judgment.correctness {
            CragLabel::Acceptable
        } else {
            CragLabel::Incorrect
        }
    }
}

/// Parse a judge response into a boolean verdict.
///
/// The `<result>` tag wins when present; otherwise fall back to scanning the
/// whole response for affirmative keywords.
pub fn parse_verdict(response: &str, fallback_keywords: &[&str]) -> bool {
    let response = response.trim();
    if let Some(captures) = result_tag().captures(response) {
        return captures[1].contains("是");
    }
    response.contains("是") || fallback_keywords.iter().any(|kw| response.contains(kw))
}

/// A human reviewer's verdict on one answer.
///
/// Fields stay `None` until the reviewer submits; `judge_time` doubles as
/// the reviewed marker for resume.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManualJudgment {
    pub correctness: Option<bool>,
    pub completeness: Option<bool>,
    pub faithfulness: Option<bool>,
    pub judge_time: Option<String>,
    #[serde(default)]
    pub notes: String,
}

impl ManualJudgment {
    /// Whether the reviewer has submitted a verdict for this item.
    pub fn is_reviewed(&self) -> bool {
        self.judge_time.is_some()
    }
}

/// Judge of generated answers, backed by the judge model.
pub struct GenerationJudge<'a> {
    client: &'a LlmClient,
}

impl<'a> GenerationJudge<'a> {
    pub fn new(client: &'a LlmClient) -> Self {
        Self { client }
    }

    pub async fn judge_correctness(
        &self,
        query: &str,
        answer: &str,
        golden_answer: &str,
    ) -> Result<bool> {
        let prompt = Prompts::correctness(query, answer, golden_answer);
        let response = self.client.complete_judge(&prompt).await?;
        Ok(parse_verdict(&response, &["正确", "一致"]))
    }

    pub async fn judge_completeness(
        &self,
        query: &str,
        answer: &str,
        golden_answer: &str,
    ) -> Result<bool> {
        let prompt = Prompts::completeness(query, answer, golden_answer);
        let response = self.client.complete_judge(&prompt).await?;
        Ok(parse_verdict(&response, &["完整"]))
    }

    pub async fn judge_faithfulness(
        &self,
        query: &str,
        answer: &str,
        golden_answer: &str,
    ) -> Result<bool> {
        let prompt = Prompts::faithfulness(query, answer, golden_answer);
        let response = self.client.complete_judge(&prompt).await?;
        Ok(parse_verdict(&response, &["忠实", "基于"]))
    }

    /// Judge all three dimensions of one answer.
    ///
    /// A failed judge call counts the dimension as false rather than aborting
    /// the evaluation run.
    pub async fn judge(&self, query: &str, answer: &str, golden_answer: &str) -> Judgment {
        let correctness = self
            .judge_correctness(query, answer, golden_answer)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "correctness judging failed");
                false
            });
        let completeness = self
            .judge_completeness(query, answer, golden_answer)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "completeness judging failed");
                false
            });
        let faithfulness = self
            .judge_faithfulness(query, answer, golden_answer)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "faithfulness judging failed");
                false
            });

        Judgment {
            correctness,
            completeness,
            faithfulness,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_verdict_with_tag() {
        assert!(parse_verdict("分析如下……<result>是</result>", &[]));
        assert!(!parse_verdict("<result>否</result>", &[]));
        assert!(parse_verdict("<RESULT>是</RESULT>", &[]));
    }

    #[test]
    fn test_parse_verdict_tag_wins_over_body() {
        // Affirmative words outside the tag must not override the verdict.
        assert!(!parse_verdict("回答是否正确？答案一致性不足。<result>否</result>", &[]));
    }

    #[test]
    fn test_parse_verdict_fallback_keywords() {
        assert!(parse_verdict("该回答与标准答案一致", &["正确", "一致"]));
        assert!(!parse_verdict("不对", &["正确", "一致"]));
    }

    #[test]
    fn test_crag_scores_are_fixed() {
        assert_eq!(CragLabel::Perfect.score(), 1.0);
        assert_eq!(CragLabel::Acceptable.score(), 0.5);
        assert_eq!(CragLabel::Missing.score(), 0.0);
        assert_eq!(CragLabel::Incorrect.score(), -1.0);
    }

    #[test]
    fn test_crag_derivation() {
        let all = Judgment::all_true();
        assert_eq!(CragLabel::derive("15000万元", &all), CragLabel::Perfect);

        let correct_only = Judgment {
            correctness: true,
            completeness: false,
            faithfulness: true,
        };
        assert_eq!(
            CragLabel::derive("15000万元", &correct_only),
            CragLabel::Acceptable
        );

        let wrong = Judgment {
            correctness: false,
            completeness: false,
            faithfulness: false,
        };
        assert_eq!(CragLabel::derive("16000万元", &wrong), CragLabel::Incorrect);
    }

    #[test]
    fn test_crag_missing_overrides_judgment() {
        let all = Judgment::all_true();
        assert_eq!(CragLabel::derive("", &all), CragLabel::Missing);
        assert_eq!(CragLabel::derive("处理失败", &all), CragLabel::Missing);
        assert_eq!(
            CragLabel::derive("抱歉，无法回答此问题。", &all),
            CragLabel::Missing
        );
    }
}
