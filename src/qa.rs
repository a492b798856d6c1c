//! Batch question answering over the BM25 index.
//!
//! Questions are answered concurrently but results are emitted in the input
//! order. A failed item never aborts the batch: answer-stage failures fall
//! back to a refusal answer and keep the retrieved passages, while
//! retrieval-stage failures record a failure marker with no passages.

use crate::error::{BenchError, Result};
use crate::index::{BmIndex, ScoredDocument};
use crate::llm::{LlmClient, Message, Prompts, Role};
use crate::questions::{HistoryTurn, QuestionItem, QuestionSet};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Answer recorded when the LLM call fails after retries.
pub const REFUSAL_ANSWER: &str = "抱歉，无法回答此问题。";

/// Answer recorded when an item fails before reaching the LLM.
pub const FAILURE_ANSWER: &str = "处理失败";

/// The answer produced for one question, with its retrieval context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub id: String,
    pub query: String,
    pub answer: String,
    #[serde(default)]
    pub documents: Vec<ScoredDocument>,
}

/// Batch QA runner.
pub struct QaRunner {
    index: Arc<BmIndex>,
    client: LlmClient,
    top_k: usize,
    batch_size: usize,
}

impl QaRunner {
    pub fn new(index: Arc<BmIndex>, client: LlmClient, top_k: usize, batch_size: usize) -> Self {
        Self {
            index,
            client,
            top_k,
            batch_size: batch_size.max(1),
        }
    }

    /// Answer every question in the set, preserving input order.
    pub async fn run(&self, questions: &QuestionSet) -> Vec<AnswerRecord> {
        let total = questions.len();
        let mut indexed: Vec<(usize, AnswerRecord)> =
            futures::stream::iter(questions.items.iter().enumerate().map(|(position, item)| {
                let item = item.clone();
                async move {
                    let record = self.answer_one(&item).await;
                    tracing::info!(
                        id = %record.id,
                        position = position + 1,
                        total,
                        "answered question"
                    );
                    (position, record)
                }
            }))
            .buffer_unordered(self.batch_size)
            .collect()
            .await;

        indexed.sort_by_key(|(position, _)| *position);
        indexed.into_iter().map(|(_, record)| record).collect()
    }

    /// Answer a single question: retrieve, prompt, generate.
    async fn answer_one(&self, item: &QuestionItem) -> AnswerRecord {
        let documents = match self.index.search(&item.query, self.top_k) {
            Ok(documents) => documents,
            Err(e) => {
                tracing::warn!(id = %item.id, error = %e, "retrieval failed");
                return AnswerRecord {
                    id: item.id.clone(),
                    query: item.query.clone(),
                    answer: FAILURE_ANSWER.to_string(),
                    documents: Vec::new(),
                };
            }
        };

        let passages: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
        let prompt = Prompts::rag_answer(&item.query, &passages);
        let history = history_messages(&item.history);

        let answer = match self.client.complete(&history, &prompt).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(id = %item.id, error = %e, "answer generation failed");
                REFUSAL_ANSWER.to_string()
            }
        };

        AnswerRecord {
            id: item.id.clone(),
            query: item.query.clone(),
            answer,
            documents,
        }
    }
}

/// Convert stored history turns into chat messages preceding the prompt.
fn history_messages(history: &[HistoryTurn]) -> Vec<Message> {
    history
        .iter()
        .map(|turn| {
            let role = match turn.role.as_str() {
                "assistant" => Role::Assistant,
                "system" => Role::System,
                _ => Role::User,
            };
            Message {
                role,
                content: turn.content.clone(),
            }
        })
        .collect()
}

/// Save answer records to a JSON file, creating parent directories as needed.
pub fn save_answers(records: &[AnswerRecord], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| BenchError::io(parent, e))?;
        }
    }

    let data = serde_json::to_string_pretty(records)?;
    fs::write(path, data).map_err(|e| BenchError::io(path, e))?;
    Ok(())
}

/// Load answer records from a JSON file.
pub fn load_answers(path: &Path) -> Result<Vec<AnswerRecord>> {
    let content = fs::read_to_string(path).map_err(|e| BenchError::io(path, e))?;
    let records = serde_json::from_str(&content)?;
    Ok(records)
}
