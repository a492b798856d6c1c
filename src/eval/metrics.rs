//! Retrieval metrics: Recall@K and MRR@K at page and content level.
//!
//! Page-level metrics use exact page-id matching. Content-level metrics
//! match via [`content_similarity`] against a threshold, so a relevant span
//! counts as retrieved even when page ids differ.

use super::similarity::content_similarity;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Recall@K: fraction of relevant items found in the top-k, exact match.
pub fn recall_at_k(retrieved: &[String], relevant: &[String], k: usize) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }

    let retrieved_k: HashSet<&String> = retrieved.iter().take(k).collect();
    let relevant_set: HashSet<&String> = relevant.iter().collect();
    let hits = relevant_set.intersection(&retrieved_k).count();
    hits as f64 / relevant_set.len() as f64
}

/// MRR@K: reciprocal rank of the first relevant item in the top-k.
pub fn mrr_at_k(retrieved: &[String], relevant: &[String], k: usize) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }

    let relevant_set: HashSet<&String> = relevant.iter().collect();
    for (i, item) in retrieved.iter().take(k).enumerate() {
        if relevant_set.contains(item) {
            return 1.0 / (i + 1) as f64;
        }
    }
    0.0
}

/// Content Recall@K: a relevant span counts once it is similar enough to any
/// top-k retrieved text.
pub fn content_recall_at_k(
    retrieved: &[String],
    relevant: &[String],
    k: usize,
    threshold: f64,
) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }

    let retrieved_k = &retrieved[..retrieved.len().min(k)];
    let mut matched = 0usize;

    for relevant_content in relevant {
        for retrieved_content in retrieved_k {
            if content_similarity(relevant_content, retrieved_content) >= threshold {
                matched += 1;
                break;
            }
        }
    }

    matched as f64 / relevant.len() as f64
}

/// Content MRR@K: reciprocal rank of the first retrieved text similar enough
/// to any relevant span.
pub fn content_mrr_at_k(
    retrieved: &[String],
    relevant: &[String],
    k: usize,
    threshold: f64,
) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }

    for (i, retrieved_content) in retrieved.iter().take(k).enumerate() {
        for relevant_content in relevant {
            if content_similarity(relevant_content, retrieved_content) >= threshold {
                return 1.0 / (i + 1) as f64;
            }
        }
    }
    0.0
}

/// Aggregated retrieval metrics, keyed by K.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalMetrics {
    pub page_recall: BTreeMap<usize, f64>,
    pub page_mrr: BTreeMap<usize, f64>,
    pub content_recall: BTreeMap<usize, f64>,
    pub content_mrr: BTreeMap<usize, f64>,
}

impl RetrievalMetrics {
    pub fn new(k_values: &[usize]) -> Self {
        let zero: BTreeMap<usize, f64> = k_values.iter().map(|&k| (k, 0.0)).collect();
        Self {
            page_recall: zero.clone(),
            page_mrr: zero.clone(),
            content_recall: zero.clone(),
            content_mrr: zero,
        }
    }

    /// Average per-sample metric maps into a summary.
    pub fn mean_of(samples: &[RetrievalMetrics], k_values: &[usize]) -> Self {
        let mut summary = Self::new(k_values);
        if samples.is_empty() {
            return summary;
        }

        let n = samples.len() as f64;
        for &k in k_values {
            summary.page_recall.insert(
                k,
                samples.iter().filter_map(|s| s.page_recall.get(&k)).sum::<f64>() / n,
            );
            summary.page_mrr.insert(
                k,
                samples.iter().filter_map(|s| s.page_mrr.get(&k)).sum::<f64>() / n,
            );
            summary.content_recall.insert(
                k,
                samples.iter().filter_map(|s| s.content_recall.get(&k)).sum::<f64>() / n,
            );
            summary.content_mrr.insert(
                k,
                samples.iter().filter_map(|s| s.content_mrr.get(&k)).sum::<f64>() / n,
            );
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_recall_at_k() {
        let retrieved = ids(&["a.pdf_page_1", "a.pdf_page_2", "a.pdf_page_3"]);
        let relevant = ids(&["a.pdf_page_2", "a.pdf_page_9"]);

        assert_eq!(recall_at_k(&retrieved, &relevant, 1), 0.0);
        assert_eq!(recall_at_k(&retrieved, &relevant, 3), 0.5);
        assert_eq!(recall_at_k(&retrieved, &ids(&["a.pdf_page_1"]), 3), 1.0);
    }

    #[test]
    fn test_recall_with_no_relevant_items() {
        let retrieved = ids(&["a.pdf_page_1"]);
        assert_eq!(recall_at_k(&retrieved, &[], 3), 0.0);
        assert_eq!(mrr_at_k(&retrieved, &[], 3), 0.0);
    }

    #[test]
    fn test_mrr_at_k() {
        let retrieved = ids(&["a.pdf_page_1", "a.pdf_page_2", "a.pdf_page_3"]);

        assert_eq!(mrr_at_k(&retrieved, &ids(&["a.pdf_page_1"]), 3), 1.0);
        assert_eq!(mrr_at_k(&retrieved, &ids(&["a.pdf_page_2"]), 3), 0.5);
        assert!((mrr_at_k(&retrieved, &ids(&["a.pdf_page_3"]), 3) - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(mrr_at_k(&retrieved, &ids(&["a.pdf_page_2"]), 1), 0.0);
        assert_eq!(mrr_at_k(&retrieved, &ids(&["b.pdf_page_1"]), 3), 0.0);
    }

    #[test]
    fn test_content_recall_substring_match() {
        let retrieved = ids(&["公司注册资本15000万元，由股东共同出资", "其他内容"]);
        let relevant = ids(&["注册资本15000万元"]);

        assert_eq!(content_recall_at_k(&retrieved, &relevant, 1, 0.7), 1.0);
        assert_eq!(content_recall_at_k(&ids(&["其他内容"]), &relevant, 1, 0.7), 0.0);
    }

    #[test]
    fn test_content_mrr_first_match_position() {
        let retrieved = ids(&["无关的文本内容", "公司注册资本15000万元"]);
        let relevant = ids(&["注册资本15000万元"]);

        assert_eq!(content_mrr_at_k(&retrieved, &relevant, 2, 0.7), 0.5);
        assert_eq!(content_mrr_at_k(&retrieved, &relevant, 1, 0.7), 0.0);
    }

    #[test]
    fn test_content_recall_each_relevant_counts_once() {
        // One retrieved passage covering both relevant spans counts both.
        let retrieved = ids(&["注册资本15000万元，实际控制人为邹承慧"]);
        let relevant = ids(&["注册资本15000万元", "实际控制人为邹承慧"]);

        assert_eq!(content_recall_at_k(&retrieved, &relevant, 1, 0.7), 1.0);
    }

    #[test]
    fn test_metrics_mean() {
        let k_values = [1, 3];
        let mut a = RetrievalMetrics::new(&k_values);
        a.page_recall.insert(1, 1.0);
        a.page_recall.insert(3, 1.0);
        let b = RetrievalMetrics::new(&k_values);

        let summary = RetrievalMetrics::mean_of(&[a, b], &k_values);
        assert_eq!(summary.page_recall[&1], 0.5);
        assert_eq!(summary.page_mrr[&3], 0.0);
    }

    #[test]
    fn test_mean_of_empty_is_zero() {
        let summary = RetrievalMetrics::mean_of(&[], &[1, 3]);
        assert_eq!(summary.page_recall[&1], 0.0);
    }
}
