//! String similarity for content-level retrieval matching.
//!
//! Similarity is ROUGE-L recall over a mixed tokenization: Chinese text is
//! split per character while latin words and numbers stay whole tokens. A
//! golden text that appears verbatim inside the retrieved text scores 1.0
//! without tokenizing.

use regex::Regex;
use std::sync::OnceLock;

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[a-zA-Z]+|\d+\.?\d*|[^\w\s]|[一-鿿]").unwrap()
    })
}

/// Tokenize mixed Chinese / latin text.
///
/// Chinese characters become one token each; latin words and numbers
/// (including decimals) stay intact; punctuation is kept as its own token.
pub fn smart_tokenize(text: &str) -> Vec<String> {
    token_pattern()
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Length of the longest common subsequence between two token slices.
fn lcs_length(a: &[String], b: &[String]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    // Rolling single row keeps memory linear in the shorter side.
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for token_a in a {
        for (j, token_b) in b.iter().enumerate() {
            curr[j + 1] = if token_a == token_b {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// ROUGE-L recall of the golden tokens against the retrieved tokens.
fn rouge_l_recall(golden: &[String], retrieved: &[String]) -> f64 {
    if golden.is_empty() {
        return 0.0;
    }
    lcs_length(golden, retrieved) as f64 / golden.len() as f64
}

/// Similarity of a golden text against a retrieved text, in [0, 1].
///
/// 1.0 means the golden text is fully covered by the retrieved text.
pub fn content_similarity(golden_text: &str, retrieved_text: &str) -> f64 {
    if golden_text.is_empty() || retrieved_text.is_empty() {
        return 0.0;
    }

    let golden = golden_text.trim();
    let retrieved = retrieved_text.trim();

    if golden == retrieved {
        return 1.0;
    }
    if retrieved.contains(golden) {
        return 1.0;
    }

    rouge_l_recall(&smart_tokenize(golden), &smart_tokenize(retrieved))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smart_tokenize_mixed_text() {
        let tokens = smart_tokenize("2008年投资1526.45万元，ROI为12%");
        assert!(tokens.contains(&"2008".to_string()));
        assert!(tokens.contains(&"1526.45".to_string()));
        assert!(tokens.contains(&"ROI".to_string()));
        assert!(tokens.contains(&"年".to_string()));
        assert!(tokens.contains(&"，".to_string()));
        assert!(tokens.contains(&"%".to_string()));
    }

    #[test]
    fn test_chinese_is_character_level() {
        let tokens = smart_tokenize("注册资本");
        assert_eq!(tokens, vec!["注", "册", "资", "本"]);
    }

    #[test]
    fn test_identical_text_scores_one() {
        assert_eq!(content_similarity("注册资本15000万元", "注册资本15000万元"), 1.0);
    }

    #[test]
    fn test_substring_scores_one() {
        let retrieved = "根据招股说明书，公司注册资本15000万元，由股东共同出资。";
        assert_eq!(content_similarity("注册资本15000万元", retrieved), 1.0);
    }

    #[test]
    fn test_empty_text_scores_zero() {
        assert_eq!(content_similarity("", "文本"), 0.0);
        assert_eq!(content_similarity("文本", ""), 0.0);
    }

    #[test]
    fn test_unrelated_text_scores_low() {
        let score = content_similarity("注册资本15000万元", "hello world");
        assert!(score < 0.2);
    }

    #[test]
    fn test_partial_overlap_scores_between() {
        // Half the golden characters appear in order in the retrieved text.
        let score = content_similarity("注册资本一亿元整", "公司注册资本很高");
        assert!(score > 0.0 && score < 1.0);
    }

    #[test]
    fn test_number_tokens_do_not_split() {
        // 15000 vs 1500 must not partially match as digits.
        let score = content_similarity("15000", "1500");
        assert_eq!(score, 0.0);
    }
}
