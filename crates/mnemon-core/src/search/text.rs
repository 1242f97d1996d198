//! Text normalization primitives shared across the retrieval pipeline.
//!
//! The tokenizer here feeds BM25 indexing and the Jaccard similarity used
//! by the diversity filter and the context assembler's dedup pass. It must
//! be deterministic: identical input always yields an identical token
//! sequence, which is required both for reproducible scoring and for index
//! serialization round-trips.

use crate::config::CHARS_PER_TOKEN_ESTIMATE;
use std::collections::HashSet;

/// Splits raw text into lowercase alphanumeric terms.
///
/// Punctuation and whitespace act as separators; anything that is not
/// alphanumeric terminates the current term. Short terms (1-2 chars) are
/// retained; they participate in BM25 math, and stopword policy is an
/// application-level choice, not enforced here.
///
/// No side effects; deterministic for any input.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut terms = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        if ch.is_alphanumeric() {
            for lower in ch.to_lowercase() {
                current.push(lower);
            }
        } else if !current.is_empty() {
            terms.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        terms.push(current);
    }

    terms
}

/// Token-set Jaccard similarity between two texts.
///
/// Returns `|A ∩ B| / |A ∪ B|` over the tokenized term sets. Two empty
/// texts are considered identical (1.0); one empty side yields 0.0.
pub fn jaccard_similarity(a: &str, b: &str) -> f32 {
    let set_a: HashSet<String> = tokenize(a).into_iter().collect();
    let set_b: HashSet<String> = tokenize(b).into_iter().collect();

    if set_a.is_empty() && set_b.is_empty() {
        return 1.0;
    }

    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.len() + set_b.len() - intersection;

    if union == 0 {
        return 1.0;
    }

    intersection as f32 / union as f32
}

/// Estimates the token count of a text as `ceil(chars / 4)`.
///
/// A fixed approximation used for context budgeting, not a real tokenizer.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN_ESTIMATE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_lowercases_and_splits_on_punctuation() {
        let terms = tokenize("Hello, World! This-is_a test: 123");
        assert_eq!(
            terms,
            vec!["hello", "world", "this", "is", "a", "test", "123"]
        );
    }

    #[test]
    fn test_tokenize_retains_short_terms() {
        // 1-2 char terms stay in; stopword filtering is a caller policy.
        let terms = tokenize("a to of x");
        assert_eq!(terms, vec!["a", "to", "of", "x"]);
    }

    #[test]
    fn test_tokenize_empty_and_punctuation_only() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("!!! ... ---").is_empty());
    }

    #[test]
    fn test_tokenize_is_deterministic() {
        let input = "Rust: systems programming, зеленый 日本語 mixed!";
        assert_eq!(tokenize(input), tokenize(input));
    }

    #[test]
    fn test_jaccard_identical_texts() {
        let sim = jaccard_similarity("the quick brown fox", "quick brown fox the");
        assert!((sim - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_jaccard_disjoint_texts() {
        let sim = jaccard_similarity("alpha beta", "gamma delta");
        assert_eq!(sim, 0.0);
    }

    #[test]
    fn test_jaccard_partial_overlap() {
        // {quick, brown, fox} vs {quick, brown, dog}: 2 shared of 4 total
        let sim = jaccard_similarity("quick brown fox", "quick brown dog");
        assert!((sim - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_jaccard_empty_sides() {
        assert_eq!(jaccard_similarity("", "words here"), 0.0);
        assert_eq!(jaccard_similarity("", ""), 1.0);
    }

    #[test]
    fn test_estimate_tokens_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        // 160 chars → 40 tokens
        assert_eq!(estimate_tokens(&"x".repeat(160)), 40);
    }
}
