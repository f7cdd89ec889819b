//! Trending-term extraction.
//!
//! A best-effort frequency tally over recent tweet bodies, recomputed in
//! full on every call. Tag tokens (`#` + word characters, including kana,
//! CJK and hangul ranges) and plain words share one vocabulary; stop-words
//! and tokens of one or two characters are dropped.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{
    collections::{HashMap, HashSet},
    sync::LazyLock,
};

/// How many tweet bodies a single scan considers at most.
pub const TRENDING_SCAN_LIMIT: i64 = 1000;
/// How many terms a scan reports at most.
pub const MAX_TRENDING_TERMS: usize = 10;

// Bodies are lowercased before matching, so the ASCII range is a-z only.
// The explicit ranges cover hiragana, katakana, CJK ideographs and hangul.
const TAG_PATTERN: &str =
    r"#[0-9a-z_\u{3040}-\u{309f}\u{30a0}-\u{30ff}\u{4e00}-\u{9faf}\u{ac00}-\u{d7af}]+";
const URL_PATTERN: &str = r"https?://\S+";
const NON_WORD_PATTERN: &str =
    r"[^0-9a-z_\s\u{3040}-\u{309f}\u{30a0}-\u{30ff}\u{4e00}-\u{9faf}\u{ac00}-\u{d7af}]";

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(TAG_PATTERN).expect("hard-coded pattern"));
static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(URL_PATTERN).expect("hard-coded pattern"));
static NON_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(NON_WORD_PATTERN).expect("hard-coded pattern"));

static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "been", "be",
        "have", "has", "had", "do", "does", "did", "will", "would", "should", "could", "may",
        "might", "must", "can", "of", "to", "in", "for", "with", "by", "from", "about", "into",
        "through", "during", "before", "after", "above", "below", "between", "under", "again",
        "further", "then", "once", "here", "there", "when", "where", "why", "how", "all", "both",
        "each", "few", "more", "most", "other", "some", "such", "no", "nor", "not", "only", "own",
        "same", "so", "than", "too", "very", "and", "but", "or", "if", "because", "that", "this",
        "these", "those", "i", "you", "he", "she", "it", "we", "they", "what", "who", "my", "your",
        "his", "her", "its", "our", "their", "me", "him", "us", "them",
    ]
    .into_iter()
    .collect()
});

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
pub struct TrendingTerm {
    pub word: String,
    pub count: u32,
}

/// Tallies tag and word frequencies across the given bodies and returns the
/// highest-frequency tokens that occur more than once, ties broken by
/// first-encountered order. Deterministic for a fixed input sequence.
#[must_use]
pub fn trending_terms<'a>(bodies: impl IntoIterator<Item = &'a str>) -> Vec<TrendingTerm> {
    // token -> (first-seen order, count)
    fn record(tally: &mut HashMap<String, (usize, u32)>, token: &str) {
        let order = tally.len();
        tally.entry(token.to_owned()).or_insert((order, 0)).1 += 1;
    }

    let mut tally: HashMap<String, (usize, u32)> = HashMap::new();

    for body in bodies {
        let content = body.to_lowercase();

        for tag in TAG_RE.find_iter(&content) {
            record(&mut tally, tag.as_str());
        }

        let without_tags = TAG_RE.replace_all(&content, "");
        let without_urls = URL_RE.replace_all(&without_tags, "");
        let cleaned = NON_WORD_RE.replace_all(&without_urls, " ");

        for word in cleaned
            .split_whitespace()
            .filter(|word| word.chars().count() > 2 && !STOP_WORDS.contains(word))
        {
            record(&mut tally, word);
        }
    }

    let mut terms: Vec<(String, usize, u32)> = tally
        .into_iter()
        .filter(|(_, (_, count))| *count > 1)
        .map(|(word, (order, count))| (word, order, count))
        .collect();
    terms.sort_by(|a, b| b.2.cmp(&a.2).then(a.1.cmp(&b.1)));

    terms
        .into_iter()
        .take(MAX_TRENDING_TERMS)
        .map(|(word, _, count)| TrendingTerm { word, count })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::trending::{MAX_TRENDING_TERMS, TrendingTerm, trending_terms};

    fn words(terms: &[TrendingTerm]) -> Vec<&str> {
        terms.iter().map(|t| t.word.as_str()).collect()
    }

    #[test]
    fn tags_outrank_singletons() {
        let terms = trending_terms(["I love #rust and rust", "rust is great #rust"]);

        assert_eq!(terms[0].word, "#rust");
        assert_eq!(terms[0].count, 2);
        assert_eq!(terms[1].word, "rust");
        assert_eq!(terms[1].count, 2);
        // Singletons, stop-words and short tokens never appear.
        assert_eq!(terms.len(), 2);
    }

    #[test]
    fn stop_words_and_short_tokens_are_dropped() {
        let terms = trending_terms(["the the the is is to to", "ab ab ab cd cd"]);
        assert!(terms.is_empty());
    }

    #[test]
    fn singletons_are_dropped() {
        let terms = trending_terms(["unique words only here"]);
        assert!(terms.is_empty());
    }

    #[test]
    fn ties_break_by_first_encountered_order() {
        let terms = trending_terms(["alpha beta", "beta alpha", "gamma gamma"]);

        // All three have count 2; alpha was seen first, then beta, then gamma.
        assert_eq!(words(&terms), ["alpha", "beta", "gamma"]);
    }

    #[test]
    fn urls_are_stripped_before_word_extraction() {
        let terms = trending_terms([
            "rust https://example.com/rust-article rust",
            "more rust https://example.com/rust-article more",
        ]);

        assert_eq!(words(&terms), ["rust", "more"]);
    }

    #[test]
    fn tags_and_words_are_separate_tokens() {
        let terms = trending_terms(["#rust forever", "#rust forever"]);

        assert_eq!(words(&terms), ["#rust", "forever"]);
        assert!(terms.iter().all(|t| t.count == 2));
    }

    #[test]
    fn non_latin_tags_are_extracted() {
        let terms = trending_terms(["#日本語 です", "#日本語 です"]);
        assert_eq!(terms[0].word, "#日本語");
        assert_eq!(terms[0].count, 2);
    }

    #[test]
    fn casing_is_folded() {
        let terms = trending_terms(["Rust RUST rust"]);
        assert_eq!(terms, [TrendingTerm { word: "rust".into(), count: 3 }]);
    }

    #[test]
    fn output_is_capped() {
        let bodies: Vec<String> = (0..20)
            .map(|i| format!("word{i} word{i}"))
            .collect();
        let terms = trending_terms(bodies.iter().map(String::as_str));

        assert_eq!(terms.len(), MAX_TRENDING_TERMS);
        // Cap keeps the earliest-seen among equal counts.
        assert_eq!(terms[0].word, "word0");
        assert_eq!(terms[9].word, "word9");
    }

    #[test]
    fn deterministic_for_a_fixed_snapshot() {
        let bodies = ["#rust is great", "I love #rust and tooling", "tooling tooling"];
        assert_eq!(trending_terms(bodies), trending_terms(bodies));
    }
}
