//! Citation marker extraction and answer confidence.
//!
//! Generated answers reference the numbered context blocks of the prompt with
//! markers such as `[1]` or `[1][2]`. Markers are parsed from the final text
//! and checked against the number of parents that were actually supplied.
//!
//! [`Confidence`] is derived only from how many distinct, in-range markers an
//! answer carries. It measures whether the answer points at its sources, not
//! whether the answer is correct: a low-confidence answer may still be right,
//! and a high-confidence one may still be wrong.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Groundedness heuristic derived from valid citation count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Two or more distinct valid citations.
    High,
    /// Exactly one valid citation.
    Medium,
    /// No valid citation.
    Low,
}

impl Confidence {
    /// Classifies a count of distinct in-range citations.
    pub fn from_valid_count(count: usize) -> Self {
        match count {
            0 => Self::Low,
            1 => Self::Medium,
            _ => Self::High,
        }
    }

    /// Lowercase label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Answer text with its parsed citations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedAnswer {
    /// Answer text with surrounding whitespace removed.
    pub text: String,
    /// Every marker in text order, duplicates and out-of-range values kept.
    pub citations: Vec<i64>,
    /// Distinct markers within `[1, parent_count]`, ascending.
    pub unique_citations: Vec<i64>,
    /// Classification of `unique_citations.len()`.
    pub confidence: Confidence,
}

fn marker_regex() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(r"\[(\d+)\]").expect("valid citation regex"))
}

/// Returns every `[n]` marker in text order.
///
/// Digit runs that do not fit in an `i64` are skipped.
pub fn parse_citations(text: &str) -> Vec<i64> {
    marker_regex()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1)?.as_str().parse::<i64>().ok())
        .collect()
}

/// Sorted distinct values of `citations`.
pub fn unique_citations(citations: &[i64]) -> Vec<i64> {
    citations
        .iter()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Parses and validates the markers in `text` against `parent_count` sources.
pub fn process_answer(text: &str, parent_count: usize) -> GeneratedAnswer {
    let citations = parse_citations(text);
    let max = i64::try_from(parent_count).unwrap_or(i64::MAX);
    let unique_citations: Vec<i64> = unique_citations(&citations)
        .into_iter()
        .filter(|n| (1..=max).contains(n))
        .collect();
    let confidence = Confidence::from_valid_count(unique_citations.len());
    GeneratedAnswer {
        text: text.trim().to_string(),
        citations,
        unique_citations,
        confidence,
    }
}
