//! Order number detection in free text.
//!
//! [`NumberFinder`] runs an ordered list of precompiled patterns over a text
//! blob and returns the digits of the first pattern tier that matches. Tiers
//! go from most specific (year-prefixed identifiers) to most generic
//! (any 8–12 digit run), followed by the labeled forms `ORDER …` and `№ …`.
//!
//! # Example
//!
//! ```
//! use ordersplit::NumberFinder;
//!
//! let finder = NumberFinder::new();
//! assert_eq!(
//!     finder.find("ref 12345678 order 20246001234 done").as_deref(),
//!     Some("20246001234")
//! );
//! assert_eq!(finder.find("ORDER: 987654321").as_deref(), Some("987654321"));
//! assert_eq!(finder.find("ab"), None);
//! ```

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Texts shorter than this (in characters) are never searched.
pub const DEFAULT_MIN_TEXT_LEN: usize = 5;

/// The pattern tiers, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatternKind {
    /// `2024`–`2029` followed by the identifier suffix.
    YearPrefixed,
    /// `20` followed by eight or more digits.
    CenturyPrefixed,
    /// Exactly ten digits.
    TenDigits,
    /// Any run of 8 to 12 digits.
    DigitRun,
    /// `ORDER` label followed by 8 to 12 digits.
    OrderLabel,
    /// `№` label followed by 8 to 12 digits.
    NumeroLabel,
}

impl PatternKind {
    /// All tiers in priority order.
    pub const ALL: [PatternKind; 6] = [
        PatternKind::YearPrefixed,
        PatternKind::CenturyPrefixed,
        PatternKind::TenDigits,
        PatternKind::DigitRun,
        PatternKind::OrderLabel,
        PatternKind::NumeroLabel,
    ];

    /// Regular expression source for this tier.
    ///
    /// Group 1 always holds the digits. Digit classes are ASCII-only so the
    /// captured text can be used verbatim in file names.
    pub fn pattern(self) -> &'static str {
        match self {
            PatternKind::YearPrefixed => r"\b(202[4-9][0-9]{6,8})\b",
            PatternKind::CenturyPrefixed => r"\b(20[0-9]{8,10})\b",
            PatternKind::TenDigits => r"\b([0-9]{10})\b",
            PatternKind::DigitRun => r"\b([0-9]{8,12})\b",
            PatternKind::OrderLabel => r"(?i)\bORDER[:\s]*([0-9]{8,12})\b",
            // `№` is not a word character, so no boundary in front of it.
            PatternKind::NumeroLabel => r"(?i)№[:\s]*([0-9]{8,12})\b",
        }
    }

    /// Whether the tier matches a label in front of the digits.
    pub fn is_labeled(self) -> bool {
        matches!(self, PatternKind::OrderLabel | PatternKind::NumeroLabel)
    }
}

impl std::fmt::Display for PatternKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PatternKind::YearPrefixed => "year-prefixed",
            PatternKind::CenturyPrefixed => "century-prefixed",
            PatternKind::TenDigits => "ten-digits",
            PatternKind::DigitRun => "digit-run",
            PatternKind::OrderLabel => "order-label",
            PatternKind::NumeroLabel => "numero-label",
        };
        f.write_str(name)
    }
}

/// A compiled tier.
#[derive(Debug, Clone)]
struct PatternSpec {
    kind: PatternKind,
    regex: Regex,
}

impl PatternSpec {
    fn compile(kind: PatternKind) -> Self {
        Self {
            kind,
            regex: Regex::new(kind.pattern()).unwrap(),
        }
    }
}

/// A located order number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberMatch {
    /// The matched digits (label stripped).
    pub number: String,
    /// Tier that produced the match.
    pub kind: PatternKind,
    /// Byte offset of the digits in the searched text.
    pub offset: usize,
}

/// Finds the most plausible order number in a text blob.
///
/// The finder is immutable after construction and cheap to share between
/// threads; compile it once and reuse it for every page.
#[derive(Debug, Clone)]
pub struct NumberFinder {
    patterns: Vec<PatternSpec>,
    min_text_len: usize,
}

impl NumberFinder {
    /// Create a finder with every tier in the default order.
    pub fn new() -> Self {
        Self {
            patterns: PatternKind::ALL
                .iter()
                .copied()
                .map(PatternSpec::compile)
                .collect(),
            min_text_len: DEFAULT_MIN_TEXT_LEN,
        }
    }

    /// Set the minimum text length below which no search is attempted.
    pub fn with_min_text_len(mut self, len: usize) -> Self {
        self.min_text_len = len;
        self
    }

    /// Minimum text length in characters.
    pub fn min_text_len(&self) -> usize {
        self.min_text_len
    }

    /// Tiers in the order they are tried.
    pub fn tiers(&self) -> impl Iterator<Item = PatternKind> + '_ {
        self.patterns.iter().map(|p| p.kind)
    }

    /// Return the order number in `text`, if any.
    pub fn find(&self, text: &str) -> Option<String> {
        self.find_match(text).map(|m| m.number)
    }

    /// Return the order number in `text` along with the tier that found it.
    ///
    /// Tiers are tried in order and the first tier with any match wins.
    /// Within a tier the leftmost match wins.
    pub fn find_match(&self, text: &str) -> Option<NumberMatch> {
        if text.chars().take(self.min_text_len).count() < self.min_text_len {
            return None;
        }

        self.patterns.iter().find_map(|spec| {
            let digits = spec.regex.captures(text)?.get(1)?;
            let number = digits.as_str();
            if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            Some(NumberMatch {
                number: number.to_string(),
                kind: spec.kind,
                offset: digits.start(),
            })
        })
    }
}

impl Default for NumberFinder {
    fn default() -> Self {
        Self::new()
    }
}

/// Find an order number using a shared default [`NumberFinder`].
pub fn find_order_number(text: &str) -> Option<String> {
    static FINDER: OnceLock<NumberFinder> = OnceLock::new();
    FINDER.get_or_init(NumberFinder::new).find(text)
}
