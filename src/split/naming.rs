//! Output file naming and collision avoidance.

use std::collections::HashSet;

use crate::error::{Error, Result};

/// Extension of every output file.
pub const PDF_EXTENSION: &str = ".pdf";

/// Default bound on the `_N` suffix search.
pub const DEFAULT_MAX_SUFFIX: u32 = 10_000;

/// Name for a page before collision avoidance.
///
/// `{number}.pdf` when a number was found, else `page_{n}.pdf` with the
/// 1-based page number.
pub fn candidate_name(number: Option<&str>, page_number: u32) -> String {
    match number {
        Some(n) => format!("{}{}", n, PDF_EXTENSION),
        None => format!("page_{}{}", page_number, PDF_EXTENSION),
    }
}

/// Names assigned during one run.
///
/// A candidate that is taken (by this run or by the sink) gets the lowest
/// free `_1`, `_2`, … suffix before the extension.
#[derive(Debug, Clone)]
pub struct NameRegistry {
    assigned: HashSet<String>,
    max_suffix: u32,
}

impl NameRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            assigned: HashSet::new(),
            max_suffix: DEFAULT_MAX_SUFFIX,
        }
    }

    /// Bound the suffix search.
    pub fn with_max_suffix(mut self, max_suffix: u32) -> Self {
        self.max_suffix = max_suffix;
        self
    }

    /// Whether `name` was assigned in this run.
    pub fn contains(&self, name: &str) -> bool {
        self.assigned.contains(name)
    }

    /// Number of names assigned.
    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    /// Whether no name was assigned yet.
    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }

    /// Reserve a free name derived from `candidate`.
    ///
    /// `taken` reports names that exist outside this registry (for example
    /// files already in the output directory).
    pub fn assign<F>(&mut self, candidate: &str, taken: F) -> Result<String>
    where
        F: Fn(&str) -> bool,
    {
        let is_free = |name: &str| !self.assigned.contains(name) && !taken(name);

        let name = if is_free(candidate) {
            Some(candidate.to_string())
        } else {
            let stem = candidate
                .strip_suffix(PDF_EXTENSION)
                .unwrap_or(candidate);
            (1..=self.max_suffix)
                .map(|i| format!("{}_{}{}", stem, i, PDF_EXTENSION))
                .find(|name| is_free(name))
        };

        let name = name.ok_or_else(|| Error::NameExhausted(candidate.to_string(), self.max_suffix))?;
        self.assigned.insert(name.clone());
        Ok(name)
    }
}

impl Default for NameRegistry {
    fn default() -> Self {
        Self::new()
    }
}
