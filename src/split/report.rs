//! Per-page records and run totals.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::finder::{NumberMatch, PatternKind};

/// How a page's name was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionSource {
    /// Text embedded in the PDF.
    NativeText,
    /// Text recognized from a rendered image.
    Ocr,
    /// No number found; the page got a positional name.
    None,
}

impl std::fmt::Display for ExtractionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ExtractionSource::NativeText => "native-text",
            ExtractionSource::Ocr => "ocr",
            ExtractionSource::None => "none",
        })
    }
}

/// One try at finding a page's number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionAttempt {
    /// `NativeText` or `Ocr`
    pub source: ExtractionSource,
    /// Number found by this attempt
    pub matched: Option<NumberMatch>,
    /// Failure recorded instead of aborting the run
    pub error: Option<String>,
}

/// Where a page is in the extraction pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageState {
    NotStarted,
    NativeTextTried,
    OcrTried,
    Matched,
    Unmatched,
    Written,
}

impl PageState {
    /// Whether the pipeline may move from `self` to `next`.
    pub fn can_advance_to(self, next: PageState) -> bool {
        use PageState::*;
        matches!(
            (self, next),
            (NotStarted, NativeTextTried)
                | (NativeTextTried, Matched)
                | (NativeTextTried, OcrTried)
                | (NativeTextTried, Unmatched)
                | (OcrTried, Matched)
                | (OcrTried, Unmatched)
                | (Matched, Written)
                | (Unmatched, Written)
        )
    }

    /// Whether the page has been handed to the sink.
    pub fn is_terminal(self) -> bool {
        self == PageState::Written
    }
}

/// Result of the extraction stage for one page, before naming.
#[derive(Debug, Clone)]
pub struct PageExtraction {
    /// 0-based page index
    pub page_index: u32,
    /// Attempts in the order they ran
    pub attempts: Vec<ExtractionAttempt>,
    /// Standalone PDF holding just this page
    pub page_pdf: Vec<u8>,
    state: PageState,
}

impl PageExtraction {
    pub(crate) fn new(page_index: u32) -> Self {
        Self {
            page_index,
            attempts: Vec::new(),
            page_pdf: Vec::new(),
            state: PageState::NotStarted,
        }
    }

    /// Current pipeline state.
    pub fn state(&self) -> PageState {
        self.state
    }

    pub(crate) fn advance(&mut self, next: PageState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "invalid page transition {:?} -> {:?}",
            self.state,
            next
        );
        self.state = next;
    }

    pub(crate) fn record(
        &mut self,
        source: ExtractionSource,
        matched: Option<NumberMatch>,
        error: Option<String>,
    ) {
        self.attempts.push(ExtractionAttempt {
            source,
            matched,
            error,
        });
    }

    /// The winning match and the attempt that produced it.
    pub fn winner(&self) -> Option<(&NumberMatch, ExtractionSource)> {
        self.attempts
            .iter()
            .find_map(|a| a.matched.as_ref().map(|m| (m, a.source)))
    }

    /// How the page will be named.
    pub fn source(&self) -> ExtractionSource {
        self.winner()
            .map(|(_, source)| source)
            .unwrap_or(ExtractionSource::None)
    }

    /// Whether any attempt of `source` recorded an error.
    pub fn failed(&self, source: ExtractionSource) -> bool {
        self.attempts
            .iter()
            .any(|a| a.source == source && a.error.is_some())
    }
}

/// A written page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFile {
    /// 0-based index of the page in the input
    pub page_index: u32,
    /// Final name, unique within the run
    pub assigned_name: String,
    /// Number the name was derived from
    pub matched_number: Option<String>,
    /// Tier that matched
    pub pattern: Option<PatternKind>,
    /// How the number was obtained
    pub extraction_source: ExtractionSource,
    /// OCR-derived names deserve a human look
    pub needs_review: bool,
}

impl OutputFile {
    /// 1-based page number.
    pub fn page_number(&self) -> u32 {
        self.page_index + 1
    }

    /// Whether the name came from a found number.
    pub fn is_matched(&self) -> bool {
        self.matched_number.is_some()
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SplitStats {
    /// Pages in the input
    pub total_pages: u32,
    /// Pages written
    pub processed: u32,
    /// Pages named from native text
    pub native_text: u32,
    /// Pages named from OCR
    pub ocr: u32,
    /// Pages written under their positional name
    pub unmatched: u32,
    /// Pages never started because the run was cancelled
    pub skipped: u32,
    /// Pages whose native text could not be read at some granularity
    pub text_failures: u32,
    /// Pages whose OCR attempt failed
    pub ocr_failures: u32,
    /// Wall time in milliseconds
    pub elapsed_ms: u64,
}

impl SplitStats {
    pub(crate) fn new(total_pages: u32) -> Self {
        Self {
            total_pages,
            ..Default::default()
        }
    }

    pub(crate) fn record(&mut self, file: &OutputFile, extraction: &PageExtraction) {
        self.processed += 1;
        match file.extraction_source {
            ExtractionSource::NativeText => self.native_text += 1,
            ExtractionSource::Ocr => self.ocr += 1,
            ExtractionSource::None => self.unmatched += 1,
        }
        if extraction.failed(ExtractionSource::NativeText) {
            self.text_failures += 1;
        }
        if extraction.failed(ExtractionSource::Ocr) {
            self.ocr_failures += 1;
        }
    }

    /// Pages named from a found number.
    pub fn matched(&self) -> u32 {
        self.native_text + self.ocr
    }

    /// Share of written pages that got a number, in percent.
    pub fn success_rate(&self) -> f64 {
        if self.processed == 0 {
            return 0.0;
        }
        self.matched() as f64 * 100.0 / self.processed as f64
    }

    /// Wall time of the run.
    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }

    /// Throughput over the whole run.
    pub fn pages_per_second(&self) -> f64 {
        let secs = self.elapsed().as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.processed as f64 / secs
    }
}

/// Everything a split run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitReport {
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Written pages in input order
    pub files: Vec<OutputFile>,
    /// Run totals
    pub stats: SplitStats,
    /// Whether cancellation left pages unwritten
    pub cancelled: bool,
}

impl SplitReport {
    /// Files whose names came from OCR.
    pub fn needs_review(&self) -> impl Iterator<Item = &OutputFile> {
        self.files.iter().filter(|f| f.needs_review)
    }

    /// Whether every page of the input was written.
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.stats.processed == self.stats.total_pages
    }

    /// Serialize the report.
    pub fn to_json(&self, format: JsonFormat) -> Result<String> {
        to_json(self, format)
    }
}

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Convert a report to JSON.
pub fn to_json(report: &SplitReport, format: JsonFormat) -> Result<String> {
    let result = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(report),
        JsonFormat::Compact => serde_json::to_string(report),
    };

    result.map_err(|e| Error::Output(format!("JSON serialization error: {}", e)))
}
