//! Page splitting pipeline.
//!
//! Each page goes through the same stages:
//!
//! 1. Native text at every configured granularity, combined and searched.
//! 2. If nothing matched and OCR is available: render, grayscale, recognize,
//!    search again.
//! 3. Name the page (`{number}.pdf` or `page_{n}.pdf`), resolve collisions
//!    and hand the single-page PDF to the sink.
//!
//! Page-level failures never abort a run; the page is written under its
//! positional name instead. Naming and writing always happen in page order,
//! including in parallel mode, so collision suffixes are deterministic.

mod naming;
mod options;
mod progress;
mod report;

pub use naming::{candidate_name, NameRegistry, DEFAULT_MAX_SUFFIX, PDF_EXTENSION};
pub use options::{
    SplitOptions, DEFAULT_LANGUAGE, DEFAULT_MIN_PLAIN_TEXT_LEN, DEFAULT_RENDER_SCALE,
};
pub use progress::{CancellationToken, NoProgress, ProgressSink};
pub use report::{
    to_json, ExtractionAttempt, ExtractionSource, JsonFormat, OutputFile, PageExtraction,
    PageState, SplitReport, SplitStats,
};

use std::path::Path;
use std::time::Instant;

use chrono::Utc;
use rayon::prelude::*;

use crate::document::{PageSource, PdfDocument, TextGranularity};
use crate::error::Result;
use crate::finder::NumberFinder;
use crate::ocr::{OcrBackend, SystemOcrConfig};
use crate::sink::OutputSink;

/// Splits documents into one named PDF per page.
///
/// A splitter holds no per-run state and can be reused for any number of
/// documents.
#[derive(Debug, Clone)]
pub struct PageSplitter {
    finder: NumberFinder,
    options: SplitOptions,
    ocr: Option<OcrBackend>,
}

impl PageSplitter {
    /// Create a splitter without an OCR backend.
    pub fn new(options: SplitOptions) -> Self {
        let finder = NumberFinder::new().with_min_text_len(options.min_text_len);
        Self {
            finder,
            options,
            ocr: None,
        }
    }

    /// Attach an OCR backend.
    pub fn with_ocr_backend(mut self, backend: OcrBackend) -> Self {
        self.ocr = Some(backend);
        self
    }

    /// Attach the system OCR tools if they are installed.
    pub fn with_system_ocr(mut self, config: &SystemOcrConfig) -> Self {
        self.ocr = OcrBackend::detect_system(config);
        self
    }

    /// Replace the number finder.
    pub fn with_finder(mut self, finder: NumberFinder) -> Self {
        self.finder = finder;
        self
    }

    /// Options in use.
    pub fn options(&self) -> &SplitOptions {
        &self.options
    }

    /// Whether pages without a native match go through OCR.
    pub fn ocr_enabled(&self) -> bool {
        self.options.ocr && self.ocr.is_some()
    }

    /// Open `path` and split it into `sink`.
    pub fn split_file<P: AsRef<Path>>(
        &self,
        path: P,
        sink: &mut dyn OutputSink,
    ) -> Result<SplitReport> {
        let doc = PdfDocument::open(path)?;
        self.split(&doc, sink)
    }

    /// Open PDF bytes and split them into `sink`.
    pub fn split_bytes(&self, data: &[u8], sink: &mut dyn OutputSink) -> Result<SplitReport> {
        let doc = PdfDocument::from_bytes(data)?;
        self.split(&doc, sink)
    }

    /// Split every page of `source` into `sink`.
    pub fn split(&self, source: &dyn PageSource, sink: &mut dyn OutputSink) -> Result<SplitReport> {
        self.split_with(source, sink, &mut NoProgress, &CancellationToken::new())
    }

    /// Split with progress reporting and cancellation.
    ///
    /// Errors returned here come from the sink or from copying a page out
    /// of the document; extraction failures are recorded per page instead.
    pub fn split_with(
        &self,
        source: &dyn PageSource,
        sink: &mut dyn OutputSink,
        progress: &mut dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<SplitReport> {
        let started_at = Utc::now();
        let start = Instant::now();
        let total = source.page_count();
        log::info!(
            "Splitting {} pages (ocr: {}, parallel: {})",
            total,
            self.ocr_enabled(),
            self.options.parallel
        );

        let mut run = Run {
            registry: NameRegistry::new().with_max_suffix(self.options.max_name_suffix),
            stats: SplitStats::new(total),
            files: Vec::with_capacity(total as usize),
            total,
        };

        if self.options.parallel {
            self.split_parallel(source, sink, progress, cancel, &mut run)?;
        } else {
            self.split_sequential(source, sink, progress, cancel, &mut run)?;
        }

        let Run {
            mut stats, files, ..
        } = run;
        stats.skipped = total - stats.processed;
        stats.elapsed_ms = start.elapsed().as_millis() as u64;
        let cancelled = stats.skipped > 0;

        if cancelled {
            log::warn!(
                "Cancelled after {} of {} pages",
                stats.processed,
                stats.total_pages
            );
        }
        log::info!(
            "Split {} pages: {} native, {} ocr, {} unmatched ({:.1}% named) in {:?}",
            stats.processed,
            stats.native_text,
            stats.ocr,
            stats.unmatched,
            stats.success_rate(),
            stats.elapsed()
        );

        Ok(SplitReport {
            started_at,
            files,
            stats,
            cancelled,
        })
    }

    fn split_sequential(
        &self,
        source: &dyn PageSource,
        sink: &mut dyn OutputSink,
        progress: &mut dyn ProgressSink,
        cancel: &CancellationToken,
        run: &mut Run,
    ) -> Result<()> {
        for index in 0..run.total {
            if cancel.is_cancelled() {
                break;
            }
            let extraction = self.extract_page(source, index)?;
            run.write(extraction, sink, progress)?;
        }
        Ok(())
    }

    fn split_parallel(
        &self,
        source: &dyn PageSource,
        sink: &mut dyn OutputSink,
        progress: &mut dyn ProgressSink,
        cancel: &CancellationToken,
        run: &mut Run,
    ) -> Result<()> {
        let extracted: Vec<Option<Result<PageExtraction>>> = (0..run.total)
            .into_par_iter()
            .map(|index| {
                if cancel.is_cancelled() {
                    None
                } else {
                    Some(self.extract_page(source, index))
                }
            })
            .collect();

        // Only the contiguous prefix is written, so output matches what a
        // sequential run cancelled at the same page would produce.
        for extraction in extracted.into_iter().map_while(|e| e) {
            run.write(extraction?, sink, progress)?;
        }
        Ok(())
    }

    /// Run the extraction stages for one page (0-based index).
    pub fn extract_page(&self, source: &dyn PageSource, index: u32) -> Result<PageExtraction> {
        let page = index + 1;
        let mut extraction = PageExtraction::new(index);

        let (text, error) = self.native_text(source, page);
        let found = self.finder.find_match(&text);
        extraction.advance(PageState::NativeTextTried);
        let matched = found.is_some();
        extraction.record(ExtractionSource::NativeText, found, error);

        extraction.page_pdf = source.single_page(page)?;

        if matched {
            extraction.advance(PageState::Matched);
            log::debug!("Page {}: matched in native text", page);
            return Ok(extraction);
        }

        let ocr = match &self.ocr {
            Some(ocr) if self.options.ocr => ocr,
            _ => {
                extraction.advance(PageState::Unmatched);
                log::debug!("Page {}: no number in native text", page);
                return Ok(extraction);
            }
        };

        extraction.advance(PageState::OcrTried);
        match ocr.page_text(
            &extraction.page_pdf,
            self.options.render_scale,
            &self.options.language,
        ) {
            Ok(text) => {
                let found = self.finder.find_match(&text);
                let next = if found.is_some() {
                    PageState::Matched
                } else {
                    PageState::Unmatched
                };
                extraction.record(ExtractionSource::Ocr, found, None);
                extraction.advance(next);
            }
            Err(e) => {
                log::warn!("OCR failed on page {}: {}", page, e);
                extraction.record(ExtractionSource::Ocr, None, Some(e.to_string()));
                extraction.advance(PageState::Unmatched);
            }
        }
        log::debug!("Page {}: {:?} after OCR", page, extraction.state());
        Ok(extraction)
    }

    /// Native text of a page across granularities, plus any failures.
    fn native_text(&self, source: &dyn PageSource, page: u32) -> (String, Option<String>) {
        let mut parts = Vec::new();
        let mut errors = Vec::new();

        for &granularity in &self.options.granularities {
            match source.page_text(page, granularity) {
                Ok(text) => {
                    if granularity == TextGranularity::Plain
                        && text.chars().count() <= self.options.min_plain_text_len
                    {
                        continue;
                    }
                    parts.push(text);
                }
                Err(e) => {
                    log::warn!("Failed to extract {} text from page {}: {}", granularity, page, e);
                    errors.push(format!("{}: {}", granularity, e));
                }
            }
        }

        let error = if errors.is_empty() {
            None
        } else {
            Some(errors.join("; "))
        };
        (parts.join(" "), error)
    }
}

impl Default for PageSplitter {
    fn default() -> Self {
        Self::new(SplitOptions::default())
    }
}

/// Mutable state of one run.
struct Run {
    registry: NameRegistry,
    stats: SplitStats,
    files: Vec<OutputFile>,
    total: u32,
}

impl Run {
    fn write(
        &mut self,
        mut extraction: PageExtraction,
        sink: &mut dyn OutputSink,
        progress: &mut dyn ProgressSink,
    ) -> Result<()> {
        let page_number = extraction.page_index + 1;
        let (number, pattern, source) = match extraction.winner() {
            Some((m, source)) => (Some(m.number.clone()), Some(m.kind), source),
            None => (None, None, ExtractionSource::None),
        };

        let candidate = candidate_name(number.as_deref(), page_number);
        let name = self.registry.assign(&candidate, |n| sink.exists(n))?;
        sink.write(&name, &extraction.page_pdf)?;
        extraction.advance(PageState::Written);
        log::debug!("Page {} -> {}", page_number, name);

        let file = OutputFile {
            page_index: extraction.page_index,
            assigned_name: name,
            matched_number: number,
            pattern,
            extraction_source: source,
            needs_review: source == ExtractionSource::Ocr,
        };
        self.stats.record(&file, &extraction);
        progress.page_done(self.stats.processed, self.total, source);
        self.files.push(file);
        Ok(())
    }
}
