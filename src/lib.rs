//! # ordersplit
//!
//! Split multi-page PDFs into single-page files named by the order number
//! printed on each page.
//!
//! Every page is searched for a number in its embedded text first. Scanned
//! pages without usable text are rendered and passed through OCR. Pages
//! where no number turns up are still written, under a positional name.
//!
//! ## Quick Start
//!
//! ```no_run
//! use ordersplit::split_file;
//!
//! fn main() -> ordersplit::Result<()> {
//!     let report = split_file("orders.pdf", "out")?;
//!
//!     for file in &report.files {
//!         println!("page {} -> {}", file.page_number(), file.assigned_name);
//!     }
//!     println!("{:.1}% named", report.stats.success_rate());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Tiered number search**: year-prefixed IDs before generic digit runs
//! - **OCR fallback**: `pdftoppm` + `tesseract`, or any [`OcrEngine`]
//! - **Collision-safe naming**: `_1`, `_2`, … suffixes, never overwrites
//! - **Output sinks**: directory, memory, ZIP archive (`archive` feature)
//! - **Parallel extraction**: Uses Rayon, output order stays deterministic
//! - **Run reports**: per-page records and totals as JSON

pub mod detect;
pub mod document;
pub mod error;
pub mod finder;
pub mod ocr;
pub mod sink;
pub mod split;

// Re-export commonly used types
pub use detect::{detect_format_from_bytes, detect_format_from_path, is_pdf, PdfFormat};
pub use document::{PageSource, PdfDocument, TextGranularity};
pub use error::{Error, Result};
pub use finder::{find_order_number, NumberFinder, NumberMatch, PatternKind};
pub use ocr::{OcrBackend, OcrEngine, Rasterizer, SystemOcrConfig};
pub use sink::{DirectorySink, MemorySink, OutputSink};
pub use split::{
    CancellationToken, ExtractionSource, JsonFormat, OutputFile, PageSplitter, ProgressSink,
    SplitOptions, SplitReport, SplitStats,
};

#[cfg(feature = "archive")]
pub use sink::ZipSink;

use std::path::Path;

/// Split a PDF file into a directory, using system OCR when installed.
///
/// # Arguments
///
/// * `path` - Path to the PDF file
/// * `out_dir` - Output directory, created if missing
///
/// # Example
///
/// ```no_run
/// use ordersplit::split_file;
///
/// let report = split_file("orders.pdf", "out").unwrap();
/// println!("Pages: {}", report.stats.processed);
/// ```
pub fn split_file<P: AsRef<Path>, Q: AsRef<Path>>(path: P, out_dir: Q) -> Result<SplitReport> {
    OrderSplit::new().split_to_dir(path, out_dir)
}

/// Split a PDF file with custom options.
///
/// # Example
///
/// ```no_run
/// use ordersplit::{split_file_with_options, SplitOptions};
///
/// let options = SplitOptions::new().text_only().parallel();
/// let report = split_file_with_options("orders.pdf", "out", options).unwrap();
/// ```
pub fn split_file_with_options<P: AsRef<Path>, Q: AsRef<Path>>(
    path: P,
    out_dir: Q,
    options: SplitOptions,
) -> Result<SplitReport> {
    OrderSplit::new()
        .with_options(options)
        .split_to_dir(path, out_dir)
}

/// Split PDF bytes into any sink, native text only.
///
/// # Example
///
/// ```no_run
/// use ordersplit::{split_bytes, MemorySink};
///
/// let data = std::fs::read("orders.pdf").unwrap();
/// let mut sink = MemorySink::new();
/// let report = split_bytes(&data, &mut sink).unwrap();
/// assert_eq!(sink.len(), report.files.len());
/// ```
pub fn split_bytes(data: &[u8], sink: &mut dyn OutputSink) -> Result<SplitReport> {
    PageSplitter::new(SplitOptions::new().text_only()).split_bytes(data, sink)
}

/// Builder for splitting PDF documents.
///
/// # Example
///
/// ```no_run
/// use ordersplit::OrderSplit;
///
/// let report = OrderSplit::new()
///     .with_language("eng+kor")
///     .with_render_scale(2.0)
///     .parallel()
///     .split_to_dir("orders.pdf", "out")?;
/// println!("{}", report.to_json(ordersplit::JsonFormat::Pretty)?);
/// # Ok::<(), ordersplit::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct OrderSplit {
    options: SplitOptions,
    ocr_config: SystemOcrConfig,
    ocr_backend: Option<OcrBackend>,
}

impl OrderSplit {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all split options.
    pub fn with_options(mut self, options: SplitOptions) -> Self {
        self.options = options;
        self
    }

    /// Native text only, no OCR.
    pub fn text_only(mut self) -> Self {
        self.options = self.options.text_only();
        self
    }

    /// Extract pages in parallel.
    pub fn parallel(mut self) -> Self {
        self.options = self.options.parallel();
        self
    }

    /// Set the OCR language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.options = self.options.with_language(language);
        self
    }

    /// Set the OCR render scale.
    pub fn with_render_scale(mut self, scale: f32) -> Self {
        self.options = self.options.with_render_scale(scale);
        self
    }

    /// Configure the system OCR tools.
    pub fn with_ocr_config(mut self, config: SystemOcrConfig) -> Self {
        self.ocr_config = config;
        self
    }

    /// Use a specific OCR backend instead of the system tools.
    pub fn with_ocr_backend(mut self, backend: OcrBackend) -> Self {
        self.ocr_backend = Some(backend);
        self
    }

    /// Build the splitter.
    ///
    /// System tools are only looked up when OCR is enabled and no backend was
    /// given.
    pub fn build(&self) -> PageSplitter {
        let splitter = PageSplitter::new(self.options.clone());
        match (&self.ocr_backend, self.options.ocr) {
            (Some(backend), _) => splitter.with_ocr_backend(backend.clone()),
            (None, true) => splitter.with_system_ocr(&self.ocr_config),
            (None, false) => splitter,
        }
    }

    /// Split a PDF file into a directory.
    pub fn split_to_dir<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        path: P,
        out_dir: Q,
    ) -> Result<SplitReport> {
        let doc = PdfDocument::open(path)?;
        let mut sink = DirectorySink::new(out_dir)?;
        self.build().split(&doc, &mut sink)
    }

    /// Split a PDF file into a ZIP archive.
    #[cfg(feature = "archive")]
    pub fn split_to_zip<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        path: P,
        zip_path: Q,
    ) -> Result<SplitReport> {
        let doc = PdfDocument::open(path)?;
        let mut sink = ZipSink::create(zip_path)?;
        let report = self.build().split(&doc, &mut sink)?;
        sink.finish()?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let builder = OrderSplit::new();
        assert!(builder.options.ocr);
        assert!(!builder.options.parallel);
        assert!(builder.ocr_backend.is_none());
    }

    #[test]
    fn test_builder_chained() {
        let builder = OrderSplit::new()
            .text_only()
            .parallel()
            .with_language("kor")
            .with_render_scale(2.0);
        assert!(!builder.options.ocr);
        assert!(builder.options.parallel);
        assert_eq!(builder.options.language, "kor");
        assert_eq!(builder.options.render_scale, 2.0);
    }

    #[test]
    fn test_text_only_never_looks_up_ocr() {
        let splitter = OrderSplit::new().text_only().build();
        assert!(!splitter.ocr_enabled());
    }

    #[test]
    fn test_missing_tools_disable_ocr() {
        let config = SystemOcrConfig::new()
            .with_pdftoppm("/nonexistent/pdftoppm")
            .with_tesseract("/nonexistent/tesseract");
        let splitter = OrderSplit::new().with_ocr_config(config).build();
        assert!(!splitter.ocr_enabled());
    }

    // ==================== Edge Case Tests ====================

    #[test]
    fn test_split_bytes_empty_data() {
        let mut sink = MemorySink::new();
        let err = split_bytes(&[], &mut sink).unwrap_err();
        assert!(err.is_input_format());
        assert!(sink.is_empty());
    }

    #[test]
    fn test_split_bytes_unknown_magic() {
        let mut sink = MemorySink::new();
        let data = b"<!DOCTYPE html><html></html>";
        let err = split_bytes(data, &mut sink).unwrap_err();
        assert!(matches!(err, Error::UnknownFormat));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_split_bytes_broken_pdf() {
        // Valid header, no body
        let mut sink = MemorySink::new();
        let err = split_bytes(b"%PDF-1.7\n%garbage", &mut sink).unwrap_err();
        assert!(err.is_input_format());
        assert!(sink.is_empty());
    }

    #[test]
    fn test_split_file_missing_input_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let result = split_file(dir.path().join("missing.pdf"), &out);
        assert!(result.is_err());
        assert!(!out.exists());
    }

    #[test]
    fn test_find_order_number_reexport() {
        assert_eq!(
            find_order_number("Order № 123456789").as_deref(),
            Some("123456789")
        );
    }
}
