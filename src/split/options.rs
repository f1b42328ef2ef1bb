//! Split options and configuration.

use crate::document::TextGranularity;
use crate::finder::DEFAULT_MIN_TEXT_LEN;

use super::naming::DEFAULT_MAX_SUFFIX;

/// Default render scale for OCR (1.0 = 72 DPI).
pub const DEFAULT_RENDER_SCALE: f32 = 1.2;

/// Default OCR language.
pub const DEFAULT_LANGUAGE: &str = "eng";

/// Plain text of this many characters or fewer is ignored.
pub const DEFAULT_MIN_PLAIN_TEXT_LEN: usize = 10;

/// Options for splitting a document.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitOptions {
    /// Render scale used before OCR
    pub render_scale: f32,

    /// OCR language code
    pub language: String,

    /// Whether to fall back to OCR when native text has no number
    pub ocr: bool,

    /// Native text granularities, combined in this order
    pub granularities: Vec<TextGranularity>,

    /// Plain text at or below this length (untrimmed, in characters) is dropped
    pub min_plain_text_len: usize,

    /// Text shorter than this is never searched
    pub min_text_len: usize,

    /// Extract pages on the rayon pool; naming stays in page order
    pub parallel: bool,

    /// Upper bound of the `_N` collision suffix
    pub max_name_suffix: u32,
}

impl SplitOptions {
    /// Create new split options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the render scale.
    pub fn with_render_scale(mut self, scale: f32) -> Self {
        self.render_scale = scale;
        self
    }

    /// Set the OCR language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Enable or disable the OCR fallback.
    pub fn with_ocr(mut self, ocr: bool) -> Self {
        self.ocr = ocr;
        self
    }

    /// Native text only.
    pub fn text_only(mut self) -> Self {
        self.ocr = false;
        self
    }

    /// Set the native text granularities.
    pub fn with_granularities(mut self, granularities: Vec<TextGranularity>) -> Self {
        self.granularities = granularities;
        self
    }

    /// Set the plain text cutoff.
    pub fn with_min_plain_text_len(mut self, len: usize) -> Self {
        self.min_plain_text_len = len;
        self
    }

    /// Set the minimum searchable text length.
    pub fn with_min_text_len(mut self, len: usize) -> Self {
        self.min_text_len = len;
        self
    }

    /// Enable or disable parallel extraction.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Extract pages in parallel.
    pub fn parallel(mut self) -> Self {
        self.parallel = true;
        self
    }

    /// Disable parallel extraction.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Set the collision suffix bound.
    pub fn with_max_name_suffix(mut self, max: u32) -> Self {
        self.max_name_suffix = max;
        self
    }
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            render_scale: DEFAULT_RENDER_SCALE,
            language: DEFAULT_LANGUAGE.to_string(),
            ocr: true,
            granularities: TextGranularity::ALL.to_vec(),
            min_plain_text_len: DEFAULT_MIN_PLAIN_TEXT_LEN,
            min_text_len: DEFAULT_MIN_TEXT_LEN,
            parallel: false,
            max_name_suffix: DEFAULT_MAX_SUFFIX,
        }
    }
}
