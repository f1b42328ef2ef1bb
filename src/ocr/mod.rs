//! Raster + OCR fallback.
//!
//! The splitter only needs two capabilities: render a single-page PDF to an
//! image, and turn a grayscale image into text. Both sit behind traits so
//! the pipeline can run with the system tools (`pdftoppm` and `tesseract`),
//! with another engine, or with test doubles.

mod system;

pub use system::{command_available, PdftoppmRasterizer, SystemOcrConfig, TesseractEngine};

use std::sync::Arc;

use image::{DynamicImage, GrayImage};

use crate::error::Result;

/// Renders a standalone single-page PDF to a raster image.
pub trait Rasterizer: Send + Sync {
    /// Render the only page of `page_pdf` at `scale` × native resolution
    /// (1.0 = 72 DPI).
    fn render(&self, page_pdf: &[u8], scale: f32) -> Result<DynamicImage>;
}

/// Recognizes text in a grayscale image.
pub trait OcrEngine: Send + Sync {
    /// Engine name used in logs.
    fn name(&self) -> &str;

    /// Run recognition with the given language code (e.g. `eng`).
    fn recognize(&self, image: &GrayImage, language: &str) -> Result<String>;
}

/// Convert a rendered page to grayscale before recognition.
///
/// Color artifacts (stamps, highlighted fields) confuse recognition more
/// than they help.
pub fn to_grayscale(image: &DynamicImage) -> GrayImage {
    image.to_luma8()
}

/// A rasterizer paired with an OCR engine.
#[derive(Clone)]
pub struct OcrBackend {
    rasterizer: Arc<dyn Rasterizer>,
    engine: Arc<dyn OcrEngine>,
}

impl OcrBackend {
    /// Pair a rasterizer with an engine.
    pub fn new(rasterizer: Arc<dyn Rasterizer>, engine: Arc<dyn OcrEngine>) -> Self {
        Self { rasterizer, engine }
    }

    /// Use `pdftoppm` and `tesseract` if both are installed.
    ///
    /// Returns `None` when either tool is missing; the splitter then runs
    /// on native text alone.
    pub fn detect_system(config: &SystemOcrConfig) -> Option<Self> {
        let rasterizer = PdftoppmRasterizer::new(&config.pdftoppm_command);
        let engine = TesseractEngine::new(config.clone());

        if !rasterizer.is_available() {
            log::info!(
                "OCR disabled: '{}' not found",
                config.pdftoppm_command.display()
            );
            return None;
        }
        if !engine.is_available() {
            log::info!(
                "OCR disabled: '{}' not found",
                config.tesseract_command.display()
            );
            return None;
        }

        log::debug!("OCR enabled with {} and {}", rasterizer.command().display(), engine.name());
        Some(Self::new(Arc::new(rasterizer), Arc::new(engine)))
    }

    /// Render a page and recognize its text.
    pub fn page_text(&self, page_pdf: &[u8], scale: f32, language: &str) -> Result<String> {
        let image = self.rasterizer.render(page_pdf, scale)?;
        let gray = to_grayscale(&image);
        self.engine.recognize(&gray, language)
    }

    /// Name of the OCR engine.
    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }
}

impl std::fmt::Debug for OcrBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrBackend")
            .field("engine", &self.engine.name())
            .finish()
    }
}
