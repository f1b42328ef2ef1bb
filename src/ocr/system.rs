//! OCR through the Poppler and Tesseract command-line tools.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use image::{DynamicImage, GrayImage};

use super::{OcrEngine, Rasterizer};
use crate::error::{Error, Result};

/// Native PDF resolution; a scale of 1.0 renders at this DPI.
const BASE_DPI: f32 = 72.0;
/// Below this, text is unreadable to any engine.
const MIN_DPI: u32 = 36;

/// Collapse runs of spaces between recognized words.
pub const PRESERVE_INTERWORD_SPACES: &str = "preserve_interword_spaces=0";

/// Settings for the system OCR tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemOcrConfig {
    /// `pdftoppm` executable
    pub pdftoppm_command: PathBuf,
    /// `tesseract` executable
    pub tesseract_command: PathBuf,
    /// OCR engine mode (`--oem`); 1 = LSTM only
    pub oem: Option<u8>,
    /// Page segmentation mode (`--psm`); 6 = single uniform block of text
    pub psm: Option<u8>,
    /// Additional arguments appended to every tesseract call
    pub extra_args: Vec<String>,
}

impl SystemOcrConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `pdftoppm` executable.
    pub fn with_pdftoppm(mut self, command: impl Into<PathBuf>) -> Self {
        self.pdftoppm_command = command.into();
        self
    }

    /// Set the `tesseract` executable.
    pub fn with_tesseract(mut self, command: impl Into<PathBuf>) -> Self {
        self.tesseract_command = command.into();
        self
    }

    /// Set the engine mode.
    pub fn with_oem(mut self, oem: Option<u8>) -> Self {
        self.oem = oem;
        self
    }

    /// Set the page segmentation mode.
    pub fn with_psm(mut self, psm: Option<u8>) -> Self {
        self.psm = psm;
        self
    }

    /// Append an extra tesseract argument.
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }
}

impl Default for SystemOcrConfig {
    fn default() -> Self {
        Self {
            pdftoppm_command: PathBuf::from("pdftoppm"),
            tesseract_command: PathBuf::from("tesseract"),
            oem: Some(1),
            psm: Some(6),
            extra_args: vec!["-c".to_string(), PRESERVE_INTERWORD_SPACES.to_string()],
        }
    }
}

/// Check whether an executable can be started.
///
/// Old Poppler releases exit non-zero for `-v`, so only spawning matters.
pub fn command_available(command: &Path) -> bool {
    Command::new(command).arg("-v").output().is_ok()
}

fn check_output(output: Output, error: fn(String) -> Error) -> Result<Output> {
    if output.status.success() {
        return Ok(output);
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(error(format!("exit {}: {}", output.status, stderr.trim())))
}

/// Renders pages with Poppler's `pdftoppm`.
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    command: PathBuf,
}

impl PdftoppmRasterizer {
    /// Use the given `pdftoppm` executable.
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// The executable in use.
    pub fn command(&self) -> &Path {
        &self.command
    }

    /// Whether the executable can be run.
    pub fn is_available(&self) -> bool {
        command_available(&self.command)
    }

    fn dpi(scale: f32) -> u32 {
        ((BASE_DPI * scale).round() as u32).max(MIN_DPI)
    }
}

impl Default for PdftoppmRasterizer {
    fn default() -> Self {
        Self::new("pdftoppm")
    }
}

impl Rasterizer for PdftoppmRasterizer {
    fn render(&self, page_pdf: &[u8], scale: f32) -> Result<DynamicImage> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("page.pdf");
        std::fs::write(&input, page_pdf)?;
        let prefix = dir.path().join("page");

        let output = Command::new(&self.command)
            .arg("-png")
            .arg("-singlefile")
            .args(["-f", "1", "-l", "1"])
            .args(["-r", &Self::dpi(scale).to_string()])
            .arg(&input)
            .arg(&prefix)
            .output()
            .map_err(|e| Error::Render(format!("{}: {}", self.command.display(), e)))?;
        check_output(output, Error::Render)?;

        // -singlefile writes <prefix>.png without a page suffix
        let png = prefix.with_extension("png");
        Ok(image::open(&png)?)
    }
}

/// Recognizes text with the `tesseract` CLI.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    config: SystemOcrConfig,
}

impl TesseractEngine {
    /// Create an engine with the given settings.
    pub fn new(config: SystemOcrConfig) -> Self {
        Self { config }
    }

    /// Whether the executable can be run.
    pub fn is_available(&self) -> bool {
        command_available(&self.config.tesseract_command)
    }

    /// Installed recognition languages.
    pub fn languages(&self) -> Result<Vec<String>> {
        let output = Command::new(&self.config.tesseract_command)
            .arg("--list-langs")
            .output()
            .map_err(|e| Error::Ocr(e.to_string()))?;
        let output = check_output(output, Error::Ocr)?;

        // First line is a header ("List of available languages ...")
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .skip(1)
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn args(&self, language: &str) -> Vec<String> {
        let mut args = vec!["stdout".to_string(), "-l".to_string(), language.to_string()];
        if let Some(oem) = self.config.oem {
            args.push("--oem".to_string());
            args.push(oem.to_string());
        }
        if let Some(psm) = self.config.psm {
            args.push("--psm".to_string());
            args.push(psm.to_string());
        }
        args.extend(self.config.extra_args.iter().cloned());
        args
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new(SystemOcrConfig::default())
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&self, image: &GrayImage, language: &str) -> Result<String> {
        let file = tempfile::Builder::new()
            .prefix("ordersplit-")
            .suffix(".png")
            .tempfile()?;
        image
            .save_with_format(file.path(), image::ImageFormat::Png)
            .map_err(|e| Error::Ocr(e.to_string()))?;

        let output = Command::new(&self.config.tesseract_command)
            .arg(file.path())
            .args(self.args(language))
            .output()
            .map_err(|e| Error::Ocr(format!("{}: {}", self.config.tesseract_command.display(), e)))?;
        let output = check_output(output, Error::Ocr)?;

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
