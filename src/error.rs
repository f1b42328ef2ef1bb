//! Error types for ordersplit.

use std::io;
use thiserror::Error;

/// Result type alias for ordersplit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while splitting a PDF.
///
/// Only the input-format family ([`Error::is_input_format`]) ends a run.
/// Page-level failures are recovered inside the splitter and never reach
/// the caller of [`crate::PageSplitter::split`].
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading input or writing output.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF version is not supported.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF document is encrypted.
    #[error("Document is encrypted")]
    Encrypted,

    /// Page number is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(u32, u32),

    /// Error extracting text content from a page.
    #[error("Text extraction error: {0}")]
    TextExtract(String),

    /// Error rasterizing a page.
    #[error("Render error: {0}")]
    Render(String),

    /// Error running the OCR engine.
    #[error("OCR error: {0}")]
    Ocr(String),

    /// No free output name was found within the configured bound.
    #[error("No free output name for '{0}' after {1} attempts")]
    NameExhausted(String, u32),

    /// The output sink refused or failed a write.
    #[error("Output error: {0}")]
    Output(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error means the input could not be opened as a document.
    pub fn is_input_format(&self) -> bool {
        matches!(
            self,
            Error::UnknownFormat | Error::UnsupportedVersion(_) | Error::PdfParse(_) | Error::Encrypted
        )
    }

    /// Whether this error belongs to a single page's extraction attempt.
    pub fn is_page_level(&self) -> bool {
        matches!(
            self,
            Error::TextExtract(_) | Error::Render(_) | Error::Ocr(_) | Error::PageOutOfRange(..)
        )
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Render(err.to_string())
    }
}

#[cfg(feature = "archive")]
impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Error::Io(e),
            _ => Error::Output(err.to_string()),
        }
    }
}
