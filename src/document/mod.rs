//! Document access layer.
//!
//! Provides a trait-based interface for the page operations the splitter
//! needs, isolating the concrete PDF library (lopdf) from the pipeline.

mod pdf;
mod text;

pub use pdf::PdfDocument;
pub use text::{decode_text_simple, TextFragments};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Granularity at which page text is extracted.
///
/// PDF producers do not populate every granularity equally well, so the
/// splitter combines several of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextGranularity {
    /// The library's plain text rendering of the page.
    Plain,
    /// Individual shown strings split on whitespace, joined by spaces.
    Words,
    /// Text objects (`BT`..`ET`), one per line.
    Blocks,
}

impl TextGranularity {
    /// All granularities, richest combination first.
    pub const ALL: [TextGranularity; 3] = [
        TextGranularity::Plain,
        TextGranularity::Words,
        TextGranularity::Blocks,
    ];
}

impl std::fmt::Display for TextGranularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            TextGranularity::Plain => "plain",
            TextGranularity::Words => "words",
            TextGranularity::Blocks => "blocks",
        })
    }
}

/// Abstract interface for a paged document.
///
/// Page numbers are 1-based, matching PDF page labels. Implementations must
/// be shareable between threads so pages can be extracted in parallel.
pub trait PageSource: Sync {
    /// Number of pages in the document.
    fn page_count(&self) -> u32;

    /// Extract the text of a page at the given granularity.
    fn page_text(&self, page: u32, granularity: TextGranularity) -> Result<String>;

    /// Copy exactly one page into a new, standalone PDF.
    fn single_page(&self, page: u32) -> Result<Vec<u8>>;
}
