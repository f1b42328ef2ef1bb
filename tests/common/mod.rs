//! Shared fixtures: synthesized PDFs and OCR test doubles.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use image::{DynamicImage, GrayImage, Luma};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use ordersplit::{
    Error, OcrBackend, OcrEngine, PageSource, PdfDocument, Rasterizer, Result, TextGranularity,
};

/// Build a PDF with one page per entry; each page shows its entry as a
/// single line of Courier text. An empty entry gives a page with no text.
pub fn build_pdf(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let mut operations = Vec::new();
        if !text.is_empty() {
            operations = vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ];
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).expect("save pdf");
    out
}

/// Write a synthesized PDF into `dir`.
pub fn write_pdf(dir: &Path, name: &str, pages: &[&str]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, build_pdf(pages)).expect("write pdf");
    path
}

/// Plain text of the only page of a split output file.
pub fn single_page_text(data: &[u8]) -> String {
    let doc = PdfDocument::from_bytes(data).expect("output is a PDF");
    assert_eq!(doc.page_count(), 1, "output must hold exactly one page");
    doc.page_text(1, TextGranularity::Plain).expect("page text")
}

/// "Renders" a page as a 1-pixel-high strip whose width is the `N` of a
/// `scan-N` marker on the page (1 when there is none).
pub struct MarkerRasterizer {
    pub calls: AtomicUsize,
}

impl MarkerRasterizer {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

impl Rasterizer for MarkerRasterizer {
    fn render(&self, page_pdf: &[u8], _scale: f32) -> Result<DynamicImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let doc = PdfDocument::from_bytes(page_pdf)?;
        let text = doc.page_text(1, TextGranularity::Words)?;
        let marker = text
            .split_whitespace()
            .find_map(|w| w.strip_prefix("scan-")?.parse::<u32>().ok())
            .unwrap_or(1);
        Ok(DynamicImage::ImageLuma8(GrayImage::from_pixel(
            marker,
            1,
            Luma([0]),
        )))
    }
}

/// Answers recognition requests from a table keyed by image width.
///
/// Widths without an entry recognize nothing; `Err` entries simulate an
/// engine crash.
pub struct ScriptedEngine {
    pub answers: HashMap<u32, std::result::Result<String, String>>,
    pub calls: AtomicUsize,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self {
            answers: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn answer(mut self, marker: u32, text: &str) -> Self {
        self.answers.insert(marker, Ok(text.to_string()));
        self
    }

    pub fn fail(mut self, marker: u32, message: &str) -> Self {
        self.answers.insert(marker, Err(message.to_string()));
        self
    }
}

impl OcrEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    fn recognize(&self, image: &GrayImage, _language: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.answers.get(&image.width()) {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err(message)) => Err(Error::Ocr(message.clone())),
            None => Ok(String::new()),
        }
    }
}

/// Pair the doubles into a backend, keeping handles for call counts.
pub fn scripted_backend(
    engine: ScriptedEngine,
) -> (OcrBackend, Arc<MarkerRasterizer>, Arc<ScriptedEngine>) {
    let rasterizer = Arc::new(MarkerRasterizer::new());
    let engine = Arc::new(engine);
    let backend = OcrBackend::new(rasterizer.clone(), engine.clone());
    (backend, rasterizer, engine)
}
