//! Word- and block-level text collection from content stream operations.

use lopdf::content::Operation;
use lopdf::Object;

/// TJ adjustments larger than this (in 1/1000 text space units) are treated
/// as word gaps.
const TJ_SPACE_THRESHOLD: f32 = 200.0;

/// Text shown on a page, grouped by text object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextFragments {
    blocks: Vec<String>,
}

impl TextFragments {
    /// Collect shown text from decoded content stream operations.
    ///
    /// `decode` receives the current font resource name and the raw string
    /// bytes and returns the decoded text.
    pub fn from_operations<F>(operations: &[Operation], decode: F) -> Self
    where
        F: Fn(&[u8], &[u8]) -> String,
    {
        let mut blocks = Vec::new();
        let mut current = String::new();
        let mut font: Vec<u8> = Vec::new();

        for op in operations {
            match op.operator.as_str() {
                "BT" => {
                    flush(&mut blocks, &mut current);
                }
                "ET" => {
                    flush(&mut blocks, &mut current);
                }
                "Tf" => {
                    if let Some(Object::Name(name)) = op.operands.first() {
                        font = name.clone();
                    }
                }
                "Tj" => {
                    if let Some(Object::String(bytes, _)) = op.operands.first() {
                        push_text(&mut current, &decode(&font, bytes));
                    }
                }
                "'" | "\"" => {
                    let text_idx = if op.operator == "\"" { 2 } else { 0 };
                    if let Some(Object::String(bytes, _)) = op.operands.get(text_idx) {
                        push_separator(&mut current);
                        push_text(&mut current, &decode(&font, bytes));
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = op.operands.first() {
                        for item in items {
                            match item {
                                Object::String(bytes, _) => {
                                    push_text(&mut current, &decode(&font, bytes));
                                }
                                Object::Integer(n) if -(*n as f32) > TJ_SPACE_THRESHOLD => {
                                    push_separator(&mut current);
                                }
                                Object::Real(n) if -*n > TJ_SPACE_THRESHOLD => {
                                    push_separator(&mut current);
                                }
                                _ => {}
                            }
                        }
                    }
                }
                "Td" | "TD" | "T*" | "Tm" => {
                    push_separator(&mut current);
                }
                _ => {}
            }
        }
        flush(&mut blocks, &mut current);

        Self { blocks }
    }

    /// Every word on the page, space-separated.
    pub fn words(&self) -> String {
        self.blocks
            .iter()
            .flat_map(|b| b.split_whitespace())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// One line per text object.
    pub fn blocks(&self) -> String {
        self.blocks.join("\n")
    }

    /// Number of non-empty text objects.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Whether no text was shown.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

fn push_text(current: &mut String, text: &str) {
    current.push_str(text);
}

fn push_separator(current: &mut String) {
    if !current.is_empty() && !current.ends_with(char::is_whitespace) {
        current.push(' ');
    }
}

fn flush(blocks: &mut Vec<String>, current: &mut String) {
    let text = current.trim();
    if !text.is_empty() {
        blocks.push(text.to_string());
    }
    current.clear();
}

/// Simple text decoding fallback when no font encoding is available.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    // UTF-16BE with BOM
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // Latin-1
    bytes.iter().map(|&b| b as char).collect()
}
