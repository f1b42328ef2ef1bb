//! [`PageSource`] backed by lopdf.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Read;
use std::path::Path;

use lopdf::content::Content;
use lopdf::{dictionary, Dictionary, Document as LopdfDocument, Object, ObjectId};

use super::text::{decode_text_simple, TextFragments};
use super::{PageSource, TextGranularity};
use crate::detect::{detect_format_from_bytes, detect_format_from_path};
use crate::error::{Error, Result};

/// An opened, read-only PDF document.
#[derive(Debug, Clone)]
pub struct PdfDocument {
    doc: LopdfDocument,
    pages: BTreeMap<u32, ObjectId>,
}

impl PdfDocument {
    /// Open a PDF file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        detect_format_from_path(path)?;
        let doc = LopdfDocument::load(path).map_err(load_error)?;
        Self::from_lopdf(doc)
    }

    /// Open a PDF from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        detect_format_from_bytes(data)?;
        let doc = LopdfDocument::load_mem(data).map_err(load_error)?;
        Self::from_lopdf(doc)
    }

    /// Open a PDF from a reader.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(&data)
    }

    fn from_lopdf(doc: LopdfDocument) -> Result<Self> {
        if doc.is_encrypted() {
            log::warn!("Document is encrypted; text extraction may be incomplete");
        }
        let pages = doc.get_pages();
        log::debug!("Opened PDF {} with {} pages", doc.version, pages.len());
        Ok(Self { doc, pages })
    }

    /// PDF version string.
    pub fn version(&self) -> &str {
        &self.doc.version
    }

    fn page_id(&self, page: u32) -> Result<ObjectId> {
        self.pages
            .get(&page)
            .copied()
            .ok_or(Error::PageOutOfRange(page, self.page_count()))
    }

    fn plain_text(&self, page: u32) -> Result<String> {
        self.doc
            .extract_text(&[page])
            .map_err(|e| Error::TextExtract(format!("Page {}: {}", page, e)))
    }

    fn fragments(&self, page: u32) -> Result<TextFragments> {
        let page_id = self.page_id(page)?;
        let fonts = self
            .doc
            .get_page_fonts(page_id)
            .map_err(|e| Error::TextExtract(format!("Page {}: {}", page, e)))?;
        let data = self
            .doc
            .get_page_content(page_id)
            .map_err(|e| Error::TextExtract(format!("Page {}: {}", page, e)))?;
        let content = Content::decode(&data)
            .map_err(|e| Error::TextExtract(format!("Page {}: {}", page, e)))?;

        Ok(TextFragments::from_operations(
            &content.operations,
            |font_name, bytes| {
                fonts
                    .get(font_name)
                    .and_then(|font| font.get_font_encoding(&self.doc).ok())
                    .and_then(|enc| LopdfDocument::decode_text(&enc, bytes).ok())
                    .unwrap_or_else(|| decode_text_simple(bytes))
            },
        ))
    }
}

impl PageSource for PdfDocument {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_text(&self, page: u32, granularity: TextGranularity) -> Result<String> {
        match granularity {
            TextGranularity::Plain => {
                self.page_id(page)?;
                self.plain_text(page)
            }
            TextGranularity::Words => Ok(self.fragments(page)?.words()),
            TextGranularity::Blocks => Ok(self.fragments(page)?.blocks()),
        }
    }

    fn single_page(&self, page: u32) -> Result<Vec<u8>> {
        let page_id = self.page_id(page)?;
        let mut single = copy_page(&self.doc, page_id)
            .map_err(|e| Error::Output(format!("Page {}: {}", page, e)))?;

        let mut out = Vec::new();
        single
            .save_to(&mut out)
            .map_err(|e| Error::Output(format!("Page {}: {}", page, e)))?;
        Ok(out)
    }
}

/// Page attributes a page may inherit from its ancestor `Pages` nodes.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Build a one-page document holding `page_id` and only the objects it reaches.
///
/// Inherited attributes are resolved onto the copied page. References to other
/// page tree nodes (annotation targets, link destinations) become null.
fn copy_page(source: &LopdfDocument, page_id: ObjectId) -> lopdf::Result<LopdfDocument> {
    let mut page = source.get_dictionary(page_id)?.clone();

    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut visited = HashSet::new();
    while let Some(node_id) = parent {
        if !visited.insert(node_id) {
            break;
        }
        let Ok(node) = source.get_dictionary(node_id) else {
            break;
        };
        for key in INHERITABLE {
            if !page.has(key) {
                if let Ok(value) = node.get(key) {
                    page.set(key, value.clone());
                }
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    page.remove(b"Parent");

    let mut copier = PageCopier::new(source);
    let pages_id = copier.target.new_object_id();
    let new_page_id = copier.target.new_object_id();
    copier.ids.insert(page_id, new_page_id);

    let mut page = copier.map_dictionary(&page);
    copier.drain();
    page.set("Parent", pages_id);

    let mut target = copier.target;
    target.objects.insert(new_page_id, Object::Dictionary(page));
    target.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![new_page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = target.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    target.trailer.set("Root", catalog_id);
    Ok(target)
}

/// Copies objects out of a source document, renumbering them on the way.
struct PageCopier<'a> {
    source: &'a LopdfDocument,
    target: LopdfDocument,
    ids: HashMap<ObjectId, ObjectId>,
    queue: Vec<(ObjectId, ObjectId)>,
}

impl<'a> PageCopier<'a> {
    fn new(source: &'a LopdfDocument) -> Self {
        Self {
            source,
            target: LopdfDocument::with_version(source.version.clone()),
            ids: HashMap::new(),
            queue: Vec::new(),
        }
    }

    /// Copy every object queued by earlier mapping, and whatever those reach.
    fn drain(&mut self) {
        let source = self.source;
        while let Some((old, new)) = self.queue.pop() {
            let object = match source.get_object(old) {
                Ok(object) => self.map(object),
                Err(_) => Object::Null,
            };
            self.target.objects.insert(new, object);
        }
    }

    fn map(&mut self, object: &Object) -> Object {
        match object {
            Object::Reference(id) => self.map_reference(*id),
            Object::Array(items) => Object::Array(items.iter().map(|o| self.map(o)).collect()),
            Object::Dictionary(dict) => Object::Dictionary(self.map_dictionary(dict)),
            Object::Stream(stream) => {
                let mut stream = stream.clone();
                stream.dict = self.map_dictionary(&stream.dict);
                Object::Stream(stream)
            }
            other => other.clone(),
        }
    }

    fn map_dictionary(&mut self, dict: &Dictionary) -> Dictionary {
        let mut mapped = Dictionary::new();
        for (key, value) in dict.iter() {
            mapped.set(key.clone(), self.map(value));
        }
        mapped
    }

    fn map_reference(&mut self, old: ObjectId) -> Object {
        if let Some(&new) = self.ids.get(&old) {
            return Object::Reference(new);
        }
        match self.source.get_object(old) {
            Ok(object) if !is_page_tree_node(object) => {
                let new = self.target.new_object_id();
                self.ids.insert(old, new);
                self.queue.push((old, new));
                Object::Reference(new)
            }
            _ => Object::Null,
        }
    }
}

fn is_page_tree_node(object: &Object) -> bool {
    match object {
        Object::Dictionary(dict) => matches!(
            dict.get(b"Type").and_then(Object::as_name),
            Ok(b"Page") | Ok(b"Pages")
        ),
        _ => false,
    }
}

/// Anything lopdf rejects after the header check is an input-format error.
fn load_error(err: lopdf::Error) -> Error {
    match err {
        lopdf::Error::Decryption(_) => Error::Encrypted,
        _ => Error::PdfParse(err.to_string()),
    }
}
