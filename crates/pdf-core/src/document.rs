//! PDF document assembly

use crate::canvas::Canvas;
use crate::font::FontHandle;
use crate::{PdfError, Result};
use chrono::{DateTime, FixedOffset};
use flate2::{write::ZlibEncoder, Compression};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::{BTreeSet, HashMap};
use std::io::Write;
use std::path::Path;

/// RGB Color (values 0.0 - 1.0)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    /// Create a new RGB color (values 0.0 - 1.0)
    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Create color from RGB values (0-255)
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f64 / 255.0,
            g: g as f64 / 255.0,
            b: b as f64 / 255.0,
        }
    }

    /// Parse `#rrggbb`
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#')?;
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self::from_rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn black() -> Self {
        Self::rgb(0.0, 0.0, 0.0)
    }

    /// `#808080`
    pub fn grey() -> Self {
        Self::from_rgb(0x80, 0x80, 0x80)
    }

    pub fn darkblue() -> Self {
        Self::from_rgb(0x00, 0x00, 0x8B)
    }

    pub fn darkred() -> Self {
        Self::from_rgb(0x8B, 0x00, 0x00)
    }

    pub fn darkslategray() -> Self {
        Self::from_rgb(0x2F, 0x4F, 0x4F)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::black()
    }
}

/// Document information dictionary entries
#[derive(Debug, Clone, Default)]
pub struct DocumentInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub creation_date: Option<DateTime<FixedOffset>>,
}

/// Encode a text string, UTF-16BE with BOM when it is not plain ASCII
fn text_string(value: &str) -> Object {
    if value.is_ascii() {
        return Object::string_literal(value);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in value.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Format a date as `D:YYYYMMDDHHmmSS+HH'mm'`
fn pdf_date(date: &DateTime<FixedOffset>) -> String {
    let offset = date.format("%:z").to_string().replace(':', "'");
    format!("{}{offset}'", date.format("D:%Y%m%d%H%M%S"))
}

impl DocumentInfo {
    fn to_dictionary(&self) -> Dictionary {
        let mut dict = Dictionary::new();
        let fields = [
            ("Title", &self.title),
            ("Author", &self.author),
            ("Subject", &self.subject),
            ("Creator", &self.creator),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                dict.set(key, text_string(value));
            }
        }
        dict.set("Producer", Object::string_literal("pdf-factory"));
        if let Some(date) = &self.creation_date {
            dict.set("CreationDate", Object::string_literal(pdf_date(date)));
        }
        dict
    }
}

/// A font used somewhere in the document, written when the document is finished
struct DocumentFont {
    id: ObjectId,
    font: FontHandle,
    used_chars: BTreeSet<char>,
}

/// A PDF document built page by page
///
/// Pages are written as soon as they are added. Fonts are only referenced
/// by a reserved object id until the document is finished, because their
/// widths and ToUnicode maps depend on every page.
pub struct PdfDocument {
    /// The underlying lopdf document
    inner: Document,
    /// Reserved id of the page tree root
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
    fonts: Vec<DocumentFont>,
    /// Written XObjects (content hash -> PDF object ID)
    xobjects: HashMap<u64, ObjectId>,
    info: DocumentInfo,
}

impl Default for PdfDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfDocument {
    pub fn new() -> Self {
        let mut inner = Document::with_version("1.7");
        let pages_id = inner.new_object_id();
        Self {
            inner,
            pages_id,
            page_ids: Vec::new(),
            fonts: Vec::new(),
            xobjects: HashMap::new(),
            info: DocumentInfo::default(),
        }
    }

    pub fn set_info(&mut self, info: DocumentInfo) {
        self.info = info;
    }

    /// Get the number of pages
    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn font_id(&mut self, font: &FontHandle, chars: &BTreeSet<char>) -> ObjectId {
        if let Some(entry) = self.fonts.iter_mut().find(|f| f.font.name() == font.name()) {
            entry.used_chars.extend(chars.iter().copied());
            return entry.id;
        }
        let id = self.inner.new_object_id();
        self.fonts.push(DocumentFont {
            id,
            font: FontHandle::clone(font),
            used_chars: chars.clone(),
        });
        id
    }

    /// Append a page of the given size painted by `canvas`
    ///
    /// # Returns
    /// The 1-based number of the new page
    pub fn add_page(&mut self, width: f64, height: f64, canvas: Canvas) -> Result<usize> {
        let mut font_resources = Dictionary::new();
        for (i, (font, chars)) in canvas.fonts.iter().zip(&canvas.used_chars).enumerate() {
            let id = self.font_id(font, chars);
            font_resources.set(format!("F{}", i + 1), Object::Reference(id));
        }

        let mut xobject_resources = Dictionary::new();
        for (i, xobject) in canvas.xobjects.iter().enumerate() {
            let key = xobject.key();
            let id = match self.xobjects.get(&key) {
                Some(id) => *id,
                None => {
                    let id = self.inner.add_object(xobject.to_pdf_stream());
                    self.xobjects.insert(key, id);
                    id
                }
            };
            xobject_resources.set(format!("X{}", i + 1), Object::Reference(id));
        }

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(canvas.content())?;
        let content = Stream::new(
            Dictionary::from_iter(vec![("Filter", Object::Name(b"FlateDecode".to_vec()))]),
            encoder.finish()?,
        )
        .with_compression(false);
        let content_id = self.inner.add_object(content);

        let mut resources = Dictionary::new();
        resources.set("Font", font_resources);
        resources.set("XObject", xobject_resources);

        let page = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(self.pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(width as _),
                    Object::Real(height as _),
                ]),
            ),
            ("Contents", Object::Reference(content_id)),
            ("Resources", Object::Dictionary(resources)),
        ]);
        self.page_ids.push(self.inner.add_object(page));

        Ok(self.page_ids.len())
    }

    /// Write fonts, the page tree and the catalog
    fn finish(mut self) -> Result<Document> {
        if self.page_ids.is_empty() {
            return Err(PdfError::SaveError("document has no pages".to_string()));
        }

        for entry in std::mem::take(&mut self.fonts) {
            self.write_font(entry)?;
        }

        log::debug!("Finishing document with {} pages", self.page_ids.len());
        let kids = self.page_ids.iter().map(|id| Object::Reference(*id)).collect();
        let pages = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(self.page_ids.len() as i64)),
        ]);
        self.inner.objects.insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.inner.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(self.pages_id)),
        ]));
        self.inner.trailer.set("Root", Object::Reference(catalog_id));

        let info_id = self.inner.add_object(self.info.to_dictionary());
        self.inner.trailer.set("Info", Object::Reference(info_id));

        Ok(self.inner)
    }

    /// Write a font's objects, the Type0 dictionary at its reserved id
    fn write_font(&mut self, entry: DocumentFont) -> Result<()> {
        log::debug!(
            "Writing font {} ({} characters used, embedded: {})",
            entry.font.name(),
            entry.used_chars.len(),
            entry.font.is_embedded()
        );
        let objects = entry.font.to_pdf_objects(&entry.used_chars)?;

        let mut font_descriptor = objects.font_descriptor;
        if let Some(file) = objects.font_file_stream {
            let file_id = self.inner.add_object(file);
            font_descriptor.set("FontFile2", Object::Reference(file_id));
        }
        let font_descriptor_id = self.inner.add_object(font_descriptor);

        let mut cid_font = objects.cid_font;
        cid_font.set("FontDescriptor", Object::Reference(font_descriptor_id));
        let cid_font_id = self.inner.add_object(cid_font);

        let mut type0_font = objects.type0_font;
        type0_font.set(
            "DescendantFonts",
            Object::Array(vec![Object::Reference(cid_font_id)]),
        );
        if let Some(tounicode) = objects.tounicode_stream {
            let tounicode_id = self.inner.add_object(tounicode);
            type0_font.set("ToUnicode", Object::Reference(tounicode_id));
        }

        self.inner
            .objects
            .insert(entry.id, Object::Dictionary(type0_font));
        Ok(())
    }

    /// Finish the document and serialize it
    pub fn to_bytes(self) -> Result<Vec<u8>> {
        let mut document = self.finish()?;
        let mut buffer = Vec::new();
        document
            .save_to(&mut buffer)
            .map_err(|e| PdfError::SaveError(e.to_string()))?;
        Ok(buffer)
    }

    /// Finish the document and write it to a file
    pub fn save<P: AsRef<Path>>(self, path: P) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}
