//! Font handling for PDF documents
//!
//! Two kinds of fonts are supported:
//! - TrueType fonts, embedded whole as `CIDFontType2` with `Identity-H`
//!   encoding (glyph IDs are written directly into the content stream)
//! - Built-in CJK CID fonts, which every conforming reader ships with and
//!   which are only referenced by name with a UCS-2 CMap

use crate::{PdfError, Result};
use flate2::{write::ZlibEncoder, Compression};
use lopdf::{Dictionary, Object, Stream};
use std::collections::BTreeSet;
use std::io::Write;
use std::sync::Arc;

/// A registered font shared by styles and canvases
pub type FontHandle = Arc<FontData>;

/// Description of a CID font that readers provide without embedding
#[derive(Debug)]
pub struct CidFontInfo {
    /// PostScript name of the font
    pub name: &'static str,
    /// Character collection ordering (GB1, CNS1, Japan1, Korea1)
    pub ordering: &'static str,
    /// Character collection supplement
    pub supplement: i64,
    /// UCS-2 CMap used to encode text
    pub encoding: &'static str,
    /// Ascent in 1/1000 em
    pub ascent: i64,
    /// Descent in 1/1000 em
    pub descent: i64,
    /// Font bounding box in 1/1000 em
    pub bbox: [i64; 4],
    /// Dominant vertical stem width
    pub stem_v: i64,
}

/// The built-in CID fonts that can be registered by name
pub const BUILTIN_CID_FONTS: &[CidFontInfo] = &[
    CidFontInfo {
        name: "STSong-Light",
        ordering: "GB1",
        supplement: 2,
        encoding: "UniGB-UCS2-H",
        ascent: 880,
        descent: -120,
        bbox: [-25, -254, 1000, 880],
        stem_v: 93,
    },
    CidFontInfo {
        name: "MSung-Light",
        ordering: "CNS1",
        supplement: 1,
        encoding: "UniCNS-UCS2-H",
        ascent: 880,
        descent: -120,
        bbox: [-160, -259, 1015, 888],
        stem_v: 93,
    },
    CidFontInfo {
        name: "HeiseiMin-W3",
        ordering: "Japan1",
        supplement: 2,
        encoding: "UniJIS-UCS2-H",
        ascent: 723,
        descent: -241,
        bbox: [-123, -257, 1001, 910],
        stem_v: 69,
    },
    CidFontInfo {
        name: "HYSMyeongJo-Medium",
        ordering: "Korea1",
        supplement: 1,
        encoding: "UniKS-UCS2-H",
        ascent: 880,
        descent: -120,
        bbox: [0, -148, 1001, 880],
        stem_v: 58,
    },
];

/// Where the glyphs of a font come from
#[derive(Debug, Clone)]
enum FontSource {
    /// Standalone TrueType data with cached metrics
    TrueType {
        ttf_data: Vec<u8>,
        units_per_em: u16,
        ascender: i16,
        descender: i16,
        bbox: [i16; 4],
        cap_height: i16,
    },
    /// A reader-provided CID font
    BuiltinCid(&'static CidFontInfo),
}

/// A font registered under a name
#[derive(Debug, Clone)]
pub struct FontData {
    /// Font name/identifier
    name: String,
    source: FontSource,
}

/// PDF objects generated for a font
pub struct FontObjects {
    /// Type0 font dictionary
    pub type0_font: Dictionary,
    /// Descendant CIDFont dictionary
    pub cid_font: Dictionary,
    /// Font descriptor dictionary
    pub font_descriptor: Dictionary,
    /// Font file stream (TrueType data), absent for built-in fonts
    pub font_file_stream: Option<Stream>,
    /// ToUnicode CMap stream, absent for built-in fonts
    pub tounicode_stream: Option<Stream>,
}

impl FontData {
    /// Create font data from TrueType bytes
    ///
    /// Font collections (`.ttc`) are accepted; their first face is extracted
    /// into a standalone font. Fonts with CFF outlines are rejected since
    /// they cannot be embedded as `FontFile2`.
    ///
    /// # Arguments
    /// * `name` - Font identifier
    /// * `ttf_data` - TrueType font or collection bytes
    pub fn from_ttf(name: &str, ttf_data: &[u8]) -> Result<Self> {
        let data = if let Some(count) = ttf_parser::fonts_in_collection(ttf_data) {
            log::debug!("{name} is a collection of {count} faces, using the first");
            extract_collection_face(ttf_data, 0)?
        } else {
            ttf_data.to_vec()
        };

        let face = ttf_parser::Face::parse(&data, 0)
            .map_err(|e| PdfError::FontParseError(format!("{name}: {e:?}")))?;

        if face.tables().glyf.is_none() {
            return Err(PdfError::UnsupportedFont(format!(
                "{name} has no TrueType outlines"
            )));
        }

        let rect = face.global_bounding_box();
        let units_per_em = face.units_per_em();
        let ascender = face.ascender();
        let descender = face.descender();
        let cap_height = face.capital_height().unwrap_or(ascender);

        Ok(Self {
            name: name.to_string(),
            source: FontSource::TrueType {
                units_per_em,
                ascender,
                descender,
                bbox: [rect.x_min, rect.y_min, rect.x_max, rect.y_max],
                cap_height,
                ttf_data: data,
            },
        })
    }

    /// Reference one of the [`BUILTIN_CID_FONTS`] by name
    pub fn builtin_cid(name: &str) -> Result<Self> {
        let info = BUILTIN_CID_FONTS
            .iter()
            .find(|info| info.name == name)
            .ok_or_else(|| PdfError::UnknownCidFont(name.to_string()))?;

        Ok(Self {
            name: name.to_string(),
            source: FontSource::BuiltinCid(info),
        })
    }

    /// The registered name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the font program is embedded into the document
    pub fn is_embedded(&self) -> bool {
        matches!(self.source, FontSource::TrueType { .. })
    }

    fn face(&self) -> Option<ttf_parser::Face<'_>> {
        match &self.source {
            FontSource::TrueType { ttf_data, .. } => ttf_parser::Face::parse(ttf_data, 0).ok(),
            FontSource::BuiltinCid(_) => None,
        }
    }

    /// Get glyph ID for a character (TrueType fonts only)
    pub fn glyph_id(&self, c: char) -> Option<u16> {
        self.face()
            .and_then(|face| face.glyph_index(c).map(|id| id.0))
    }

    /// Check if font has a glyph for the given character
    pub fn has_glyph(&self, c: char) -> bool {
        match &self.source {
            FontSource::TrueType { .. } => self.glyph_id(c).map(|id| id != 0).unwrap_or(false),
            FontSource::BuiltinCid(_) => (c as u32) <= 0xFFFF,
        }
    }

    /// Ascent in 1/1000 em
    pub fn ascent(&self) -> f64 {
        match &self.source {
            FontSource::TrueType {
                ascender,
                units_per_em,
                ..
            } => *ascender as f64 * 1000.0 / *units_per_em as f64,
            FontSource::BuiltinCid(info) => info.ascent as f64,
        }
    }

    /// Descent in 1/1000 em (negative below the baseline)
    pub fn descent(&self) -> f64 {
        match &self.source {
            FontSource::TrueType {
                descender,
                units_per_em,
                ..
            } => *descender as f64 * 1000.0 / *units_per_em as f64,
            FontSource::BuiltinCid(info) => info.descent as f64,
        }
    }

    /// Width of a built-in CID glyph in 1/1000 em
    fn cid_width(c: char) -> u32 {
        if (' '..='~').contains(&c) {
            500
        } else {
            1000
        }
    }

    /// Calculate text width in 1/1000 em
    pub fn text_width(&self, text: &str) -> u32 {
        match &self.source {
            FontSource::TrueType { units_per_em, .. } => {
                let Some(face) = self.face() else {
                    return 0;
                };
                let upm = *units_per_em as f64;
                text.chars()
                    .map(|c| {
                        let gid = face.glyph_index(c).unwrap_or(ttf_parser::GlyphId(0));
                        let advance = face.glyph_hor_advance(gid).unwrap_or(0) as f64;
                        (advance * 1000.0 / upm).round() as u32
                    })
                    .sum()
            }
            FontSource::BuiltinCid(_) => text.chars().map(Self::cid_width).sum(),
        }
    }

    /// Calculate text width in points for a given font size
    pub fn text_width_points(&self, text: &str, font_size: f64) -> f64 {
        self.text_width(text) as f64 * font_size / 1000.0
    }

    /// Encode text as hex string for PDF Tj operator
    ///
    /// TrueType fonts are written as glyph IDs, built-in CID fonts as UCS-2
    /// code units (characters outside the BMP become `?`).
    pub fn encode_text_hex(&self, text: &str) -> String {
        let mut result = String::with_capacity(text.len() * 4 + 2);
        result.push('<');
        match &self.source {
            FontSource::TrueType { .. } => {
                let face = self.face();
                for c in text.chars() {
                    let gid = face
                        .as_ref()
                        .and_then(|face| face.glyph_index(c))
                        .map(|id| id.0)
                        .unwrap_or(0);
                    result.push_str(&format!("{gid:04X}"));
                }
            }
            FontSource::BuiltinCid(_) => {
                for c in text.chars() {
                    let code = if (c as u32) <= 0xFFFF { c as u32 } else { '?' as u32 };
                    result.push_str(&format!("{code:04X}"));
                }
            }
        }
        result.push('>');
        result
    }

    /// Generate all PDF objects needed to use this font
    ///
    /// Object references between the returned dictionaries are left as
    /// placeholders and are wired up when the font is written.
    ///
    /// # Arguments
    /// * `used_chars` - Characters painted with this font in the document
    pub fn to_pdf_objects(&self, used_chars: &BTreeSet<char>) -> Result<FontObjects> {
        match &self.source {
            FontSource::TrueType { .. } => self.truetype_objects(used_chars),
            FontSource::BuiltinCid(info) => Ok(Self::cid_objects(info)),
        }
    }

    fn truetype_objects(&self, used_chars: &BTreeSet<char>) -> Result<FontObjects> {
        let FontSource::TrueType {
            ttf_data,
            units_per_em,
            ascender,
            descender,
            bbox,
            cap_height,
        } = &self.source
        else {
            return Err(PdfError::UnsupportedFont(self.name.clone()));
        };

        let scale = |v: i16| -> i64 { (v as f64 * 1000.0 / *units_per_em as f64).round() as i64 };
        let font_name = Object::Name(self.base_font_name().into_bytes());

        let tounicode_content = self.generate_tounicode_cmap(used_chars);
        let tounicode_stream = Stream::new(Dictionary::new(), tounicode_content.into_bytes());

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(ttf_data)?;
        let compressed = encoder.finish()?;
        let font_file_stream = Stream::new(
            Dictionary::from_iter(vec![
                ("Length1", Object::Integer(ttf_data.len() as i64)),
                ("Filter", Object::Name(b"FlateDecode".to_vec())),
            ]),
            compressed,
        );

        let font_bbox: Vec<Object> = bbox.iter().map(|v| Object::Integer(scale(*v))).collect();
        let font_descriptor = Dictionary::from_iter(vec![
            ("Type", "FontDescriptor".into()),
            ("FontName", font_name.clone()),
            ("Flags", 4.into()), // Symbolic font
            ("FontBBox", Object::Array(font_bbox)),
            ("ItalicAngle", 0.into()),
            ("Ascent", Object::Integer(scale(*ascender))),
            ("Descent", Object::Integer(scale(*descender))),
            ("CapHeight", Object::Integer(scale(*cap_height))),
            ("StemV", 80.into()),
            ("FontFile2", Object::Reference((0, 0))),
        ]);

        let cid_system_info = Dictionary::from_iter(vec![
            ("Registry", Object::string_literal("Adobe")),
            ("Ordering", Object::string_literal("Identity")),
            ("Supplement", 0.into()),
        ]);

        let cid_font = Dictionary::from_iter(vec![
            ("Type", "Font".into()),
            ("Subtype", "CIDFontType2".into()),
            ("BaseFont", font_name.clone()),
            ("CIDSystemInfo", cid_system_info.into()),
            ("FontDescriptor", Object::Reference((0, 0))),
            ("CIDToGIDMap", "Identity".into()),
            ("W", self.generate_widths_array(used_chars).into()),
            ("DW", 1000.into()),
        ]);

        let type0_font = Dictionary::from_iter(vec![
            ("Type", "Font".into()),
            ("Subtype", "Type0".into()),
            ("BaseFont", font_name),
            ("Encoding", "Identity-H".into()),
            ("DescendantFonts", vec![Object::Reference((0, 0))].into()),
            ("ToUnicode", Object::Reference((0, 0))),
        ]);

        Ok(FontObjects {
            type0_font,
            cid_font,
            font_descriptor,
            font_file_stream: Some(font_file_stream),
            tounicode_stream: Some(tounicode_stream),
        })
    }

    fn cid_objects(info: &CidFontInfo) -> FontObjects {
        let font_name = Object::Name(info.name.as_bytes().to_vec());

        let font_descriptor = Dictionary::from_iter(vec![
            ("Type", "FontDescriptor".into()),
            ("FontName", font_name.clone()),
            ("Flags", 6.into()),
            (
                "FontBBox",
                Object::Array(info.bbox.iter().map(|v| Object::Integer(*v)).collect()),
            ),
            ("ItalicAngle", 0.into()),
            ("Ascent", Object::Integer(info.ascent)),
            ("Descent", Object::Integer(info.descent)),
            ("CapHeight", Object::Integer(info.ascent)),
            ("StemV", Object::Integer(info.stem_v)),
        ]);

        let cid_system_info = Dictionary::from_iter(vec![
            ("Registry", Object::string_literal("Adobe")),
            ("Ordering", Object::string_literal(info.ordering)),
            ("Supplement", Object::Integer(info.supplement)),
        ]);

        // Half-width proportional Latin occupies CIDs 1-95 in every collection
        let widths = vec![
            Object::Integer(1),
            Object::Integer(95),
            Object::Integer(500),
        ];

        let cid_font = Dictionary::from_iter(vec![
            ("Type", "Font".into()),
            ("Subtype", "CIDFontType0".into()),
            ("BaseFont", font_name),
            ("CIDSystemInfo", cid_system_info.into()),
            ("FontDescriptor", Object::Reference((0, 0))),
            ("W", Object::Array(widths)),
            ("DW", 1000.into()),
        ]);

        let type0_font = Dictionary::from_iter(vec![
            ("Type", "Font".into()),
            ("Subtype", "Type0".into()),
            (
                "BaseFont",
                Object::Name(format!("{}-{}", info.name, info.encoding).into_bytes()),
            ),
            ("Encoding", Object::Name(info.encoding.as_bytes().to_vec())),
            ("DescendantFonts", vec![Object::Reference((0, 0))].into()),
        ]);

        FontObjects {
            type0_font,
            cid_font,
            font_descriptor,
            font_file_stream: None,
            tounicode_stream: None,
        }
    }

    /// PostScript-safe name for the embedded font
    fn base_font_name(&self) -> String {
        self.name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
            .collect()
    }

    /// Generate /W array for glyph widths, scaled to 1/1000 em
    fn generate_widths_array(&self, used_chars: &BTreeSet<char>) -> Vec<Object> {
        let mut widths = Vec::new();
        let (Some(face), FontSource::TrueType { units_per_em, .. }) = (self.face(), &self.source)
        else {
            return widths;
        };

        let mut gids: Vec<u16> = used_chars
            .iter()
            .filter_map(|&c| face.glyph_index(c).map(|id| id.0))
            .collect();
        gids.sort();
        gids.dedup();

        // Individual mapping format: [gid1 [width1] gid2 [width2] ...]
        for gid in gids {
            let advance = face
                .glyph_hor_advance(ttf_parser::GlyphId(gid))
                .unwrap_or(*units_per_em) as f64;
            let width = (advance * 1000.0 / *units_per_em as f64).round() as i64;
            widths.push(Object::Integer(gid as i64));
            widths.push(vec![Object::Integer(width)].into());
        }

        widths
    }

    /// Generate ToUnicode CMap stream content
    fn generate_tounicode_cmap(&self, used_chars: &BTreeSet<char>) -> String {
        let mut cmap = String::new();

        cmap.push_str("/CIDInit /ProcSet findresource begin\n");
        cmap.push_str("12 dict begin\n");
        cmap.push_str("begincmap\n");
        cmap.push_str("/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
        cmap.push_str("/CMapName /Adobe-Identity-UCS def\n");
        cmap.push_str("/CMapType 2 def\n");
        cmap.push_str("1 begincodespacerange\n");
        cmap.push_str("<0000> <FFFF>\n");
        cmap.push_str("endcodespacerange\n");

        let face = self.face();
        let mappings: Vec<(u16, char)> = used_chars
            .iter()
            .map(|&c| {
                let gid = face
                    .as_ref()
                    .and_then(|face| face.glyph_index(c))
                    .map(|id| id.0)
                    .unwrap_or(0);
                (gid, c)
            })
            .collect();

        // At most 100 entries per bfchar section
        for chunk in mappings.chunks(100) {
            cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
            for (gid, c) in chunk {
                let mut units = [0u16; 2];
                let unicode: String = c
                    .encode_utf16(&mut units)
                    .iter()
                    .map(|u| format!("{u:04X}"))
                    .collect();
                cmap.push_str(&format!("<{gid:04X}> <{unicode}>\n"));
            }
            cmap.push_str("endbfchar\n");
        }

        cmap.push_str("endcmap\n");
        cmap.push_str("CMapName currentdict /CMap defineresource pop\n");
        cmap.push_str("end\n");
        cmap.push_str("end\n");

        cmap
    }
}

fn read_u16(data: &[u8], offset: usize) -> Result<u16> {
    data.get(offset..offset + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or_else(|| PdfError::FontParseError("truncated font collection".to_string()))
}

fn read_u32(data: &[u8], offset: usize) -> Result<u32> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| PdfError::FontParseError("truncated font collection".to_string()))
}

/// Copy one face of a TrueType collection into a standalone sfnt
///
/// The table directory is copied verbatim and table offsets are rewritten
/// to point into the new file; every table starts on a 4-byte boundary.
pub(crate) fn extract_collection_face(data: &[u8], index: u32) -> Result<Vec<u8>> {
    if data.get(0..4) != Some(b"ttcf".as_slice()) {
        return Err(PdfError::FontParseError("not a font collection".to_string()));
    }

    let num_fonts = read_u32(data, 8)?;
    if index >= num_fonts {
        return Err(PdfError::FontParseError(format!(
            "collection has {num_fonts} faces, face {index} requested"
        )));
    }

    let offset = read_u32(data, 12 + 4 * index as usize)? as usize;
    let num_tables = read_u16(data, offset + 4)? as usize;
    let header_len = 12 + 16 * num_tables;

    let mut out = data
        .get(offset..offset + header_len)
        .ok_or_else(|| PdfError::FontParseError("truncated table directory".to_string()))?
        .to_vec();
    let mut body = Vec::new();

    for i in 0..num_tables {
        let record = offset + 12 + 16 * i;
        let table_offset = read_u32(data, record + 8)? as usize;
        let length = read_u32(data, record + 12)? as usize;
        let table = data
            .get(table_offset..table_offset + length)
            .ok_or_else(|| PdfError::FontParseError("truncated font table".to_string()))?;

        let new_offset = (header_len + body.len()) as u32;
        out[12 + 16 * i + 8..12 + 16 * i + 12].copy_from_slice(&new_offset.to_be_bytes());

        body.extend_from_slice(table);
        while body.len() % 4 != 0 {
            body.push(0);
        }
    }

    out.extend_from_slice(&body);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn chars(text: &str) -> BTreeSet<char> {
        text.chars().collect()
    }

    /// A collection with one face holding two tables of 3 and 4 bytes
    fn synthetic_collection() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(b"ttcf");
        data.extend_from_slice(&0x0001_0000u32.to_be_bytes());
        data.extend_from_slice(&1u32.to_be_bytes());
        data.extend_from_slice(&16u32.to_be_bytes()); // face 0 at offset 16

        // sfnt header with two tables
        data.extend_from_slice(&0x0001_0000u32.to_be_bytes());
        data.extend_from_slice(&2u16.to_be_bytes());
        data.extend_from_slice(&[0; 6]);

        let first_table = 16 + 12 + 32;
        for (tag, offset, length) in [(b"aaaa", first_table, 3u32), (b"bbbb", first_table + 4, 4)] {
            data.extend_from_slice(tag);
            data.extend_from_slice(&0u32.to_be_bytes());
            data.extend_from_slice(&(offset as u32).to_be_bytes());
            data.extend_from_slice(&length.to_be_bytes());
        }

        data.extend_from_slice(&[1, 2, 3, 0]);
        data.extend_from_slice(&[4, 5, 6, 7]);
        data
    }

    #[test]
    fn test_builtin_cid_font() {
        let font = FontData::builtin_cid("STSong-Light").unwrap();
        assert_eq!(font.name(), "STSong-Light");
        assert!(!font.is_embedded());
        assert!(font.has_glyph('中'));
    }

    #[test]
    fn test_unknown_builtin_cid_font() {
        let result = FontData::builtin_cid("Helvetica-Chinese");
        assert!(matches!(result, Err(PdfError::UnknownCidFont(_))));
    }

    #[test]
    fn test_cid_text_width() {
        let font = FontData::builtin_cid("STSong-Light").unwrap();
        assert_eq!(font.text_width("ab"), 1000);
        assert_eq!(font.text_width("中文"), 2000);
        assert_eq!(font.text_width_points("第 1 页", 10.0), 35.0);
    }

    #[test]
    fn test_cid_encode_text_hex() {
        let font = FontData::builtin_cid("STSong-Light").unwrap();
        assert_eq!(font.encode_text_hex(""), "<>");
        assert_eq!(font.encode_text_hex("A中"), "<00414E2D>");
        assert_eq!(font.encode_text_hex("<b>"), "<003C0062003E>");
    }

    #[test]
    fn test_cid_pdf_objects() {
        let font = FontData::builtin_cid("STSong-Light").unwrap();
        let objects = font.to_pdf_objects(&chars("中文")).unwrap();

        assert!(objects.font_file_stream.is_none());
        assert!(objects.tounicode_stream.is_none());
        assert_eq!(
            objects.type0_font.get(b"Encoding").unwrap(),
            &Object::Name(b"UniGB-UCS2-H".to_vec())
        );
        assert_eq!(
            objects.cid_font.get(b"Subtype").unwrap(),
            &Object::Name(b"CIDFontType0".to_vec())
        );
    }

    #[test]
    fn test_rejects_garbage_font_data() {
        let result = FontData::from_ttf("garbage", &[0u8; 100]);
        assert!(matches!(result, Err(PdfError::FontParseError(_))));
    }

    #[test]
    fn test_extract_collection_face() {
        let data = synthetic_collection();
        let face = extract_collection_face(&data, 0).unwrap();

        // header (12) + 2 records (32) + padded tables (4 + 4)
        assert_eq!(face.len(), 52);
        assert_eq!(read_u32(&face, 0).unwrap(), 0x0001_0000);
        assert_eq!(read_u16(&face, 4).unwrap(), 2);
        assert_eq!(read_u32(&face, 12 + 8).unwrap(), 44);
        assert_eq!(read_u32(&face, 28 + 8).unwrap(), 48);
        assert_eq!(&face[44..47], &[1, 2, 3]);
        assert_eq!(&face[48..52], &[4, 5, 6, 7]);
    }

    #[test]
    fn test_extract_collection_face_out_of_range() {
        let data = synthetic_collection();
        assert!(extract_collection_face(&data, 1).is_err());
        assert!(extract_collection_face(b"true\0\0\0\0", 0).is_err());
    }

    #[test]
    fn test_tounicode_cmap_structure() {
        let font = FontData::builtin_cid("STSong-Light").unwrap();
        let cmap = font.generate_tounicode_cmap(&chars("AB"));

        assert!(cmap.contains("/CIDInit"));
        assert!(cmap.contains("2 beginbfchar"));
        // no glyph table, every character maps from GID 0
        assert!(cmap.contains("<0000> <0041>"));
        assert!(cmap.contains("<0000> <0042>"));
        assert!(cmap.ends_with("end\nend\n"));
    }

    #[test]
    fn test_tounicode_cmap_astral_plane() {
        let font = FontData::builtin_cid("STSong-Light").unwrap();
        let cmap = font.generate_tounicode_cmap(&chars("𠀀"));
        assert!(cmap.contains("<0000> <D840DC00>"));
    }
}
