//! Integration tests for pdf-core
//!
//! Documents are written to bytes and parsed back with lopdf.

use lopdf::{Document, Object, ObjectId};
use pdf_core::{
    Align, Canvas, Color, DocumentInfo, FontData, FormXObject, PdfDocument, XObject, A4,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn song() -> pdf_core::FontHandle {
    Arc::new(FontData::builtin_cid("STSong-Light").unwrap())
}

fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().values().copied().collect()
}

fn page_resources<'a>(doc: &'a Document, page: ObjectId, kind: &[u8]) -> &'a lopdf::Dictionary {
    doc.get_dictionary(page)
        .unwrap()
        .get(b"Resources")
        .and_then(Object::as_dict)
        .unwrap()
        .get(kind)
        .and_then(Object::as_dict)
        .unwrap()
}

fn page_content(doc: &Document, page: ObjectId) -> String {
    let content_id = doc
        .get_dictionary(page)
        .unwrap()
        .get(b"Contents")
        .and_then(Object::as_reference)
        .unwrap();
    let stream = doc.get_object(content_id).and_then(Object::as_stream).unwrap();
    String::from_utf8(stream.decompressed_content().unwrap()).unwrap()
}

#[test]
fn test_single_page_with_cjk_text() {
    let font = song();
    let mut canvas = Canvas::new();
    canvas.set_fill_color(Color::darkblue());
    canvas.set_font(&font, 12.0);
    canvas.draw_string(72.0, 700.0, "中文 PDF", Align::Left).unwrap();

    let mut doc = PdfDocument::new();
    assert_eq!(doc.add_page(A4.0, A4.1, canvas).unwrap(), 1);
    let bytes = doc.to_bytes().unwrap();
    assert!(bytes.starts_with(b"%PDF-1.7"));

    let parsed = Document::load_mem(&bytes).unwrap();
    let pages = page_ids(&parsed);
    assert_eq!(pages.len(), 1);

    let content = page_content(&parsed, pages[0]);
    assert!(content.contains("0 0 0.5451 rg"));
    assert!(content.contains("/F1 12 Tf"));
    assert!(content.contains("<4E2D65870020005000440046> Tj"));

    let fonts = page_resources(&parsed, pages[0], b"Font");
    let font_id = fonts.get(b"F1").and_then(Object::as_reference).unwrap();
    let font_dict = parsed.get_dictionary(font_id).unwrap();
    assert_eq!(
        font_dict.get(b"Encoding").and_then(Object::as_name).unwrap(),
        b"UniGB-UCS2-H"
    );
    assert_eq!(
        font_dict.get(b"Subtype").and_then(Object::as_name).unwrap(),
        b"Type0"
    );
}

#[test]
fn test_pages_share_font_object() {
    let font = song();
    let mut doc = PdfDocument::new();
    for number in 1..=3 {
        let mut canvas = Canvas::new();
        canvas.set_font(&font, 10.0);
        canvas
            .draw_string(297.0, 30.0, &format!("第 {number} 页"), Align::Center)
            .unwrap();
        doc.add_page(A4.0, A4.1, canvas).unwrap();
    }
    assert_eq!(doc.page_count(), 3);

    let parsed = Document::load_mem(&doc.to_bytes().unwrap()).unwrap();
    let font_refs: Vec<ObjectId> = page_ids(&parsed)
        .into_iter()
        .map(|page| {
            page_resources(&parsed, page, b"Font")
                .get(b"F1")
                .and_then(Object::as_reference)
                .unwrap()
        })
        .collect();
    assert_eq!(font_refs.len(), 3);
    assert!(font_refs.iter().all(|id| *id == font_refs[0]));
}

#[test]
fn test_identical_forms_written_once() {
    let content = b"0 0 m 10 10 l S\n".to_vec();
    let first = Arc::new(XObject::Form(FormXObject::top_down(10.0, 10.0, content.clone())));
    let second = Arc::new(XObject::Form(FormXObject::top_down(10.0, 10.0, content)));

    let mut doc = PdfDocument::new();
    for form in [&first, &second] {
        let mut canvas = Canvas::new();
        canvas.draw_xobject(form, 0.0, 0.0, 20.0, 20.0);
        doc.add_page(100.0, 100.0, canvas).unwrap();
    }

    let parsed = Document::load_mem(&doc.to_bytes().unwrap()).unwrap();
    let refs: Vec<ObjectId> = page_ids(&parsed)
        .into_iter()
        .map(|page| {
            page_resources(&parsed, page, b"XObject")
                .get(b"X1")
                .and_then(Object::as_reference)
                .unwrap()
        })
        .collect();
    assert_eq!(refs[0], refs[1]);

    let form = parsed.get_object(refs[0]).and_then(Object::as_stream).unwrap();
    assert_eq!(form.dict.get(b"Subtype").and_then(Object::as_name).unwrap(), b"Form");
}

#[test]
fn test_document_info() {
    let mut doc = PdfDocument::new();
    doc.set_info(DocumentInfo {
        title: Some("报告".to_string()),
        author: Some("pdf-factory".to_string()),
        ..Default::default()
    });
    doc.add_page(A4.0, A4.1, Canvas::new()).unwrap();

    let parsed = Document::load_mem(&doc.to_bytes().unwrap()).unwrap();
    let info_id = parsed
        .trailer
        .get(b"Info")
        .and_then(Object::as_reference)
        .unwrap();
    let info = parsed.get_dictionary(info_id).unwrap();

    assert_eq!(
        info.get(b"Title").and_then(Object::as_str).unwrap(),
        &[0xFEu8, 0xFF, 0x62, 0xA5, 0x54, 0x4A]
    );
    assert_eq!(
        info.get(b"Author").and_then(Object::as_str).unwrap(),
        b"pdf-factory"
    );
}

#[test]
fn test_saved_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blank.pdf");

    let mut doc = PdfDocument::new();
    doc.add_page(A4.0, A4.1, Canvas::new()).unwrap();
    doc.save(&path).unwrap();

    let parsed = Document::load(&path).unwrap();
    assert_eq!(parsed.get_pages().len(), 1);
}
