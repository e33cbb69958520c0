//! Full-document recovery when the cross-reference data is missing or
//! lies.

mod common;

use common::{objstm_payload, PdfBuilder};
use orinoco_core::model::DictExt;
use orinoco_core::{Document, ObjectKind, PdfError, PdfObject};

#[test]
fn test_missing_startxref_recovers() {
    let mut b = PdfBuilder::new();
    b.object(1, 0, "<</Type /Catalog /Pages 2 0 R>>");
    b.object(2, 0, "<</Type /Pages /Kids [] /Count 0>>");
    b.trailer("<</Size 3 /Root 1 0 R>>");
    let doc = Document::new(b.finish_without_startxref(), b"").unwrap();
    let parser = doc.parser();

    assert!(parser.was_rebuilt());
    assert_eq!(parser.last_xref_offset(), 0);
    assert_eq!(doc.catalog().unwrap().get_name("Type"), Some("Catalog"));
    assert_eq!(parser.object_kind(2), ObjectKind::Normal);
}

#[test]
fn test_startxref_into_garbage_recovers() {
    let mut b = PdfBuilder::new();
    b.object(1, 0, "<</Type /Catalog>>");
    b.object(2, 0, "(salvaged)");
    b.trailer("<</Size 3 /Root 1 0 R>>");
    let garbage = b.pos();
    b.push("not an xref section\n");
    let doc = Document::new(b.finish(garbage), b"").unwrap();

    assert!(doc.parser().was_rebuilt());
    assert_eq!(
        *doc.get_object(2).unwrap(),
        PdfObject::String(b"salvaged".to_vec())
    );
}

#[test]
fn test_later_definition_wins() {
    let mut b = PdfBuilder::new();
    b.object(1, 0, "<</Type /Catalog>>");
    b.object(2, 0, "(first draft)");
    b.object(2, 0, "(final)");
    b.trailer("<</Size 3 /Root 1 0 R>>");
    let doc = Document::new(b.finish_without_startxref(), b"").unwrap();

    assert_eq!(*doc.get_object(2).unwrap(), PdfObject::String(b"final".to_vec()));
}

#[test]
fn test_xref_stream_dict_serves_as_trailer() {
    let mut b = PdfBuilder::new();
    b.object(1, 0, "<</Type /Catalog>>");
    b.object(2, 0, "(reachable)");
    // No trailer keyword anywhere; the only /Root lives in an
    // orphaned cross-reference stream dictionary.
    b.stream_object(3, 0, "/Type /XRef /Size 4 /W [1 2 1] /Root 1 0 R", &[]);
    let doc = Document::new(b.finish_without_startxref(), b"").unwrap();
    let parser = doc.parser();

    assert!(parser.was_rebuilt());
    assert_eq!(parser.trailer_object_number(), 3);
    assert_eq!(doc.catalog().unwrap().get_name("Type"), Some("Catalog"));
    assert_eq!(
        *doc.get_object(2).unwrap(),
        PdfObject::String(b"reachable".to_vec())
    );
}

#[test]
fn test_rebuild_registers_object_stream_contents() {
    let mut b = PdfBuilder::new();
    b.object(1, 0, "<</Type /Catalog /Pages 2 0 R>>");
    let (payload, first) = objstm_payload(&[(2, "<</Type /Pages /Count 0>>"), (3, "(inside)")]);
    b.stream_object(
        5,
        0,
        &format!("/Type /ObjStm /N 2 /First {first}"),
        &payload,
    );
    b.trailer("<</Size 6 /Root 1 0 R>>");
    let doc = Document::new(b.finish_without_startxref(), b"").unwrap();
    let parser = doc.parser();

    assert!(parser.was_rebuilt());
    assert_eq!(parser.object_kind(2), ObjectKind::Compressed);
    assert_eq!(parser.object_kind(5), ObjectKind::ObjStream);
    assert_eq!(
        *doc.get_object(3).unwrap(),
        PdfObject::String(b"inside".to_vec())
    );
    assert_eq!(
        doc.get_object(2).unwrap().as_dict().unwrap().get_name("Type"),
        Some("Pages")
    );
}

#[test]
fn test_table_without_usable_root_rescans() {
    let mut b = PdfBuilder::new();
    let o2 = b.object(2, 0, "(data)");
    // The real catalog exists in the body but the table omits it
    b.object(1, 0, "<</Type /Catalog>>");
    let xref = b.xref_table(&[(0, vec![(0, 65535, 'f')]), (2, vec![(o2, 0, 'n')])]);
    b.trailer("<</Size 3 /Root 1 0 R>>");
    let doc = Document::new(b.finish(xref), b"").unwrap();

    assert!(doc.parser().was_rebuilt());
    assert_eq!(doc.catalog().unwrap().get_name("Type"), Some("Catalog"));
}

#[test]
fn test_no_catalog_anywhere_is_fatal() {
    let mut b = PdfBuilder::new();
    b.object(2, 0, "(just data)");
    b.trailer("<</Size 3 /Root 1 0 R>>");
    let err = Document::new(b.finish_without_startxref(), b"").unwrap_err();
    assert!(matches!(err, PdfError::Format(_)));
}

#[test]
fn test_empty_body_is_fatal() {
    let b = PdfBuilder::new();
    assert!(Document::new(b.finish_without_startxref(), b"").is_err());
}
