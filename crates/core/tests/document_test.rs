//! Whole-document parsing through classic cross-reference tables.

mod common;

use common::PdfBuilder;
use orinoco_core::codec::arcfour::Arcfour;
use orinoco_core::model::DictExt;
use orinoco_core::{Document, ObjectKind, PdfError, PdfObject};

/// Catalog, pages, info dictionary, and a string object behind a
/// single well-formed table.
fn simple_document() -> Vec<u8> {
    let mut b = PdfBuilder::new();
    let o1 = b.object(1, 0, "<</Type /Catalog /Pages 2 0 R>>");
    let o2 = b.object(2, 0, "<</Type /Pages /Kids [] /Count 0>>");
    let o3 = b.object(3, 0, "<</Title (Fixture)>>");
    let o4 = b.object(4, 0, "(hello)");
    let xref = b.xref_table(&[(
        0,
        vec![
            (0, 65535, 'f'),
            (o1, 0, 'n'),
            (o2, 0, 'n'),
            (o3, 0, 'n'),
            (o4, 0, 'n'),
        ],
    )]);
    b.trailer("<</Size 5 /Root 1 0 R /Info 3 0 R>>");
    b.finish(xref)
}

#[test]
fn test_simple_document() {
    let data = simple_document();
    let len = data.len() as u64;
    let doc = Document::new(data, b"").unwrap();
    let parser = doc.parser();

    assert_eq!(parser.file_version(), 17);
    assert!(!parser.was_rebuilt());
    assert!(!parser.uses_xref_streams());
    assert_eq!(parser.trailer_object_number(), 0);
    assert_eq!(parser.last_objnum(), 4);
    assert_eq!(parser.document_size(), len);
    assert_eq!(parser.permissions(), 0xFFFF_FFFF);
    assert!(!doc.is_encrypted());

    let catalog = doc.catalog().unwrap();
    assert_eq!(catalog.get_name("Type"), Some("Catalog"));
    assert_eq!(doc.info().unwrap().get("Title"), Some(&PdfObject::String(b"Fixture".to_vec())));

    assert_eq!(
        *doc.get_object(4).unwrap(),
        PdfObject::String(b"hello".to_vec())
    );
    assert_eq!(parser.object_kind(2), ObjectKind::Normal);
    assert_eq!(parser.object_kind(99), ObjectKind::Free);
    assert!(parser.get_object_position_or_zero(1) > 0);
}

#[test]
fn test_out_of_range_object_numbers() {
    let doc = Document::new(simple_document(), b"").unwrap();
    assert!(doc.get_object(0).is_none());
    assert!(doc.get_object(0x7FFF_FFFF).is_none());
    assert!(doc.get_object(50).is_none());
}

#[test]
fn test_resolve_ref_follows_reference() {
    let doc = Document::new(simple_document(), b"").unwrap();
    let catalog = doc.catalog().unwrap();
    let pages = doc.resolve_ref(catalog.get("Pages").unwrap()).unwrap();
    assert_eq!(pages.as_dict().unwrap().get_name("Type"), Some("Pages"));
}

#[test]
fn test_incremental_update_wins() {
    let mut b = PdfBuilder::new();
    let o1 = b.object(1, 0, "<</Type /Catalog>>");
    let o2 = b.object(2, 0, "<</Val 1>>");
    let o3 = b.object(3, 0, "<</Keep true>>");
    let xref1 = b.xref_table(&[(
        0,
        vec![(0, 65535, 'f'), (o1, 0, 'n'), (o2, 0, 'n'), (o3, 0, 'n')],
    )]);
    b.trailer("<</Size 4 /Root 1 0 R>>");
    b.push(format!("startxref\n{xref1}\n%%EOF\n"));

    // Revision 2: replace object 2, delete object 3
    let o2b = b.object(2, 0, "<</Val 2>>");
    let xref2 = b.xref_table(&[(2, vec![(o2b, 0, 'n')]), (3, vec![(0, 1, 'f')])]);
    b.trailer(&format!("<</Size 4 /Root 1 0 R /Prev {xref1}>>"));
    let data = b.finish(xref2);

    let doc = Document::new(data, b"").unwrap();
    assert!(!doc.parser().was_rebuilt());
    assert_eq!(
        doc.get_object(2).unwrap().as_dict().unwrap().get_int("Val"),
        Some(2)
    );
    assert!(doc.get_object(3).is_none());
    assert_eq!(doc.parser().object_kind(3), ObjectKind::Free);
    assert!(doc.get_object(1).is_some());
}

#[test]
fn test_generation_zero_free_is_ignored() {
    let mut b = PdfBuilder::new();
    let o1 = b.object(1, 0, "<</Type /Catalog>>");
    let o2 = b.object(2, 0, "(still here)");
    let xref1 = b.xref_table(&[(0, vec![(0, 65535, 'f'), (o1, 0, 'n'), (o2, 0, 'n')])]);
    b.trailer("<</Size 3 /Root 1 0 R>>");
    b.push(format!("startxref\n{xref1}\n%%EOF\n"));

    // A gen-0 free record is the unused-slot shape, not a deletion
    let xref2 = b.xref_table(&[(2, vec![(0, 0, 'f')])]);
    b.trailer(&format!("<</Size 3 /Root 1 0 R /Prev {xref1}>>"));
    let data = b.finish(xref2);

    let doc = Document::new(data, b"").unwrap();
    assert_eq!(
        *doc.get_object(2).unwrap(),
        PdfObject::String(b"still here".to_vec())
    );
}

#[test]
fn test_junk_before_header() {
    let mut data = b"<<garbage prologue>>\n".to_vec();
    let body = simple_document();
    let body_len = body.len() as u64;
    data.extend_from_slice(&body);

    let doc = Document::new(data, b"").unwrap();
    assert_eq!(doc.parser().document_size(), body_len);
    assert_eq!(doc.catalog().unwrap().get_name("Type"), Some("Catalog"));
}

#[test]
fn test_missing_header_is_fatal() {
    let err = Document::new(b"not a pdf at all".to_vec(), b"").unwrap_err();
    assert!(matches!(err, PdfError::Format(_)));
}

#[test]
fn test_circular_prev_chain_falls_back_to_rebuild() {
    let mut b = PdfBuilder::new();
    let o1 = b.object(1, 0, "<</Type /Catalog>>");
    let o2 = b.object(2, 0, "(data)");

    let xref1_pos = b.pos();
    let xref2_guess = xref1_pos + 200;
    b.xref_table(&[(0, vec![(0, 65535, 'f'), (o1, 0, 'n'), (o2, 0, 'n')])]);
    b.trailer(&format!("<</Size 3 /Root 1 0 R /Prev {xref2_guess}>>"));
    while b.pos() < xref2_guess {
        b.push(" ");
    }
    let xref2 = b.pos();
    b.xref_table(&[(0, vec![(0, 65535, 'f'), (o1, 0, 'n'), (o2, 0, 'n')])]);
    b.trailer(&format!("<</Size 3 /Root 1 0 R /Prev {xref1_pos}>>"));
    let data = b.finish(xref2);

    let doc = Document::new(data, b"").unwrap();
    assert!(doc.parser().was_rebuilt());
    assert_eq!(*doc.get_object(2).unwrap(), PdfObject::String(b"data".to_vec()));
}

#[test]
fn test_shifted_offsets_fail_verification_and_rebuild() {
    let mut b = PdfBuilder::new();
    let o1 = b.object(1, 0, "<</Type /Catalog>>");
    let o2 = b.object(2, 0, "(payload)");
    // Offsets deliberately point into the middle of the definitions
    let xref = b.xref_table(&[(
        0,
        vec![(0, 65535, 'f'), (o1 + 4, 0, 'n'), (o2 + 4, 0, 'n')],
    )]);
    b.trailer("<</Size 3 /Root 1 0 R>>");
    let data = b.finish(xref);

    let doc = Document::new(data, b"").unwrap();
    assert!(doc.parser().was_rebuilt());
    assert_eq!(
        *doc.get_object(2).unwrap(),
        PdfObject::String(b"payload".to_vec())
    );
}

#[test]
fn test_declared_size_caps_object_map() {
    let mut b = PdfBuilder::new();
    let o1 = b.object(1, 0, "<</Type /Catalog>>");
    let o2 = b.object(2, 0, "(kept)");
    let o9 = b.object(9, 0, "(beyond the declared size)");
    let xref = b.xref_table(&[
        (0, vec![(0, 65535, 'f'), (o1, 0, 'n'), (o2, 0, 'n')]),
        (9, vec![(o9, 0, 'n')]),
    ]);
    b.trailer("<</Size 3 /Root 1 0 R>>");
    let data = b.finish(xref);

    let doc = Document::new(data, b"").unwrap();
    // /Size 3 pins the ceiling before entries are applied; entries past
    // it still land, the ceiling placeholder just guarantees last_objnum
    // is at least Size - 1.
    assert!(doc.parser().last_objnum() >= 2);
    assert_eq!(*doc.get_object(2).unwrap(), PdfObject::String(b"kept".to_vec()));
}

// ---- encryption ------------------------------------------------------

const PASSWORD_PADDING: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

fn pad_password(password: &[u8]) -> [u8; 32] {
    let mut padded = [0u8; 32];
    let len = password.len().min(32);
    padded[..len].copy_from_slice(&password[..len]);
    padded[len..].copy_from_slice(&PASSWORD_PADDING[..32 - len]);
    padded
}

/// RC4 R2 fixture with equal user and owner passwords.
fn encrypted_document(password: &[u8]) -> Vec<u8> {
    let docid = b"0123456789abcdef";
    let p: i64 = -1;

    let o_value = Arcfour::new(&md5::compute(pad_password(password)).0[..5])
        .process(&PASSWORD_PADDING);

    let mut ctx = md5::Context::new();
    ctx.consume(pad_password(password));
    ctx.consume(&o_value);
    ctx.consume((p as u32).to_le_bytes());
    ctx.consume(docid);
    let file_key = ctx.finalize().0[..5].to_vec();
    let u_value = Arcfour::new(&file_key).process(&PASSWORD_PADDING);

    // Per-object key for the string in object 4
    let mut obj_key = file_key.clone();
    obj_key.extend_from_slice(&4u32.to_le_bytes()[..3]);
    obj_key.extend_from_slice(&0u32.to_le_bytes()[..2]);
    let obj_key = &md5::compute(&obj_key).0[..10];
    let ciphertext = Arcfour::new(obj_key).process(b"top secret");

    let mut b = PdfBuilder::new();
    let o1 = b.object(1, 0, "<</Type /Catalog>>");
    let o4 = b.object(4, 0, &format!("<{}>", hex::encode(&ciphertext)));
    let o5 = b.object(
        5,
        0,
        &format!(
            "<</Filter /Standard /V 1 /R 2 /Length 40 /P {p} /O <{}> /U <{}>>>",
            hex::encode(&o_value),
            hex::encode(&u_value)
        ),
    );
    let xref = b.xref_table(&[
        (0, vec![(0, 65535, 'f'), (o1, 0, 'n')]),
        (4, vec![(o4, 0, 'n'), (o5, 0, 'n')]),
    ]);
    b.trailer(&format!(
        "<</Size 6 /Root 1 0 R /Encrypt 5 0 R /ID [<{id}> <{id}>]>>",
        id = hex::encode(docid)
    ));
    b.finish(xref)
}

#[test]
fn test_encrypted_document_with_correct_password() {
    let doc = Document::new(encrypted_document(b"secret"), b"secret").unwrap();
    assert!(doc.is_encrypted());
    assert_eq!(
        *doc.get_object(4).unwrap(),
        PdfObject::String(b"top secret".to_vec())
    );
    assert_eq!(doc.parser().permissions(), 0xFFFF_FFFF);
}

#[test]
fn test_encrypted_document_with_wrong_password() {
    let err = Document::new(encrypted_document(b"secret"), b"nope").unwrap_err();
    assert!(matches!(err, PdfError::Password));
}
