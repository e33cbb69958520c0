//! Programmatic PDF fixtures with computed byte offsets.

#![allow(dead_code)]

use std::fmt::Write as _;

/// Builds a PDF byte image incrementally, reporting the offset of each
/// piece so cross-reference data can point at real positions.
pub struct PdfBuilder {
    buf: Vec<u8>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self {
            buf: b"%PDF-1.7\n".to_vec(),
        }
    }

    pub fn with_version(version: &str) -> Self {
        Self {
            buf: format!("%PDF-{version}\n").into_bytes(),
        }
    }

    pub fn pos(&self) -> u64 {
        self.buf.len() as u64
    }

    pub fn push(&mut self, bytes: impl AsRef<[u8]>) {
        self.buf.extend_from_slice(bytes.as_ref());
    }

    /// Append `objnum gennum obj <body> endobj` and return its offset.
    pub fn object(&mut self, objnum: u32, gennum: u32, body: &str) -> u64 {
        let offset = self.pos();
        self.push(format!("{objnum} {gennum} obj\n{body}\nendobj\n"));
        offset
    }

    /// Append a stream object. `extra_dict` is spliced into the
    /// dictionary next to the computed /Length.
    pub fn stream_object(
        &mut self,
        objnum: u32,
        gennum: u32,
        extra_dict: &str,
        payload: &[u8],
    ) -> u64 {
        let offset = self.pos();
        self.push(format!(
            "{objnum} {gennum} obj\n<</Length {} {extra_dict}>>\nstream\n",
            payload.len()
        ));
        self.push(payload);
        self.push("\nendstream\nendobj\n");
        offset
    }

    /// Append a classic cross-reference table and return its offset.
    /// Each subsection is (first object number, entries); each entry is
    /// (offset, generation, type char).
    pub fn xref_table(&mut self, subsections: &[(u32, Vec<(u64, u32, char)>)]) -> u64 {
        let offset = self.pos();
        let mut text = String::from("xref\n");
        for (start, entries) in subsections {
            let _ = writeln!(text, "{start} {}", entries.len());
            for (pos, gen, ty) in entries {
                let _ = write!(text, "{pos:010} {gen:05} {ty}\r\n");
            }
        }
        self.push(text);
        offset
    }

    pub fn trailer(&mut self, dict: &str) {
        self.push(format!("trailer\n{dict}\n"));
    }

    pub fn finish(mut self, startxref: u64) -> Vec<u8> {
        self.push(format!("startxref\n{startxref}\n%%EOF\n"));
        self.buf
    }

    /// End the file without a startxref pointer.
    pub fn finish_without_startxref(mut self) -> Vec<u8> {
        self.push("%%EOF\n");
        self.buf
    }
}

/// Encode cross-reference stream records with /W widths [1 w2 w3],
/// big-endian. Each record is (type, field2, field3).
pub fn xref_stream_records(records: &[(u8, u64, u64)], w2: usize, w3: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(records.len() * (1 + w2 + w3));
    for (ty, field2, field3) in records {
        out.push(*ty);
        out.extend_from_slice(&field2.to_be_bytes()[8 - w2..]);
        out.extend_from_slice(&field3.to_be_bytes()[8 - w3..]);
    }
    out
}

/// The decoded payload of an object stream: header pair list plus the
/// concatenated bodies, with the computed /First offset.
pub fn objstm_payload(objects: &[(u32, &str)]) -> (Vec<u8>, usize) {
    let mut header = String::new();
    let mut bodies = String::new();
    for (objnum, body) in objects {
        let _ = write!(header, "{objnum} {} ", bodies.len());
        bodies.push_str(body);
        bodies.push(' ');
    }
    let first = header.len();
    let mut payload = header.into_bytes();
    payload.extend_from_slice(bodies.as_bytes());
    (payload, first)
}
