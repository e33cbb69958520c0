//! Object streams (/Type /ObjStm).
//!
//! A container stream holding several non-stream objects. The decoded
//! payload starts with /N pairs of `objnum offset` integers; object
//! bodies begin at /First plus their offset.

use crate::model::{DictExt, PdfObject, PdfStream};
use crate::parser::{Lexer, ObjectParser};

pub struct ObjectStream {
    data: Vec<u8>,
    first: usize,
    /// (object number, offset relative to `first`) per slot.
    entries: Vec<(u32, usize)>,
}

impl ObjectStream {
    /// Build from a stream object and its decoded payload. Returns
    /// None unless the dictionary declares /Type /ObjStm with sane
    /// /N and /First values.
    pub fn new(stream: &PdfStream, data: Vec<u8>) -> Option<Self> {
        if stream.type_name() != Some("ObjStm") {
            return None;
        }
        let count = usize::try_from(stream.attrs.get_int("N")?).ok()?;
        let first = usize::try_from(stream.attrs.get_int("First")?).ok()?;
        if first > data.len() {
            return None;
        }

        let mut entries = Vec::with_capacity(count);
        let mut lexer = Lexer::new(&data[..first]);
        for _ in 0..count {
            let objnum = lexer.next_word()?.as_u64()?;
            let offset = lexer.next_word()?.as_u64()?;
            entries.push((
                u32::try_from(objnum).ok()?,
                usize::try_from(offset).ok()?,
            ));
        }

        Some(Self { data, first, entries })
    }

    pub fn object_count(&self) -> usize {
        self.entries.len()
    }

    /// Object number stored at `index`.
    pub fn object_number_at(&self, index: usize) -> Option<u32> {
        self.entries.get(index).map(|(objnum, _)| *objnum)
    }

    /// Iterate (object number, local index) pairs.
    pub fn iter_objects(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, (objnum, _))| (*objnum, index as u32))
    }

    /// Parse the object at `index`, verifying it is the slot for
    /// `objnum`. A stale cross-reference entry pointing at the wrong
    /// slot reads as absent.
    pub fn parse_object(&self, objnum: u32, index: u32) -> Option<PdfObject> {
        let (entry_objnum, offset) = *self.entries.get(index as usize)?;
        if entry_objnum != objnum {
            return None;
        }
        let pos = self.first.checked_add(offset)?;
        if pos >= self.data.len() {
            return None;
        }
        ObjectParser::new_at(&self.data, pos).parse_object().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Dict;

    fn objstm(count: i64, first: i64, payload: &[u8]) -> PdfStream {
        let mut attrs = Dict::new();
        attrs.insert("Type".into(), PdfObject::Name("ObjStm".into()));
        attrs.insert("N".into(), PdfObject::Int(count));
        attrs.insert("First".into(), PdfObject::Int(first));
        PdfStream::new(attrs, payload.to_vec())
    }

    #[test]
    fn test_parses_header_and_objects() {
        let mut payload = b"11 0 12 8 ".to_vec();
        let first = payload.len();
        payload.extend_from_slice(b"<</A 1>> [1 2 3]");
        let stream = objstm(2, first as i64, &payload);

        let os = ObjectStream::new(&stream, payload).unwrap();
        assert_eq!(os.object_count(), 2);
        assert_eq!(os.object_number_at(0), Some(11));

        let obj = os.parse_object(12, 1).unwrap();
        assert_eq!(
            obj,
            PdfObject::Array(vec![
                PdfObject::Int(1),
                PdfObject::Int(2),
                PdfObject::Int(3)
            ])
        );
    }

    #[test]
    fn test_wrong_objnum_for_slot() {
        let mut payload = b"11 0 ".to_vec();
        let first = payload.len();
        payload.extend_from_slice(b"42");
        let stream = objstm(1, first as i64, &payload);
        let os = ObjectStream::new(&stream, payload).unwrap();
        assert!(os.parse_object(99, 0).is_none());
    }

    #[test]
    fn test_requires_objstm_type() {
        let mut attrs = Dict::new();
        attrs.insert("N".into(), PdfObject::Int(1));
        attrs.insert("First".into(), PdfObject::Int(4));
        let stream = PdfStream::new(attrs, b"1 0 5".to_vec());
        assert!(ObjectStream::new(&stream, b"1 0 5".to_vec()).is_none());
    }
}
