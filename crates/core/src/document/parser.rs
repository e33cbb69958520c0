//! Document-level parsing: cross-reference loading and lazy object
//! resolution.
//!
//! Startup walks the cross-reference machinery in order of trust:
//! classic tables, then cross-reference streams, then a brute-force
//! scan of the whole file. A loaded table answers `resolve` lazily;
//! a damaged object reads as absent rather than failing the document.

use crate::codec::decode_stream_data;
use crate::document::objstream::ObjectStream;
use crate::document::security::{create_security_handler, SecurityHandler};
use crate::document::xref::{
    CrossRefTable, ObjectInfo, ObjectKind, MAX_OBJECT_NUMBER, MAX_XREF_SIZE,
};
use crate::error::{PdfError, Result};
use crate::model::{Dict, DictExt, PdfObject, PdfStream};
use crate::parser::lexer::{find_backwards, find_header_offset, parse_file_version};
use crate::parser::{Lexer, ObjectParser};
use bytes::Bytes;
use regex::bytes::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::cell::RefCell;
use std::rc::Rc;

/// Shortest meaningful file: "%PDF-1.7\n".
const HEADER_SIZE: u64 = 9;

/// Classic cross-reference entries are fixed-width records.
const XREF_ENTRY_SIZE: usize = 20;

/// Window searched backwards from end of file for `startxref`.
const STARTXREF_WINDOW: usize = 4096;

/// An entry read from a classic subsection, before it is folded into
/// the table. Free entries keep the generation column: it decides
/// whether the free is a real deletion or the object-0 sentinel shape.
enum RawEntry {
    Free { gennum: u32 },
    Normal { pos: u64, gennum: u32 },
}

struct CrossRefObjData {
    objnum: u32,
    entry: RawEntry,
}

/// Removes the object number from the in-progress set when parsing of
/// that object finishes, normally or not.
struct ScopedInsert<'a> {
    set: &'a RefCell<FxHashSet<u32>>,
    objnum: u32,
}

impl<'a> ScopedInsert<'a> {
    fn new(set: &'a RefCell<FxHashSet<u32>>, objnum: u32) -> Self {
        set.borrow_mut().insert(objnum);
        Self { set, objnum }
    }
}

impl Drop for ScopedInsert<'_> {
    fn drop(&mut self) {
        self.set.borrow_mut().remove(&self.objnum);
    }
}

/// Parses a PDF file's structure and resolves indirect objects.
pub struct DocumentParser {
    data: Bytes,
    header_offset: usize,
    file_version: u32,
    password: Vec<u8>,
    cross_ref: CrossRefTable,
    security: Option<Box<dyn SecurityHandler>>,
    /// Object number of the document metadata stream when it is
    /// exempt from decryption, 0 otherwise.
    metadata_objnum: u32,
    last_xref_offset: u64,
    was_rebuilt: bool,
    uses_xref_streams: bool,
    object_stream_cache: RefCell<FxHashMap<u32, Rc<ObjectStream>>>,
    parsing_objnums: RefCell<FxHashSet<u32>>,
}

impl DocumentParser {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            header_offset: 0,
            file_version: 0,
            password: Vec::new(),
            cross_ref: CrossRefTable::default(),
            security: None,
            metadata_objnum: 0,
            last_xref_offset: 0,
            was_rebuilt: false,
            uses_xref_streams: false,
            object_stream_cache: RefCell::new(FxHashMap::default()),
            parsing_objnums: RefCell::new(FxHashSet::default()),
        }
    }

    /// File bytes with any junk before the %PDF header sliced off.
    /// Every stored position is relative to this slice.
    fn body(&self) -> &[u8] {
        &self.data[self.header_offset..]
    }

    /// Load the document structure, trying progressively less trusting
    /// strategies. `password` is consulted only when the trailer names
    /// an /Encrypt dictionary.
    pub fn start_parse(&mut self, password: &[u8]) -> Result<()> {
        self.password = password.to_vec();

        let header_offset = find_header_offset(&self.data)
            .ok_or_else(|| PdfError::Format("PDF header not found".into()))?;
        if (self.data.len() as u64) < header_offset as u64 + HEADER_SIZE {
            return Err(PdfError::Format("file too short".into()));
        }
        self.header_offset = header_offset;
        self.file_version = parse_file_version(&self.data, header_offset);

        self.last_xref_offset = self.parse_startxref();
        if self.last_xref_offset >= HEADER_SIZE {
            let offset = self.last_xref_offset;
            if !self.load_all_cross_ref_v4(offset) && !self.load_all_cross_ref_v5(offset) {
                if !self.rebuild_cross_ref() {
                    return Err(PdfError::Format("cross-reference rebuild failed".into()));
                }
                self.was_rebuilt = true;
                self.last_xref_offset = 0;
            }
        } else {
            if !self.rebuild_cross_ref() {
                return Err(PdfError::Format("cross-reference rebuild failed".into()));
            }
            self.was_rebuilt = true;
        }

        self.set_encrypt_handler()?;

        // A loaded table that cannot produce the catalog is treated as
        // damaged: drop the handler, rescan, and handshake again.
        if self.root_dict().is_none() {
            if self.was_rebuilt {
                return Err(PdfError::Format("document catalog not found".into()));
            }
            self.security = None;
            if !self.rebuild_cross_ref() {
                return Err(PdfError::Format("cross-reference rebuild failed".into()));
            }
            self.was_rebuilt = true;
            self.set_encrypt_handler()?;
            if self.root_dict().is_none() {
                return Err(PdfError::Format("document catalog not found".into()));
            }
        }

        if let Some(handler) = &self.security {
            if !handler.is_metadata_encrypted() {
                if let Some(root) = self.root_dict() {
                    if let Some(metadata) = root.get_ref("Metadata") {
                        self.metadata_objnum = metadata.objnum;
                    }
                }
            }
        }
        Ok(())
    }

    /// Locate the trailing `startxref` keyword and read the offset
    /// after it. 0 means not found or out of range.
    fn parse_startxref(&self) -> u64 {
        let body = self.body();
        let Some(pos) = find_backwards(body, b"startxref", STARTXREF_WINDOW) else {
            return 0;
        };
        let mut lexer = Lexer::new(body);
        lexer.set_pos(pos);
        // Skip the keyword itself
        if lexer.next_word().is_none() {
            return 0;
        }
        let Some(offset) = lexer.next_word().and_then(|w| w.as_u64()) else {
            return 0;
        };
        if offset >= body.len() as u64 {
            return 0;
        }
        offset
    }

    // ---- classic cross-reference tables ------------------------------

    /// Parse the `xref` section at `pos`. Entries are collected only
    /// when `collect` is set; either way the returned position is
    /// where the trailer keyword should follow.
    fn parse_cross_ref_v4(
        &self,
        pos: u64,
        collect: bool,
    ) -> Option<(Vec<CrossRefObjData>, usize)> {
        let body = self.body();
        let mut lexer = Lexer::new(body);
        lexer.set_pos(usize::try_from(pos).ok()?);

        let keyword = lexer.next_word()?;
        if keyword.bytes != b"xref" {
            return None;
        }

        let mut objects = Vec::new();
        loop {
            let saved = lexer.tell();
            let word = lexer.next_word()?;
            if !word.is_number {
                lexer.set_pos(saved);
                break;
            }

            let start_objnum = u32::try_from(word.as_u64()?).ok()?;
            if start_objnum >= MAX_OBJECT_NUMBER {
                return None;
            }
            let count = lexer
                .next_word()
                .and_then(|w| w.as_u64())
                .and_then(|n| u32::try_from(n).ok())?;

            lexer.skip_whitespace();
            let entries_pos = lexer.tell();
            if collect {
                self.parse_cross_ref_subsection(
                    entries_pos,
                    start_objnum,
                    count,
                    &mut objects,
                )?;
            }
            lexer.set_pos(entries_pos + count as usize * XREF_ENTRY_SIZE);
        }
        Some((objects, lexer.tell()))
    }

    /// Read `count` fixed-width records: 10-digit offset, 5-digit
    /// generation, and a type letter at byte 17.
    fn parse_cross_ref_subsection(
        &self,
        pos: usize,
        start_objnum: u32,
        count: u32,
        out: &mut Vec<CrossRefObjData>,
    ) -> Option<()> {
        if count == 0 {
            return Some(());
        }
        let new_size = out.len().checked_add(count as usize)?;
        if new_size > MAX_XREF_SIZE as usize || new_size > self.body().len() / XREF_ENTRY_SIZE {
            return None;
        }
        let block = self
            .body()
            .get(pos..pos + count as usize * XREF_ENTRY_SIZE)?;

        for i in 0..count as usize {
            let entry = &block[i * XREF_ENTRY_SIZE..(i + 1) * XREF_ENTRY_SIZE];
            let objnum = start_objnum + i as u32;
            let gennum = ascii_to_u32(&entry[11..16]);
            let raw = if entry[17] == b'f' {
                RawEntry::Free { gennum }
            } else {
                let pos = ascii_to_u64(&entry[..10]);
                // A zero offset is only credible when the field really
                // is ten digits; anything else means the reader is
                // misaligned.
                if pos == 0 && !entry[..10].iter().all(u8::is_ascii_digit) {
                    return None;
                }
                RawEntry::Normal { pos, gennum }
            };
            out.push(CrossRefObjData { objnum, entry: raw });
        }
        Some(())
    }

    fn merge_cross_ref_objects(&mut self, objects: Vec<CrossRefObjData>) {
        for obj in objects {
            match obj.entry {
                RawEntry::Free { gennum } => {
                    // Generation 0 frees are the object-0 sentinel shape
                    if gennum > 0 {
                        self.cross_ref.set_free(obj.objnum);
                    }
                }
                RawEntry::Normal { pos, gennum } => {
                    self.cross_ref.add_normal(obj.objnum, gennum, pos);
                }
            }
        }
    }

    fn load_trailer_v4(&self, pos: usize) -> Option<Dict> {
        let body = self.body();
        let mut lexer = Lexer::new(body);
        lexer.set_pos(pos);
        let keyword = lexer.next_word()?;
        if keyword.bytes != b"trailer" {
            return None;
        }
        match ObjectParser::new_at(body, lexer.tell()).parse_object() {
            Ok(PdfObject::Dict(dict)) => Some(dict),
            _ => None,
        }
    }

    /// Load the classic table chain rooted at `xref_offset`.
    ///
    /// Two passes: walk the /Prev chain newest to oldest merging
    /// trailers, then apply entries oldest first so later revisions
    /// (including frees) win. Hybrid files interleave each table's
    /// /XRefStm stream right after it.
    fn load_all_cross_ref_v4(&mut self, xref_offset: u64) -> bool {
        let Some((_, trailer_pos)) = self.parse_cross_ref_v4(xref_offset, false) else {
            return false;
        };
        let Some(trailer) = self.load_trailer_v4(trailer_pos) else {
            return false;
        };

        let xrefsize = trailer.get_int("Size").unwrap_or(0);
        let mut xref_stream_list = vec![trailer.get_int("XRefStm").unwrap_or(0)];
        let mut xref_list = vec![xref_offset as i64];
        let mut seen_offsets = FxHashSet::default();
        seen_offsets.insert(xref_offset as i64);
        let mut prev = trailer.get_int("Prev").unwrap_or(0);

        self.cross_ref.set_trailer(trailer, 0);
        if xrefsize > 0 && xrefsize <= MAX_XREF_SIZE as i64 {
            self.cross_ref.shrink_object_map(xrefsize as u32);
        }

        while prev > 0 {
            if !seen_offsets.insert(prev) {
                return false;
            }
            xref_list.insert(0, prev);

            let Some((_, tpos)) = self.parse_cross_ref_v4(prev as u64, false) else {
                return false;
            };
            let Some(dict) = self.load_trailer_v4(tpos) else {
                return false;
            };
            prev = dict.get_int("Prev").unwrap_or(0);
            xref_stream_list.insert(0, dict.get_int("XRefStm").unwrap_or(0));

            // Fold the older trailer underneath the accumulated one
            let mut older = CrossRefTable::new(dict, 0);
            older.merge_up(std::mem::take(&mut self.cross_ref));
            self.cross_ref = older;
        }

        for i in 0..xref_list.len() {
            if xref_list[i] > 0 {
                let Some((objects, _)) = self.parse_cross_ref_v4(xref_list[i] as u64, true)
                else {
                    return false;
                };
                self.merge_cross_ref_objects(objects);
            }
            if xref_stream_list[i] > 0 {
                let mut pos = xref_stream_list[i] as u64;
                if !self.load_cross_ref_v5(&mut pos, false) {
                    return false;
                }
            }
            if i == 0 && !self.verify_cross_ref_v4() {
                return false;
            }
        }
        true
    }

    /// Spot check: the first recorded offset must point at the object
    /// number it claims. Tables that are off by one fail here and fall
    /// through to the rebuild path.
    fn verify_cross_ref_v4(&self) -> bool {
        for (objnum, info) in self.cross_ref.iter() {
            let ObjectInfo::Normal { pos, .. } = info else {
                continue;
            };
            if *pos == 0 {
                continue;
            }
            let mut lexer = Lexer::new(self.body());
            lexer.set_pos(*pos as usize);
            return matches!(
                lexer.next_word().and_then(|w| w.as_u64()),
                Some(n) if n == u64::from(objnum)
            );
        }
        true
    }

    // ---- cross-reference streams -------------------------------------

    fn load_all_cross_ref_v5(&mut self, xref_offset: u64) -> bool {
        let mut pos = xref_offset;
        if !self.load_cross_ref_v5(&mut pos, true) {
            return false;
        }
        let mut seen_offsets = FxHashSet::default();
        while pos > 0 {
            seen_offsets.insert(pos);
            if !self.load_cross_ref_v5(&mut pos, false) {
                return false;
            }
            if seen_offsets.contains(&pos) {
                return false;
            }
        }
        self.object_stream_cache.borrow_mut().clear();
        self.uses_xref_streams = true;
        true
    }

    /// Load one cross-reference stream. On success `pos` is replaced
    /// by the stream's /Prev (0 ends the chain). The main stream
    /// replaces the table outright; older ones merge underneath it.
    fn load_cross_ref_v5(&mut self, pos: &mut u64, is_main: bool) -> bool {
        let Some((objnum, _, object)) = self.parse_object_at_raw(*pos) else {
            return false;
        };
        if objnum == 0 {
            return false;
        }
        let PdfObject::Stream(stream) = object else {
            return false;
        };

        let prev = stream.attrs.get_int("Prev").unwrap_or(0);
        let size = stream.attrs.get_int("Size").unwrap_or(0);
        if prev < 0 || size < 0 {
            return false;
        }
        *pos = prev as u64;

        let trailer = stream.attrs.clone();
        if is_main {
            self.cross_ref = CrossRefTable::new(trailer, objnum);
            self.cross_ref.shrink_object_map(size as u32);
        } else {
            let mut older = CrossRefTable::new(trailer, objnum);
            older.merge_up(std::mem::take(&mut self.cross_ref));
            self.cross_ref = older;
        }

        let Some(widths) = field_widths(&stream.attrs) else {
            return false;
        };
        let mut total_width: u32 = 0;
        for width in &widths {
            match total_width.checked_add(*width) {
                Some(sum) => total_width = sum,
                None => return false,
            }
        }
        if total_width == 0 {
            return false;
        }

        let Ok(data) = decode_stream_data(&stream.attrs, stream.rawdata()) else {
            return false;
        };

        let indices = index_segments(&stream.attrs, size as u32);
        let total_width = total_width as u64;
        let mut segindex: u64 = 0;
        for (seg_start, seg_count) in indices {
            let seg_count = u64::from(seg_count);
            let Some(seg_end) = segindex
                .checked_add(seg_count)
                .and_then(|n| n.checked_mul(total_width))
            else {
                continue;
            };
            if seg_end > data.len() as u64 {
                continue;
            }

            let known_size = if self.cross_ref.is_empty() {
                0
            } else {
                u64::from(self.cross_ref.last_objnum()) + 1
            };
            let Some(max_objnum) = u64::from(seg_start).checked_add(seg_count) else {
                continue;
            };
            if max_objnum > known_size {
                continue;
            }

            for i in 0..seg_count {
                let objnum64 = u64::from(seg_start) + i;
                if objnum64 >= u64::from(MAX_OBJECT_NUMBER) {
                    break;
                }
                let entry_start = ((segindex + i) * total_width) as usize;
                let entry = &data[entry_start..entry_start + total_width as usize];
                self.process_v5_entry(entry, &widths, objnum64 as u32);
            }
            segindex += seg_count;
        }
        true
    }

    /// Apply one stream record. Within a single load the first writer
    /// wins; only a size-ceiling placeholder may be claimed later.
    fn process_v5_entry(&mut self, entry: &[u8], widths: &[u32], objnum: u32) {
        let w0 = widths[0] as usize;
        let w1 = widths[1] as usize;
        let w2 = widths[2] as usize;

        // Type field defaults to 1 (in use) when its width is zero
        let entry_type = if w0 > 0 { get_var_int(&entry[..w0]) } else { 1 };
        if entry_type > 2 {
            return;
        }
        let field2 = get_var_int(&entry[w0..w0 + w1]);
        let field3 = get_var_int(&entry[w0 + w1..w0 + w1 + w2]);

        match self.cross_ref.get_object_info(objnum).copied() {
            Some(ObjectInfo::Null) => {
                self.cross_ref.add_normal(objnum, 0, field2);
                return;
            }
            // A container marker created before its own record was seen
            // still needs the position filled in.
            Some(ObjectInfo::ObjStream { pos: 0, .. }) => {
                if entry_type == 1 {
                    self.cross_ref.add_normal(objnum, 0, field2);
                }
                return;
            }
            Some(ObjectInfo::Free) | None => {}
            Some(_) => return,
        }

        match entry_type {
            0 => self.cross_ref.set_free(objnum),
            1 => self.cross_ref.add_normal(objnum, 0, field2),
            _ => {
                let Ok(container) = u32::try_from(field2) else {
                    return;
                };
                if container == 0 || container >= MAX_OBJECT_NUMBER {
                    return;
                }
                let index = u32::try_from(field3).unwrap_or(u32::MAX);
                self.cross_ref.add_compressed(objnum, container, index);
            }
        }
    }

    // ---- recovery ----------------------------------------------------

    /// Scan the whole file for object definitions and trailers,
    /// trusting content over the (missing or broken) cross-reference
    /// data. Later definitions of an object shadow earlier ones.
    fn rebuild_cross_ref(&mut self) -> bool {
        let body = self.body();
        let obj_re = Regex::new(r"(?-u)(\d+)\s+(\d+)\s+obj\b").unwrap();
        let trailer_re = Regex::new(r"(?-u)\btrailer\b").unwrap();

        enum Candidate {
            Object(usize),
            Trailer(usize),
        }
        let mut candidates: Vec<(usize, Candidate)> = obj_re
            .find_iter(body)
            .map(|m| (m.start(), Candidate::Object(m.start())))
            .chain(
                trailer_re
                    .find_iter(body)
                    .map(|m| (m.start(), Candidate::Trailer(m.end()))),
            )
            .collect();
        candidates.sort_by_key(|(pos, _)| *pos);

        let mut rebuilt = CrossRefTable::default();
        for (_, candidate) in candidates {
            match candidate {
                Candidate::Object(pos) => {
                    let Some((objnum, gennum, object)) = self.parse_object_at_raw(pos as u64)
                    else {
                        continue;
                    };
                    if objnum >= MAX_OBJECT_NUMBER {
                        continue;
                    }

                    if let PdfObject::Stream(stream) = &object {
                        if stream.type_name() == Some("XRef") {
                            // The stream dictionary doubles as a trailer
                            let newer = CrossRefTable::new(stream.attrs.clone(), objnum);
                            rebuilt.merge_up(newer);
                        }
                    }

                    rebuilt.add_normal(objnum, gennum, pos as u64);

                    if let PdfObject::Stream(stream) = &object {
                        if let Some(objstm) = self.decode_object_stream(stream) {
                            for (sub_objnum, index) in objstm.iter_objects() {
                                if sub_objnum < MAX_OBJECT_NUMBER {
                                    rebuilt.add_compressed(sub_objnum, objnum, index);
                                }
                            }
                        }
                    }
                }
                Candidate::Trailer(after) => {
                    if let Ok(PdfObject::Dict(dict)) =
                        ObjectParser::new_at(body, after).parse_object()
                    {
                        rebuilt.merge_up(CrossRefTable::new(dict, 0));
                    }
                }
            }
        }

        let mut current = std::mem::take(&mut self.cross_ref);
        current.merge_up(rebuilt);
        self.cross_ref = current;

        !self.cross_ref.trailer().is_empty() && self.cross_ref.last_objnum() > 0
    }

    fn decode_object_stream(&self, stream: &PdfStream) -> Option<ObjectStream> {
        if stream.type_name() != Some("ObjStm") {
            return None;
        }
        let data = decode_stream_data(&stream.attrs, stream.rawdata()).ok()?;
        ObjectStream::new(stream, data)
    }

    // ---- encryption --------------------------------------------------

    fn set_encrypt_handler(&mut self) -> Result<()> {
        self.security = None;
        if self.cross_ref.trailer().is_empty() {
            return Err(PdfError::Format("no trailer".into()));
        }
        let Some(encrypt) = self.encrypt_dict() else {
            return Ok(());
        };

        let docid = self
            .cross_ref
            .trailer()
            .get_array("ID")
            .and_then(|ids| ids.first())
            .and_then(|id| id.as_string().ok())
            .map(<[u8]>::to_vec)
            .unwrap_or_default();

        let handler = create_security_handler(&encrypt, &docid, &self.password)?;
        self.security = Some(handler);
        Ok(())
    }

    /// The trailer's /Encrypt dictionary, following one level of
    /// indirection.
    pub fn encrypt_dict(&self) -> Option<Dict> {
        match self.cross_ref.trailer().get("Encrypt")? {
            PdfObject::Dict(dict) => Some(dict.clone()),
            PdfObject::Ref(r) => match self.resolve(r.objnum)? {
                PdfObject::Dict(dict) => Some(dict),
                _ => None,
            },
            _ => None,
        }
    }

    fn decrypt_object_tree(&self, object: &mut PdfObject, objnum: u32, gennum: u32) {
        let Some(handler) = &self.security else {
            return;
        };
        match object {
            PdfObject::String(s) => {
                *s = handler.decrypt_string(objnum, gennum, s);
            }
            PdfObject::Stream(stream) => {
                for value in stream.attrs.values_mut() {
                    self.decrypt_object_tree(value, objnum, gennum);
                }
                if !stream.rawdata_is_decrypted() {
                    let plain =
                        handler.decrypt_stream(objnum, gennum, stream.rawdata(), &stream.attrs);
                    stream.set_rawdata_decrypted(plain);
                }
            }
            PdfObject::Array(items) => {
                for item in items {
                    self.decrypt_object_tree(item, objnum, gennum);
                }
            }
            PdfObject::Dict(dict) => {
                for value in dict.values_mut() {
                    self.decrypt_object_tree(value, objnum, gennum);
                }
            }
            _ => {}
        }
    }

    // ---- object resolution -------------------------------------------

    /// Parse `objnum gennum obj` at `pos` without decryption or object
    /// number verification.
    fn parse_object_at_raw(&self, pos: u64) -> Option<(u32, u32, PdfObject)> {
        let pos = usize::try_from(pos).ok()?;
        if pos >= self.body().len() {
            return None;
        }
        ObjectParser::new_at(self.body(), pos)
            .parse_indirect_object()
            .ok()
    }

    /// Parse the object at `pos`, verify it is `objnum` (0 skips the
    /// check), and decrypt its strings and stream payload. The exempt
    /// metadata object passes through untouched.
    fn parse_indirect_object_at(&self, pos: u64, objnum: u32) -> Option<PdfObject> {
        let (parsed_objnum, gennum, mut object) = self.parse_object_at_raw(pos)?;
        if objnum != 0 && parsed_objnum != objnum {
            return None;
        }
        if self.security.is_some() && parsed_objnum != self.metadata_objnum {
            self.decrypt_object_tree(&mut object, parsed_objnum, gennum);
        }
        Some(object)
    }

    /// Fetch an indirect object by number. Free slots, damaged
    /// definitions, and circular references all read as None.
    pub fn resolve(&self, objnum: u32) -> Option<PdfObject> {
        if !self.is_valid_object_number(objnum) {
            return None;
        }
        if self.parsing_objnums.borrow().contains(&objnum) {
            return None;
        }
        let _guard = ScopedInsert::new(&self.parsing_objnums, objnum);

        match self.cross_ref.get_object_info(objnum)? {
            ObjectInfo::Normal { .. } => {
                let pos = self.cross_ref.get_object_position_or_zero(objnum);
                if pos == 0 {
                    return None;
                }
                self.parse_indirect_object_at(pos, objnum)
            }
            ObjectInfo::Compressed { container, index } => {
                let (container, index) = (*container, *index);
                let objstm = self.get_object_stream(container)?;
                objstm.parse_object(objnum, index)
            }
            _ => None,
        }
    }

    /// Fetch and cache the container object stream `objnum`. Requires
    /// an object-stream entry with a real position.
    fn get_object_stream(&self, objnum: u32) -> Option<Rc<ObjectStream>> {
        if self.parsing_objnums.borrow().contains(&objnum) {
            return None;
        }
        if let Some(cached) = self.object_stream_cache.borrow().get(&objnum) {
            return Some(Rc::clone(cached));
        }

        let ObjectInfo::ObjStream { pos, .. } = self.cross_ref.get_object_info(objnum)? else {
            return None;
        };
        let pos = *pos;
        if pos == 0 {
            return None;
        }

        let _guard = ScopedInsert::new(&self.parsing_objnums, objnum);
        let object = self.parse_indirect_object_at(pos, objnum)?;
        let PdfObject::Stream(stream) = object else {
            return None;
        };
        let data = decode_stream_data(&stream.attrs, stream.rawdata()).ok()?;
        let objstm = Rc::new(ObjectStream::new(&stream, data)?);
        self.object_stream_cache
            .borrow_mut()
            .insert(objnum, Rc::clone(&objstm));
        Some(objstm)
    }

    // ---- accessors ---------------------------------------------------

    pub fn trailer(&self) -> &Dict {
        self.cross_ref.trailer()
    }

    /// Object number of the cross-reference stream carrying the
    /// trailer, or 0 for a classic trailer.
    pub fn trailer_object_number(&self) -> u32 {
        self.cross_ref.trailer_objnum()
    }

    pub fn root_objnum(&self) -> Option<u32> {
        self.cross_ref.trailer().get_ref("Root").map(|r| r.objnum)
    }

    pub fn info_objnum(&self) -> Option<u32> {
        self.cross_ref.trailer().get_ref("Info").map(|r| r.objnum)
    }

    fn root_dict(&self) -> Option<Dict> {
        match self.resolve(self.root_objnum()?)? {
            PdfObject::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn is_valid_object_number(&self, objnum: u32) -> bool {
        objnum > 0 && objnum < MAX_OBJECT_NUMBER
    }

    pub fn object_kind(&self, objnum: u32) -> ObjectKind {
        self.cross_ref.object_kind(objnum)
    }

    pub fn get_object_position_or_zero(&self, objnum: u32) -> u64 {
        self.cross_ref.get_object_position_or_zero(objnum)
    }

    pub fn last_objnum(&self) -> u32 {
        self.cross_ref.last_objnum()
    }

    pub fn cross_ref(&self) -> &CrossRefTable {
        &self.cross_ref
    }

    /// Size of the document proper, excluding junk before the header.
    pub fn document_size(&self) -> u64 {
        self.body().len() as u64
    }

    /// Header version digits, e.g. 17 for a %PDF-1.7 file.
    pub fn file_version(&self) -> u32 {
        self.file_version
    }

    /// Offset the trailing startxref pointed at (0 after a rebuild).
    pub fn last_xref_offset(&self) -> u64 {
        self.last_xref_offset
    }

    pub fn was_rebuilt(&self) -> bool {
        self.was_rebuilt
    }

    pub fn uses_xref_streams(&self) -> bool {
        self.uses_xref_streams
    }

    pub fn is_encrypted(&self) -> bool {
        self.cross_ref.trailer().contains_key("Encrypt")
    }

    /// /P flags from the security handler; unencrypted documents allow
    /// everything.
    pub fn permissions(&self) -> u32 {
        self.security
            .as_ref()
            .map_or(0xFFFF_FFFF, |handler| handler.permissions())
    }
}

/// Big-endian variable-width integer from a stream record field.
fn get_var_int(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}

/// Decimal prefix of an ASCII field, ignoring leading whitespace.
fn ascii_to_u64(bytes: &[u8]) -> u64 {
    let mut value: u64 = 0;
    let mut seen_digit = false;
    for &b in bytes {
        if b.is_ascii_digit() {
            seen_digit = true;
            value = value.saturating_mul(10).saturating_add(u64::from(b - b'0'));
        } else if seen_digit || !Lexer::is_whitespace(b) {
            break;
        }
    }
    value
}

fn ascii_to_u32(bytes: &[u8]) -> u32 {
    u32::try_from(ascii_to_u64(bytes)).unwrap_or(u32::MAX)
}

/// The /W field widths; at least three are required.
fn field_widths(dict: &Dict) -> Option<Vec<u32>> {
    let array = dict.get_array("W")?;
    let mut widths = Vec::with_capacity(array.len());
    for item in array {
        let w = item.as_int().ok()?;
        widths.push(u32::try_from(w).ok()?);
    }
    (widths.len() >= 3).then_some(widths)
}

/// /Index segments as (start, count) pairs; default is one segment
/// covering /Size.
fn index_segments(dict: &Dict, size: u32) -> Vec<(u32, u32)> {
    let Some(array) = dict.get_array("Index") else {
        return vec![(0, size)];
    };
    let mut segments = Vec::with_capacity(array.len() / 2);
    for pair in array.chunks_exact(2) {
        let (Ok(start), Ok(count)) = (pair[0].as_int(), pair[1].as_int()) else {
            continue;
        };
        let (Ok(start), Ok(count)) = (u32::try_from(start), u32::try_from(count)) else {
            continue;
        };
        segments.push((start, count));
    }
    if segments.is_empty() {
        return vec![(0, size)];
    }
    segments
}
