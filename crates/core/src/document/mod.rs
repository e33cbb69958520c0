//! Document structure: cross-reference loading, object resolution,
//! decryption, and the user-facing `Document` handle.
//!
//! - `parser` - cross-reference loaders and lazy object resolution
//! - `xref` - the object location table
//! - `objstream` - /ObjStm containers
//! - `security` - standard security handler

pub mod objstream;
pub mod parser;
pub mod security;
pub mod xref;

pub use parser::DocumentParser;
pub use xref::{CrossRefTable, ObjectInfo, ObjectKind};

use crate::error::Result;
use crate::model::{Dict, PdfObject};
use bytes::Bytes;
use indexmap::IndexMap;
use memmap2::Mmap;
use std::cell::RefCell;
use std::rc::Rc;

pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// LRU memo for resolved objects, keyed by object number. Insertion
/// order doubles as recency order.
struct ObjectCache {
    capacity: usize,
    map: IndexMap<u32, Rc<PdfObject>>,
}

impl ObjectCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            map: IndexMap::new(),
        }
    }

    fn get(&mut self, objnum: u32) -> Option<Rc<PdfObject>> {
        if self.capacity == 0 {
            return None;
        }
        let index = self.map.get_index_of(&objnum)?;
        let value = Rc::clone(self.map.get_index(index)?.1);
        if index + 1 != self.map.len() {
            self.map.move_index(index, self.map.len() - 1);
        }
        Some(value)
    }

    fn insert(&mut self, objnum: u32, value: Rc<PdfObject>) {
        if self.capacity == 0 {
            return;
        }
        if self.map.contains_key(&objnum) {
            self.map.shift_remove(&objnum);
        }
        self.map.insert(objnum, value);
        if self.map.len() > self.capacity {
            self.map.shift_remove_index(0);
        }
    }
}

/// File bytes, either copied in or borrowed from a mapping.
#[derive(Clone)]
enum PdfBytes {
    Owned(Bytes),
    Shared(Bytes),
}

impl PdfBytes {
    const fn as_bytes(&self) -> &Bytes {
        match self {
            Self::Owned(data) => data,
            Self::Shared(data) => data,
        }
    }
}

/// A parsed PDF document.
///
/// Thin memoizing layer over `DocumentParser`: repeated object fetches
/// come from an LRU cache instead of re-reading the file.
pub struct Document {
    data: PdfBytes,
    parser: DocumentParser,
    cache: RefCell<ObjectCache>,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document").finish_non_exhaustive()
    }
}

impl Document {
    fn new_inner(data: PdfBytes, password: &[u8], cache_capacity: usize) -> Result<Self> {
        let mut parser = DocumentParser::new(data.as_bytes().clone());
        parser.start_parse(password)?;
        Ok(Self {
            data,
            parser,
            cache: RefCell::new(ObjectCache::new(cache_capacity)),
        })
    }

    /// Parse a document from raw bytes.
    pub fn new<D: AsRef<[u8]>>(data: D, password: &[u8]) -> Result<Self> {
        Self::new_with_cache(data, password, DEFAULT_CACHE_CAPACITY)
    }

    /// Parse with an explicit object cache capacity.
    pub fn new_with_cache<D: AsRef<[u8]>>(
        data: D,
        password: &[u8],
        cache_capacity: usize,
    ) -> Result<Self> {
        Self::new_inner(
            PdfBytes::Owned(Bytes::copy_from_slice(data.as_ref())),
            password,
            cache_capacity,
        )
    }

    /// Parse a memory-mapped file without copying it.
    pub fn new_from_mmap(mmap: Mmap, password: &[u8]) -> Result<Self> {
        Self::new_inner(
            PdfBytes::Shared(Bytes::from_owner(mmap)),
            password,
            DEFAULT_CACHE_CAPACITY,
        )
    }

    /// Parse shared bytes without copying them.
    pub fn new_from_bytes(data: Bytes, password: &[u8]) -> Result<Self> {
        Self::new_inner(PdfBytes::Shared(data), password, DEFAULT_CACHE_CAPACITY)
    }

    /// The raw file bytes.
    pub fn bytes(&self) -> &[u8] {
        self.data.as_bytes().as_ref()
    }

    /// The underlying structure parser.
    pub fn parser(&self) -> &DocumentParser {
        &self.parser
    }

    /// Fetch an indirect object by number, memoized.
    pub fn get_object(&self, objnum: u32) -> Option<Rc<PdfObject>> {
        if let Some(cached) = self.cache.borrow_mut().get(objnum) {
            return Some(cached);
        }
        let object = Rc::new(self.parser.resolve(objnum)?);
        self.cache.borrow_mut().insert(objnum, Rc::clone(&object));
        Some(object)
    }

    /// Resolve a possible reference to its target object.
    pub fn resolve_ref(&self, object: &PdfObject) -> Option<Rc<PdfObject>> {
        match object {
            PdfObject::Ref(r) => self.get_object(r.objnum),
            other => Some(Rc::new(other.clone())),
        }
    }

    /// The document catalog dictionary.
    pub fn catalog(&self) -> Option<Dict> {
        let root = self.get_object(self.parser.root_objnum()?)?;
        root.as_dict().ok().cloned()
    }

    /// The document information dictionary, if any.
    pub fn info(&self) -> Option<Dict> {
        let info = self.get_object(self.parser.info_objnum()?)?;
        info.as_dict().ok().cloned()
    }

    pub fn trailer(&self) -> &Dict {
        self.parser.trailer()
    }

    pub fn is_encrypted(&self) -> bool {
        self.parser.is_encrypted()
    }
}
