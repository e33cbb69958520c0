//! PDF object types.
//!
//! The closed tagged-variant value type produced by the parser and
//! handed to callers. The cross-reference core only ever asks a few
//! capability questions ("is this a stream", "give me the dictionary"),
//! so every variant carries a cheap accessor.

use crate::error::{PdfError, Result};
use bytes::Bytes;
use std::collections::HashMap;

/// Dictionary type used throughout the crate.
pub type Dict = HashMap<String, PdfObject>;

/// PDF object - the fundamental value type in PDF.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfObject {
    /// Null object
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Real (floating point) value
    Real(f64),
    /// Name object (e.g., /Type, /XRef)
    Name(String),
    /// String (byte array)
    String(Vec<u8>),
    /// Array of objects
    Array(Vec<Self>),
    /// Dictionary (name -> object mapping)
    Dict(Dict),
    /// Stream (dictionary + binary data)
    Stream(Box<PdfStream>),
    /// Indirect object reference
    Ref(ObjRef),
}

impl PdfObject {
    /// Check if this is a null object.
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get as integer.
    pub const fn as_int(&self) -> Result<i64> {
        match self {
            Self::Int(n) => Ok(*n),
            _ => Err(PdfError::TypeError {
                expected: "int",
                got: self.type_name(),
            }),
        }
    }

    /// Get as name string.
    pub fn as_name(&self) -> Result<&str> {
        match self {
            Self::Name(s) => Ok(s),
            _ => Err(PdfError::TypeError {
                expected: "name",
                got: self.type_name(),
            }),
        }
    }

    /// Get as byte string.
    pub fn as_string(&self) -> Result<&[u8]> {
        match self {
            Self::String(s) => Ok(s),
            _ => Err(PdfError::TypeError {
                expected: "string",
                got: self.type_name(),
            }),
        }
    }

    /// Get as array.
    pub const fn as_array(&self) -> Result<&Vec<Self>> {
        match self {
            Self::Array(arr) => Ok(arr),
            _ => Err(PdfError::TypeError {
                expected: "array",
                got: self.type_name(),
            }),
        }
    }

    /// Get as dictionary. A stream answers with its attribute dictionary.
    pub fn as_dict(&self) -> Result<&Dict> {
        match self {
            Self::Dict(d) => Ok(d),
            Self::Stream(s) => Ok(&s.attrs),
            _ => Err(PdfError::TypeError {
                expected: "dict",
                got: self.type_name(),
            }),
        }
    }

    /// Get as stream.
    pub fn as_stream(&self) -> Result<&PdfStream> {
        match self {
            Self::Stream(s) => Ok(s),
            _ => Err(PdfError::TypeError {
                expected: "stream",
                got: self.type_name(),
            }),
        }
    }

    /// Get as object reference.
    pub const fn as_ref_obj(&self) -> Result<&ObjRef> {
        match self {
            Self::Ref(r) => Ok(r),
            _ => Err(PdfError::TypeError {
                expected: "ref",
                got: self.type_name(),
            }),
        }
    }

    /// Get type name for error messages.
    const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Real(_) => "real",
            Self::Name(_) => "name",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Dict(_) => "dict",
            Self::Stream(_) => "stream",
            Self::Ref(_) => "ref",
        }
    }
}

/// Dictionary helpers used all over the loaders. Missing keys and wrong
/// types both read as "absent"; the loaders treat bad trailer values as
/// zero, which is how real-world files expect to be tolerated.
pub trait DictExt {
    fn get_int(&self, key: &str) -> Option<i64>;
    fn get_name(&self, key: &str) -> Option<&str>;
    fn get_array(&self, key: &str) -> Option<&Vec<PdfObject>>;
    fn get_ref(&self, key: &str) -> Option<&ObjRef>;
}

impl DictExt for Dict {
    fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|o| o.as_int().ok())
    }

    fn get_name(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|o| o.as_name().ok())
    }

    fn get_array(&self, key: &str) -> Option<&Vec<PdfObject>> {
        self.get(key).and_then(|o| o.as_array().ok())
    }

    fn get_ref(&self, key: &str) -> Option<&ObjRef> {
        self.get(key).and_then(|o| o.as_ref_obj().ok())
    }
}

/// PDF indirect object reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjRef {
    /// Object number
    pub objnum: u32,
    /// Generation number
    pub gennum: u32,
}

impl ObjRef {
    /// Create a new object reference.
    pub const fn new(objnum: u32, gennum: u32) -> Self {
        Self { objnum, gennum }
    }
}

/// PDF stream - dictionary attributes + raw (possibly encoded) data.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfStream {
    /// Stream dictionary attributes
    pub attrs: Dict,
    /// Raw (filtered, possibly encrypted) data
    rawdata: Bytes,
    /// Whether rawdata has already been decrypted
    rawdata_decrypted: bool,
    /// Object number (set when the stream belongs to the document)
    pub objnum: Option<u32>,
    /// Generation number
    pub gennum: Option<u32>,
}

impl PdfStream {
    /// Create a new stream.
    pub fn new(attrs: Dict, rawdata: impl Into<Bytes>) -> Self {
        Self {
            attrs,
            rawdata: rawdata.into(),
            rawdata_decrypted: false,
            objnum: None,
            gennum: None,
        }
    }

    /// Set object and generation number.
    pub fn set_objnum(&mut self, objnum: u32, gennum: u32) {
        self.objnum = Some(objnum);
        self.gennum = Some(gennum);
    }

    /// Get raw (undecoded) data.
    pub fn rawdata(&self) -> &[u8] {
        self.rawdata.as_ref()
    }

    /// Get raw data as shared bytes.
    pub fn rawdata_bytes(&self) -> Bytes {
        self.rawdata.clone()
    }

    /// Check if rawdata has been decrypted already.
    pub const fn rawdata_is_decrypted(&self) -> bool {
        self.rawdata_decrypted
    }

    /// Replace rawdata and mark it as decrypted.
    pub fn set_rawdata_decrypted(&mut self, data: Vec<u8>) {
        self.rawdata = Bytes::from(data);
        self.rawdata_decrypted = true;
    }

    /// Get attribute by name.
    pub fn get(&self, name: &str) -> Option<&PdfObject> {
        self.attrs.get(name)
    }

    /// The stream's /Type name, if any.
    pub fn type_name(&self) -> Option<&str> {
        self.attrs.get_name("Type")
    }
}
