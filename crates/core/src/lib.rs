//! orinoco - PDF cross-reference parsing and lazy object resolution.
//!
//! Turns an untrusted, possibly corrupt byte stream into a navigable
//! graph of typed objects. Supports classic xref tables, xref streams,
//! incremental updates, object streams, and a brute-force recovery
//! scan for files whose index structures cannot be trusted.

pub mod codec;
pub mod document;
pub mod error;
pub mod model;
pub mod parser;

pub use document::parser::DocumentParser;
pub use document::xref::{CrossRefTable, ObjectInfo, ObjectKind};
pub use document::Document;
pub use error::{PdfError, Result};
pub use model::objects::{ObjRef, PdfObject, PdfStream};
