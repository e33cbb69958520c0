//! PDF data model types.
//!
//! - `objects` - PDF object types (PdfObject, PdfStream, ObjRef)

pub mod objects;

pub use objects::{Dict, DictExt, ObjRef, PdfObject, PdfStream};
