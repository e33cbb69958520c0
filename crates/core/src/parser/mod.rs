//! PDF syntax parsing.
//!
//! - `lexer` - low-level tokenizer over raw bytes
//! - `object_parser` - token stream to `PdfObject` values

pub mod lexer;
pub mod object_parser;

pub use lexer::{Lexer, Token, Word};
pub use object_parser::ObjectParser;
