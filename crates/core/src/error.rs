//! Error types for orinoco PDF parsing.

use thiserror::Error;

/// Primary error type for PDF parsing operations.
///
/// The first three variants are the only ones that escape
/// `DocumentParser::start_parse`: everything else is handled inside a
/// loader strategy and at worst makes a single object unresolvable.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Document structure is damaged beyond recovery (bad header,
    /// cyclic cross-reference chain, rebuild found no trailer/root).
    #[error("unrecoverable document structure: {0}")]
    Format(String),

    /// An /Encrypt dictionary names a security filter we do not support.
    #[error("unsupported security handler: {0}")]
    Handler(String),

    /// Encryption handshake failed; the caller may re-prompt for a password.
    #[error("password authentication failed")]
    Password,

    #[error("invalid token at position {pos}: {msg}")]
    TokenError { pos: usize, msg: String },

    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("type error: expected {expected}, got {got}")]
    TypeError {
        expected: &'static str,
        got: &'static str,
    },

    #[error("PDF object not found: {0}")]
    ObjectNotFound(u32),

    #[error("PDF syntax error: {0}")]
    SyntaxError(String),

    #[error("decode error: {0}")]
    DecodeError(String),

    #[error("encryption error: {0}")]
    EncryptionError(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias for PdfError.
pub type Result<T> = std::result::Result<T, PdfError>;
