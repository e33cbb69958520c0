//! PDF syntax scanner.
//!
//! Slice-based tokenizer over raw PDF bytes. Two levels of access:
//! `next_token` produces typed tokens for object parsing, `next_word`
//! produces raw words with numeric classification for the
//! cross-reference machinery (subsection headers, startxref offsets,
//! spot checks).

use crate::error::{PdfError, Result};

/// Token types produced by the scanner.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Integer value
    Int(i64),
    /// Floating point value
    Real(f64),
    /// Boolean value
    Bool(bool),
    /// Literal name (e.g., /Name)
    Literal(String),
    /// String (literal or hex)
    String(Vec<u8>),
    /// Keyword or delimiter (e.g., obj, endobj, <<, [)
    Keyword(Vec<u8>),
}

/// A raw word with numeric classification.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    /// The word's bytes.
    pub bytes: Vec<u8>,
    /// Whether the word is an unsigned decimal number.
    pub is_number: bool,
    /// Byte position where the word began.
    pub pos: usize,
}

impl Word {
    /// Parse the word as an unsigned integer, if it is one.
    pub fn as_u64(&self) -> Option<u64> {
        if !self.is_number {
            return None;
        }
        std::str::from_utf8(&self.bytes).ok()?.parse().ok()
    }
}

/// Slice-based PDF tokenizer.
pub struct Lexer<'a> {
    data: &'a [u8],
    pos: usize,
    /// Position where the last token began
    token_pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            token_pos: 0,
        }
    }

    /// Current position in the slice.
    pub fn tell(&self) -> usize {
        self.pos
    }

    /// Set current position.
    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
        self.token_pos = pos;
    }

    /// Position where the most recent token/word began.
    pub fn token_pos(&self) -> usize {
        self.token_pos
    }

    /// Get remaining unscanned data.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos.min(self.data.len())..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.data.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    /// Check if byte is PDF whitespace.
    pub fn is_whitespace(b: u8) -> bool {
        matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b'\x00' | b'\x0c')
    }

    /// Check if byte is a PDF delimiter.
    pub fn is_delimiter(b: u8) -> bool {
        matches!(
            b,
            b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
        )
    }

    fn is_regular(b: u8) -> bool {
        !Self::is_whitespace(b) && !Self::is_delimiter(b)
    }

    /// Skip whitespace and %-comments.
    pub fn skip_whitespace(&mut self) {
        while self.pos < self.data.len() {
            let b = self.data[self.pos];
            if b == b'%' {
                while self.pos < self.data.len()
                    && self.data[self.pos] != b'\n'
                    && self.data[self.pos] != b'\r'
                {
                    self.pos += 1;
                }
                continue;
            }
            if !Self::is_whitespace(b) {
                return;
            }
            self.pos += 1;
        }
    }

    /// Get the next raw word: a run of regular characters, or a single
    /// delimiter ("<<" and ">>" count as one word). Returns None at end
    /// of data.
    pub fn next_word(&mut self) -> Option<Word> {
        self.skip_whitespace();
        if self.at_end() {
            return None;
        }
        self.token_pos = self.pos;
        let b = self.peek()?;

        if Self::is_delimiter(b) {
            if (b == b'<' && self.peek_at(1) == Some(b'<'))
                || (b == b'>' && self.peek_at(1) == Some(b'>'))
            {
                self.pos += 2;
            } else {
                self.pos += 1;
            }
            return Some(Word {
                bytes: self.data[self.token_pos..self.pos].to_vec(),
                is_number: false,
                pos: self.token_pos,
            });
        }

        while let Some(c) = self.peek() {
            if !Self::is_regular(c) {
                break;
            }
            self.pos += 1;
        }
        let bytes = &self.data[self.token_pos..self.pos];
        let is_number = !bytes.is_empty() && bytes.iter().all(u8::is_ascii_digit);
        Some(Word {
            bytes: bytes.to_vec(),
            is_number,
            pos: self.token_pos,
        })
    }

    /// Get next typed token.
    pub fn next_token(&mut self) -> Option<Result<Token>> {
        self.skip_whitespace();
        if self.at_end() {
            return None;
        }
        self.token_pos = self.pos;
        let b = self.peek()?;

        let result = match b {
            b'/' => self.parse_literal(),
            b'(' => self.parse_string(),
            b'<' => {
                if self.peek_at(1) == Some(b'<') {
                    self.pos += 2;
                    Ok(Token::Keyword(b"<<".to_vec()))
                } else {
                    self.parse_hex_string()
                }
            }
            b'>' => {
                if self.peek_at(1) == Some(b'>') {
                    self.pos += 2;
                    Ok(Token::Keyword(b">>".to_vec()))
                } else {
                    self.pos += 1;
                    Ok(Token::Keyword(b">".to_vec()))
                }
            }
            b'[' | b']' | b'{' | b'}' => {
                self.pos += 1;
                Ok(Token::Keyword(vec![b]))
            }
            b'+' | b'-' => {
                if matches!(self.peek_at(1), Some(c) if c.is_ascii_digit() || c == b'.') {
                    self.parse_number()
                } else {
                    self.parse_keyword()
                }
            }
            b'.' => {
                if matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
                    self.parse_number()
                } else {
                    self.parse_keyword()
                }
            }
            c if c.is_ascii_digit() => self.parse_number(),
            b')' | b'%' => {
                // Stray delimiter in object context
                self.pos += 1;
                Ok(Token::Keyword(vec![b]))
            }
            _ => self.parse_keyword(),
        };

        Some(result)
    }

    /// Parse a literal name (/Name) with #xx hex escapes.
    fn parse_literal(&mut self) -> Result<Token> {
        self.advance(); // skip '/'
        let mut name = Vec::new();

        while let Some(b) = self.peek() {
            if Self::is_whitespace(b) || Self::is_delimiter(b) {
                break;
            }
            if b == b'#' {
                let h1 = self.peek_at(1);
                let h2 = self.peek_at(2);
                if let (Some(c1), Some(c2)) = (h1, h2) {
                    if c1.is_ascii_hexdigit() && c2.is_ascii_hexdigit() {
                        self.pos += 3;
                        name.push(hex_nibble(c1) << 4 | hex_nibble(c2));
                        continue;
                    }
                }
                // Invalid hex escape: drop the '#', keep following chars
                self.advance();
            } else {
                name.push(self.advance().unwrap_or_default());
            }
        }

        Ok(Token::Literal(String::from_utf8_lossy(&name).into_owned()))
    }

    /// Parse an integer or real number.
    fn parse_number(&mut self) -> Result<Token> {
        let start = self.pos;
        let mut has_dot = false;

        if matches!(self.peek(), Some(b'+') | Some(b'-')) {
            self.advance();
        }
        while let Some(b) = self.peek() {
            if b.is_ascii_digit() {
                self.advance();
            } else if b == b'.' && !has_dot {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        let s = std::str::from_utf8(&self.data[start..self.pos]).map_err(|_| {
            PdfError::TokenError {
                pos: start,
                msg: "invalid number".into(),
            }
        })?;

        if has_dot {
            let val: f64 = s.parse().map_err(|_| PdfError::TokenError {
                pos: start,
                msg: format!("invalid real: {s}"),
            })?;
            Ok(Token::Real(val))
        } else {
            let val: i64 = s.parse().map_err(|_| PdfError::TokenError {
                pos: start,
                msg: format!("invalid int: {s}"),
            })?;
            Ok(Token::Int(val))
        }
    }

    /// Parse a literal string (...) with escapes and nesting.
    fn parse_string(&mut self) -> Result<Token> {
        self.advance(); // skip '('
        let mut result = Vec::new();
        let mut depth = 1usize;

        while depth > 0 {
            match self.advance() {
                Some(b'(') => {
                    depth += 1;
                    result.push(b'(');
                }
                Some(b')') => {
                    depth -= 1;
                    if depth > 0 {
                        result.push(b')');
                    }
                }
                Some(b'\\') => match self.advance() {
                    Some(b'n') => result.push(b'\n'),
                    Some(b'r') => result.push(b'\r'),
                    Some(b't') => result.push(b'\t'),
                    Some(b'b') => result.push(0x08),
                    Some(b'f') => result.push(0x0c),
                    Some(b'(') => result.push(b'('),
                    Some(b')') => result.push(b')'),
                    Some(b'\\') => result.push(b'\\'),
                    Some(b'\r') => {
                        // Line continuation
                        if self.peek() == Some(b'\n') {
                            self.advance();
                        }
                    }
                    Some(b'\n') => {}
                    Some(c) if (b'0'..b'8').contains(&c) => {
                        let mut octal = u32::from(c - b'0');
                        for _ in 0..2 {
                            match self.peek() {
                                Some(d) if (b'0'..b'8').contains(&d) => {
                                    self.advance();
                                    octal = octal * 8 + u32::from(d - b'0');
                                }
                                _ => break,
                            }
                        }
                        result.push((octal & 0xff) as u8);
                    }
                    Some(c) => result.push(c),
                    None => return Err(PdfError::UnexpectedEof),
                },
                Some(c) => result.push(c),
                None => return Err(PdfError::UnexpectedEof),
            }
        }

        Ok(Token::String(result))
    }

    /// Parse a hex string <...>.
    fn parse_hex_string(&mut self) -> Result<Token> {
        self.advance(); // skip '<'
        let mut result = Vec::new();
        let mut pending: Option<u8> = None;

        loop {
            match self.peek() {
                Some(b'>') => {
                    self.pos += 1;
                    break;
                }
                Some(c) if c.is_ascii_hexdigit() => {
                    self.pos += 1;
                    let nibble = hex_nibble(c);
                    if let Some(high) = pending.take() {
                        result.push(high << 4 | nibble);
                    } else {
                        pending = Some(nibble);
                    }
                }
                Some(c) if Self::is_whitespace(c) => {
                    self.pos += 1;
                }
                Some(_) => break,
                None => return Err(PdfError::UnexpectedEof),
            }
        }

        // Odd trailing digit means an implied low zero nibble
        if let Some(high) = pending {
            result.push(high << 4);
        }

        Ok(Token::String(result))
    }

    /// Parse a bare keyword.
    fn parse_keyword(&mut self) -> Result<Token> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if !Self::is_regular(b) {
                break;
            }
            self.advance();
        }
        let bytes = &self.data[start..self.pos];

        match bytes {
            b"true" => Ok(Token::Bool(true)),
            b"false" => Ok(Token::Bool(false)),
            _ => Ok(Token::Keyword(bytes.to_vec())),
        }
    }
}

fn hex_nibble(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        b'A'..=b'F' => c - b'A' + 10,
        _ => 0,
    }
}

/// Search backwards for the last occurrence of `needle` within the final
/// `window` bytes of `data`. Used to locate the trailing `startxref`.
pub fn find_backwards(data: &[u8], needle: &[u8], window: usize) -> Option<usize> {
    if data.len() < needle.len() || needle.is_empty() {
        return None;
    }
    let search_start = data.len().saturating_sub(window);
    let hay = &data[search_start..];
    hay.windows(needle.len())
        .rposition(|w| w == needle)
        .map(|pos| search_start + pos)
}

/// Locate the `%PDF-` header within the first kilobyte of the file and
/// return its byte offset. Real files occasionally carry junk before the
/// header; positions after it are still absolute file offsets.
pub fn find_header_offset(data: &[u8]) -> Option<usize> {
    const MARKER: &[u8] = b"%PDF-";
    let limit = data.len().min(1024);
    data.get(..limit)?
        .windows(MARKER.len())
        .position(|w| w == MARKER)
}

/// Read the two version digits from a `%PDF-x.y` header at `offset`,
/// e.g. 17 for "%PDF-1.7". Missing digits read as zero.
pub fn parse_file_version(data: &[u8], offset: usize) -> u32 {
    let mut version = 0;
    if let Some(&major) = data.get(offset + 5) {
        if major.is_ascii_digit() {
            version = u32::from(major - b'0') * 10;
        }
    }
    if let Some(&minor) = data.get(offset + 7) {
        if minor.is_ascii_digit() {
            version += u32::from(minor - b'0');
        }
    }
    version
}
