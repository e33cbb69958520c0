//! Token stream to `PdfObject` values.

use crate::error::{PdfError, Result};
use crate::model::{Dict, DictExt, ObjRef, PdfObject, PdfStream};
use crate::parser::lexer::{Lexer, Token};
use bytes::Bytes;

/// Recursion limit for nested arrays/dictionaries.
const MAX_DEPTH: usize = 64;

/// Parses PDF objects from a byte slice.
///
/// Indirect references need three tokens of lookahead (`num num R`), so
/// consumed tokens can be pushed back together with the position they
/// started at.
pub struct ObjectParser<'a> {
    lexer: Lexer<'a>,
    data: &'a [u8],
    pushback: Vec<(usize, Token)>,
}

impl<'a> ObjectParser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            lexer: Lexer::new(data),
            data,
            pushback: Vec::new(),
        }
    }

    /// Create a parser positioned at `pos`.
    pub fn new_at(data: &'a [u8], pos: usize) -> Self {
        let mut parser = Self::new(data);
        parser.lexer.set_pos(pos);
        parser
    }

    /// Current scan position.
    pub fn tell(&self) -> usize {
        match self.pushback.last() {
            Some((pos, _)) => *pos,
            None => self.lexer.tell(),
        }
    }

    /// Reposition the parser, discarding lookahead.
    pub fn set_pos(&mut self, pos: usize) {
        self.pushback.clear();
        self.lexer.set_pos(pos);
    }

    fn next_token(&mut self) -> Result<(usize, Token)> {
        if let Some(entry) = self.pushback.pop() {
            return Ok(entry);
        }
        match self.lexer.next_token() {
            Some(Ok(token)) => Ok((self.lexer.token_pos(), token)),
            Some(Err(e)) => Err(e),
            None => Err(PdfError::UnexpectedEof),
        }
    }

    fn push_back(&mut self, pos: usize, token: Token) {
        self.pushback.push((pos, token));
    }

    /// Parse the next complete object.
    pub fn parse_object(&mut self) -> Result<PdfObject> {
        self.parse_object_depth(0)
    }

    fn parse_object_depth(&mut self, depth: usize) -> Result<PdfObject> {
        if depth > MAX_DEPTH {
            return Err(PdfError::SyntaxError("object nesting too deep".into()));
        }
        let (pos, token) = self.next_token()?;
        match token {
            Token::Int(n) => self.parse_int_or_ref(pos, n),
            Token::Real(v) => Ok(PdfObject::Real(v)),
            Token::Bool(b) => Ok(PdfObject::Bool(b)),
            Token::Literal(name) => Ok(PdfObject::Name(name)),
            Token::String(s) => Ok(PdfObject::String(s)),
            Token::Keyword(kw) => match kw.as_slice() {
                b"null" => Ok(PdfObject::Null),
                b"[" => self.parse_array(depth),
                b"<<" => self.parse_dict_or_stream(depth),
                _ => Err(PdfError::SyntaxError(format!(
                    "unexpected keyword '{}' at {pos}",
                    String::from_utf8_lossy(&kw)
                ))),
            },
        }
    }

    /// An integer may begin an indirect reference: `objnum gennum R`.
    fn parse_int_or_ref(&mut self, _pos: usize, n: i64) -> Result<PdfObject> {
        let (pos2, second) = match self.next_token() {
            Ok(t) => t,
            Err(PdfError::UnexpectedEof) => return Ok(PdfObject::Int(n)),
            Err(e) => return Err(e),
        };
        if let Token::Int(g) = second {
            let (pos3, third) = match self.next_token() {
                Ok(t) => t,
                Err(PdfError::UnexpectedEof) => {
                    self.push_back(pos2, second);
                    return Ok(PdfObject::Int(n));
                }
                Err(e) => return Err(e),
            };
            if third == Token::Keyword(b"R".to_vec()) && n >= 0 && g >= 0 {
                return Ok(PdfObject::Ref(ObjRef::new(n as u32, g as u32)));
            }
            self.push_back(pos3, third);
            self.push_back(pos2, Token::Int(g));
        } else {
            self.push_back(pos2, second);
        }
        Ok(PdfObject::Int(n))
    }

    fn parse_array(&mut self, depth: usize) -> Result<PdfObject> {
        let mut items = Vec::new();
        loop {
            let (pos, token) = self.next_token()?;
            if token == Token::Keyword(b"]".to_vec()) {
                return Ok(PdfObject::Array(items));
            }
            self.push_back(pos, token);
            items.push(self.parse_object_depth(depth + 1)?);
        }
    }

    fn parse_dict_or_stream(&mut self, depth: usize) -> Result<PdfObject> {
        let mut dict = Dict::new();
        loop {
            let (pos, token) = self.next_token()?;
            match token {
                Token::Keyword(ref kw) if kw == b">>" => break,
                Token::Literal(key) => {
                    let value = self.parse_object_depth(depth + 1)?;
                    dict.insert(key, value);
                }
                _ => {
                    return Err(PdfError::SyntaxError(format!(
                        "expected name key in dict at {pos}"
                    )))
                }
            }
        }

        // A dict followed by the stream keyword is a stream object.
        match self.next_token() {
            Ok((pos, token)) => {
                if token == Token::Keyword(b"stream".to_vec()) {
                    return self.parse_stream_body(dict);
                }
                self.push_back(pos, token);
            }
            Err(PdfError::UnexpectedEof) => {}
            Err(e) => return Err(e),
        }
        Ok(PdfObject::Dict(dict))
    }

    /// Read stream payload after the `stream` keyword. A declared
    /// /Length that is a direct integer and lands on `endstream` is
    /// trusted; otherwise the payload extent is found by scanning.
    fn parse_stream_body(&mut self, dict: Dict) -> Result<PdfObject> {
        let mut start = self.lexer.tell();
        // The keyword is followed by CRLF or LF
        if self.data.get(start) == Some(&b'\r') {
            start += 1;
        }
        if self.data.get(start) == Some(&b'\n') {
            start += 1;
        }

        let declared = dict.get_int("Length").and_then(|n| usize::try_from(n).ok());
        let end = match declared {
            Some(len)
                if start + len <= self.data.len()
                    && endstream_follows(self.data, start + len) =>
            {
                start + len
            }
            _ => scan_for_endstream(self.data, start)
                .ok_or(PdfError::UnexpectedEof)?,
        };

        let payload = Bytes::copy_from_slice(&self.data[start..end]);
        self.lexer.set_pos(end);
        // Consume the endstream keyword
        let (_, token) = self.next_token()?;
        if token != Token::Keyword(b"endstream".to_vec()) {
            return Err(PdfError::SyntaxError("missing endstream".into()));
        }
        Ok(PdfObject::Stream(Box::new(PdfStream::new(dict, payload))))
    }

    /// Parse a complete `objnum gennum obj ... endobj` definition
    /// starting at the current position. Returns the numbers and body.
    pub fn parse_indirect_object(&mut self) -> Result<(u32, u32, PdfObject)> {
        let (pos, first) = self.next_token()?;
        let objnum = match first {
            Token::Int(n) if n >= 0 => n as u32,
            _ => {
                return Err(PdfError::SyntaxError(format!(
                    "expected object number at {pos}"
                )))
            }
        };
        let (pos, second) = self.next_token()?;
        let gennum = match second {
            Token::Int(n) if n >= 0 => n as u32,
            _ => {
                return Err(PdfError::SyntaxError(format!(
                    "expected generation number at {pos}"
                )))
            }
        };
        let (pos, third) = self.next_token()?;
        if third != Token::Keyword(b"obj".to_vec()) {
            return Err(PdfError::SyntaxError(format!(
                "expected obj keyword at {pos}"
            )));
        }

        let mut body = self.parse_object()?;
        if let PdfObject::Stream(ref mut stream) = body {
            stream.set_objnum(objnum, gennum);
        }

        // endobj is customary but its absence is tolerated
        if let Ok((pos, token)) = self.next_token() {
            if token != Token::Keyword(b"endobj".to_vec()) {
                self.push_back(pos, token);
            }
        }
        Ok((objnum, gennum, body))
    }
}

fn endstream_follows(data: &[u8], mut pos: usize) -> bool {
    while pos < data.len() && Lexer::is_whitespace(data[pos]) {
        pos += 1;
    }
    data[pos..].starts_with(b"endstream")
}

fn scan_for_endstream(data: &[u8], start: usize) -> Option<usize> {
    let hay = data.get(start..)?;
    let mut offset = hay
        .windows(b"endstream".len())
        .position(|w| w == b"endstream")?;
    // Trim the EOL that precedes the keyword
    if offset > 0 && hay[offset - 1] == b'\n' {
        offset -= 1;
    }
    if offset > 0 && hay[offset - 1] == b'\r' {
        offset -= 1;
    }
    Some(start + offset)
}
