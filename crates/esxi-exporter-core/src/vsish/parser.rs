//! Parser for `vsish -p` output.
//!
//! `vsish -p -e cat` prints one brace-delimited record per requested path,
//! back to back. Records hold quoted strings, integers (decimal or hex),
//! floats, nested `{ key: value }` structs and `[ ... ]` arrays.
//!
//! These are pure functions over the command output, so they are easy to test
//! with string inputs. Nothing here evaluates the text; anything outside the
//! grammar is a [`ParseError`].

use std::collections::HashMap;

use tracing::warn;

/// Nesting limit for structs and arrays.
const MAX_DEPTH: usize = 64;

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    /// Byte offset into the input where parsing stopped.
    pub offset: usize,
}

impl ParseError {
    pub fn new(msg: impl Into<String>, offset: usize) -> Self {
        Self {
            message: msg.into(),
            offset,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error at offset {}: {}", self.offset, self.message)
    }
}

impl std::error::Error for ParseError {}

/// A parsed `vsish` value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    /// Struct fields in source order.
    Struct(Vec<(String, Value)>),
    Array(Vec<Value>),
}

impl Value {
    /// Looks up a struct field by name. `None` for non-structs.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields()?
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    /// Struct fields, or `None` if this is not a struct.
    pub fn fields(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Struct(fields) => Some(fields),
            _ => None,
        }
    }

    /// Numeric value as an integer.
    ///
    /// Floats are truncated toward zero (saturating at the `i64` bounds).
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Float(v) => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// Parses a blob of concatenated top-level records.
///
/// Every top-level value must be a struct. An empty (or whitespace-only)
/// input yields an empty vector.
pub fn parse_document(input: &str) -> Result<Vec<Value>, ParseError> {
    let mut parser = Parser::new(input);
    let mut records = Vec::new();

    parser.skip_ws();
    while !parser.at_end() {
        if parser.peek() != Some(b'{') {
            return Err(parser.error("expected '{' at start of record"));
        }
        records.push(parser.parse_value(0)?);
        parser.skip_ws();
    }

    Ok(records)
}

/// Parses the output of one batched `cat` and keys the records by path.
///
/// The i-th record belongs to the i-th path. If the output does not parse,
/// or the record count differs from `paths.len()`, the whole batch is
/// discarded and an empty map is returned.
pub fn parse_batch(input: &str, paths: &[String]) -> HashMap<String, Value> {
    let records = match parse_document(input) {
        Ok(records) => records,
        Err(e) => {
            warn!(error = %e, paths = paths.len(), "discarding batch: unparsable vsish output");
            return HashMap::new();
        }
    };

    if records.len() != paths.len() {
        warn!(
            paths = paths.len(),
            records = records.len(),
            "discarding batch: record count does not match requested paths"
        );
        return HashMap::new();
    }

    paths.iter().cloned().zip(records).collect()
}

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn error(&self, msg: impl Into<String>) -> ParseError {
        ParseError::new(msg, self.pos)
    }

    fn skip_ws(&mut self) {
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn expect(&mut self, byte: u8) -> Result<(), ParseError> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", byte as char)))
        }
    }

    fn parse_value(&mut self, depth: usize) -> Result<Value, ParseError> {
        if depth > MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        match self.peek() {
            Some(b'{') => self.parse_struct(depth),
            Some(b'[') => self.parse_array(depth),
            Some(q @ (b'"' | b'\'')) => self.parse_string(q).map(Value::Str),
            Some(b'-' | b'+' | b'0'..=b'9') => self.parse_number(),
            Some(b) => Err(self.error(format!("unexpected character '{}'", b as char))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn parse_struct(&mut self, depth: usize) -> Result<Value, ParseError> {
        self.expect(b'{')?;
        let mut fields = Vec::new();

        loop {
            self.skip_ws();
            if self.peek() == Some(b'}') {
                self.pos += 1;
                return Ok(Value::Struct(fields));
            }

            let key = self.parse_key()?;
            self.skip_ws();
            self.expect(b':')?;
            self.skip_ws();
            let value = self.parse_value(depth + 1)?;
            fields.push((key, value));

            self.skip_ws();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {}
                Some(_) => return Err(self.error("expected ',' or '}' in struct")),
                None => return Err(self.error("unterminated struct")),
            }
        }
    }

    fn parse_array(&mut self, depth: usize) -> Result<Value, ParseError> {
        self.expect(b'[')?;
        let mut items = Vec::new();

        loop {
            self.skip_ws();
            if self.peek() == Some(b']') {
                self.pos += 1;
                return Ok(Value::Array(items));
            }

            items.push(self.parse_value(depth + 1)?);

            self.skip_ws();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b']') => {}
                Some(_) => return Err(self.error("expected ',' or ']' in array")),
                None => return Err(self.error("unterminated array")),
            }
        }
    }

    fn parse_key(&mut self) -> Result<String, ParseError> {
        match self.peek() {
            Some(q @ (b'"' | b'\'')) => self.parse_string(q),
            Some(b) if b.is_ascii_alphabetic() || b == b'_' => {
                let start = self.pos;
                while let Some(b) = self.peek() {
                    if b.is_ascii_alphanumeric() || b == b'_' {
                        self.pos += 1;
                    } else {
                        break;
                    }
                }
                Ok(self.src[start..self.pos].to_string())
            }
            Some(_) => Err(self.error("expected field name")),
            None => Err(self.error("unterminated struct")),
        }
    }

    fn parse_string(&mut self, quote: u8) -> Result<String, ParseError> {
        let open = self.pos;
        self.expect(quote)?;
        let mut out = String::new();
        let mut chunk_start = self.pos;

        // Only ASCII bytes are inspected, so slice boundaries stay on UTF-8
        // character boundaries.
        while let Some(b) = self.peek() {
            if b == quote {
                out.push_str(&self.src[chunk_start..self.pos]);
                self.pos += 1;
                return Ok(out);
            }
            if b == b'\\' {
                out.push_str(&self.src[chunk_start..self.pos]);
                self.pos += 1;
                match self.peek() {
                    Some(b'n') => out.push('\n'),
                    Some(b't') => out.push('\t'),
                    Some(b'r') => out.push('\r'),
                    Some(e @ (b'"' | b'\'' | b'\\')) => out.push(e as char),
                    Some(_) => {
                        // Unknown escape: keep the backslash, the next
                        // character is picked up by the following chunk.
                        out.push('\\');
                        chunk_start = self.pos;
                        continue;
                    }
                    None => break,
                }
                self.pos += 1;
                chunk_start = self.pos;
                continue;
            }
            self.pos += 1;
        }

        Err(ParseError::new("unterminated string", open))
    }

    fn parse_number(&mut self) -> Result<Value, ParseError> {
        let start = self.pos;
        let negative = match self.peek() {
            Some(b'-') => {
                self.pos += 1;
                true
            }
            Some(b'+') => {
                self.pos += 1;
                false
            }
            _ => false,
        };

        if self.peek() == Some(b'0') && matches!(self.bytes.get(self.pos + 1), Some(b'x' | b'X')) {
            self.pos += 2;
            let digits_start = self.pos;
            while self.peek().is_some_and(|b| b.is_ascii_hexdigit()) {
                self.pos += 1;
            }
            let digits = &self.src[digits_start..self.pos];
            let magnitude = u64::from_str_radix(digits, 16)
                .map_err(|_| ParseError::new("invalid hex number", start))?;
            return Ok(signed_value(magnitude, negative));
        }

        let digits_start = self.pos;
        self.consume_digits();
        if self.pos == digits_start {
            return Err(ParseError::new("expected digits", start));
        }

        let mut is_float = false;
        if self.peek() == Some(b'.') {
            is_float = true;
            self.pos += 1;
            self.consume_digits();
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            is_float = true;
            self.pos += 1;
            if matches!(self.peek(), Some(b'-' | b'+')) {
                self.pos += 1;
            }
            let exp_start = self.pos;
            self.consume_digits();
            if self.pos == exp_start {
                return Err(ParseError::new("invalid exponent", start));
            }
        }

        let text = &self.src[start..self.pos];
        if !is_float {
            if let Ok(v) = text.parse::<i64>() {
                return Ok(Value::Int(v));
            }
        }
        text.parse::<f64>()
            .map(Value::Float)
            .map_err(|_| ParseError::new(format!("invalid number '{}'", text), start))
    }

    fn consume_digits(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
    }
}

/// Applies a sign to a hex magnitude; values beyond `i64` become floats.
fn signed_value(magnitude: u64, negative: bool) -> Value {
    match i64::try_from(magnitude) {
        Ok(v) if negative => Value::Int(-v),
        Ok(v) => Value::Int(v),
        Err(_) if negative => Value::Float(-(magnitude as f64)),
        Err(_) => Value::Float(magnitude as f64),
    }
}
