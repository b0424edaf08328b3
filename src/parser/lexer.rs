use crate::error::{PdfError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Null,
    True,
    False,
    Int(i64),
    Real(f64),

    // Strings
    String(Vec<u8>),
    HexString(Vec<u8>),

    // Names
    Name(String),

    // Delimiters
    ArrayStart, // [
    ArrayEnd,   // ]
    DictStart,  // <<
    DictEnd,    // >>

    // Object markers
    Obj,       // obj
    EndObj,    // endobj
    Stream,    // stream
    EndStream, // endstream

    // File structure
    Ref,       // R
    XRef,      // xref
    Trailer,   // trailer
    StartXRef, // startxref

    /// Any other bare word: xref entry flags, content stream operators
    Keyword(String),
}

pub struct Lexer<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.data.len());
    }

    /// Peek at current byte without consuming
    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    /// Read and consume one byte
    fn read_byte(&mut self) -> Result<u8> {
        let b = self.peek().ok_or_else(|| PdfError::Parse {
            position: self.pos,
            message: "Unexpected end of file".into(),
        })?;
        self.pos += 1;
        Ok(b)
    }

    /// Skip whitespace and comments
    pub fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            match b {
                b' ' | b'\t' | b'\n' | b'\r' | 0x0C | 0x00 => self.pos += 1,
                b'%' => {
                    while let Some(c) = self.peek() {
                        self.pos += 1;
                        if c == b'\n' || c == b'\r' {
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
    }

    /// Skip the single end-of-line marker that follows the `stream` keyword.
    /// Stream data may itself start with whitespace bytes, so nothing more is consumed.
    pub fn skip_eol(&mut self) {
        while self.peek() == Some(b' ') {
            self.pos += 1;
        }
        match self.peek() {
            Some(b'\r') => {
                self.pos += 1;
                if self.peek() == Some(b'\n') {
                    self.pos += 1;
                }
            }
            Some(b'\n') => self.pos += 1,
            _ => {}
        }
    }

    /// Main entry point - get next token
    pub fn next_token(&mut self) -> Result<Option<Token>> {
        self.skip_whitespace();

        let Some(b) = self.peek() else {
            return Ok(None);
        };

        match b {
            b'[' => {
                self.pos += 1;
                Ok(Some(Token::ArrayStart))
            }
            b']' => {
                self.pos += 1;
                Ok(Some(Token::ArrayEnd))
            }
            b'<' => {
                self.pos += 1;
                if self.peek() == Some(b'<') {
                    self.pos += 1;
                    Ok(Some(Token::DictStart))
                } else {
                    self.read_hex_string().map(|s| Some(Token::HexString(s)))
                }
            }
            b'>' => {
                self.pos += 1;
                if self.peek() == Some(b'>') {
                    self.pos += 1;
                    Ok(Some(Token::DictEnd))
                } else {
                    Err(PdfError::Parse {
                        position: self.pos,
                        message: "Unexpected '>'".into(),
                    })
                }
            }
            b'(' => self.read_literal_string().map(|s| Some(Token::String(s))),
            b'/' => self.read_name().map(|n| Some(Token::Name(n))),
            b'+' | b'-' | b'.' | b'0'..=b'9' => self.read_number().map(Some),
            b'\'' | b'"' => {
                self.pos += 1;
                Ok(Some(Token::Keyword((b as char).to_string())))
            }
            b'a'..=b'z' | b'A'..=b'Z' => self.read_keyword().map(Some),
            _ => Err(PdfError::Parse {
                position: self.pos,
                message: format!("Unexpected byte: 0x{:02X}", b),
            }),
        }
    }

    /// Read integer or real number
    fn read_number(&mut self) -> Result<Token> {
        let start = self.pos;
        let mut has_decimal = false;

        if matches!(self.peek(), Some(b'+' | b'-')) {
            self.pos += 1;
        }

        while let Some(b) = self.peek() {
            match b {
                b'0'..=b'9' => self.pos += 1,
                b'.' if !has_decimal => {
                    has_decimal = true;
                    self.pos += 1;
                }
                _ => break,
            }
        }

        let num_str =
            std::str::from_utf8(&self.data[start..self.pos]).map_err(|_| PdfError::Parse {
                position: start,
                message: "Invalid number encoding".into(),
            })?;

        // A lone sign or dot is treated as zero, as most readers do
        if matches!(num_str, "+" | "-" | "." | "-." | "+.") {
            return Ok(Token::Int(0));
        }

        if has_decimal {
            let f: f64 = num_str.parse().map_err(|_| PdfError::Parse {
                position: start,
                message: format!("Invalid real number: {}", num_str),
            })?;
            Ok(Token::Real(f))
        } else {
            let n: i64 = num_str.parse().map_err(|_| PdfError::Parse {
                position: start,
                message: format!("Invalid integer: {}", num_str),
            })?;
            Ok(Token::Int(n))
        }
    }

    /// Read a bare word: a letter followed by letters, digits or `*`
    fn read_keyword(&mut self) -> Result<Token> {
        let start = self.pos;
        self.pos += 1;

        while let Some(b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'*') = self.peek() {
            self.pos += 1;
        }

        let keyword =
            std::str::from_utf8(&self.data[start..self.pos]).map_err(|_| PdfError::InvalidUtf8)?;

        Ok(match keyword {
            "null" => Token::Null,
            "true" => Token::True,
            "false" => Token::False,
            "obj" => Token::Obj,
            "endobj" => Token::EndObj,
            "stream" => Token::Stream,
            "endstream" => Token::EndStream,
            "R" => Token::Ref,
            "xref" => Token::XRef,
            "trailer" => Token::Trailer,
            "startxref" => Token::StartXRef,
            other => Token::Keyword(other.to_string()),
        })
    }

    /// Read literal string (...)
    fn read_literal_string(&mut self) -> Result<Vec<u8>> {
        self.pos += 1; // Skip opening '('

        let mut result = Vec::new();
        let mut depth = 1;

        while depth > 0 {
            let b = self.read_byte()?;

            match b {
                b'(' => {
                    depth += 1;
                    result.push(b);
                }
                b')' => {
                    depth -= 1;
                    if depth > 0 {
                        result.push(b);
                    }
                }
                b'\\' => {
                    let escaped = self.read_byte()?;
                    match escaped {
                        b'n' => result.push(b'\n'),
                        b'r' => result.push(b'\r'),
                        b't' => result.push(b'\t'),
                        b'b' => result.push(0x08),
                        b'f' => result.push(0x0C),
                        b'0'..=b'7' => {
                            let mut octal = (escaped - b'0') as u32;
                            for _ in 0..2 {
                                if let Some(d @ b'0'..=b'7') = self.peek() {
                                    self.pos += 1;
                                    octal = octal * 8 + (d - b'0') as u32;
                                } else {
                                    break;
                                }
                            }
                            result.push((octal & 0xFF) as u8);
                        }
                        b'\r' => {
                            // Line continuation
                            if self.peek() == Some(b'\n') {
                                self.pos += 1;
                            }
                        }
                        b'\n' => {}
                        // \( \) \\ and unknown escapes keep the escaped byte
                        _ => result.push(escaped),
                    }
                }
                _ => result.push(b),
            }
        }

        Ok(result)
    }

    /// Read hex string <...>
    fn read_hex_string(&mut self) -> Result<Vec<u8>> {
        // Opening '<' already consumed
        let mut hex_chars = Vec::new();

        loop {
            let b = self.read_byte()?;
            match b {
                b'>' => break,
                b'0'..=b'9' | b'a'..=b'f' | b'A'..=b'F' => hex_chars.push(b),
                b' ' | b'\t' | b'\n' | b'\r' | 0x0C | 0x00 => {}
                _ => {
                    return Err(PdfError::Parse {
                        position: self.pos - 1,
                        message: format!("Invalid hex char: 0x{:02X}", b),
                    });
                }
            }
        }

        if hex_chars.len() % 2 == 1 {
            hex_chars.push(b'0');
        }

        Ok(hex_chars
            .chunks(2)
            .map(|pair| (hex_value(pair[0]) << 4) | hex_value(pair[1]))
            .collect())
    }

    /// Read name /...
    fn read_name(&mut self) -> Result<String> {
        self.pos += 1; // Skip '/'

        let mut name = Vec::new();

        while let Some(b) = self.peek() {
            match b {
                b' ' | b'\t' | b'\n' | b'\r' | 0x0C | 0x00 | b'(' | b')' | b'<' | b'>' | b'['
                | b']' | b'{' | b'}' | b'/' | b'%' => break,

                b'#' => {
                    self.pos += 1;
                    let h1 = self.read_byte()?;
                    let h2 = self.read_byte()?;
                    name.push((hex_value(h1) << 4) | hex_value(h2));
                }

                _ => {
                    self.pos += 1;
                    name.push(b);
                }
            }
        }

        // Font names in the wild are not always UTF-8
        Ok(match String::from_utf8(name) {
            Ok(s) => s,
            Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
        })
    }
}

/// Convert hex digit to value
pub(crate) fn hex_value(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        b'A'..=b'F' => b - b'A' + 10,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_tokens() {
        let mut lexer = Lexer::new(b"42 3.14 true null");

        assert_eq!(lexer.next_token().unwrap(), Some(Token::Int(42)));
        assert_eq!(lexer.next_token().unwrap(), Some(Token::Real(3.14)));
        assert_eq!(lexer.next_token().unwrap(), Some(Token::True));
        assert_eq!(lexer.next_token().unwrap(), Some(Token::Null));
        assert_eq!(lexer.next_token().unwrap(), None);
    }

    #[test]
    fn test_string_with_escapes() {
        let mut lexer = Lexer::new(b"(Hello\\nWorld \\(x\\) \\101)");
        let token = lexer.next_token().unwrap().unwrap();
        assert_eq!(token, Token::String(b"Hello\nWorld (x) A".to_vec()));
    }

    #[test]
    fn test_nested_parens() {
        let mut lexer = Lexer::new(b"(a(b)c)");
        let token = lexer.next_token().unwrap().unwrap();
        assert_eq!(token, Token::String(b"a(b)c".to_vec()));
    }

    #[test]
    fn test_hex_string_with_whitespace() {
        let mut lexer = Lexer::new(b"<48 65 6C\n6C 6F>");
        let token = lexer.next_token().unwrap().unwrap();
        assert_eq!(token, Token::HexString(b"Hello".to_vec()));
    }

    #[test]
    fn test_name_with_hex_escape() {
        let mut lexer = Lexer::new(b"/Font#20Name");
        let token = lexer.next_token().unwrap().unwrap();
        assert_eq!(token, Token::Name("Font Name".into()));
    }

    #[test]
    fn test_content_operators() {
        let mut lexer = Lexer::new(b"T* f* ' \" re d0");
        let ops: Vec<Token> = std::iter::from_fn(|| lexer.next_token().unwrap()).collect();
        assert_eq!(
            ops,
            vec![
                Token::Keyword("T*".into()),
                Token::Keyword("f*".into()),
                Token::Keyword("'".into()),
                Token::Keyword("\"".into()),
                Token::Keyword("re".into()),
                Token::Keyword("d0".into()),
            ]
        );
    }

    #[test]
    fn test_skip_eol_keeps_leading_data_whitespace() {
        let mut lexer = Lexer::new(b"\r\n\n data");
        lexer.skip_eol();
        assert_eq!(lexer.position(), 2);
    }
}
