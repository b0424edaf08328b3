use crate::error::{PdfError, Result};
use crate::parser::lexer::{Lexer, Token};
use crate::types::{Dict, ObjRef, PdfObject};

/// One element of a content stream: an operand or the operator that consumes them
#[derive(Debug, Clone, PartialEq)]
pub enum ContentItem {
    Operand(PdfObject),
    Operator(String),
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    /// Lookahead buffer for handling "42 0 R" vs "42"
    peeked: Vec<Token>,
}

impl<'a> Parser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            lexer: Lexer::new(data),
            peeked: Vec::new(),
        }
    }

    pub fn position(&self) -> usize {
        self.lexer.position()
    }

    pub fn data(&self) -> &'a [u8] {
        self.lexer.data()
    }

    pub fn seek(&mut self, pos: usize) {
        self.lexer.seek(pos);
        self.peeked.clear();
    }

    /// Get next token (from buffer or lexer)
    pub fn next_token(&mut self) -> Result<Option<Token>> {
        if let Some(tok) = self.peeked.pop() {
            Ok(Some(tok))
        } else {
            self.lexer.next_token()
        }
    }

    /// Put token back for later
    fn push_back(&mut self, tok: Token) {
        self.peeked.push(tok);
    }

    /// Consume the next token and fail unless it equals `expected`
    pub fn expect(&mut self, expected: Token) -> Result<()> {
        match self.next_token()? {
            Some(tok) if tok == expected => Ok(()),
            other => Err(PdfError::Parse {
                position: self.position(),
                message: format!("Expected {:?}, got {:?}", expected, other),
            }),
        }
    }

    /// Parse a single PDF object
    pub fn parse_object(&mut self) -> Result<Option<PdfObject>> {
        let Some(token) = self.next_token()? else {
            return Ok(None);
        };

        match token {
            Token::Null => Ok(Some(PdfObject::Null)),
            Token::True => Ok(Some(PdfObject::Bool(true))),
            Token::False => Ok(Some(PdfObject::Bool(false))),
            Token::Real(f) => Ok(Some(PdfObject::Real(f))),
            Token::String(s) | Token::HexString(s) => Ok(Some(PdfObject::String(s))),
            Token::Name(n) => Ok(Some(PdfObject::Name(n))),
            Token::ArrayStart => self.parse_array(),
            Token::DictStart => self.parse_dict_or_stream(),
            Token::Int(n) => self.parse_int_or_ref(n),
            _ => Err(PdfError::Parse {
                position: self.position(),
                message: format!("Unexpected token: {:?}", token),
            }),
        }
    }

    /// Parse `<num> <gen> obj <object>` at the current position
    pub fn parse_indirect_object(&mut self) -> Result<(ObjRef, PdfObject)> {
        let start = self.position();
        let header = (self.next_token()?, self.next_token()?, self.next_token()?);
        let (Some(Token::Int(num)), Some(Token::Int(generation)), Some(Token::Obj)) = header else {
            return Err(PdfError::Parse {
                position: start,
                message: format!("Expected object header, got {:?}", header),
            });
        };

        let obj = self.parse_object()?.ok_or_else(|| PdfError::Parse {
            position: self.position(),
            message: "Expected object content".into(),
        })?;

        Ok((ObjRef::new(num as u32, generation as u16), obj))
    }

    /// Next operand or operator of a content stream
    pub fn next_content_item(&mut self) -> Result<Option<ContentItem>> {
        let Some(token) = self.next_token()? else {
            return Ok(None);
        };

        if let Token::Keyword(op) = token {
            return Ok(Some(ContentItem::Operator(op)));
        }

        self.push_back(token);
        Ok(self.parse_object()?.map(ContentItem::Operand))
    }

    /// Parse integer or reference (42 vs 42 0 R)
    fn parse_int_or_ref(&mut self, first: i64) -> Result<Option<PdfObject>> {
        let Some(tok2) = self.next_token()? else {
            return Ok(Some(PdfObject::Int(first)));
        };

        let Token::Int(second) = tok2 else {
            self.push_back(tok2);
            return Ok(Some(PdfObject::Int(first)));
        };

        let Some(tok3) = self.next_token()? else {
            self.push_back(Token::Int(second));
            return Ok(Some(PdfObject::Int(first)));
        };

        if tok3 == Token::Ref {
            Ok(Some(PdfObject::Ref(ObjRef::new(first as u32, second as u16))))
        } else {
            self.push_back(tok3);
            self.push_back(Token::Int(second));
            Ok(Some(PdfObject::Int(first)))
        }
    }

    /// Parse array [...]
    fn parse_array(&mut self) -> Result<Option<PdfObject>> {
        let mut items = Vec::new();

        loop {
            let Some(token) = self.next_token()? else {
                return Err(PdfError::Parse {
                    position: self.position(),
                    message: "Unterminated array".into(),
                });
            };

            if token == Token::ArrayEnd {
                break;
            }

            self.push_back(token);
            if let Some(obj) = self.parse_object()? {
                items.push(obj);
            }
        }

        Ok(Some(PdfObject::Array(items)))
    }

    /// Parse dictionary or stream
    fn parse_dict_or_stream(&mut self) -> Result<Option<PdfObject>> {
        let mut dict = Dict::new();

        loop {
            let Some(token) = self.next_token()? else {
                return Err(PdfError::Parse {
                    position: self.position(),
                    message: "Unterminated dictionary".into(),
                });
            };

            if token == Token::DictEnd {
                break;
            }

            let Token::Name(key) = token else {
                return Err(PdfError::Parse {
                    position: self.position(),
                    message: format!("Dictionary key must be name, got {:?}", token),
                });
            };

            let value = self.parse_object()?.ok_or_else(|| PdfError::Parse {
                position: self.position(),
                message: "Missing dictionary value".into(),
            })?;

            dict.insert(key, value);
        }

        // Only a dictionary directly followed by `stream` is a stream object
        if !self.peeked.is_empty() {
            return Ok(Some(PdfObject::Dict(dict)));
        }
        let pos_after_dict = self.lexer.position();
        if let Some(Token::Stream) = self.lexer.next_token()? {
            let data = self.read_stream_data(&dict)?;
            Ok(Some(PdfObject::Stream { dict, data }))
        } else {
            self.lexer.seek(pos_after_dict);
            Ok(Some(PdfObject::Dict(dict)))
        }
    }

    /// Read stream data after "stream" keyword
    fn read_stream_data(&mut self, dict: &Dict) -> Result<Vec<u8>> {
        self.lexer.skip_eol();
        let start = self.lexer.position();

        // An indirect /Length cannot be resolved here; scan for endstream instead
        let Some(length) = dict.get("Length").and_then(PdfObject::as_int) else {
            return self.read_stream_until_endstream();
        };

        let end = start.saturating_add(length.max(0) as usize);
        let Some(data) = self.lexer.data().get(start..end) else {
            return self.read_stream_until_endstream();
        };
        let result = data.to_vec();

        self.lexer.seek(end);
        match self.lexer.next_token() {
            Ok(Some(Token::EndStream)) => Ok(result),
            // Wrong /Length: fall back to the marker
            _ => {
                self.lexer.seek(start);
                self.read_stream_until_endstream()
            }
        }
    }

    /// Fallback: search for "endstream" marker
    fn read_stream_until_endstream(&mut self) -> Result<Vec<u8>> {
        let start = self.lexer.position();
        let marker = b"endstream";
        let data = self.lexer.data();

        let found = data[start..]
            .windows(marker.len())
            .position(|w| w == marker)
            .map(|p| start + p);

        let Some(end) = found else {
            return Err(PdfError::Parse {
                position: start,
                message: "Could not find endstream".into(),
            });
        };

        // Drop the EOL that precedes the marker
        let mut data_end = end;
        if data_end > start && data[data_end - 1] == b'\n' {
            data_end -= 1;
        }
        if data_end > start && data[data_end - 1] == b'\r' {
            data_end -= 1;
        }

        self.lexer.seek(end + marker.len());
        Ok(data[start..data_end].to_vec())
    }
}
