mod cmap;
mod encoding;

use std::collections::HashMap;

use tracing::warn;

use crate::document::Document;
use crate::error::Result;
use crate::types::{Dict, PdfObject};

pub use cmap::parse_tounicode_cmap;
pub use encoding::{DifferenceItem, FontEncoding, glyph_to_char};

/// Width used when a font carries no metrics, in glyph space units
const DEFAULT_WIDTH: f64 = 500.0;

#[derive(Debug, Clone)]
enum Widths {
    /// `/FirstChar` + `/Widths` of a simple font
    Simple { first_char: u16, widths: Vec<f64>, missing: f64 },
    /// `/W` + `/DW` of a CID font
    Cid { widths: HashMap<u16, f64>, default: f64 },
}

/// What the content interpreter needs from a font: code splitting, text and advance widths
#[derive(Debug, Clone)]
pub struct Font {
    pub base_font: String,
    composite: bool,
    encoding: FontEncoding,
    to_unicode: HashMap<u16, String>,
    widths: Widths,
}

impl Default for Font {
    fn default() -> Self {
        Font {
            base_font: String::from("Unknown"),
            composite: false,
            encoding: FontEncoding::win_ansi(),
            to_unicode: HashMap::new(),
            widths: Widths::Simple {
                first_char: 0,
                widths: Vec::new(),
                missing: DEFAULT_WIDTH,
            },
        }
    }
}

impl Font {
    /// Build a font from its resource dictionary, resolving indirect parts through `doc`
    pub fn load(doc: &mut Document, dict: &Dict) -> Result<Font> {
        let base_font = dict
            .get("BaseFont")
            .and_then(PdfObject::as_name)
            .unwrap_or("Unknown")
            .to_string();
        let composite = dict.get("Subtype").and_then(PdfObject::as_name) == Some("Type0");

        let to_unicode = match dict.get("ToUnicode") {
            Some(obj @ (PdfObject::Ref(_) | PdfObject::Stream { .. })) => {
                match doc.decoded_stream(obj) {
                    Ok(data) => parse_tounicode_cmap(&data),
                    Err(e) => {
                        warn!(font = %base_font, error = %e, "unreadable ToUnicode CMap");
                        HashMap::new()
                    }
                }
            }
            _ => HashMap::new(),
        };

        let (encoding, widths) = if composite {
            (FontEncoding::default(), Self::load_cid_widths(doc, dict)?)
        } else {
            (
                Self::load_encoding(doc, dict)?,
                Self::load_simple_widths(doc, dict)?,
            )
        };

        Ok(Font {
            base_font,
            composite,
            encoding,
            to_unicode,
            widths,
        })
    }

    fn load_encoding(doc: &mut Document, dict: &Dict) -> Result<FontEncoding> {
        let Some(raw) = dict.get("Encoding") else {
            return Ok(FontEncoding::default());
        };

        match doc.get_object(raw)? {
            PdfObject::Name(name) => Ok(FontEncoding::named(&name)),
            PdfObject::Dict(enc) => {
                let mut encoding = enc
                    .get("BaseEncoding")
                    .and_then(PdfObject::as_name)
                    .map(FontEncoding::named)
                    .unwrap_or_default();

                if let Some(diffs) = enc.get("Differences") {
                    let diffs = doc.get_object(diffs)?;
                    let items: Vec<DifferenceItem> = diffs
                        .as_array()
                        .map(|arr| {
                            arr.iter()
                                .filter_map(|item| match item {
                                    PdfObject::Name(n) => Some(DifferenceItem::Glyph(n.clone())),
                                    other => other
                                        .as_int()
                                        .map(|c| DifferenceItem::Code(c.max(0) as u32)),
                                })
                                .collect()
                        })
                        .unwrap_or_default();
                    encoding.apply_differences(&items);
                }

                Ok(encoding)
            }
            _ => Ok(FontEncoding::default()),
        }
    }

    fn load_simple_widths(doc: &mut Document, dict: &Dict) -> Result<Widths> {
        let first_char = dict
            .get("FirstChar")
            .and_then(PdfObject::as_int)
            .unwrap_or(0)
            .clamp(0, u16::MAX as i64) as u16;

        let widths = match dict.get("Widths") {
            Some(w) => doc.get_object(w)?.as_numbers().unwrap_or_default(),
            None => Vec::new(),
        };

        let missing = match dict.get("FontDescriptor") {
            Some(fd) => doc
                .get_object(fd)?
                .get("MissingWidth")
                .and_then(PdfObject::as_number)
                .filter(|w| *w > 0.0)
                .unwrap_or(DEFAULT_WIDTH),
            None => DEFAULT_WIDTH,
        };

        Ok(Widths::Simple {
            first_char,
            widths,
            missing,
        })
    }

    fn load_cid_widths(doc: &mut Document, dict: &Dict) -> Result<Widths> {
        let descendant = match dict.get("DescendantFonts") {
            Some(d) => doc.get_object(d)?,
            None => PdfObject::Null,
        };
        let cid_font = match descendant.as_array().and_then(|a| a.first()) {
            Some(first) => doc.get_object(first)?,
            None => PdfObject::Null,
        };

        let default = cid_font
            .get("DW")
            .and_then(PdfObject::as_number)
            .unwrap_or(1000.0);

        let mut widths = HashMap::new();
        if let Some(w) = cid_font.get("W") {
            let w = doc.get_object(w)?;
            let items = w.as_array().cloned().unwrap_or_default();
            let mut i = 0;
            while i < items.len() {
                let Some(start) = items[i].as_int() else {
                    break;
                };
                match items.get(i + 1) {
                    // c [w1 w2 ...]
                    Some(PdfObject::Array(list)) => {
                        for (offset, width) in list.iter().enumerate() {
                            if let Some(width) = width.as_number() {
                                widths.insert((start as usize + offset) as u16, width);
                            }
                        }
                        i += 2;
                    }
                    // c_first c_last w
                    Some(end) => {
                        let end = end.as_int().unwrap_or(start);
                        let width = items
                            .get(i + 2)
                            .and_then(PdfObject::as_number)
                            .unwrap_or(default);
                        for cid in start..=end {
                            widths.insert(cid as u16, width);
                        }
                        i += 3;
                    }
                    None => break,
                }
            }
        }

        Ok(Widths::Cid { widths, default })
    }

    /// Split a shown string into character codes
    pub fn codes(&self, bytes: &[u8]) -> Vec<u16> {
        if self.composite {
            bytes
                .chunks(2)
                .map(|pair| pair.iter().fold(0u16, |acc, &b| (acc << 8) | b as u16))
                .collect()
        } else {
            bytes.iter().map(|&b| b as u16).collect()
        }
    }

    /// Unicode text for one character code
    pub fn decode(&self, code: u16) -> String {
        if let Some(text) = self.to_unicode.get(&code) {
            return text.clone();
        }
        if self.composite {
            return char::from_u32(code as u32)
                .map(String::from)
                .unwrap_or_default();
        }
        self.encoding.decode_byte(code as u8).to_string()
    }

    /// Advance width in glyph space (thousandths of text space)
    pub fn width(&self, code: u16) -> f64 {
        match &self.widths {
            Widths::Simple {
                first_char,
                widths,
                missing,
            } => code
                .checked_sub(*first_char)
                .and_then(|i| widths.get(i as usize))
                .copied()
                .unwrap_or(*missing),
            Widths::Cid { widths, default } => widths.get(&code).copied().unwrap_or(*default),
        }
    }

    /// Word spacing only applies to the single-byte code 32
    pub fn is_word_space(&self, code: u16) -> bool {
        !self.composite && code == 32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_font_decodes_win_ansi() {
        let font = Font::default();
        let codes = font.codes(b"CEBU");
        assert_eq!(codes, vec![67, 69, 66, 85]);
        let text: String = codes.iter().map(|&c| font.decode(c)).collect();
        assert_eq!(text, "CEBU");
        assert_eq!(font.width(67), DEFAULT_WIDTH);
        assert!(font.is_word_space(32));
    }

    #[test]
    fn test_simple_widths_lookup() {
        let font = Font {
            widths: Widths::Simple {
                first_char: 65,
                widths: vec![600.0, 700.0],
                missing: 250.0,
            },
            ..Font::default()
        };
        assert_eq!(font.width(65), 600.0);
        assert_eq!(font.width(66), 700.0);
        assert_eq!(font.width(67), 250.0);
        assert_eq!(font.width(10), 250.0);
    }

    #[test]
    fn test_composite_codes_and_tounicode() {
        let mut to_unicode = HashMap::new();
        to_unicode.insert(0x0024, "A".to_string());
        let font = Font {
            composite: true,
            to_unicode,
            widths: Widths::Cid {
                widths: HashMap::from([(0x0024, 667.0)]),
                default: 1000.0,
            },
            ..Font::default()
        };

        let codes = font.codes(&[0x00, 0x24, 0x00, 0x42]);
        assert_eq!(codes, vec![0x0024, 0x0042]);
        assert_eq!(font.decode(0x0024), "A");
        assert_eq!(font.decode(0x0042), "B");
        assert_eq!(font.width(0x0024), 667.0);
        assert_eq!(font.width(0x0042), 1000.0);
        assert!(!font.is_word_space(32));
    }
}
