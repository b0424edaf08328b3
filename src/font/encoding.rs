use std::collections::HashMap;

/// Single-byte font encoding: character code -> Unicode
#[derive(Debug, Clone)]
pub struct FontEncoding {
    map: HashMap<u8, char>,
}

impl Default for FontEncoding {
    fn default() -> Self {
        Self::standard()
    }
}

impl FontEncoding {
    /// StandardEncoding for the printable ASCII range
    pub fn standard() -> Self {
        let mut map: HashMap<u8, char> = (0x20u8..=0x7E).map(|b| (b, b as char)).collect();
        map.insert(0x27, '\u{2019}'); // quoteright
        map.insert(0x60, '\u{2018}'); // quoteleft
        FontEncoding { map }
    }

    /// WinAnsiEncoding - standard Windows encoding
    pub fn win_ansi() -> Self {
        let mut map: HashMap<u8, char> = (0x20u8..=0x7E).map(|b| (b, b as char)).collect();

        // Windows-1252 specific mappings for 0x80-0x9F range
        let high_mappings: [(u8, char); 27] = [
            (0x80, '\u{20AC}'),
            (0x82, '\u{201A}'),
            (0x83, '\u{0192}'),
            (0x84, '\u{201E}'),
            (0x85, '\u{2026}'),
            (0x86, '\u{2020}'),
            (0x87, '\u{2021}'),
            (0x88, '\u{02C6}'),
            (0x89, '\u{2030}'),
            (0x8A, '\u{0160}'),
            (0x8B, '\u{2039}'),
            (0x8C, '\u{0152}'),
            (0x8E, '\u{017D}'),
            (0x91, '\u{2018}'),
            (0x92, '\u{2019}'),
            (0x93, '\u{201C}'),
            (0x94, '\u{201D}'),
            (0x95, '\u{2022}'),
            (0x96, '\u{2013}'),
            (0x97, '\u{2014}'),
            (0x98, '\u{02DC}'),
            (0x99, '\u{2122}'),
            (0x9A, '\u{0161}'),
            (0x9B, '\u{203A}'),
            (0x9C, '\u{0153}'),
            (0x9E, '\u{017E}'),
            (0x9F, '\u{0178}'),
        ];
        map.extend(high_mappings);

        // Latin-1 Supplement
        map.extend((0xA0u8..=0xFF).map(|b| (b, char::from(b))));

        FontEncoding { map }
    }

    /// Pick a base encoding by its PDF name
    pub fn named(name: &str) -> Self {
        match name {
            "WinAnsiEncoding" => Self::win_ansi(),
            _ => Self::standard(),
        }
    }

    /// Apply a `/Differences` array: a code followed by the glyph names it starts
    pub fn apply_differences(&mut self, differences: &[DifferenceItem]) {
        let mut code: Option<u32> = None;
        for item in differences {
            match item {
                DifferenceItem::Code(c) => code = Some(*c),
                DifferenceItem::Glyph(name) => {
                    let Some(c) = code else { continue };
                    if let (Ok(byte), Some(ch)) = (u8::try_from(c), glyph_to_char(name)) {
                        self.map.insert(byte, ch);
                    }
                    code = Some(c + 1);
                }
            }
        }
    }

    /// Decode a single byte; unmapped bytes fall back to Latin-1
    pub fn decode_byte(&self, byte: u8) -> char {
        self.map.get(&byte).copied().unwrap_or(char::from(byte))
    }
}

/// Entry of a `/Differences` array
#[derive(Debug, Clone, PartialEq)]
pub enum DifferenceItem {
    Code(u32),
    Glyph(String),
}

/// Map an Adobe glyph name to a character
pub fn glyph_to_char(name: &str) -> Option<char> {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some(c);
    }

    // uniXXXX (first code point only) and uXXXX[XX]
    let hex = match name.strip_prefix("uni") {
        Some(rest) => rest.get(..4),
        None => name
            .strip_prefix('u')
            .filter(|rest| (4..=6).contains(&rest.len())),
    };
    if let Some(ch) = hex
        .and_then(|h| u32::from_str_radix(h, 16).ok())
        .and_then(char::from_u32)
    {
        return Some(ch);
    }

    let ch = match name {
        "space" | "nbspace" => ' ',
        "exclam" => '!',
        "quotedbl" => '"',
        "numbersign" => '#',
        "dollar" => '$',
        "percent" => '%',
        "ampersand" => '&',
        "quotesingle" => '\'',
        "quoteright" => '\u{2019}',
        "quoteleft" => '\u{2018}',
        "quotedblleft" => '\u{201C}',
        "quotedblright" => '\u{201D}',
        "parenleft" => '(',
        "parenright" => ')',
        "asterisk" => '*',
        "plus" => '+',
        "comma" => ',',
        "hyphen" | "minus" => '-',
        "period" => '.',
        "slash" => '/',
        "zero" => '0',
        "one" => '1',
        "two" => '2',
        "three" => '3',
        "four" => '4',
        "five" => '5',
        "six" => '6',
        "seven" => '7',
        "eight" => '8',
        "nine" => '9',
        "colon" => ':',
        "semicolon" => ';',
        "less" => '<',
        "equal" => '=',
        "greater" => '>',
        "question" => '?',
        "at" => '@',
        "bracketleft" => '[',
        "backslash" => '\\',
        "bracketright" => ']',
        "asciicircum" => '^',
        "underscore" => '_',
        "grave" => '`',
        "braceleft" => '{',
        "bar" => '|',
        "braceright" => '}',
        "asciitilde" => '~',
        "endash" => '\u{2013}',
        "emdash" => '\u{2014}',
        "bullet" => '\u{2022}',
        "ellipsis" => '\u{2026}',
        "degree" => '\u{00B0}',
        "Ntilde" => '\u{00D1}',
        "ntilde" => '\u{00F1}',
        "Eacute" => '\u{00C9}',
        "eacute" => '\u{00E9}',
        "Aacute" => '\u{00C1}',
        "aacute" => '\u{00E1}',
        "Oacute" => '\u{00D3}',
        "oacute" => '\u{00F3}',
        "Iacute" => '\u{00CD}',
        "iacute" => '\u{00ED}',
        "Uacute" => '\u{00DA}',
        "uacute" => '\u{00FA}',
        _ => return None,
    };
    Some(ch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_win_ansi_basic() {
        let enc = FontEncoding::win_ansi();
        assert_eq!(enc.decode_byte(b'A'), 'A');
        assert_eq!(enc.decode_byte(b' '), ' ');
        assert_eq!(enc.decode_byte(0x80), '\u{20AC}');
        assert_eq!(enc.decode_byte(0xD1), '\u{00D1}');
    }

    #[test]
    fn test_standard_quotes() {
        let enc = FontEncoding::standard();
        assert_eq!(enc.decode_byte(0x27), '\u{2019}');
        assert_eq!(enc.decode_byte(b'Z'), 'Z');
    }

    #[test]
    fn test_differences() {
        let mut enc = FontEncoding::win_ansi();
        enc.apply_differences(&[
            DifferenceItem::Code(1),
            DifferenceItem::Glyph("B".into()),
            DifferenceItem::Glyph("O".into()),
            DifferenceItem::Glyph("space".into()),
            DifferenceItem::Code(0x41),
            DifferenceItem::Glyph("uni00D1".into()),
        ]);

        assert_eq!(enc.decode_byte(1), 'B');
        assert_eq!(enc.decode_byte(2), 'O');
        assert_eq!(enc.decode_byte(3), ' ');
        assert_eq!(enc.decode_byte(0x41), '\u{00D1}');
    }

    #[test]
    fn test_glyph_names() {
        assert_eq!(glyph_to_char("hyphen"), Some('-'));
        assert_eq!(glyph_to_char("uni0041"), Some('A'));
        assert_eq!(glyph_to_char("g123"), None);
    }
}
