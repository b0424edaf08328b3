use std::collections::HashMap;

/// Parse a ToUnicode CMap into a code -> text mapping.
///
/// Destinations are UTF-16BE, so one code may map to several characters (ligatures).
pub fn parse_tounicode_cmap(data: &[u8]) -> HashMap<u16, String> {
    let text = String::from_utf8_lossy(data);
    let mut map = HashMap::new();

    for section in sections(&text, "beginbfchar", "endbfchar") {
        parse_bfchar_entries(section, &mut map);
    }
    for section in sections(&text, "beginbfrange", "endbfrange") {
        parse_bfrange_entries(section, &mut map);
    }

    map
}

/// Bodies between every `begin`/`end` keyword pair
fn sections<'t>(text: &'t str, begin: &str, end: &str) -> Vec<&'t str> {
    let mut found = Vec::new();
    let mut remaining = text;

    while let Some(start_idx) = remaining.find(begin) {
        remaining = &remaining[start_idx + begin.len()..];
        let Some(end_idx) = remaining.find(end) else {
            break;
        };
        found.push(&remaining[..end_idx]);
        remaining = &remaining[end_idx + end.len()..];
    }

    found
}

/// Hex strings and bracket markers of a section, in order
#[derive(Debug, PartialEq)]
enum Item {
    Hex(Vec<u8>),
    Open,
    Close,
}

fn items(section: &str) -> Vec<Item> {
    let mut out = Vec::new();
    let mut chars = section.chars();

    while let Some(c) = chars.next() {
        match c {
            '<' => {
                let digits: String = chars
                    .by_ref()
                    .take_while(|&c| c != '>')
                    .filter(|c| c.is_ascii_hexdigit())
                    .collect();
                out.push(Item::Hex(hex_bytes(&digits)));
            }
            '[' => out.push(Item::Open),
            ']' => out.push(Item::Close),
            _ => {}
        }
    }

    out
}

fn hex_bytes(digits: &str) -> Vec<u8> {
    let mut padded = digits.to_string();
    if padded.len() % 2 == 1 {
        padded.push('0');
    }
    (0..padded.len())
        .step_by(2)
        .filter_map(|i| u8::from_str_radix(&padded[i..i + 2], 16).ok())
        .collect()
}

fn code_value(bytes: &[u8]) -> u16 {
    bytes.iter().fold(0u16, |acc, &b| (acc << 8) | b as u16)
}

fn utf16_text(bytes: &[u8]) -> String {
    if bytes.len() == 1 {
        return char::from(bytes[0]).to_string();
    }
    let units: Vec<u16> = bytes
        .chunks(2)
        .map(|pair| code_value(pair))
        .collect();
    String::from_utf16_lossy(&units)
}

/// `<src> <dst>` pairs
fn parse_bfchar_entries(section: &str, map: &mut HashMap<u16, String>) {
    let hex: Vec<Vec<u8>> = items(section)
        .into_iter()
        .filter_map(|item| match item {
            Item::Hex(bytes) => Some(bytes),
            _ => None,
        })
        .collect();

    for pair in hex.chunks(2) {
        if let [src, dst] = pair {
            map.insert(code_value(src), utf16_text(dst));
        }
    }
}

/// `<lo> <hi> <dst>` or `<lo> <hi> [<dst1> <dst2> ...]`
fn parse_bfrange_entries(section: &str, map: &mut HashMap<u16, String>) {
    let mut iter = items(section).into_iter();

    while let Some(first) = iter.next() {
        let (Item::Hex(lo), Some(Item::Hex(hi))) = (first, iter.next()) else {
            continue;
        };
        let (lo, hi) = (code_value(&lo), code_value(&hi));

        match iter.next() {
            Some(Item::Hex(dst)) => {
                // Increment the last UTF-16 unit across the range
                let mut units: Vec<u16> = dst.chunks(2).map(code_value).collect();
                for src in lo..=hi {
                    map.insert(src, String::from_utf16_lossy(&units));
                    if let Some(last) = units.last_mut() {
                        *last = last.wrapping_add(1);
                    }
                }
            }
            Some(Item::Open) => {
                let mut src = lo;
                for item in iter.by_ref() {
                    match item {
                        Item::Hex(dst) if src <= hi => {
                            map.insert(src, utf16_text(&dst));
                            src = src.saturating_add(1);
                        }
                        Item::Close => break,
                        _ => {}
                    }
                }
            }
            _ => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bfrange() {
        let cmap = r#"
beginbfrange
<0003><0003><0020>
<0024><0026><0041>
endbfrange
"#;
        let map = parse_tounicode_cmap(cmap.as_bytes());
        assert_eq!(map.get(&0x0003).map(String::as_str), Some(" "));
        assert_eq!(map.get(&0x0024).map(String::as_str), Some("A"));
        assert_eq!(map.get(&0x0026).map(String::as_str), Some("C"));
    }

    #[test]
    fn test_parse_bfrange_array() {
        let cmap = "beginbfrange\n<0010> <0012> [<0058> <0059> <005A>]\nendbfrange";
        let map = parse_tounicode_cmap(cmap.as_bytes());
        assert_eq!(map.get(&0x0010).map(String::as_str), Some("X"));
        assert_eq!(map.get(&0x0012).map(String::as_str), Some("Z"));
    }

    #[test]
    fn test_parse_bfchar_with_ligature() {
        let cmap = r#"
2 beginbfchar
<0003> <0020>
<00B2> <00660069>
endbfchar
"#;
        let map = parse_tounicode_cmap(cmap.as_bytes());
        assert_eq!(map.get(&0x0003).map(String::as_str), Some(" "));
        assert_eq!(map.get(&0x00B2).map(String::as_str), Some("fi"));
    }

    #[test]
    fn test_single_byte_codes() {
        let cmap = "beginbfchar\n<41> <0042>\nendbfchar";
        let map = parse_tounicode_cmap(cmap.as_bytes());
        assert_eq!(map.get(&0x41).map(String::as_str), Some("B"));
    }
}
