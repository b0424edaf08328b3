/// Make a raw cell value safe to inline as a SQL string literal.
///
/// Single quotes are doubled, newlines become spaces and surrounding
/// whitespace is trimmed, in that order. A missing cell is the empty string.
pub fn clean_text(text: Option<&str>) -> String {
    match text {
        Some(text) => text.replace('\'', "''").replace('\n', " ").trim().to_string(),
        None => String::new(),
    }
}

/// Clean every cell of a raw table row
pub fn clean_row(row: &[Option<String>]) -> Vec<String> {
    row.iter().map(|cell| clean_text(cell.as_deref())).collect()
}
