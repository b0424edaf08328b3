use tracing::debug;

use crate::content::PageChar;
use crate::types::BBox;

/// How a label-shaped row is confirmed as red text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelMatching {
    /// Any red glyph on the page whose text occurs in the cell text
    #[default]
    Containment,
    /// Only red glyphs whose center lies inside the label cell
    CellBounds,
}

/// A section heading found in the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Label {
    Province(String),
    Region(String),
}

impl Label {
    /// Regions are recognized by keyword; every other heading names a province
    pub fn classify(text: &str) -> Label {
        let upper = text.to_uppercase();
        if upper.contains("REGION") || upper.contains("ADMINISTRATIVE") {
            Label::Region(text.to_string())
        } else {
            Label::Province(text.to_string())
        }
    }
}

/// First cell filled, every other cell empty
pub fn is_label_shaped(row: &[String]) -> bool {
    match row.split_first() {
        Some((first, rest)) => !first.is_empty() && rest.iter().all(String::is_empty),
        None => false,
    }
}

/// Classify a cleaned row as a label when it is label-shaped and rendered in red
pub fn detect_label(
    row: &[String],
    first_cell: Option<&BBox>,
    chars: &[PageChar],
    matching: LabelMatching,
) -> Option<Label> {
    if !is_label_shaped(row) {
        return None;
    }
    let text = &row[0];

    let mut red = chars
        .iter()
        .filter(|ch| ch.text != " " && ch.fill.is_red());
    let confirmed = match matching {
        LabelMatching::Containment => red.any(|ch| text.contains(ch.text.as_str())),
        LabelMatching::CellBounds => {
            let Some(bbox) = first_cell else {
                return None;
            };
            red.any(|ch| {
                let (x, y) = ch.bbox.center();
                bbox.contains_point(x, y)
            })
        }
    };

    if !confirmed {
        debug!(text = %text, "label-shaped row without red text");
        return None;
    }
    Some(Label::classify(text))
}
