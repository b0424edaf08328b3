use crate::content::PageChar;
use crate::facility::clean::clean_row;
use crate::facility::label::{Label, LabelMatching, detect_label};
use crate::facility::record::{RAW_COLUMNS, Record};
use crate::types::BBox;

/// Why a row produced no record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    MissingFacilityName,
    MissingExpireDate,
}

/// What became of one table row
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    /// The repeated column header row
    HeaderMarker,
    /// Every cell empty after cleaning
    Empty,
    /// Red section heading; updates the running province or region
    Label(Label),
    Record(Record),
    Rejected(Rejection),
}

/// Everything row classification needs besides the row itself
#[derive(Debug, Clone, Copy)]
pub struct RowContext<'a> {
    pub chars: &'a [PageChar],
    /// Bounding box of the row's first cell, if the table has one
    pub first_cell: Option<&'a BBox>,
    pub province: &'a str,
    pub header_marker: &'a str,
    pub label_matching: LabelMatching,
}

/// Clean a raw row and decide what it is
pub fn classify_row(raw: &[Option<String>], ctx: &RowContext) -> RowOutcome {
    let row = clean_row(raw);

    if row.iter().any(|cell| cell == ctx.header_marker) {
        return RowOutcome::HeaderMarker;
    }
    if row.iter().all(String::is_empty) {
        return RowOutcome::Empty;
    }
    if let Some(label) = detect_label(&row, ctx.first_cell, ctx.chars, ctx.label_matching) {
        return RowOutcome::Label(label);
    }

    match normalize(row, ctx.province) {
        Ok(record) => RowOutcome::Record(record),
        Err(rejection) => RowOutcome::Rejected(rejection),
    }
}

/// Pad or truncate to the raw column count, require a name and an expiry, inject the province
pub fn normalize(row: Vec<String>, province: &str) -> Result<Record, Rejection> {
    let mut cells = row.into_iter();
    let row: [String; RAW_COLUMNS] = std::array::from_fn(|_| cells.next().unwrap_or_default());

    if row[6].is_empty() {
        return Err(Rejection::MissingExpireDate);
    }
    if row[1].is_empty() {
        return Err(Rejection::MissingFacilityName);
    }

    Ok(Record::with_province(row, province))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Color;

    const MARKER: &str = "NAME OF HEALTH FACILITY";

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn raw(cells: &[Option<&str>]) -> Vec<Option<String>> {
        cells.iter().map(|c| c.map(String::from)).collect()
    }

    fn ctx<'a>(chars: &'a [PageChar], province: &'a str) -> RowContext<'a> {
        RowContext {
            chars,
            first_cell: None,
            province,
            header_marker: MARKER,
            label_matching: LabelMatching::Containment,
        }
    }

    #[test]
    fn test_short_row_padded() {
        let record = normalize(
            strings(&["1", "Clinic", "", "", "", "Town", "2026"]),
            "CEBU",
        )
        .unwrap();
        assert_eq!(record.expire_date(), "2026");
        assert_eq!(record.sec(), "");
        assert_eq!(record.province(), "CEBU");
    }

    #[test]
    fn test_long_row_truncated() {
        let record = normalize(
            strings(&["1", "Clinic", "t", "e", "s", "m", "2026", "S", "extra", "more"]),
            "CEBU",
        )
        .unwrap();
        assert_eq!(record.fields().len(), 9);
        assert_eq!(record.sec(), "S");
    }

    #[test]
    fn test_rejections() {
        assert_eq!(
            normalize(strings(&["1", "Clinic", "", "", "", "", ""]), "X"),
            Err(Rejection::MissingExpireDate)
        );
        assert_eq!(
            normalize(strings(&["1", "", "", "", "", "", "2026"]), "X"),
            Err(Rejection::MissingFacilityName)
        );
    }

    #[test]
    fn test_header_and_empty_rows() {
        let chars = [];
        let header = raw(&[Some("NO."), Some(MARKER), Some("TEL")]);
        assert_eq!(classify_row(&header, &ctx(&chars, "X")), RowOutcome::HeaderMarker);

        let empty = raw(&[None, Some(" "), Some("\n")]);
        assert_eq!(classify_row(&empty, &ctx(&chars, "X")), RowOutcome::Empty);
    }

    #[test]
    fn test_label_row() {
        let chars = [PageChar {
            text: "C".into(),
            bbox: BBox::new(0.0, 0.0, 5.0, 10.0),
            font_size: 10.0,
            font_name: None,
            fill: Color::Rgb(1.0, 0.0, 0.0),
            stroke: Color::default(),
        }];
        let row = raw(&[Some("CEBU"), None, None, None, None, None, None, None]);

        assert_eq!(
            classify_row(&row, &ctx(&chars, "Unknown")),
            RowOutcome::Label(Label::Province("CEBU".into()))
        );
        // The same row without red text is an incomplete record
        assert_eq!(
            classify_row(&row, &ctx(&[], "Unknown")),
            RowOutcome::Rejected(Rejection::MissingExpireDate)
        );
    }

    #[test]
    fn test_data_row_cleaned_and_tagged() {
        let row = raw(&[
            Some("12"),
            Some("St. Luke's\nClinic"),
            Some("555"),
            None,
            Some("Main"),
            Some("Cebu City"),
            Some("2026-01-01"),
            Some("A"),
        ]);
        let RowOutcome::Record(record) = classify_row(&row, &ctx(&[], "CEBU")) else {
            panic!("expected a record");
        };
        assert_eq!(record.facility_name(), "St. Luke''s Clinic");
        assert_eq!(record.email(), "");
        assert_eq!(record.province(), "CEBU");
    }
}
