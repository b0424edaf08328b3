use crate::content::{Edge, PageChar, PageContent, TextSpan};
use crate::extract::table::{Table, TableSettings, TableStrategy};
use crate::types::BBox;

/// One interpreted page
#[derive(Debug, Clone)]
pub struct Page {
    /// 1-based page number
    pub number: usize,
    pub media_box: BBox,
    pub chars: Vec<PageChar>,
    pub spans: Vec<TextSpan>,
    pub edges: Vec<Edge>,
}

impl Page {
    pub fn new(number: usize, media_box: BBox, content: PageContent) -> Self {
        Self {
            number,
            media_box,
            chars: content.chars,
            spans: content.spans,
            edges: content.edges,
        }
    }

    /// Tables on the page, top to bottom
    pub fn extract_tables(&self, settings: &TableSettings) -> Vec<Table> {
        match settings.strategy {
            TableStrategy::Lines => Table::from_edges(&self.edges, &self.chars, settings),
            TableStrategy::Text => Table::from_spans(&self.spans).into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentParser;
    use crate::content::Resources;

    fn page(content: &[u8]) -> Page {
        let parsed = ContentParser::new()
            .parse(content, &Resources::default())
            .unwrap();
        Page::new(1, BBox::new(0.0, 0.0, 612.0, 792.0), parsed)
    }

    #[test]
    fn test_ruled_page_table() {
        let page = page(
            b"0 0 100 20 re 100 0 100 20 re S \
              BT /F1 10 Tf 5 6 Td (Left) Tj 100 0 Td (Right) Tj ET",
        );

        let tables = page.extract_tables(&TableSettings::default());
        assert_eq!(tables.len(), 1);
        assert_eq!(
            tables[0].text_rows(),
            vec![vec![Some("Left".to_string()), Some("Right".to_string())]]
        );
    }

    #[test]
    fn test_text_strategy_without_rulings() {
        let page = page(b"BT /F1 10 Tf 10 100 Td (A) Tj 60 0 Td (B) Tj -60 -20 Td (C) Tj ET");
        let settings = TableSettings {
            strategy: TableStrategy::Text,
            ..TableSettings::default()
        };

        assert!(page.extract_tables(&TableSettings::default()).is_empty());
        let tables = page.extract_tables(&settings);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows.len(), 2);
        assert_eq!(tables[0].text_rows()[1], vec![Some("C".to_string()), None]);
    }
}
