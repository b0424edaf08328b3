//! In-memory PDF fixtures for tests.

use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;

/// Assembles small PDF files with a classic xref table.
///
/// Objects are numbered in insertion order: 1 catalog, 2 page tree,
/// 3 font `/F1` (Helvetica, WinAnsi, no widths), then a content stream and
/// a page object for every page.
pub(crate) struct PdfBuilder {
    objects: Vec<Vec<u8>>,
    compress: bool,
}

impl PdfBuilder {
    pub(crate) fn new() -> Self {
        Self {
            objects: Vec::new(),
            compress: false,
        }
    }

    /// Flate-compress content streams
    pub(crate) fn compressed(mut self) -> Self {
        self.compress = true;
        self
    }

    /// Uncompressed document with one page per content stream
    pub(crate) fn document(pages: &[&[u8]]) -> Vec<u8> {
        Self::new().build(pages)
    }

    fn add(&mut self, body: Vec<u8>) -> usize {
        self.objects.push(body);
        self.objects.len()
    }

    fn add_stream(&mut self, data: &[u8]) -> usize {
        let (filter, data) = if self.compress {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(data).unwrap();
            (" /Filter /FlateDecode", encoder.finish().unwrap())
        } else {
            ("", data.to_vec())
        };

        let mut body = format!("<< /Length {}{} >>\nstream\n", data.len(), filter).into_bytes();
        body.extend_from_slice(&data);
        body.extend_from_slice(b"\nendstream");
        self.add(body)
    }

    pub(crate) fn build(mut self, pages: &[&[u8]]) -> Vec<u8> {
        self.add(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());
        self.add(Vec::new()); // page tree, filled once the kids exist
        self.add(
            b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
                .to_vec(),
        );

        let mut kids = Vec::new();
        for content in pages {
            let contents = self.add_stream(content);
            let page = self.add(
                format!(
                    "<< /Type /Page /Parent 2 0 R /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
                    contents
                )
                .into_bytes(),
            );
            kids.push(format!("{} 0 R", page));
        }
        self.objects[1] = format!(
            "<< /Type /Pages /Kids [{}] /Count {} /MediaBox [0 0 612 792] >>",
            kids.join(" "),
            kids.len()
        )
        .into_bytes();

        self.finish()
    }

    fn finish(self) -> Vec<u8> {
        let mut out = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
        let mut offsets = Vec::new();

        for (i, body) in self.objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
            out.extend_from_slice(body);
            out.extend_from_slice(b"\nendobj\n");
        }

        let xref_offset = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n", self.objects.len() + 1).as_bytes());
        out.extend_from_slice(b"0000000000 65535 f \n");
        for offset in offsets {
            out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
                self.objects.len() + 1,
                xref_offset
            )
            .as_bytes(),
        );
        out
    }
}

/// A row of a drawn test table
pub(crate) enum TestRow<'a> {
    /// Black text, one ruled cell per value
    Cells(&'a [&'a str]),
    /// Red text in a single cell spanning the full table width
    Label(&'a str),
}

const COLUMN_WIDTH: f64 = 100.0;
const ROW_HEIGHT: f64 = 20.0;
const TABLE_COLUMNS: usize = 8;
const LEFT: f64 = 10.0;
const TOP: f64 = 750.0;

/// Content stream of an eight-column ruled table, rows drawn top down
pub(crate) fn ruled_table(rows: &[TestRow]) -> Vec<u8> {
    let right = LEFT + COLUMN_WIDTH * TABLE_COLUMNS as f64;
    let mut ops = String::from("0.5 w 0 G\n");

    for (r, row) in rows.iter().enumerate() {
        let top = TOP - ROW_HEIGHT * r as f64;
        let bottom = top - ROW_HEIGHT;

        // Rules: top and bottom across the table, verticals where cells split
        ops += &format!("{LEFT} {top} m {right} {top} l S\n");
        ops += &format!("{LEFT} {bottom} m {right} {bottom} l S\n");
        let dividers: Vec<f64> = match row {
            TestRow::Cells(_) => (0..=TABLE_COLUMNS)
                .map(|c| LEFT + COLUMN_WIDTH * c as f64)
                .collect(),
            TestRow::Label(_) => vec![LEFT, right],
        };
        for x in dividers {
            ops += &format!("{x} {bottom} m {x} {top} l S\n");
        }

        let baseline = bottom + 7.0;
        match row {
            TestRow::Cells(cells) => {
                ops += "BT /F1 6 Tf 0 g\n";
                for (c, text) in cells.iter().enumerate() {
                    let x = LEFT + 2.0 + COLUMN_WIDTH * c as f64;
                    ops += &format!("1 0 0 1 {x} {baseline} Tm ({}) Tj\n", escape(text));
                }
                ops += "ET\n";
            }
            TestRow::Label(text) => {
                ops += &format!(
                    "BT /F1 6 Tf 1 0 0 rg {} {baseline} Td ({}) Tj ET\n",
                    LEFT + 2.0,
                    escape(text)
                );
            }
        }
    }

    ops.into_bytes()
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)")
}
