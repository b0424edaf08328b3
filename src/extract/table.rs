use std::cmp::Ordering;
use std::collections::HashMap;

use crate::content::{Edge, Orientation, PageChar, TextSpan};
use crate::types::BBox;

/// How tables are located on a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStrategy {
    /// Cells bounded by ruling lines
    Lines,
    /// Rows and columns guessed from text positions, for pages without rulings
    Text,
}

/// Tolerances for table finding, in PDF units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableSettings {
    pub strategy: TableStrategy,
    /// Parallel edges closer than this are moved onto a common line
    pub snap_tolerance: f64,
    /// Collinear edges with gaps up to this are merged
    pub join_tolerance: f64,
    /// Edges shorter than this after merging are ignored
    pub edge_min_length: f64,
    pub intersection_tolerance: f64,
    /// Horizontal gap that splits words inside a cell
    pub text_x_tolerance: f64,
    /// Vertical distance within which characters share a line
    pub text_y_tolerance: f64,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            strategy: TableStrategy::Lines,
            snap_tolerance: 3.0,
            join_tolerance: 3.0,
            edge_min_length: 3.0,
            intersection_tolerance: 3.0,
            text_x_tolerance: 3.0,
            text_y_tolerance: 3.0,
        }
    }
}

/// A table cell and the text inside it
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub bbox: BBox,
    pub text: String,
}

/// Extracted table; a `None` slot is a grid position no cell starts at
#[derive(Debug, Clone)]
pub struct Table {
    pub bbox: BBox,
    pub rows: Vec<Vec<Option<Cell>>>,
}

impl Table {
    pub fn num_columns(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Cell texts row by row, absent cells as `None`
    pub fn text_rows(&self) -> Vec<Vec<Option<String>>> {
        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| cell.as_ref().map(|c| c.text.clone()))
                    .collect()
            })
            .collect()
    }

    /// Find ruled tables from edges, filling cells with the characters they contain
    pub fn from_edges(edges: &[Edge], chars: &[PageChar], settings: &TableSettings) -> Vec<Table> {
        let edges = merge_edges(edges, settings);
        let intersections = find_intersections(&edges, settings.intersection_tolerance);
        let cells = intersections_to_cells(&intersections);

        group_cells(cells)
            .into_iter()
            .map(|cells| build_table(cells, chars, settings))
            .collect()
    }

    /// Build a table from text spans
    pub fn from_spans(spans: &[TextSpan]) -> Option<Table> {
        // Filter empty spans
        let spans: Vec<&TextSpan> = spans.iter().filter(|s| !s.text.trim().is_empty()).collect();
        if spans.is_empty() {
            return None;
        }

        // Calculate adaptive tolerance based on average font size
        let avg_font_size = spans.iter().map(|s| s.font_size).sum::<f64>() / spans.len() as f64;
        let row_tolerance = avg_font_size * 0.5;

        let mut rows = cluster_into_rows(spans, row_tolerance);
        for row in &mut rows {
            row.sort_by(|a, b| cmp_f64(a.x, b.x));
        }

        let columns = detect_columns(&rows);
        let grid = assign_to_columns(rows, &columns);

        let bbox = grid
            .iter()
            .flatten()
            .flatten()
            .map(|cell| cell.bbox)
            .reduce(|a, b| a.union(&b))?;
        Some(Table { bbox, rows: grid })
    }
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Snap, join and length-filter the page edges
fn merge_edges(edges: &[Edge], settings: &TableSettings) -> Vec<Edge> {
    let mut horizontal: Vec<Edge> = edges
        .iter()
        .filter(|e| e.orientation == Orientation::Horizontal)
        .copied()
        .collect();
    let mut vertical: Vec<Edge> = edges
        .iter()
        .filter(|e| e.orientation == Orientation::Vertical)
        .copied()
        .collect();

    snap(&mut horizontal, settings.snap_tolerance, |e| &mut e.y0);
    for e in &mut horizontal {
        e.y1 = e.y0;
    }
    snap(&mut vertical, settings.snap_tolerance, |e| &mut e.x0);
    for e in &mut vertical {
        e.x1 = e.x0;
    }

    let mut merged = join(horizontal, settings.join_tolerance);
    merged.extend(join(vertical, settings.join_tolerance));
    merged.retain(|e| e.length() >= settings.edge_min_length);
    merged
}

/// Move edges whose position values chain within `tolerance` onto their mean
fn snap(edges: &mut [Edge], tolerance: f64, mut coord: impl FnMut(&mut Edge) -> &mut f64) {
    let mut order: Vec<usize> = (0..edges.len()).collect();
    order.sort_by(|&a, &b| cmp_f64(*coord(&mut edges[a]), *coord(&mut edges[b])));

    let mut clusters: Vec<Vec<usize>> = Vec::new();
    let mut last: Option<f64> = None;
    for i in order {
        let value = *coord(&mut edges[i]);
        match (last, clusters.last_mut()) {
            (Some(prev), Some(cluster)) if value - prev <= tolerance => cluster.push(i),
            _ => clusters.push(vec![i]),
        }
        last = Some(value);
    }

    for cluster in clusters {
        let mean = cluster.iter().map(|&i| *coord(&mut edges[i])).sum::<f64>() / cluster.len() as f64;
        for i in cluster {
            *coord(&mut edges[i]) = mean;
        }
    }
}

/// Merge overlapping or nearly touching collinear edges of one orientation
fn join(mut edges: Vec<Edge>, tolerance: f64) -> Vec<Edge> {
    // Line position, then start along the line
    let key = |e: &Edge| match e.orientation {
        Orientation::Horizontal => (e.y0, e.x0),
        Orientation::Vertical => (e.x0, e.y0),
    };
    edges.sort_by(|a, b| {
        let (pa, sa) = key(a);
        let (pb, sb) = key(b);
        cmp_f64(pa, pb).then(cmp_f64(sa, sb))
    });

    let mut joined: Vec<Edge> = Vec::new();
    for edge in edges {
        let Some(last) = joined.last_mut() else {
            joined.push(edge);
            continue;
        };
        match edge.orientation {
            Orientation::Horizontal if last.y0 == edge.y0 && edge.x0 <= last.x1 + tolerance => {
                last.x1 = last.x1.max(edge.x1);
            }
            Orientation::Vertical if last.x0 == edge.x0 && edge.y0 <= last.y1 + tolerance => {
                last.y1 = last.y1.max(edge.y1);
            }
            _ => joined.push(edge),
        }
    }
    joined
}

/// Crossing of a vertical and a horizontal edge, with the edges that meet there
#[derive(Debug, Clone)]
struct Intersection {
    x: f64,
    y: f64,
    horizontal: Vec<usize>,
    vertical: Vec<usize>,
}

impl Intersection {
    fn shares_edge(&self, other: &Intersection) -> bool {
        if self.x == other.x {
            self.vertical.iter().any(|e| other.vertical.contains(e))
        } else if self.y == other.y {
            self.horizontal.iter().any(|e| other.horizontal.contains(e))
        } else {
            false
        }
    }
}

/// Intersections sorted top to bottom, then left to right
fn find_intersections(edges: &[Edge], tolerance: f64) -> Vec<Intersection> {
    let mut points: HashMap<(u64, u64), Intersection> = HashMap::new();

    for (vi, v) in edges.iter().enumerate() {
        if v.orientation != Orientation::Vertical {
            continue;
        }
        for (hi, h) in edges.iter().enumerate() {
            if h.orientation != Orientation::Horizontal {
                continue;
            }
            let crosses = v.y0 <= h.y0 + tolerance
                && v.y1 >= h.y0 - tolerance
                && v.x0 >= h.x0 - tolerance
                && v.x0 <= h.x1 + tolerance;
            if !crosses {
                continue;
            }

            let point = points
                .entry((v.x0.to_bits(), h.y0.to_bits()))
                .or_insert_with(|| Intersection {
                    x: v.x0,
                    y: h.y0,
                    horizontal: Vec::new(),
                    vertical: Vec::new(),
                });
            point.horizontal.push(hi);
            point.vertical.push(vi);
        }
    }

    let mut points: Vec<Intersection> = points.into_values().collect();
    points.sort_by(|a, b| cmp_f64(b.y, a.y).then(cmp_f64(a.x, b.x)));
    points
}

/// Smallest rectangles whose four corners are intersections joined by edges
fn intersections_to_cells(points: &[Intersection]) -> Vec<BBox> {
    let lookup: HashMap<(u64, u64), usize> = points
        .iter()
        .enumerate()
        .map(|(i, p)| ((p.x.to_bits(), p.y.to_bits()), i))
        .collect();

    let mut cells = Vec::new();
    for (i, top_left) in points.iter().enumerate() {
        let rest = &points[i + 1..];
        let below = rest.iter().filter(|p| p.x == top_left.x);
        let right: Vec<&Intersection> = rest.iter().filter(|p| p.y == top_left.y).collect();

        'search: for bottom_left in below {
            if !top_left.shares_edge(bottom_left) {
                continue;
            }
            for &top_right in &right {
                if !top_left.shares_edge(top_right) {
                    continue;
                }
                let corner = lookup
                    .get(&(top_right.x.to_bits(), bottom_left.y.to_bits()))
                    .map(|&idx| &points[idx]);
                if let Some(bottom_right) = corner {
                    if bottom_right.shares_edge(top_right) && bottom_right.shares_edge(bottom_left) {
                        cells.push(BBox::new(top_left.x, bottom_left.y, top_right.x, top_left.y));
                        break 'search;
                    }
                }
            }
        }
    }
    cells
}

/// Union cells sharing a corner into tables; single-cell groups are dropped
fn group_cells(cells: Vec<BBox>) -> Vec<Vec<BBox>> {
    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    let mut parent: Vec<usize> = (0..cells.len()).collect();
    let mut corner_owner: HashMap<(u64, u64), usize> = HashMap::new();
    for (i, cell) in cells.iter().enumerate() {
        let corners = [
            (cell.x0, cell.y0),
            (cell.x0, cell.y1),
            (cell.x1, cell.y0),
            (cell.x1, cell.y1),
        ];
        for (x, y) in corners {
            match corner_owner.get(&(x.to_bits(), y.to_bits())) {
                Some(&other) => {
                    let (a, b) = (find(&mut parent, i), find(&mut parent, other));
                    parent[a] = b;
                }
                None => {
                    corner_owner.insert((x.to_bits(), y.to_bits()), i);
                }
            }
        }
    }

    let mut groups: HashMap<usize, Vec<BBox>> = HashMap::new();
    for (i, cell) in cells.into_iter().enumerate() {
        let root = find(&mut parent, i);
        groups.entry(root).or_default().push(cell);
    }

    let mut tables: Vec<Vec<BBox>> = groups.into_values().filter(|g| g.len() > 1).collect();
    tables.sort_by(|a, b| {
        let top = |t: &[BBox]| t.iter().map(|c| c.y1).fold(f64::MIN, f64::max);
        let left = |t: &[BBox]| t.iter().map(|c| c.x0).fold(f64::MAX, f64::min);
        cmp_f64(top(b), top(a)).then(cmp_f64(left(a), left(b)))
    });
    tables
}

/// Lay cells out in rows by their top edge, one slot per distinct left edge
fn build_table(mut cells: Vec<BBox>, chars: &[PageChar], settings: &TableSettings) -> Table {
    cells.sort_by(|a, b| cmp_f64(b.y1, a.y1).then(cmp_f64(a.x0, b.x0)));

    let mut columns: Vec<f64> = cells.iter().map(|c| c.x0).collect();
    columns.sort_by(|a, b| cmp_f64(*a, *b));
    columns.dedup();

    let bbox = cells
        .iter()
        .copied()
        .reduce(|a, b| a.union(&b))
        .unwrap_or(BBox::new(0.0, 0.0, 0.0, 0.0));

    let mut rows: Vec<Vec<Option<Cell>>> = Vec::new();
    let mut current_top: Option<f64> = None;
    for cell in cells {
        if current_top != Some(cell.y1) {
            rows.push(vec![None; columns.len()]);
            current_top = Some(cell.y1);
        }
        let slot = columns.iter().position(|&x| x == cell.x0);
        if let (Some(row), Some(slot)) = (rows.last_mut(), slot) {
            row[slot] = Some(Cell {
                bbox: cell,
                text: cell_text(&cell, chars, settings),
            });
        }
    }

    Table { bbox, rows }
}

/// Text of the characters centered inside `bbox`: words joined by spaces, lines by newlines
pub fn cell_text(bbox: &BBox, chars: &[PageChar], settings: &TableSettings) -> String {
    let mut inside: Vec<&PageChar> = chars
        .iter()
        .filter(|c| {
            let (x, y) = c.bbox.center();
            bbox.contains_point(x, y)
        })
        .collect();
    inside.sort_by(|a, b| cmp_f64(b.bbox.y1, a.bbox.y1));

    // Group into lines by top edge
    let mut lines: Vec<Vec<&PageChar>> = Vec::new();
    let mut line_top: Option<f64> = None;
    for ch in inside {
        match (line_top, lines.last_mut()) {
            (Some(top), Some(line)) if (top - ch.bbox.y1).abs() <= settings.text_y_tolerance => {
                line.push(ch)
            }
            _ => {
                line_top = Some(ch.bbox.y1);
                lines.push(vec![ch]);
            }
        }
    }

    lines
        .into_iter()
        .map(|mut line| {
            line.sort_by(|a, b| cmp_f64(a.bbox.x0, b.bbox.x0));
            line_words(&line, settings.text_x_tolerance).join(" ")
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split one line into words on blank glyphs and horizontal gaps
fn line_words(line: &[&PageChar], x_tolerance: f64) -> Vec<String> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut last_x1: Option<f64> = None;

    for ch in line {
        if ch.text.trim().is_empty() {
            if !word.is_empty() {
                words.push(std::mem::take(&mut word));
            }
            last_x1 = None;
            continue;
        }
        if let Some(x1) = last_x1 {
            if ch.bbox.x0 - x1 > x_tolerance && !word.is_empty() {
                words.push(std::mem::take(&mut word));
            }
        }
        word.push_str(&ch.text);
        last_x1 = Some(ch.bbox.x1);
    }
    if !word.is_empty() {
        words.push(word);
    }
    words
}

/// Group spans into rows by Y coordinate
fn cluster_into_rows(mut spans: Vec<&TextSpan>, tolerance: f64) -> Vec<Vec<&TextSpan>> {
    // Sort by Y descending (top to bottom), then X ascending
    spans.sort_by(|a, b| cmp_f64(b.y, a.y).then(cmp_f64(a.x, b.x)));

    let mut rows: Vec<Vec<&TextSpan>> = Vec::new();
    let mut current_y: Option<f64> = None;

    for span in spans {
        match (current_y, rows.last_mut()) {
            (Some(y), Some(row)) if (span.y - y).abs() <= tolerance => row.push(span),
            _ => {
                current_y = Some(span.y);
                rows.push(vec![span]);
            }
        }
    }

    rows
}

/// Detect column boundaries from X positions
fn detect_columns(rows: &[Vec<&TextSpan>]) -> Vec<f64> {
    let mut x_positions: Vec<f64> = rows
        .iter()
        .flat_map(|row| row.iter().map(|s| s.x))
        .collect();
    x_positions.sort_by(|a, b| cmp_f64(*a, *b));

    // Cluster X positions, each column at its cluster average
    let tolerance = 10.0;
    let mut clusters: Vec<Vec<f64>> = Vec::new();
    for x in x_positions {
        match clusters.last_mut() {
            Some(cluster) if cluster.last().is_some_and(|last| (x - last).abs() <= tolerance) => {
                cluster.push(x)
            }
            _ => clusters.push(vec![x]),
        }
    }

    clusters
        .iter()
        .map(|c| c.iter().sum::<f64>() / c.len() as f64)
        .collect()
}

/// Assign spans to grid cells based on nearest column
fn assign_to_columns(rows: Vec<Vec<&TextSpan>>, columns: &[f64]) -> Vec<Vec<Option<Cell>>> {
    rows.into_iter()
        .map(|row| {
            let mut cells: Vec<Option<Cell>> = vec![None; columns.len()];

            for span in row {
                let col_idx = columns
                    .iter()
                    .enumerate()
                    .min_by(|(_, a), (_, b)| cmp_f64((span.x - **a).abs(), (span.x - **b).abs()))
                    .map(|(i, _)| i)
                    .unwrap_or(0);

                // Several spans may land in one cell
                match &mut cells[col_idx] {
                    Some(cell) => {
                        cell.text.push(' ');
                        cell.text.push_str(&span.text);
                        cell.bbox = cell.bbox.union(&span.bbox);
                    }
                    slot @ None => {
                        *slot = Some(Cell {
                            bbox: span.bbox,
                            text: span.text.clone(),
                        })
                    }
                }
            }

            cells
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Color;

    fn make_span(text: &str, x: f64, y: f64) -> TextSpan {
        TextSpan {
            text: text.to_string(),
            x,
            y,
            font_size: 12.0,
            font_name: None,
            bbox: BBox::new(x, y - 2.0, x + 6.0 * text.len() as f64, y + 10.0),
            fill: Color::default(),
        }
    }

    /// Glyphs 5 units wide, 10 tall, starting at (x, y)
    fn make_chars(text: &str, x: f64, y: f64) -> Vec<PageChar> {
        text.chars()
            .enumerate()
            .map(|(i, c)| {
                let x0 = x + 5.0 * i as f64;
                PageChar {
                    text: c.to_string(),
                    bbox: BBox::new(x0, y, x0 + 5.0, y + 10.0),
                    font_size: 10.0,
                    font_name: None,
                    fill: Color::default(),
                    stroke: Color::default(),
                }
            })
            .collect()
    }

    /// Rectangle outlines of a `cols` x `rows` grid of 50x20 cells with top-left (0, 100)
    fn grid_edges(cols: usize, rows: usize) -> Vec<Edge> {
        let mut edges = Vec::new();
        for r in 0..rows {
            for c in 0..cols {
                let (x0, y1) = (50.0 * c as f64, 100.0 - 20.0 * r as f64);
                let (x1, y0) = (x0 + 50.0, y1 - 20.0);
                edges.push(Edge::horizontal(y0, x0, x1));
                edges.push(Edge::horizontal(y1, x0, x1));
                edges.push(Edge::vertical(x0, y0, y1));
                edges.push(Edge::vertical(x1, y0, y1));
            }
        }
        edges
    }

    #[test]
    fn test_ruled_grid() {
        let mut chars = make_chars("ID", 2.0, 85.0);
        chars.extend(make_chars("NAME", 52.0, 85.0));
        chars.extend(make_chars("7", 2.0, 65.0));
        chars.extend(make_chars("Clinic", 52.0, 65.0));

        let tables = Table::from_edges(&grid_edges(2, 2), &chars, &TableSettings::default());

        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].num_columns(), 2);
        assert_eq!(tables[0].bbox, BBox::new(0.0, 60.0, 100.0, 100.0));
        assert_eq!(
            tables[0].text_rows(),
            vec![
                vec![Some("ID".to_string()), Some("NAME".to_string())],
                vec![Some("7".to_string()), Some("Clinic".to_string())],
            ]
        );
    }

    #[test]
    fn test_snapping_and_joining() {
        // Slightly misaligned, broken lines still form one 2x1 table
        let edges = vec![
            Edge::horizontal(100.0, 0.0, 48.0),
            Edge::horizontal(100.5, 49.0, 100.0),
            Edge::horizontal(80.0, 0.0, 100.0),
            Edge::vertical(0.0, 80.0, 100.0),
            Edge::vertical(50.8, 80.0, 100.0),
            Edge::vertical(100.0, 80.0, 100.0),
        ];

        let tables = Table::from_edges(&edges, &[], &TableSettings::default());

        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows.len(), 1);
        assert_eq!(tables[0].text_rows()[0], vec![Some(String::new()), Some(String::new())]);
    }

    #[test]
    fn test_merged_row_leaves_empty_slots() {
        let mut edges = grid_edges(3, 1);
        // Full-width row below without inner dividers
        edges.push(Edge::horizontal(60.0, 0.0, 150.0));
        edges.push(Edge::vertical(0.0, 60.0, 80.0));
        edges.push(Edge::vertical(150.0, 60.0, 80.0));
        let chars = make_chars("CEBU", 2.0, 65.0);

        let tables = Table::from_edges(&edges, &chars, &TableSettings::default());
        let rows = tables[0].text_rows();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], vec![Some("CEBU".to_string()), None, None]);
    }

    #[test]
    fn test_lone_rectangle_is_not_a_table() {
        let tables = Table::from_edges(&grid_edges(1, 1), &[], &TableSettings::default());
        assert!(tables.is_empty());
    }

    #[test]
    fn test_cell_text_words_and_lines() {
        let mut chars = make_chars("Rural", 2.0, 30.0);
        chars.extend(make_chars(" ", 27.0, 30.0));
        chars.extend(make_chars("Health", 32.0, 30.0));
        chars.extend(make_chars("Unit", 2.0, 15.0));
        // Outside the cell
        chars.extend(make_chars("X", 200.0, 30.0));

        let text = cell_text(
            &BBox::new(0.0, 10.0, 100.0, 45.0),
            &chars,
            &TableSettings::default(),
        );
        assert_eq!(text, "Rural Health\nUnit");
    }

    #[test]
    fn test_cell_text_gap_splits_words() {
        let mut chars = make_chars("A", 0.0, 0.0);
        chars.extend(make_chars("B", 20.0, 0.0));
        let text = cell_text(&BBox::new(0.0, 0.0, 50.0, 20.0), &chars, &TableSettings::default());
        assert_eq!(text, "A B");
    }

    #[test]
    fn test_simple_table() {
        let spans = vec![
            make_span("A", 0.0, 100.0),
            make_span("B", 50.0, 100.0),
            make_span("1", 0.0, 80.0),
            make_span("2", 50.0, 80.0),
        ];

        let table = Table::from_spans(&spans).unwrap();

        assert_eq!(table.num_columns(), 2);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(
            table.text_rows()[1],
            vec![Some("1".to_string()), Some("2".to_string())]
        );
    }

    #[test]
    fn test_row_clustering() {
        let spans = [
            make_span("A", 0.0, 100.0),
            make_span("B", 50.0, 100.5), // Slightly different Y
            make_span("C", 0.0, 80.0),
        ];

        let rows = cluster_into_rows(spans.iter().collect(), 6.0);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), 2); // A and B in same row
        assert_eq!(rows[1].len(), 1); // C in separate row
    }

    #[test]
    fn test_span_table_missing_cell() {
        let spans = vec![
            make_span("BOHOL", 0.0, 100.0),
            make_span("1", 0.0, 80.0),
            make_span("Clinic", 50.0, 80.0),
        ];

        let table = Table::from_spans(&spans).unwrap();
        assert_eq!(table.text_rows()[0], vec![Some("BOHOL".to_string()), None]);
        assert!(Table::from_spans(&[]).is_none());
    }
}
