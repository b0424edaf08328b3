use std::rc::Rc;

use tracing::{debug, warn};

use crate::content::{Color, Edge, PageChar, PageContent, Resources, TextSpan};
use crate::error::Result;
use crate::font::Font;
use crate::parser::{ContentItem, Parser};
use crate::types::{BBox, Matrix, PdfObject};

/// Glyph box in text space, as a fraction of the font size
const DESCENT: f64 = -0.2;
const ASCENT: f64 = 0.8;

/// Form XObjects nested deeper than this are not painted
const MAX_FORM_DEPTH: usize = 8;

/// TJ adjustments at least this large (thousandths of an em) read as a word gap
const TJ_SPACE_THRESHOLD: f64 = 200.0;

/// Graphics state saved and restored by q/Q
#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    fill: Color,
    stroke: Color,
    font: Option<Rc<Font>>,
    font_name: Option<String>,
    font_size: f64,
    char_spacing: f64,
    word_spacing: f64,
    /// Tz / 100
    horizontal_scale: f64,
    leading: f64,
    rise: f64,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            fill: Color::default(),
            stroke: Color::default(),
            font: None,
            font_name: None,
            font_size: 12.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

/// Subpath in user space; `curved[i]` marks the segment ending at `points[i]`
#[derive(Debug, Default)]
struct Subpath {
    points: Vec<(f64, f64)>,
    curved: Vec<bool>,
    closed: bool,
}

/// Content stream interpreter
pub struct ContentParser {
    state: GraphicsState,
    state_stack: Vec<GraphicsState>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    path: Vec<Subpath>,
    fallback_font: Rc<Font>,
    output: PageContent,
}

impl Default for ContentParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentParser {
    pub fn new() -> Self {
        Self {
            state: GraphicsState::default(),
            state_stack: Vec::new(),
            text_matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            path: Vec::new(),
            fallback_font: Rc::new(Font::default()),
            output: PageContent::default(),
        }
    }

    /// Interpret a page content stream and return its characters, spans and edges
    pub fn parse(mut self, data: &[u8], resources: &Resources) -> Result<PageContent> {
        self.run(data, resources, 0)?;
        Ok(self.output)
    }

    fn run(&mut self, data: &[u8], resources: &Resources, depth: usize) -> Result<()> {
        let mut parser = Parser::new(data);
        let mut operands: Vec<PdfObject> = Vec::new();

        while let Some(item) = parser.next_content_item()? {
            match item {
                ContentItem::Operand(obj) => operands.push(obj),
                ContentItem::Operator(op) => {
                    if op == "BI" {
                        skip_inline_image(&mut parser)?;
                    } else {
                        self.execute_operator(&op, &operands, resources, depth)?;
                    }
                    operands.clear();
                }
            }
        }

        Ok(())
    }

    fn execute_operator(
        &mut self,
        op: &str,
        operands: &[PdfObject],
        resources: &Resources,
        depth: usize,
    ) -> Result<()> {
        let nums = numbers(operands);

        match op {
            // Graphics state
            "q" => self.state_stack.push(self.state.clone()),
            "Q" => {
                if let Some(state) = self.state_stack.pop() {
                    self.state = state;
                }
            }
            "cm" => {
                if let Some(m) = last_matrix(&nums) {
                    self.state.ctm = m.then(&self.state.ctm);
                }
            }

            // Colors
            "g" => set_color(&mut self.state.fill, &nums, 1),
            "G" => set_color(&mut self.state.stroke, &nums, 1),
            "rg" => set_color(&mut self.state.fill, &nums, 3),
            "RG" => set_color(&mut self.state.stroke, &nums, 3),
            "k" => set_color(&mut self.state.fill, &nums, 4),
            "K" => set_color(&mut self.state.stroke, &nums, 4),
            "cs" => {
                if let Some(space) = operands.last().and_then(PdfObject::as_name) {
                    self.state.fill = Color::initial_for_space(space);
                }
            }
            "CS" => {
                if let Some(space) = operands.last().and_then(PdfObject::as_name) {
                    self.state.stroke = Color::initial_for_space(space);
                }
            }
            // Pattern names among the operands are ignored; only components count
            "sc" | "scn" => self.state.fill = Color::from_components(&nums),
            "SC" | "SCN" => self.state.stroke = Color::from_components(&nums),

            // Text objects
            "BT" => {
                self.text_matrix = Matrix::IDENTITY;
                self.line_matrix = Matrix::IDENTITY;
            }
            "ET" => {}

            // Text state
            "Tf" => {
                if let [.., PdfObject::Name(name), size] = operands {
                    self.state.font = resources.fonts.get(name).cloned();
                    if self.state.font.is_none() {
                        warn!(font = %name, "font resource not found, using fallback metrics");
                    }
                    self.state.font_name = Some(name.clone());
                    if let Some(size) = size.as_number() {
                        self.state.font_size = size;
                    }
                }
            }
            "Tc" => set_last(&mut self.state.char_spacing, &nums),
            "Tw" => set_last(&mut self.state.word_spacing, &nums),
            "TL" => set_last(&mut self.state.leading, &nums),
            "Ts" => set_last(&mut self.state.rise, &nums),
            "Tz" => {
                if let Some(scale) = nums.last() {
                    self.state.horizontal_scale = scale / 100.0;
                }
            }

            // Text positioning
            "Td" => {
                if let [.., tx, ty] = nums[..] {
                    self.move_line(tx, ty);
                }
            }
            "TD" => {
                if let [.., tx, ty] = nums[..] {
                    self.state.leading = -ty;
                    self.move_line(tx, ty);
                }
            }
            "Tm" => {
                if let Some(m) = last_matrix(&nums) {
                    self.text_matrix = m;
                    self.line_matrix = m;
                }
            }
            "T*" => self.move_line(0.0, -self.state.leading),

            // Text showing
            "Tj" => {
                if let Some(bytes) = operands.last().and_then(PdfObject::as_string) {
                    self.show_text(&[TextPart::Bytes(bytes)]);
                }
            }
            "TJ" => {
                if let Some(items) = operands.last().and_then(PdfObject::as_array) {
                    let parts: Vec<TextPart> = items
                        .iter()
                        .filter_map(|item| match item {
                            PdfObject::String(bytes) => Some(TextPart::Bytes(bytes)),
                            other => other.as_number().map(TextPart::Adjust),
                        })
                        .collect();
                    self.show_text(&parts);
                }
            }
            "'" => {
                self.move_line(0.0, -self.state.leading);
                if let Some(bytes) = operands.last().and_then(PdfObject::as_string) {
                    self.show_text(&[TextPart::Bytes(bytes)]);
                }
            }
            "\"" => {
                if let [aw, ac, ..] = nums[..] {
                    self.state.word_spacing = aw;
                    self.state.char_spacing = ac;
                }
                self.move_line(0.0, -self.state.leading);
                if let Some(bytes) = operands.last().and_then(PdfObject::as_string) {
                    self.show_text(&[TextPart::Bytes(bytes)]);
                }
            }

            // Path construction
            "m" => {
                if let [.., x, y] = nums[..] {
                    let p = self.state.ctm.apply(x, y);
                    self.path.push(Subpath {
                        points: vec![p],
                        curved: vec![false],
                        closed: false,
                    });
                }
            }
            "l" => {
                if let [.., x, y] = nums[..] {
                    let p = self.state.ctm.apply(x, y);
                    self.line_to(p, false);
                }
            }
            "c" | "v" | "y" => {
                if let [.., x, y] = nums[..] {
                    let p = self.state.ctm.apply(x, y);
                    self.line_to(p, true);
                }
            }
            "h" => {
                if let Some(sub) = self.path.last_mut() {
                    sub.closed = true;
                }
            }
            "re" => {
                if let [.., x, y, w, h] = nums[..] {
                    let ctm = self.state.ctm;
                    let corners = [(x, y), (x + w, y), (x + w, y + h), (x, y + h)];
                    self.path.push(Subpath {
                        points: corners.iter().map(|&(px, py)| ctm.apply(px, py)).collect(),
                        curved: vec![false; 4],
                        closed: true,
                    });
                }
            }

            // Path painting
            "S" => self.paint_path(false),
            "s" => {
                if let Some(sub) = self.path.last_mut() {
                    sub.closed = true;
                }
                self.paint_path(false);
            }
            "f" | "F" | "f*" | "B" | "B*" => self.paint_path(true),
            "b" | "b*" => {
                if let Some(sub) = self.path.last_mut() {
                    sub.closed = true;
                }
                self.paint_path(true);
            }
            "n" => self.path.clear(),

            // XObjects
            "Do" => {
                if let Some(name) = operands.last().and_then(PdfObject::as_name) {
                    self.paint_form(name, resources, depth)?;
                }
            }

            _ => {
                // Marked content, clipping, images and shading do not affect extraction
            }
        }

        Ok(())
    }

    /// Td semantics: translate the line matrix and start a new line there
    fn move_line(&mut self, tx: f64, ty: f64) {
        self.line_matrix = Matrix::translate(tx, ty).then(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn line_to(&mut self, p: (f64, f64), curved: bool) {
        match self.path.last_mut() {
            Some(sub) => {
                sub.points.push(p);
                sub.curved.push(curved);
            }
            // A segment without a current point starts a subpath
            None => self.path.push(Subpath {
                points: vec![p],
                curved: vec![curved],
                closed: false,
            }),
        }
    }

    /// Turn the axis-aligned straight segments of the current path into edges
    fn paint_path(&mut self, fill: bool) {
        for sub in self.path.drain(..) {
            let n = sub.points.len();
            if n < 2 {
                continue;
            }

            let mut segments: Vec<((f64, f64), (f64, f64))> = (1..n)
                .filter(|&i| !sub.curved[i])
                .map(|i| (sub.points[i - 1], sub.points[i]))
                .collect();
            if sub.closed || fill {
                segments.push((sub.points[n - 1], sub.points[0]));
            }

            for ((x0, y0), (x1, y1)) in segments {
                let (dx, dy) = ((x1 - x0).abs(), (y1 - y0).abs());
                if dy < 0.01 && dx > 0.0 {
                    self.output.edges.push(Edge::horizontal(y0, x0, x1));
                } else if dx < 0.01 && dy > 0.0 {
                    self.output.edges.push(Edge::vertical(x0, y0, y1));
                }
            }
        }
    }

    fn paint_form(&mut self, name: &str, resources: &Resources, depth: usize) -> Result<()> {
        let Some(form) = resources.forms.get(name).cloned() else {
            // Image XObjects are not loaded as forms
            return Ok(());
        };
        if depth >= MAX_FORM_DEPTH {
            warn!(form = %name, depth, "form XObject nesting too deep, skipped");
            return Ok(());
        }

        debug!(form = %name, depth, "painting form XObject");
        self.state_stack.push(self.state.clone());
        let saved_text = (self.text_matrix, self.line_matrix);
        self.state.ctm = form.matrix.then(&self.state.ctm);

        let result = self.run(&form.content, &form.resources, depth + 1);

        (self.text_matrix, self.line_matrix) = saved_text;
        if let Some(state) = self.state_stack.pop() {
            self.state = state;
        }
        result
    }

    fn show_text(&mut self, parts: &[TextPart]) {
        let font = self
            .state
            .font
            .clone()
            .unwrap_or_else(|| Rc::clone(&self.fallback_font));
        let fs = self.state.font_size;
        let th = self.state.horizontal_scale;

        let mut span_text = String::new();
        let mut span_bbox: Option<BBox> = None;
        let mut span_origin: Option<(f64, f64)> = None;
        let mut span_size = fs;

        for part in parts {
            let bytes = match part {
                &TextPart::Adjust(n) => {
                    self.text_matrix = Matrix::translate(-n / 1000.0 * fs * th, 0.0)
                        .then(&self.text_matrix);
                    let gap = -n >= TJ_SPACE_THRESHOLD;
                    if gap && !span_text.is_empty() && !span_text.ends_with(' ') {
                        span_text.push(' ');
                    }
                    continue;
                }
                TextPart::Bytes(bytes) => bytes,
            };

            for code in font.codes(bytes) {
                let text = font.decode(code);
                let w0 = font.width(code) / 1000.0;

                let trm = Matrix([fs * th, 0.0, 0.0, fs, 0.0, self.state.rise])
                    .then(&self.text_matrix)
                    .then(&self.state.ctm);
                let corners = [
                    trm.apply(0.0, DESCENT),
                    trm.apply(w0, DESCENT),
                    trm.apply(0.0, ASCENT),
                    trm.apply(w0, ASCENT),
                ];

                if let Some(bbox) = BBox::from_points(&corners) {
                    if !text.is_empty() {
                        let size = trm.vertical_scale();
                        span_origin.get_or_insert(trm.apply(0.0, 0.0));
                        span_bbox = Some(match span_bbox {
                            Some(b) => b.union(&bbox),
                            None => bbox,
                        });
                        span_size = size;
                        span_text.push_str(&text);

                        self.output.chars.push(PageChar {
                            text,
                            bbox,
                            font_size: size,
                            font_name: self.state.font_name.clone(),
                            fill: self.state.fill.clone(),
                            stroke: self.state.stroke.clone(),
                        });
                    }
                }

                let mut tx = w0 * fs + self.state.char_spacing;
                if font.is_word_space(code) {
                    tx += self.state.word_spacing;
                }
                self.text_matrix = Matrix::translate(tx * th, 0.0).then(&self.text_matrix);
            }
        }

        let text = span_text.trim();
        if let (false, Some((x, y)), Some(bbox)) = (text.is_empty(), span_origin, span_bbox) {
            self.output.spans.push(TextSpan {
                text: text.to_string(),
                x,
                y,
                font_size: span_size,
                font_name: self.state.font_name.clone(),
                bbox,
                fill: self.state.fill.clone(),
            });
        }
    }
}

/// Piece of a TJ array
enum TextPart<'a> {
    Bytes(&'a [u8]),
    Adjust(f64),
}

fn numbers(operands: &[PdfObject]) -> Vec<f64> {
    operands.iter().filter_map(PdfObject::as_number).collect()
}

fn last_matrix(nums: &[f64]) -> Option<Matrix> {
    nums.len()
        .checked_sub(6)
        .and_then(|start| Matrix::from_slice(&nums[start..]))
}

fn set_last(target: &mut f64, nums: &[f64]) {
    if let Some(v) = nums.last() {
        *target = *v;
    }
}

fn set_color(target: &mut Color, nums: &[f64], arity: usize) {
    if let Some(start) = nums.len().checked_sub(arity) {
        *target = Color::from_components(&nums[start..]);
    }
}

/// Skip `BI <dict> ID <binary> EI`; the parser is positioned right after `BI`
fn skip_inline_image(parser: &mut Parser) -> Result<()> {
    while let Some(item) = parser.next_content_item()? {
        if item == ContentItem::Operator("ID".into()) {
            break;
        }
    }

    let data = parser.data();
    let start = parser.position() + 1;
    let end = (start..data.len().saturating_sub(1))
        .find(|&i| {
            &data[i..i + 2] == b"EI"
                && data[i - 1].is_ascii_whitespace()
                && data.get(i + 2).is_none_or(|b| b.is_ascii_whitespace())
        })
        .map(|i| i + 2)
        .unwrap_or(data.len());

    parser.seek(end);
    Ok(())
}
