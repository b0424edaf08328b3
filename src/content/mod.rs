mod color;
mod parser;

use std::collections::HashMap;
use std::rc::Rc;

use crate::font::Font;
use crate::types::{BBox, Matrix};

pub use color::Color;
pub use parser::ContentParser;

/// One glyph painted on the page
#[derive(Debug, Clone)]
pub struct PageChar {
    pub text: String,
    pub bbox: BBox,
    pub font_size: f64,
    pub font_name: Option<String>,
    /// Non-stroking color, the one used to fill glyph outlines
    pub fill: Color,
    pub stroke: Color,
}

/// Extracted text with position information
#[derive(Debug, Clone)]
pub struct TextSpan {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub font_size: f64,
    pub font_name: Option<String>,
    pub bbox: BBox,
    pub fill: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// Axis-aligned ruling segment; horizontal edges have `y0 == y1`, vertical `x0 == x1`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub orientation: Orientation,
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Edge {
    pub fn horizontal(y: f64, x0: f64, x1: f64) -> Self {
        Edge {
            orientation: Orientation::Horizontal,
            x0: x0.min(x1),
            y0: y,
            x1: x0.max(x1),
            y1: y,
        }
    }

    pub fn vertical(x: f64, y0: f64, y1: f64) -> Self {
        Edge {
            orientation: Orientation::Vertical,
            x0: x,
            y0: y0.min(y1),
            x1: x,
            y1: y0.max(y1),
        }
    }

    pub fn length(&self) -> f64 {
        match self.orientation {
            Orientation::Horizontal => self.x1 - self.x0,
            Orientation::Vertical => self.y1 - self.y0,
        }
    }
}

/// Everything the interpreter collects from one page
#[derive(Debug, Clone, Default)]
pub struct PageContent {
    pub chars: Vec<PageChar>,
    pub spans: Vec<TextSpan>,
    pub edges: Vec<Edge>,
}

/// Named resources a content stream can refer to
#[derive(Debug, Clone, Default)]
pub struct Resources {
    pub fonts: HashMap<String, Rc<Font>>,
    pub forms: HashMap<String, Rc<FormXObject>>,
}

/// A form XObject, painted by `Do` as a nested content stream
#[derive(Debug, Clone)]
pub struct FormXObject {
    pub content: Vec<u8>,
    pub matrix: Matrix,
    pub resources: Resources,
}
