/// A fill or stroke color as set by the content stream
#[derive(Debug, Clone, PartialEq)]
pub enum Color {
    Gray(f64),
    Rgb(f64, f64, f64),
    Cmyk(f64, f64, f64, f64),
    /// Components of a color space we do not interpret (patterns, ICC with odd arity)
    Other(Vec<f64>),
}

impl Default for Color {
    fn default() -> Self {
        Color::Gray(0.0)
    }
}

impl Color {
    /// Interpret `sc`/`scn` operands by their count
    pub fn from_components(components: &[f64]) -> Self {
        match *components {
            [g] => Color::Gray(g),
            [r, g, b] => Color::Rgb(r, g, b),
            [c, m, y, k] => Color::Cmyk(c, m, y, k),
            _ => Color::Other(components.to_vec()),
        }
    }

    /// Initial color after a `cs`/`CS` color space change
    pub fn initial_for_space(space: &str) -> Self {
        match space {
            "DeviceRGB" | "CalRGB" | "RGB" => Color::Rgb(0.0, 0.0, 0.0),
            "DeviceCMYK" | "CMYK" => Color::Cmyk(0.0, 0.0, 0.0, 1.0),
            "DeviceGray" | "CalGray" | "G" => Color::Gray(0.0),
            _ => Color::Other(Vec::new()),
        }
    }

    /// Pure RGB red, compared exactly: `(1, 0, 0)`
    pub fn is_red(&self) -> bool {
        matches!(self, Color::Rgb(r, g, b) if *r == 1.0 && *g == 0.0 && *b == 0.0)
    }
}
