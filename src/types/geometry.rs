/// Axis-aligned box in PDF user space (y grows upward)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BBox {
    /// Build a box from two corners in any order
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    /// Smallest box containing all points
    pub fn from_points(points: &[(f64, f64)]) -> Option<Self> {
        let (&(fx, fy), rest) = points.split_first()?;
        let mut bbox = BBox::new(fx, fy, fx, fy);
        for &(x, y) in rest {
            bbox.x0 = bbox.x0.min(x);
            bbox.y0 = bbox.y0.min(y);
            bbox.x1 = bbox.x1.max(x);
            bbox.y1 = bbox.y1.max(y);
        }
        Some(bbox)
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Half-open containment: left/bottom edges are inside, right/top are not
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }
}

/// Affine transform `[a b c d e f]` in PDF row-vector convention
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix(pub [f64; 6]);

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    pub fn translate(tx: f64, ty: f64) -> Self {
        Matrix([1.0, 0.0, 0.0, 1.0, tx, ty])
    }

    /// Read a six-number array such as `/Matrix` or the `cm`/`Tm` operands
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        match values {
            [a, b, c, d, e, f] => Some(Matrix([*a, *b, *c, *d, *e, *f])),
            _ => None,
        }
    }

    /// `self × other`: apply `self` first, then `other`
    pub fn then(&self, other: &Matrix) -> Matrix {
        let [a1, b1, c1, d1, e1, f1] = self.0;
        let [a2, b2, c2, d2, e2, f2] = other.0;
        Matrix([
            a1 * a2 + b1 * c2,
            a1 * b2 + b1 * d2,
            c1 * a2 + d1 * c2,
            c1 * b2 + d1 * d2,
            e1 * a2 + f1 * c2 + e2,
            e1 * b2 + f1 * d2 + f2,
        ])
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let [a, b, c, d, e, f] = self.0;
        (a * x + c * y + e, b * x + d * y + f)
    }

    /// Vertical scale factor, used for the effective font size
    pub fn vertical_scale(&self) -> f64 {
        let [_, _, c, d, _, _] = self.0;
        (c * c + d * d).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_normalizes_corners() {
        let b = BBox::new(10.0, 20.0, 0.0, 5.0);
        assert_eq!(b, BBox { x0: 0.0, y0: 5.0, x1: 10.0, y1: 20.0 });
        assert_eq!(b.width(), 10.0);
        assert_eq!(b.height(), 15.0);
    }

    #[test]
    fn test_contains_point_is_half_open() {
        let b = BBox::new(0.0, 0.0, 10.0, 10.0);
        assert!(b.contains_point(0.0, 0.0));
        assert!(b.contains_point(5.0, 9.9));
        assert!(!b.contains_point(10.0, 5.0));
        assert!(!b.contains_point(5.0, 10.0));
    }

    #[test]
    fn test_matrix_concat_order() {
        let scale = Matrix([2.0, 0.0, 0.0, 2.0, 0.0, 0.0]);
        let shift = Matrix::translate(10.0, 5.0);
        // scale first, then shift
        assert_eq!(scale.then(&shift).apply(1.0, 1.0), (12.0, 7.0));
        // shift first, then scale
        assert_eq!(shift.then(&scale).apply(1.0, 1.0), (22.0, 12.0));
    }

    #[test]
    fn test_from_points() {
        let b = BBox::from_points(&[(3.0, 4.0), (1.0, 8.0), (2.0, 0.0)]).unwrap();
        assert_eq!(b, BBox::new(1.0, 0.0, 3.0, 8.0));
        assert!(BBox::from_points(&[]).is_none());
    }
}
