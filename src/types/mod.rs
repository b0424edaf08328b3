mod geometry;
mod object;

pub use geometry::{BBox, Matrix};
pub use object::{Dict, ObjRef, PdfObject};
