//! Turning table rows into facility records.

mod clean;
mod label;
mod normalize;
mod record;

pub use clean::{clean_row, clean_text};
pub use label::{Label, LabelMatching, detect_label, is_label_shaped};
pub use normalize::{Rejection, RowContext, RowOutcome, classify_row, normalize};
pub use record::{FIELD_NAMES, PROVINCE_INDEX, RAW_COLUMNS, Record};
