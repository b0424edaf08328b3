//! Extract health-facility tables from the YAKAP PDF into batched SQL files.

pub mod config;
pub mod content;
pub mod decode;
pub mod document;
pub mod error;
pub mod extract;
pub mod facility;
pub mod font;
pub mod parser;
pub mod pipeline;
pub mod sql;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use config::ExportConfig;
pub use decode::decode_stream;
pub use document::Document;
pub use error::{ExportError, PdfError, Result};
pub use extract::{Page, Table, TableSettings, TableStrategy};
pub use facility::{LabelMatching, Record};
pub use pipeline::{ExtractState, PageOutcome, RunSummary, extract_records, process_page, run};
pub use types::{ObjRef, PdfObject};
