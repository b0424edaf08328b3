use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("Invalid PDF: missing %PDF header")]
    MissingHeader,

    #[error("Invalid PDF: missing startxref marker")]
    MissingEof,

    #[error("Parse error at byte {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("Invalid xref: {0}")]
    InvalidXref(String),

    #[error("Object not found: {0} {1} R")]
    ObjectNotFound(u32, u16),

    #[error("Invalid document structure: {0}")]
    InvalidStructure(String),

    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),

    #[error("Decompression failed: {0}")]
    DecompressError(String),

    #[error("Invalid UTF-8 in name or keyword")]
    InvalidUtf8,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PdfError>;

/// Failures of a whole extraction run. Nothing below `main` recovers from these.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open document")]
    Pdf(#[from] PdfError),

    #[error("failed to extract page {page}")]
    Page {
        page: usize,
        #[source]
        source: PdfError,
    },

    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}
