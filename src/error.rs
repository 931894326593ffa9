//! Structured error types for xlsxmeta.
//!
//! Fatal failures (open, serialize, write) surface through these variants.
//! Per-record failures during extraction are logged and skipped instead.

use std::path::PathBuf;

/// All errors that can occur while reading a workbook or writing metadata.
#[derive(Debug, thiserror::Error)]
pub enum XlsxMetaError {
    /// The workbook could not be opened.
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: Box<XlsxMetaError>,
    },

    /// XML parsing error from quick-xml.
    #[error("XML parsing: {0}")]
    Xml(#[from] quick_xml::Error),

    /// ZIP archive error.
    #[error("ZIP archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failure.
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Failure while regenerating a workbook.
    #[error("workbook write: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),

    /// Output path has an extension no encoder handles.
    #[error("unsupported {0} file")]
    UnsupportedOutput(String),

    /// Sheet name is not part of the workbook.
    #[error("sheet not found: {0}")]
    SheetNotFound(String),

    /// The source was queried after it was closed.
    #[error("workbook source is closed")]
    Closed,

    /// Style id could not be decoded.
    #[error("style resolution failed: {0}")]
    Style(String),

    /// Invalid cell reference.
    #[error("invalid cell reference: {0}")]
    CellRef(String),

    /// General parse error.
    #[error("parse error: {0}")]
    Parse(String),

    /// The literal encoder could not format a value.
    #[error("literal encoding: {0}")]
    Literal(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, XlsxMetaError>;

impl XlsxMetaError {
    /// Wrap an error raised while acquiring the workbook at `path`.
    pub fn open(path: impl Into<PathBuf>, source: XlsxMetaError) -> Self {
        Self::Open {
            path: path.into(),
            source: Box::new(source),
        }
    }
}

impl From<std::fmt::Error> for XlsxMetaError {
    fn from(e: std::fmt::Error) -> Self {
        Self::Literal(e.to_string())
    }
}
