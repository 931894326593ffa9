//! xlsxmeta - XLSX metadata extraction
//!
//! Reads an Excel workbook and produces one [`Metadata`] value describing it:
//! - Document properties and defined names
//! - Sheets with dimensions, merges, validations, protection and layout
//! - Cells with formulas, style ids, types and hyperlinks
//! - A deduplicated style table and anchored images
//!
//! The value is written either as JSON or as a Rust program that rebuilds
//! the workbook through [`recreate::Recreator`].
//!
//! # Usage
//!
//! ```no_run
//! use xlsxmeta::{Extractor, Options};
//!
//! # fn main() -> xlsxmeta::Result<()> {
//! let mut extractor = Extractor::open("book.xlsx", Options::default().with_images(false))?;
//! let json = extractor.extract_to_json(true)?;
//! extractor.close()?;
//! println!("{json}");
//! # Ok(())
//! # }
//! ```

// Package parsing
pub mod cell_ref;
pub mod data_validation;
pub mod drawings;
pub mod error;
pub mod formula;
pub mod hyperlinks;
pub mod parser;
pub mod protection;
pub mod source;
pub mod styles;
pub mod types;
pub mod workbook_meta;
pub mod xml_helpers;

// Extraction and output
pub mod extractor;
pub mod recreate;
pub mod serialize;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub use error::{Result, XlsxMetaError};
pub use extractor::{Extractor, Options};
pub use parser::XlsxSource;
pub use source::WorkbookSource;
pub use types::*;

/// Extract everything from the workbook at `path`.
///
/// # Errors
/// Returns an error if the workbook cannot be opened or its sheet list
/// cannot be read.
pub fn quick_extract(path: impl AsRef<Path>) -> Result<Metadata> {
    with_extractor(path, Extractor::extract)
}

/// Extract and encode as JSON.
///
/// # Errors
/// Fails like [`quick_extract`], or if encoding fails.
pub fn quick_extract_to_json(path: impl AsRef<Path>, pretty: bool) -> Result<String> {
    with_extractor(path, |extractor| extractor.extract_to_json(pretty))
}

/// Extract and encode as a Rust program that rebuilds the workbook.
///
/// # Errors
/// Fails like [`quick_extract`], or if encoding fails.
pub fn quick_extract_to_literal(path: impl AsRef<Path>) -> Result<String> {
    with_extractor(path, Extractor::extract_to_literal)
}

/// Extract `input` and write it to `output`, choosing the encoding from the
/// output extension (`.json` or `.rs`).
///
/// # Errors
/// Fails on an unsupported extension before extracting, and otherwise
/// like [`quick_extract`] or on write failure.
pub fn quick_extract_to_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    pretty: bool,
) -> Result<()> {
    with_extractor(input, |extractor| extractor.extract_to_file(output, pretty))
}

/// Run `f` on a default-options extractor, then close it. An error from
/// `f` wins over an error from closing.
fn with_extractor<T>(
    path: impl AsRef<Path>,
    f: impl FnOnce(&mut Extractor<XlsxSource<BufReader<File>>>) -> Result<T>,
) -> Result<T> {
    let mut extractor = Extractor::open(path, Options::default())?;
    let result = f(&mut extractor);
    let closed = extractor.close();
    let value = result?;
    closed?;
    Ok(value)
}
