//! Common test utilities.
//!
//! Helpers for turning fixture packages into extracted [`Metadata`] and
//! for placing workbooks on disk for path-based entry points and the CLI.
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

use std::io::Cursor;
use std::path::{Path, PathBuf};

use xlsxmeta::{CellMetadata, Extractor, Metadata, Options, SheetMetadata, XlsxSource};

// Re-export fixtures for convenience
pub use super::fixtures::*;

/// Extract XLSX bytes with the given options.
#[must_use]
pub fn extract_with(data: Vec<u8>, options: Options) -> Metadata {
    let source = XlsxSource::from_bytes(data).expect("Failed to open XLSX package");
    let mut extractor = Extractor::new(source, "fixture.xlsx", options);
    extractor.extract().expect("Failed to extract metadata")
}

/// Extract XLSX bytes with default options.
#[must_use]
pub fn extract(data: Vec<u8>) -> Metadata {
    extract_with(data, Options::default())
}

/// Open an in-memory extractor without running it.
#[must_use]
pub fn extractor(data: Vec<u8>) -> Extractor<XlsxSource<Cursor<Vec<u8>>>> {
    let source = XlsxSource::from_bytes(data).expect("Failed to open XLSX package");
    Extractor::new(source, "fixture.xlsx", Options::default())
}

/// Write `data` to `name` inside `dir` and return the path.
pub fn write_workbook(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, data).expect("Failed to write workbook");
    path
}

/// The two-sheet inventory workbook used across tests: `Sheet1` has
/// A1 = "Product" and B2 = 100 computed by `SUM(C2:D2)`, `Sheet2` is empty.
#[must_use]
pub fn inventory_workbook() -> Vec<u8> {
    XlsxBuilder::new()
        .sheet(
            SheetBuilder::new("Sheet1")
                .cell("A1", "Product", None)
                .formula("B2", "SUM(C2:D2)", 100.0),
        )
        .sheet(SheetBuilder::new("Sheet2"))
        .defined_name("SalesRange", "Sheet1!$A$1:$B$10")
        .title("Inventory")
        .creator("Finance")
        .build()
}

// ============================================================================
// Lookups
// ============================================================================

/// Find a sheet by name, panicking with the available names on failure.
pub fn sheet<'a>(meta: &'a Metadata, name: &str) -> &'a SheetMetadata {
    meta.sheet(name).unwrap_or_else(|| {
        let names: Vec<_> = meta.sheets.iter().map(|s| s.name.as_str()).collect();
        panic!("sheet {name:?} not found, have {names:?}")
    })
}

/// Find a cell record by address.
pub fn cell<'a>(sheet: &'a SheetMetadata, address: &str) -> &'a CellMetadata {
    sheet
        .cells
        .iter()
        .find(|c| c.address == address)
        .unwrap_or_else(|| panic!("cell {address} not found in {}", sheet.name))
}

/// Addresses of a sheet's cell records in order.
pub fn addresses(sheet: &SheetMetadata) -> Vec<&str> {
    sheet.cells.iter().map(|c| c.address.as_str()).collect()
}

/// Fix the timestamp so two extractions compare equal.
#[must_use]
pub fn normalized(mut meta: Metadata) -> Metadata {
    meta.extracted_at = chrono::DateTime::from_timestamp(0, 0).unwrap();
    meta
}
