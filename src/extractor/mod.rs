//! Metadata extraction.
//!
//! [`Extractor`] owns a [`WorkbookSource`] and walks it into a
//! [`Metadata`] value. Failures below the workbook level are logged and
//! skipped: a sheet that cannot be read is left out, a cell lookup that
//! fails leaves its field empty, a style that cannot be decoded is absent
//! from the style map.

mod cells;
mod images;
#[cfg(test)]
pub(crate) mod mock;
mod styles;

pub use styles::StyleCache;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::Utc;

use crate::cell_ref::column_name;
use crate::error::Result;
use crate::parser::XlsxSource;
use crate::serialize::{self, OutputKind};
use crate::source::{WorkbookSource, DEFAULT_COL_WIDTH};
use crate::types::{Metadata, SheetDimensions, SheetMetadata};

const WIDTH_EPSILON: f64 = 1e-9;

/// What to extract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub include_cell_data: bool,
    pub include_styles: bool,
    pub include_images: bool,
    pub include_defined_names: bool,
    pub include_data_validation: bool,
    /// Cell records per sheet; 0 means unlimited.
    pub max_cells_per_sheet: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            include_cell_data: true,
            include_styles: true,
            include_images: true,
            include_defined_names: true,
            include_data_validation: true,
            max_cells_per_sheet: 0,
        }
    }
}

impl Options {
    pub fn with_cell_data(mut self, on: bool) -> Self {
        self.include_cell_data = on;
        self
    }

    pub fn with_styles(mut self, on: bool) -> Self {
        self.include_styles = on;
        self
    }

    pub fn with_images(mut self, on: bool) -> Self {
        self.include_images = on;
        self
    }

    pub fn with_defined_names(mut self, on: bool) -> Self {
        self.include_defined_names = on;
        self
    }

    pub fn with_data_validation(mut self, on: bool) -> Self {
        self.include_data_validation = on;
        self
    }

    pub fn with_max_cells_per_sheet(mut self, max: usize) -> Self {
        self.max_cells_per_sheet = max;
        self
    }
}

/// Extracts [`Metadata`] from one workbook.
///
/// The source is closed by [`close`](Extractor::close) or, failing that,
/// when the extractor is dropped.
pub struct Extractor<S: WorkbookSource> {
    source: S,
    filename: String,
    options: Options,
    closed: bool,
}

impl Extractor<XlsxSource<BufReader<File>>> {
    /// Open the workbook at `path`.
    pub fn open(path: impl AsRef<Path>, options: Options) -> Result<Self> {
        let path = path.as_ref();
        let source = XlsxSource::open(path)?;
        Ok(Self::new(source, path.display().to_string(), options))
    }
}

impl<S: WorkbookSource> Extractor<S> {
    pub fn new(source: S, filename: impl Into<String>, options: Options) -> Self {
        Self {
            source,
            filename: filename.into(),
            options,
            closed: false,
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Walk the workbook into a [`Metadata`] value.
    ///
    /// Only a failure to list the sheets is fatal.
    pub fn extract(&mut self) -> Result<Metadata> {
        let extracted_at = Utc::now();

        let properties = self.source.doc_props().unwrap_or_else(|e| {
            tracing::debug!(error = %e, "document properties unavailable");
            Default::default()
        });

        let defined_names = if self.options.include_defined_names {
            self.source.defined_names().unwrap_or_else(|e| {
                tracing::debug!(error = %e, "defined names unavailable");
                Vec::new()
            })
        } else {
            Vec::new()
        };

        let names = self.source.sheet_list()?;
        let mut sheets = Vec::with_capacity(names.len());
        for (index, name) in names.iter().enumerate() {
            let index = u32::try_from(index).unwrap_or(u32::MAX);
            match self.extract_sheet(index, name) {
                Ok(sheet) => sheets.push(sheet),
                Err(e) => tracing::debug!(sheet = %name, error = %e, "skipping sheet"),
            }
        }

        let styles = if self.options.include_styles {
            styles::collect_styles(&mut self.source, &names)
        } else {
            BTreeMap::new()
        };

        let metadata = Metadata {
            filename: self.filename.clone(),
            properties,
            sheets,
            defined_names,
            styles,
            extracted_at,
        };
        tracing::info!(
            file = %metadata.filename,
            sheets = metadata.sheets.len(),
            cells = metadata.cell_count(),
            styles = metadata.styles.len(),
            "extracted workbook metadata"
        );
        Ok(metadata)
    }

    fn extract_sheet(&mut self, index: u32, name: &str) -> Result<SheetMetadata> {
        let visible = self.source.sheet_visible(name).unwrap_or(true);
        let rows = self.source.rows(name)?;
        let dimensions = sheet_dimensions(&rows);
        let merged_cells = self.source.merge_cells(name)?;

        let data_validations = if self.options.include_data_validation {
            self.source.data_validations(name)?
        } else {
            Vec::new()
        };

        let protection = self.source.sheet_protection(name)?;

        let row_heights = self.source.row_heights(name).unwrap_or_else(|e| {
            tracing::debug!(sheet = %name, error = %e, "row heights unavailable");
            BTreeMap::new()
        });

        let mut col_widths = BTreeMap::new();
        for col in 0..dimensions.col_count {
            let letters = column_name(col);
            let width = self.source.col_width(name, &letters)?;
            if (width - DEFAULT_COL_WIDTH).abs() > WIDTH_EPSILON {
                col_widths.insert(letters, width);
            }
        }

        let cells = if self.options.include_cell_data {
            cells::scan_cells(
                &mut self.source,
                name,
                &rows,
                self.options.max_cells_per_sheet,
            )
        } else {
            Vec::new()
        };

        let images = if self.options.include_images {
            images::collect_images(&mut self.source, name)
        } else {
            Vec::new()
        };

        tracing::debug!(sheet = %name, cells = cells.len(), images = images.len(), "extracted sheet");

        Ok(SheetMetadata {
            index,
            name: name.to_string(),
            visible,
            dimensions,
            merged_cells,
            data_validations,
            protection,
            row_heights,
            col_widths,
            cells,
            images,
        })
    }

    /// Extract and encode as JSON.
    pub fn extract_to_json(&mut self, pretty: bool) -> Result<String> {
        let metadata = self.extract()?;
        serialize::to_json(&metadata, pretty)
    }

    /// Extract and encode as a Rust program that rebuilds the workbook.
    pub fn extract_to_literal(&mut self) -> Result<String> {
        let metadata = self.extract()?;
        serialize::to_literal(&metadata)
    }

    /// Extract and write to `path`, picking the encoding from its extension.
    ///
    /// An unsupported extension fails before anything is extracted.
    pub fn extract_to_file(&mut self, path: impl AsRef<Path>, pretty: bool) -> Result<()> {
        let path = path.as_ref();
        let kind = OutputKind::from_path(path)?;
        let metadata = self.extract()?;
        serialize::write_output(&metadata, kind, path, pretty)
    }

    /// Close the source now instead of on drop.
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        self.source.close()
    }
}

impl<S: WorkbookSource> Drop for Extractor<S> {
    fn drop(&mut self) {
        if !self.closed {
            self.closed = true;
            if let Err(e) = self.source.close() {
                tracing::debug!(error = %e, "failed to close workbook source");
            }
        }
    }
}

/// Used range from the row grid: `A1` to the last row and widest row.
/// Empty grids give the single-cell origin with zero counts.
fn sheet_dimensions(rows: &[Vec<String>]) -> SheetDimensions {
    let row_count = u32::try_from(rows.len()).unwrap_or(u32::MAX);
    let col_count = rows
        .iter()
        .map(Vec::len)
        .max()
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0);

    if row_count == 0 || col_count == 0 {
        return SheetDimensions::default();
    }

    SheetDimensions {
        start_cell: "A1".to_string(),
        end_cell: format!("{}{}", column_name(col_count - 1), row_count),
        row_count,
        col_count,
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::source::Style;
    use crate::types::{CellType, DefinedName, DocumentProperties, FontStyle};
    use super::mock::{MockSheet, MockSource};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn two_sheets() -> MockSource {
        let mut sheet1 = MockSheet::new("Sheet1", &[&["Product"], &["", "100"]]);
        sheet1.formulas = HashMap::from([("B2".to_string(), "SUM(C2:D2)".to_string())]);
        sheet1.styles = HashMap::from([("B2".to_string(), 2)]);
        sheet1.types = HashMap::from([("A1".to_string(), CellType::SharedString)]);
        sheet1.widths = HashMap::from([("B".to_string(), 20.0)]);
        MockSource {
            sheets: vec![sheet1, MockSheet::new("Sheet2", &[])],
            props: Some(DocumentProperties {
                title: "Inventory".to_string(),
                ..Default::default()
            }),
            names: vec![DefinedName {
                name: "SalesRange".to_string(),
                refers_to: "Sheet1!$A$1:$B$10".to_string(),
                scope: "Workbook".to_string(),
            }],
            styles: HashMap::from([(
                2,
                Style {
                    font: Some(FontStyle {
                        bold: true,
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            )]),
            ..Default::default()
        }
    }

    #[test]
    fn test_extract_two_sheets() {
        let mut ex = Extractor::new(two_sheets(), "book.xlsx", Options::default());
        let meta = ex.extract().unwrap();

        assert_eq!(meta.filename, "book.xlsx");
        assert_eq!(meta.properties.title, "Inventory");
        assert_eq!(meta.sheets.len(), 2);

        let s1 = &meta.sheets[0];
        assert_eq!(s1.cells.len(), 2);
        assert_eq!(s1.cells[0].address, "A1");
        assert_eq!(s1.cells[1].address, "B2");
        assert_eq!(s1.cells[1].formula, "SUM(C2:D2)");
        assert_eq!(s1.cells[1].style_id, 2);
        assert_eq!(
            s1.dimensions,
            SheetDimensions {
                start_cell: "A1".to_string(),
                end_cell: "B2".to_string(),
                row_count: 2,
                col_count: 2,
            }
        );
        assert_eq!(s1.col_widths, BTreeMap::from([("B".to_string(), 20.0)]));

        let s2 = &meta.sheets[1];
        assert_eq!(s2.index, 1);
        assert_eq!(s2.dimensions, SheetDimensions::default());
        assert!(s2.cells.is_empty());

        assert_eq!(meta.defined_names.len(), 1);
        assert_eq!(meta.defined_names[0].scope, "Workbook");
        assert_eq!(meta.styles.len(), 1);
        assert!(meta.styles[&2].font.as_ref().unwrap().bold);
    }

    #[test]
    fn test_broken_sheet_dropped() {
        let mut source = two_sheets();
        source.sheets[0].broken = true;
        let mut ex = Extractor::new(source, "book.xlsx", Options::default());
        let meta = ex.extract().unwrap();
        assert_eq!(meta.sheets.len(), 1);
        assert_eq!(meta.sheets[0].name, "Sheet2");
        assert_eq!(meta.sheets[0].index, 1);
    }

    #[test]
    fn test_missing_properties_stay_empty() {
        let mut source = two_sheets();
        source.props = None;
        let mut ex = Extractor::new(source, "book.xlsx", Options::default());
        assert_eq!(ex.extract().unwrap().properties, DocumentProperties::default());
    }

    #[test]
    fn test_options_disable_parts() {
        let options = Options::default()
            .with_cell_data(false)
            .with_styles(false)
            .with_defined_names(false);
        let mut ex = Extractor::new(two_sheets(), "book.xlsx", options);
        let meta = ex.extract().unwrap();
        assert!(meta.sheets[0].cells.is_empty());
        assert!(meta.styles.is_empty());
        assert!(meta.defined_names.is_empty());
        // dimensions still come from the rows
        assert_eq!(meta.sheets[0].dimensions.row_count, 2);
    }

    #[test]
    fn test_cap_applies_per_sheet() {
        let mut source = two_sheets();
        source.sheets[1] = MockSheet::new("Sheet2", &[&["a", "b", "c", "d", "e"]]);
        let options = Options::default().with_max_cells_per_sheet(1);
        let mut ex = Extractor::new(source, "book.xlsx", options);
        let meta = ex.extract().unwrap();
        assert_eq!(meta.sheets[0].cells.len(), 1);
        assert_eq!(meta.sheets[1].cells.len(), 1);
        assert_eq!(meta.sheets[1].cells[0].address, "A1");
    }

    #[test]
    fn test_source_closed_on_drop() {
        let source = two_sheets();
        let closed = std::rc::Rc::clone(&source.closed);
        {
            let mut ex = Extractor::new(source, "book.xlsx", Options::default());
            ex.extract().unwrap();
            assert!(!closed.get());
        }
        assert!(closed.get());
    }

    #[test]
    fn test_explicit_close() {
        let source = two_sheets();
        let closed = std::rc::Rc::clone(&source.closed);
        let ex = Extractor::new(source, "book.xlsx", Options::default());
        ex.close().unwrap();
        assert!(closed.get());
    }

    #[test]
    fn test_unsupported_output_fails_before_extracting() {
        let mut ex = Extractor::new(two_sheets(), "book.xlsx", Options::default());
        let err = ex.extract_to_file("out/meta.csv", false).unwrap_err();
        assert_eq!(err.to_string(), "unsupported .csv file");
    }

    #[test]
    fn test_sheet_dimensions() {
        let rows = vec![vec!["a".to_string()], Vec::new(), vec![String::new(), String::new(), "c".to_string()]];
        let dims = sheet_dimensions(&rows);
        assert_eq!(dims.end_cell, "C3");
        assert_eq!(dims.col_count, 3);
        assert_eq!(sheet_dimensions(&[]), SheetDimensions::default());
    }
}
