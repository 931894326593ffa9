//! The read-only query surface the extractor needs from a workbook reader.
//!
//! [`crate::parser::XlsxSource`] implements it over an XLSX package. Tests
//! substitute in-memory sources.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::types::{
    AlignmentStyle, BorderStyle, CellType, DataValidation, DefinedName, DocumentProperties,
    FillStyle, FontStyle, ImageFormat, MergedCell, Protection, SheetProtection,
};

/// Column width reported when neither the column nor the sheet sets one.
pub const DEFAULT_COL_WIDTH: f64 = 9.140625;

/// Row height in points when the sheet sets no default.
pub const DEFAULT_ROW_HEIGHT: f64 = 15.0;

/// A picture resolved at a cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Picture {
    pub file: Vec<u8>,
    /// Lower case with a leading dot.
    pub extension: String,
    pub insert_type: u8,
    pub format: Option<ImageFormat>,
}

/// A `cellXfs` entry with its font, fill, borders and number format resolved.
///
/// The fill is always present here; the extractor drops it when it has no
/// colors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Style {
    pub font: Option<FontStyle>,
    pub fill: FillStyle,
    pub border: Vec<BorderStyle>,
    pub alignment: Option<AlignmentStyle>,
    pub num_fmt: u32,
    pub protection: Option<Protection>,
}

/// Queries over an open workbook.
///
/// Sheet-scoped queries fail with `SheetNotFound` for unknown names.
/// Addresses are A1 notation. After [`close`](WorkbookSource::close) every
/// query fails.
pub trait WorkbookSource {
    /// Sheet names in declared order.
    fn sheet_list(&mut self) -> Result<Vec<String>>;

    fn doc_props(&mut self) -> Result<DocumentProperties>;

    /// Defined names with their scope (sheet name or `"Workbook"`).
    fn defined_names(&mut self) -> Result<Vec<DefinedName>>;

    fn sheet_visible(&mut self, sheet: &str) -> Result<bool>;

    /// Row-major display text, trailing empty cells and rows trimmed.
    fn rows(&mut self, sheet: &str) -> Result<Vec<Vec<String>>>;

    fn merge_cells(&mut self, sheet: &str) -> Result<Vec<MergedCell>>;

    fn data_validations(&mut self, sheet: &str) -> Result<Vec<DataValidation>>;

    fn sheet_protection(&mut self, sheet: &str) -> Result<Option<SheetProtection>>;

    /// Width of a column given by its letters.
    fn col_width(&mut self, sheet: &str, col: &str) -> Result<f64>;

    /// Non-default row heights keyed by 1-based row number.
    fn row_heights(&mut self, sheet: &str) -> Result<BTreeMap<u32, f64>>;

    /// Formula text, empty when the cell has none.
    fn cell_formula(&mut self, sheet: &str, addr: &str) -> Result<String>;

    /// Style id, 0 when the cell has none.
    fn cell_style(&mut self, sheet: &str, addr: &str) -> Result<u32>;

    fn cell_type(&mut self, sheet: &str, addr: &str) -> Result<CellType>;

    /// Hyperlink target covering the cell, if any.
    fn cell_hyperlink(&mut self, sheet: &str, addr: &str) -> Result<Option<String>>;

    /// Addresses holding at least one anchored picture, in anchor order.
    fn picture_cells(&mut self, sheet: &str) -> Result<Vec<String>>;

    fn pictures(&mut self, sheet: &str, addr: &str) -> Result<Vec<Picture>>;

    /// Decode a style id. Unknown ids fail with `Style`.
    fn style(&mut self, id: u32) -> Result<Style>;

    fn close(&mut self) -> Result<()>;
}
