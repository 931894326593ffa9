use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{CellMetadata, ImageMetadata};

/// A single worksheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SheetMetadata {
    /// Zero-based position in the workbook's declared sheet order.
    pub index: u32,
    pub name: String,
    pub visible: bool,
    pub dimensions: SheetDimensions,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub merged_cells: Vec<MergedCell>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub data_validations: Vec<DataValidation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protection: Option<SheetProtection>,
    /// Row number (1-based) to height in points, non-default rows only.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub row_heights: BTreeMap<u32, f64>,
    /// Column letters to width in characters, non-default columns only.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub col_widths: BTreeMap<String, f64>,
    /// Row-major scan order.
    pub cells: Vec<CellMetadata>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageMetadata>,
}

/// Bounding range of the used cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SheetDimensions {
    pub start_cell: String,
    pub end_cell: String,
    pub row_count: u32,
    pub col_count: u32,
}

impl Default for SheetDimensions {
    /// The single-cell origin range reported for empty sheets.
    fn default() -> Self {
        Self {
            start_cell: "A1".to_string(),
            end_cell: "A1".to_string(),
            row_count: 0,
            col_count: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MergedCell {
    pub start_cell: String,
    pub end_cell: String,
    /// Display text of the anchor cell.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub value: String,
}

/// A data validation rule over a range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataValidation {
    /// Space-separated `sqref`.
    pub range: String,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub validation_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub operator: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub formula1: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub formula2: String,
    pub show_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Sheet protection settings.
///
/// The `edit*`/`select*` flags are permissions: true means the action is allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SheetProtection {
    pub protected: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub password: String,
    pub edit_objects: bool,
    pub edit_scenarios: bool,
    pub select_locked_cells: bool,
    pub select_unlocked_cells: bool,
}
