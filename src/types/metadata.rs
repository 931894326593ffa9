use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{SheetMetadata, StyleDetails};

/// Everything extracted from one workbook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metadata {
    pub filename: String,
    pub properties: DocumentProperties,
    pub sheets: Vec<SheetMetadata>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub defined_names: Vec<DefinedName>,
    /// Decoded styles keyed by style id. Id 0 never appears.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub styles: BTreeMap<u32, StyleDetails>,
    pub extracted_at: DateTime<Utc>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            filename: String::new(),
            properties: DocumentProperties::default(),
            sheets: Vec::new(),
            defined_names: Vec::new(),
            styles: BTreeMap::new(),
            extracted_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

impl Metadata {
    /// Look up a sheet record by name.
    pub fn sheet(&self, name: &str) -> Option<&SheetMetadata> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// Total number of cell records across all sheets.
    pub fn cell_count(&self) -> usize {
        self.sheets.iter().map(|s| s.cells.len()).sum()
    }
}

/// Core document properties (`docProps/core.xml`).
///
/// `created` and `modified` keep the W3CDTF text as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentProperties {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub subject: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub creator: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub keywords: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub last_modified_by: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub category: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub created: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub modified: String,
}

/// A defined name (named range or constant).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DefinedName {
    pub name: String,
    /// Formula or reference text, e.g. `Sheet1!$A$1:$D$10`.
    pub refers_to: String,
    /// Owning sheet name, or `"Workbook"` for global names.
    pub scope: String,
}
