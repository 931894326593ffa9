//! JSON encoding.

use crate::error::Result;
use crate::types::Metadata;

/// Encode as compact or two-space indented JSON.
pub fn to_json(metadata: &Metadata, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(metadata)?
    } else {
        serde_json::to_string(metadata)?
    };
    Ok(json)
}

/// Decode a document produced by [`to_json`].
pub fn from_json(json: &str) -> Result<Metadata> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::types::{
        CellMetadata, CellType, CellValue, DataValidation, SheetDimensions, SheetMetadata,
    };
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn sample() -> Metadata {
        Metadata {
            filename: "book.xlsx".to_string(),
            sheets: vec![SheetMetadata {
                name: "Sheet1".to_string(),
                visible: true,
                cells: vec![CellMetadata {
                    address: "A1".to_string(),
                    value: CellValue::from_text("Product"),
                    cell_type: CellType::SharedString,
                    ..Default::default()
                }],
                data_validations: vec![DataValidation {
                    range: "A1:A5".to_string(),
                    validation_type: "list".to_string(),
                    formula1: "\"a,b\"".to_string(),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            extracted_at: Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap(),
            ..Default::default()
        }
    }

    #[test]
    fn test_compact_shape() {
        let json = to_json(&sample(), false).unwrap();
        assert!(!json.contains('\n'));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["filename"], "book.xlsx");
        assert_eq!(value["sheets"][0]["cells"][0]["type"], "sharedString");
        assert_eq!(value["sheets"][0]["dimensions"]["startCell"], "A1");
        assert_eq!(value["extractedAt"], "2024-05-06T07:08:09Z");
        // show-error flag is kept even when false
        assert_eq!(value["sheets"][0]["dataValidations"][0]["showError"], false);
        // empty optional parts are omitted
        assert!(value.get("styles").is_none());
        assert!(value.get("definedNames").is_none());
        assert!(value["sheets"][0].get("protection").is_none());
        assert!(value["sheets"][0]["cells"][0].get("formula").is_none());
    }

    #[test]
    fn test_pretty_round_trip() {
        let meta = sample();
        let json = to_json(&meta, true).unwrap();
        assert!(json.contains("\n  \"filename\": \"book.xlsx\""));
        assert_eq!(from_json(&json).unwrap(), meta);
    }

    #[test]
    fn test_empty_sheet_dimensions_serialized() {
        let json = to_json(&sample(), false).unwrap();
        let back = from_json(&json).unwrap();
        assert_eq!(back.sheets[0].dimensions, SheetDimensions::default());
    }
}
