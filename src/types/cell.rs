use serde::{Deserialize, Serialize};

use super::is_zero;

/// One non-empty cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CellMetadata {
    /// A1 address, e.g. `B2`.
    pub address: String,
    #[serde(skip_serializing_if = "CellValue::is_empty")]
    pub value: CellValue,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub formula: String,
    /// 0 means no explicit style.
    #[serde(skip_serializing_if = "is_zero")]
    pub style_id: u32,
    #[serde(rename = "type")]
    pub cell_type: CellType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hyperlink: Option<Hyperlink>,
}

/// Cell value as extracted. Values are display text; empty cells never
/// become records, so `Empty` only shows up in hand-built models.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
}

impl CellValue {
    /// Build from display text; the empty string maps to `Empty`.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.is_empty() {
            Self::Empty
        } else {
            Self::Text(text)
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.is_empty(),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Empty => "",
            Self::Text(s) => s,
        }
    }
}

/// Declared cell kind, from the `t` attribute of `<c>`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CellType {
    #[default]
    Unset,
    Bool,
    Date,
    Error,
    Formula,
    InlineString,
    Number,
    SharedString,
}

impl CellType {
    /// Map the raw `t` attribute. Absent or unknown values are `Unset`.
    pub fn from_attr(t: Option<&str>) -> Self {
        match t {
            Some("b") => Self::Bool,
            Some("d") => Self::Date,
            Some("e") => Self::Error,
            Some("str") => Self::Formula,
            Some("inlineStr") => Self::InlineString,
            Some("n") => Self::Number,
            Some("s") => Self::SharedString,
            _ => Self::Unset,
        }
    }

    /// Variant name, as used in generated source.
    pub fn name(self) -> &'static str {
        match self {
            Self::Unset => "Unset",
            Self::Bool => "Bool",
            Self::Date => "Date",
            Self::Error => "Error",
            Self::Formula => "Formula",
            Self::InlineString => "InlineString",
            Self::Number => "Number",
            Self::SharedString => "SharedString",
        }
    }
}

/// Hyperlink target of a cell: a URL or an in-workbook location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Hyperlink {
    pub link: String,
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
    use test_case::test_case;

    #[test_case(Some("b"), CellType::Bool)]
    #[test_case(Some("d"), CellType::Date)]
    #[test_case(Some("e"), CellType::Error)]
    #[test_case(Some("str"), CellType::Formula)]
    #[test_case(Some("inlineStr"), CellType::InlineString)]
    #[test_case(Some("n"), CellType::Number)]
    #[test_case(Some("s"), CellType::SharedString)]
    #[test_case(None, CellType::Unset)]
    #[test_case(Some("x"), CellType::Unset)]
    fn test_cell_type_from_attr(t: Option<&str>, expected: CellType) {
        assert_eq!(CellType::from_attr(t), expected);
    }

    #[test]
    fn test_cell_value_untagged_json() {
        let v = CellValue::from_text("42");
        assert_eq!(serde_json::to_string(&v).unwrap(), r#""42""#);
        assert!(CellValue::from_text("").is_empty());
    }

    #[test]
    fn test_cell_omits_empty_fields() {
        let cell = CellMetadata {
            address: "A1".to_string(),
            value: CellValue::from_text("Product"),
            cell_type: CellType::SharedString,
            ..Default::default()
        };
        let json = serde_json::to_string(&cell).unwrap();
        assert_eq!(
            json,
            r#"{"address":"A1","value":"Product","type":"sharedString"}"#
        );
        let back: CellMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cell);
    }
}
