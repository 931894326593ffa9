use serde::{Deserialize, Serialize};

use super::{is_false, is_zero, is_zero_f64};

/// Decoded cell format for one style id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StyleDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<FontStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<FillStyle>,
    /// One entry per styled side.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub border: Vec<BorderStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alignment: Option<AlignmentStyle>,
    /// Number format id (`numFmtId`), 0 is General.
    #[serde(skip_serializing_if = "is_zero")]
    pub number_format: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protection: Option<Protection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FontStyle {
    #[serde(skip_serializing_if = "is_false")]
    pub bold: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub italic: bool,
    /// Underline kind (`single`, `double`, ...), empty when not underlined.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub underline: String,
    #[serde(skip_serializing_if = "is_false")]
    pub strike: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub family: String,
    #[serde(skip_serializing_if = "is_zero_f64")]
    pub size: f64,
    /// RGB hex without alpha, e.g. `FF0000`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub color: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FillStyle {
    /// `pattern` or `gradient`.
    #[serde(rename = "type")]
    pub fill_type: String,
    /// Index into the OOXML pattern list (1 = solid).
    #[serde(skip_serializing_if = "is_zero")]
    pub pattern: u32,
    pub color: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BorderStyle {
    /// Side: `left`, `right`, `top`, `bottom` or `diagonal`.
    #[serde(rename = "type")]
    pub side: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub color: String,
    /// Index into the OOXML border style list (1 = thin).
    pub style: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlignmentStyle {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub horizontal: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub vertical: String,
    #[serde(skip_serializing_if = "is_false")]
    pub wrap_text: bool,
    #[serde(skip_serializing_if = "is_zero")]
    pub text_rotation: i32,
    #[serde(skip_serializing_if = "is_zero")]
    pub indent: u32,
    #[serde(skip_serializing_if = "is_false")]
    pub shrink_to_fit: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Protection {
    #[serde(skip_serializing_if = "is_false")]
    pub hidden: bool,
    pub locked: bool,
}

/// Pattern fill names in OOXML order; the position is the pattern index.
pub const PATTERN_TYPES: [&str; 19] = [
    "none",
    "solid",
    "mediumGray",
    "darkGray",
    "lightGray",
    "darkHorizontal",
    "darkVertical",
    "darkDown",
    "darkUp",
    "darkGrid",
    "darkTrellis",
    "lightHorizontal",
    "lightVertical",
    "lightDown",
    "lightUp",
    "lightGrid",
    "lightTrellis",
    "gray125",
    "gray0625",
];

/// Border style names in OOXML order; the position is the style index.
pub const BORDER_STYLES: [&str; 14] = [
    "none",
    "thin",
    "medium",
    "dashed",
    "dotted",
    "thick",
    "double",
    "hair",
    "mediumDashed",
    "dashDot",
    "mediumDashDot",
    "dashDotDot",
    "mediumDashDotDot",
    "slantDashDot",
];

/// Pattern index for a `patternType` name, 0 when unknown.
pub fn pattern_index(name: &str) -> u32 {
    PATTERN_TYPES
        .iter()
        .position(|p| *p == name)
        .and_then(|i| u32::try_from(i).ok())
        .unwrap_or(0)
}

/// Border style index for a `style` name, 0 when unknown.
pub fn border_style_index(name: &str) -> u32 {
    BORDER_STYLES
        .iter()
        .position(|p| *p == name)
        .and_then(|i| u32::try_from(i).ok())
        .unwrap_or(0)
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

    #[test_case("none", 0)]
    #[test_case("solid", 1)]
    #[test_case("gray125", 17)]
    #[test_case("gray0625", 18)]
    #[test_case("bogus", 0)]
    fn test_pattern_index(name: &str, expected: u32) {
        assert_eq!(pattern_index(name), expected);
    }

    #[test_case("thin", 1)]
    #[test_case("double", 6)]
    #[test_case("slantDashDot", 13)]
    #[test_case("", 0)]
    fn test_border_style_index(name: &str, expected: u32) {
        assert_eq!(border_style_index(name), expected);
    }

    #[test]
    fn test_style_details_json_omits_empty_parts() {
        let details = StyleDetails {
            font: Some(FontStyle {
                bold: true,
                size: 11.0,
                ..Default::default()
            }),
            number_format: 14,
            ..Default::default()
        };
        let json = serde_json::to_string(&details).unwrap();
        assert_eq!(json, r#"{"font":{"bold":true,"size":11.0},"numberFormat":14}"#);
    }
}
