use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{is_false, is_zero, is_zero_f64};

/// A picture anchored at a cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageMetadata {
    /// Anchor cell address.
    pub cell: String,
    pub file: Bytes,
    /// Lower case with a leading dot, e.g. `.png`.
    pub extension: String,
    /// 0 = placed over cells, 1 = placed in cell.
    pub insert_type: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<ImageFormat>,
}

/// Placement and presentation attributes of a picture.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageFormat {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub alt_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub print_object: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    #[serde(skip_serializing_if = "is_false")]
    pub lock_aspect_ratio: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub auto_fit: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub auto_fit_ignore_aspect: bool,
    /// Pixel offset from the anchor cell's left edge.
    #[serde(skip_serializing_if = "is_zero")]
    pub offset_x: i32,
    /// Pixel offset from the anchor cell's top edge.
    #[serde(skip_serializing_if = "is_zero")]
    pub offset_y: i32,
    #[serde(skip_serializing_if = "is_zero_f64")]
    pub scale_x: f64,
    #[serde(skip_serializing_if = "is_zero_f64")]
    pub scale_y: f64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hyperlink: String,
    /// `External` or `Location`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hyperlink_type: String,
    /// `oneCell`, `twoCell` or `absolute`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub positioning: String,
}

/// Raw binary content. JSON carries it as standard base64.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(v: Vec<u8>) -> Self {
        Self(v)
    }
}

impl std::fmt::Debug for Bytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Bytes({} bytes)", self.0.len())
    }
}

impl Serialize for Bytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for Bytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD
            .decode(s.as_bytes())
            .map(Bytes)
            .map_err(serde::de::Error::custom)
    }
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

    #[test]
    fn test_bytes_base64() {
        let b = Bytes(vec![0x89, b'P', b'N', b'G']);
        let json = serde_json::to_string(&b).unwrap();
        assert_eq!(json, r#""iVBORw==""#);
        let back: Bytes = serde_json::from_str(&json).unwrap();
        assert_eq!(back, b);
    }

    #[test]
    fn test_bytes_rejects_invalid_base64() {
        assert!(serde_json::from_str::<Bytes>(r#""not base64!""#).is_err());
    }

    #[test]
    fn test_image_format_camel_case_keys() {
        let format = ImageFormat {
            alt_text: "logo".to_string(),
            print_object: Some(true),
            offset_x: 10,
            scale_x: 1.0,
            hyperlink_type: "External".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(&format).unwrap();
        assert_eq!(json["altText"], "logo");
        assert_eq!(json["printObject"], true);
        assert_eq!(json["offsetX"], 10);
        assert_eq!(json["hyperlinkType"], "External");
        assert!(json.get("offsetY").is_none());
    }
}
