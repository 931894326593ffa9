//! Shared XML helpers for the part parsers.
//!
//! Attribute lookups match on the full key unless the `_local` variant is
//! used, which ignores the namespace prefix (`r:id`, `r:embed`).

use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Extract a string attribute value by key, unescaping XML entities.
///
/// Returns `None` if the attribute is missing or not valid UTF-8.
pub fn attr_string(e: &BytesStart, key: &[u8]) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == key {
            return attr.unescape_value().ok().map(|s| s.into_owned());
        }
    }
    None
}

/// Extract a string attribute by local name (ignoring namespace prefix).
pub fn attr_string_local(e: &BytesStart, key: &[u8]) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.local_name().as_ref() == key {
            return attr.unescape_value().ok().map(|s| s.into_owned());
        }
    }
    None
}

/// Extract a `u32` attribute value by key.
pub fn attr_u32(e: &BytesStart, key: &[u8]) -> Option<u32> {
    attr_string(e, key).and_then(|s| s.trim().parse().ok())
}

/// Extract an `i32` attribute value by key.
pub fn attr_i32(e: &BytesStart, key: &[u8]) -> Option<i32> {
    attr_string(e, key).and_then(|s| s.trim().parse().ok())
}

/// Extract an `i64` attribute value by key.
pub fn attr_i64(e: &BytesStart, key: &[u8]) -> Option<i64> {
    attr_string(e, key).and_then(|s| s.trim().parse().ok())
}

/// Extract an `f64` attribute value by key.
///
/// `inf` and `NaN` parse as floats but are not sizes; they read as missing.
pub fn attr_f64(e: &BytesStart, key: &[u8]) -> Option<f64> {
    attr_string(e, key)
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Extract a boolean attribute value by key.
///
/// Returns `None` if missing. Recognizes `"1"`, `"true"` as true; anything else as false.
pub fn attr_bool(e: &BytesStart, key: &[u8]) -> Option<bool> {
    attr_string(e, key).map(|s| matches!(s.as_str(), "1" | "true"))
}

/// Extract a boolean attribute with a default value.
pub fn attr_bool_default(e: &BytesStart, key: &[u8], default: bool) -> bool {
    attr_bool(e, key).unwrap_or(default)
}

/// Extract the `val` attribute as a string. Very common in SpreadsheetML.
pub fn attr_val(e: &BytesStart) -> Option<String> {
    attr_string(e, b"val")
}

/// Extract the `val` attribute as `f64`.
pub fn attr_val_f64(e: &BytesStart) -> Option<f64> {
    attr_f64(e, b"val")
}

/// Toggle elements like `<b/>` or `<b val="0"/>`: present means on unless val says otherwise.
pub fn attr_val_toggle(e: &BytesStart) -> bool {
    attr_bool(e, b"val").unwrap_or(true)
}

/// RGB hex from a color element's `rgb` attribute, with the alpha byte dropped.
///
/// `FFFF0000` becomes `FF0000`. Theme and indexed colors have no RGB and yield `None`.
pub fn attr_rgb(e: &BytesStart) -> Option<String> {
    let rgb = attr_string(e, b"rgb")?;
    let rgb = rgb.trim();
    let stripped = if rgb.len() == 8 {
        rgb.get(2..).unwrap_or(rgb)
    } else {
        rgb
    };
    if stripped.is_empty() {
        None
    } else {
        Some(stripped.to_ascii_uppercase())
    }
}

/// Get the local element name as an owned string.
///
/// Returns empty string if not valid UTF-8.
#[inline]
pub fn local_name_string(e: &BytesStart) -> String {
    let bytes = e.local_name();
    std::str::from_utf8(bytes.as_ref())
        .unwrap_or("")
        .to_string()
}

/// Read the text content of the element whose start tag was just consumed.
///
/// Concatenates text and CDATA until the matching end tag (by local name),
/// skipping any nested markup. Returns an empty string for empty elements.
pub fn read_element_text<R: BufRead>(xml: &mut Reader<R>, end: &[u8]) -> String {
    let mut text = String::new();
    let mut buf = Vec::new();
    let mut depth = 0usize;

    loop {
        buf.clear();
        match xml.read_event_into(&mut buf) {
            Ok(Event::Text(t)) => {
                if let Ok(s) = t.unescape() {
                    text.push_str(&s);
                }
            }
            Ok(Event::CData(c)) => {
                if let Ok(s) = std::str::from_utf8(&c) {
                    text.push_str(s);
                }
            }
            Ok(Event::Start(_)) => depth += 1,
            Ok(Event::End(ref e)) => {
                if depth == 0 && e.local_name().as_ref() == end {
                    break;
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }

    text
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

    fn make_start(xml: &str) -> BytesStart<'_> {
        // Strip < and > / /> to get just the tag content
        let content = xml
            .trim_start_matches('<')
            .trim_end_matches('>')
            .trim_end_matches('/')
            .trim_end();
        BytesStart::from_content(content, content.find(' ').unwrap_or(content.len()))
    }

    #[test]
    fn test_attr_string_unescapes() {
        let e = make_start(r#"<foo name="a &amp; b" />"#);
        assert_eq!(attr_string(&e, b"name"), Some("a & b".to_string()));
        assert_eq!(attr_string(&e, b"missing"), None);
    }

    #[test]
    fn test_attr_string_local() {
        let e = make_start(r#"<blip r:embed="rId3" />"#);
        assert_eq!(attr_string(&e, b"embed"), None);
        assert_eq!(attr_string_local(&e, b"embed"), Some("rId3".to_string()));
    }

    #[test]
    fn test_numeric_attrs() {
        let e = make_start(r#"<foo count="42" off="-7" width="12.5" />"#);
        assert_eq!(attr_u32(&e, b"count"), Some(42));
        assert_eq!(attr_i32(&e, b"off"), Some(-7));
        assert_eq!(attr_i64(&e, b"off"), Some(-7));
        let w = attr_f64(&e, b"width").unwrap();
        assert!((w - 12.5).abs() < f64::EPSILON);
        assert_eq!(attr_u32(&e, b"missing"), None);
    }

    #[test]
    fn test_attr_f64_rejects_non_finite() {
        let e = make_start(r#"<col width="inf" ht="NaN" sz="-infinity" />"#);
        assert_eq!(attr_f64(&e, b"width"), None);
        assert_eq!(attr_f64(&e, b"ht"), None);
        assert_eq!(attr_f64(&e, b"sz"), None);
    }

    #[test]
    fn test_attr_bool() {
        let e = make_start(r#"<foo a="1" b="0" c="true" d="false" />"#);
        assert_eq!(attr_bool(&e, b"a"), Some(true));
        assert_eq!(attr_bool(&e, b"b"), Some(false));
        assert_eq!(attr_bool(&e, b"c"), Some(true));
        assert_eq!(attr_bool(&e, b"d"), Some(false));
        assert_eq!(attr_bool(&e, b"missing"), None);
        assert!(attr_bool_default(&e, b"missing", true));
    }

    #[test]
    fn test_attr_val_toggle() {
        assert!(attr_val_toggle(&make_start("<b/>")));
        assert!(!attr_val_toggle(&make_start(r#"<b val="0"/>"#)));
    }

    #[test]
    fn test_attr_rgb() {
        assert_eq!(
            attr_rgb(&make_start(r#"<color rgb="FFff0000"/>"#)),
            Some("FF0000".to_string())
        );
        assert_eq!(
            attr_rgb(&make_start(r#"<color rgb="00FF00"/>"#)),
            Some("00FF00".to_string())
        );
        assert_eq!(attr_rgb(&make_start(r#"<color theme="1"/>"#)), None);
    }

    #[test]
    fn test_read_element_text() {
        let mut reader = Reader::from_str("<f>SUM(<x/>A1:A3)&amp;1</f><next/>");
        let mut buf = Vec::new();
        // consume <f>
        let _ = reader.read_event_into(&mut buf).unwrap();
        assert_eq!(read_element_text(&mut reader, b"f"), "SUM(A1:A3)&1");
    }
}
