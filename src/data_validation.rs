//! Data validation parsing module
//! This module handles parsing of `<dataValidation>` rules from sheet XML.

use crate::types::DataValidation;
use crate::xml_helpers::{attr_bool_default, attr_string, read_element_text};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::BufRead;

/// Parse a `<dataValidation>` element and its `<formula1>`/`<formula2>` children.
///
/// # Example XML
/// ```xml
/// <dataValidation type="list" allowBlank="1" sqref="A1:A100"
///     showErrorMessage="1" errorTitle="Error" error="Invalid value">
///   <formula1>"Option1,Option2,Option3"</formula1>
/// </dataValidation>
/// ```
///
/// Attributes kept: `sqref`, `type`, `operator`, `showErrorMessage`,
/// `errorTitle` and `error`. Input prompts and the dropdown flag are not
/// part of the extracted model.
///
/// Returns `None` when `sqref` is missing. When `is_empty` is set the
/// element was self-closing and no children are read.
pub fn parse_data_validation<R: BufRead>(
    e: &BytesStart,
    xml: &mut Reader<R>,
    is_empty: bool,
) -> Option<DataValidation> {
    let range = attr_string(e, b"sqref").unwrap_or_default();

    let mut validation = DataValidation {
        range,
        validation_type: attr_string(e, b"type").unwrap_or_default(),
        operator: attr_string(e, b"operator").unwrap_or_default(),
        show_error: attr_bool_default(e, b"showErrorMessage", false),
        error_title: attr_string(e, b"errorTitle").filter(|s| !s.is_empty()),
        error_message: attr_string(e, b"error").filter(|s| !s.is_empty()),
        ..Default::default()
    };

    if !is_empty {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match xml.read_event_into(&mut buf) {
                Ok(Event::Start(ref inner)) => match inner.local_name().as_ref() {
                    b"formula1" => validation.formula1 = read_element_text(xml, b"formula1"),
                    b"formula2" => validation.formula2 = read_element_text(xml, b"formula2"),
                    _ => {}
                },
                Ok(Event::End(ref inner)) => {
                    if inner.local_name().as_ref() == b"dataValidation" {
                        break;
                    }
                }
                Ok(Event::Eof) | Err(_) => break,
                _ => {}
            }
        }
    }

    if validation.range.is_empty() {
        return None;
    }
    Some(validation)
}

/// Split an inline list formula (`"a,b,c"`) into its items.
///
/// Cell-reference sources such as `$A$1:$A$5` return `None`.
pub fn parse_list_values(formula: &str) -> Option<Vec<String>> {
    let inner = formula.trim().strip_prefix('"')?.strip_suffix('"')?;
    let values: Vec<String> = inner
        .split(',')
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values)
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

    fn parse_first(xml_str: &str) -> Option<DataValidation> {
        let mut xml = Reader::from_str(xml_str);
        xml.trim_text(true);
        let mut buf = Vec::new();
        loop {
            match xml.read_event_into(&mut buf) {
                Ok(Event::Start(e)) if e.local_name().as_ref() == b"dataValidation" => {
                    let e = e.into_owned();
                    return parse_data_validation(&e, &mut xml, false);
                }
                Ok(Event::Empty(e)) if e.local_name().as_ref() == b"dataValidation" => {
                    let e = e.into_owned();
                    return parse_data_validation(&e, &mut xml, true);
                }
                Ok(Event::Eof) => return None,
                _ => {}
            }
            buf.clear();
        }
    }

    #[test]
    fn test_parse_list_validation() {
        let dv = parse_first(
            r#"<dataValidation type="list" allowBlank="1" showErrorMessage="1"
                errorTitle="Oops" error="Pick one" sqref="A1:A10">
                <formula1>"Red,Green,Blue"</formula1>
            </dataValidation>"#,
        )
        .unwrap();
        assert_eq!(dv.range, "A1:A10");
        assert_eq!(dv.validation_type, "list");
        assert_eq!(dv.formula1, "\"Red,Green,Blue\"");
        assert!(dv.formula2.is_empty());
        assert!(dv.show_error);
        assert_eq!(dv.error_title.as_deref(), Some("Oops"));
        assert_eq!(dv.error_message.as_deref(), Some("Pick one"));
    }

    #[test]
    fn test_parse_between_validation() {
        let dv = parse_first(
            r#"<dataValidation type="whole" operator="between" sqref="B2 C3:C4">
                <formula1>1</formula1><formula2>100</formula2>
            </dataValidation>"#,
        )
        .unwrap();
        assert_eq!(dv.range, "B2 C3:C4");
        assert_eq!(dv.operator, "between");
        assert_eq!(dv.formula1, "1");
        assert_eq!(dv.formula2, "100");
        assert!(!dv.show_error);
        assert_eq!(dv.error_title, None);
    }

    #[test]
    fn test_missing_sqref_is_skipped() {
        assert!(parse_first(r#"<dataValidation type="custom"/>"#).is_none());
    }

    #[test]
    fn test_parse_list_values() {
        assert_eq!(
            parse_list_values("\"a, b,c\""),
            Some(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
        assert_eq!(parse_list_values("$A$1:$A$5"), None);
        assert_eq!(parse_list_values("\"\""), None);
    }
}
