//! Style and value resolution - resolves cell display text and decodes style ids.

use crate::error::{Result, XlsxMetaError};
use crate::source::Style;
use crate::styles::{RawFill, StyleSheet};
use crate::types::{border_style_index, pattern_index, BorderStyle, CellType, FillStyle, FontStyle};

/// Resolve the display text of a cell from its raw `<v>`/`<is>` content.
///
/// Shared strings are looked up, booleans become `TRUE`/`FALSE`, and all
/// other kinds keep the stored text.
pub(super) fn resolve_cell_text(
    raw_value: Option<&str>,
    cell_type: CellType,
    shared_strings: &[String],
) -> String {
    match cell_type {
        CellType::SharedString => raw_value
            .and_then(|v| v.trim().parse::<usize>().ok())
            .and_then(|idx| shared_strings.get(idx))
            .cloned()
            .unwrap_or_default(),
        CellType::Bool => match raw_value.map(str::trim) {
            Some("1" | "true") => "TRUE".to_string(),
            Some("0" | "false") => "FALSE".to_string(),
            other => other.unwrap_or_default().to_string(),
        },
        _ => raw_value.unwrap_or_default().to_string(),
    }
}

/// Decode `cellXfs[id]` into a [`Style`].
///
/// Out-of-range font, fill and border ids are treated as absent.
pub(super) fn decode_style(stylesheet: &StyleSheet, id: u32) -> Result<Style> {
    let xf = usize::try_from(id)
        .ok()
        .and_then(|idx| stylesheet.cell_xfs.get(idx))
        .ok_or_else(|| XlsxMetaError::Style(format!("unknown style id {id}")))?;

    let font = xf
        .font_id
        .and_then(|fid| stylesheet.fonts.get(fid as usize))
        .map(|f| FontStyle {
            bold: f.bold,
            italic: f.italic,
            underline: f.underline.clone().unwrap_or_default(),
            strike: f.strike,
            family: f.name.clone().unwrap_or_default(),
            size: f.size.unwrap_or(0.0),
            color: f.color.clone().unwrap_or_default(),
        });

    let fill = xf
        .fill_id
        .and_then(|fid| stylesheet.fills.get(fid as usize))
        .map(decode_fill)
        .unwrap_or_default();

    let border = xf
        .border_id
        .and_then(|bid| stylesheet.borders.get(bid as usize))
        .map(|b| {
            b.sides()
                .map(|(side, s)| BorderStyle {
                    side: side.to_string(),
                    color: s.color.clone().unwrap_or_default(),
                    style: border_style_index(&s.style),
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(Style {
        font,
        fill,
        border,
        alignment: xf.alignment.clone(),
        num_fmt: xf.num_fmt_id.unwrap_or(0),
        protection: xf.protection.clone(),
    })
}

fn decode_fill(fill: &RawFill) -> FillStyle {
    if let Some(gradient) = &fill.gradient {
        return FillStyle {
            fill_type: "gradient".to_string(),
            pattern: 0,
            color: gradient.stops.clone(),
        };
    }
    let pattern = fill.pattern_type.as_deref().map_or(0, pattern_index);
    FillStyle {
        fill_type: "pattern".to_string(),
        pattern,
        color: fill.fg_color.iter().cloned().collect(),
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
    use crate::styles::{parse_styles, CellXf, RawBorder, RawBorderSide, RawFont};

    #[test]
    fn test_resolve_cell_text() {
        let sst = vec!["Product".to_string()];
        assert_eq!(
            resolve_cell_text(Some("0"), CellType::SharedString, &sst),
            "Product"
        );
        assert_eq!(resolve_cell_text(Some("7"), CellType::SharedString, &sst), "");
        assert_eq!(resolve_cell_text(Some("1"), CellType::Bool, &sst), "TRUE");
        assert_eq!(resolve_cell_text(Some("0"), CellType::Bool, &sst), "FALSE");
        assert_eq!(resolve_cell_text(Some("1.50"), CellType::Unset, &sst), "1.50");
        assert_eq!(resolve_cell_text(Some("#DIV/0!"), CellType::Error, &sst), "#DIV/0!");
        assert_eq!(resolve_cell_text(None, CellType::Number, &sst), "");
    }

    fn stylesheet() -> StyleSheet {
        StyleSheet {
            num_fmts: Vec::new(),
            fonts: vec![RawFont {
                name: Some("Arial".to_string()),
                size: Some(12.0),
                bold: true,
                color: Some("FF0000".to_string()),
                ..Default::default()
            }],
            fills: vec![
                RawFill::default(),
                RawFill {
                    pattern_type: Some("solid".to_string()),
                    fg_color: Some("FFFF00".to_string()),
                    ..Default::default()
                },
            ],
            borders: vec![RawBorder {
                bottom: Some(RawBorderSide {
                    style: "thick".to_string(),
                    color: None,
                }),
                ..Default::default()
            }],
            cell_xfs: vec![
                CellXf::default(),
                CellXf {
                    num_fmt_id: Some(4),
                    font_id: Some(0),
                    fill_id: Some(1),
                    border_id: Some(0),
                    ..Default::default()
                },
            ],
        }
    }

    #[test]
    fn test_decode_style() {
        let style = decode_style(&stylesheet(), 1).unwrap();
        assert_eq!(style.num_fmt, 4);
        let font = style.font.unwrap();
        assert!(font.bold);
        assert_eq!(font.family, "Arial");
        assert_eq!(font.size, 12.0);
        assert_eq!(font.color, "FF0000");
        assert_eq!(style.fill.fill_type, "pattern");
        assert_eq!(style.fill.pattern, 1);
        assert_eq!(style.fill.color, vec!["FFFF00"]);
        assert_eq!(style.border.len(), 1);
        assert_eq!(style.border[0].side, "bottom");
        assert_eq!(style.border[0].style, 5);
    }

    #[test]
    fn test_decode_unknown_style_id() {
        let err = decode_style(&stylesheet(), 9).unwrap_err();
        assert!(matches!(err, XlsxMetaError::Style(_)));
    }

    #[test]
    fn test_decode_gradient_fill() {
        let xml = r#"<styleSheet><fills count="1"><fill><gradientFill><stop position="0"><color rgb="FF112233"/></stop><stop position="1"><color rgb="FF445566"/></stop></gradientFill></fill></fills><cellXfs count="1"><xf fillId="0"/></cellXfs></styleSheet>"#;
        let sheet = parse_styles(xml.as_bytes()).unwrap();
        let style = decode_style(&sheet, 0).unwrap();
        assert_eq!(style.fill.fill_type, "gradient");
        assert_eq!(style.fill.color, vec!["112233", "445566"]);
        assert!(style.font.is_none());
    }
}
