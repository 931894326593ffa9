//! Parsing of xl/styles.xml
//!
//! This file contains fonts, fills, borders, and cell formats (xf). Only the
//! parts the style decoder reads are kept: `numFmts`, `fonts`, `fills`,
//! `borders` and `cellXfs`. Colors are kept as RGB; theme and indexed
//! colors have no RGB value and are dropped.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::BufRead;

use crate::error::Result;
use crate::protection::parse_cell_protection;
use crate::types::{AlignmentStyle, Protection};
use crate::xml_helpers::{
    attr_bool, attr_f64, attr_i32, attr_rgb, attr_string, attr_u32, attr_val, attr_val_f64,
    attr_val_toggle,
};

/// Parsed `styles.xml`.
#[derive(Debug, Clone, Default)]
pub struct StyleSheet {
    /// Custom number formats `(numFmtId, formatCode)`.
    pub num_fmts: Vec<(u32, String)>,
    pub fonts: Vec<RawFont>,
    pub fills: Vec<RawFill>,
    pub borders: Vec<RawBorder>,
    pub cell_xfs: Vec<CellXf>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFont {
    pub name: Option<String>,
    pub size: Option<f64>,
    pub bold: bool,
    pub italic: bool,
    pub strike: bool,
    /// `single` for a bare `<u/>`.
    pub underline: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFill {
    pub pattern_type: Option<String>,
    pub fg_color: Option<String>,
    pub bg_color: Option<String>,
    pub gradient: Option<RawGradientFill>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawGradientFill {
    pub gradient_type: String,
    pub degree: f64,
    /// Stop colors in document order.
    pub stops: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawBorderSide {
    pub style: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawBorder {
    pub left: Option<RawBorderSide>,
    pub right: Option<RawBorderSide>,
    pub top: Option<RawBorderSide>,
    pub bottom: Option<RawBorderSide>,
    pub diagonal: Option<RawBorderSide>,
}

impl RawBorder {
    /// Styled sides in `left, right, top, bottom, diagonal` order.
    pub fn sides(&self) -> impl Iterator<Item = (&'static str, &RawBorderSide)> {
        [
            ("left", &self.left),
            ("right", &self.right),
            ("top", &self.top),
            ("bottom", &self.bottom),
            ("diagonal", &self.diagonal),
        ]
        .into_iter()
        .filter_map(|(name, side)| side.as_ref().map(|s| (name, s)))
    }

    fn side_mut(&mut self, name: &[u8]) -> Option<&mut Option<RawBorderSide>> {
        match name {
            b"left" | b"start" => Some(&mut self.left),
            b"right" | b"end" => Some(&mut self.right),
            b"top" => Some(&mut self.top),
            b"bottom" => Some(&mut self.bottom),
            b"diagonal" => Some(&mut self.diagonal),
            _ => None,
        }
    }
}

/// One `<xf>` of `cellXfs`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellXf {
    pub num_fmt_id: Option<u32>,
    pub font_id: Option<u32>,
    pub fill_id: Option<u32>,
    pub border_id: Option<u32>,
    pub alignment: Option<AlignmentStyle>,
    pub protection: Option<Protection>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Other,
    NumFmts,
    Fonts,
    Fills,
    Borders,
    CellXfs,
}

/// Parse styles.xml content
#[allow(clippy::too_many_lines)]
pub fn parse_styles<R: BufRead>(reader: R) -> Result<StyleSheet> {
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(true);

    let mut stylesheet = StyleSheet::default();
    let mut buf = Vec::new();

    let mut section = Section::Other;
    let mut current_font: Option<RawFont> = None;
    let mut current_fill: Option<RawFill> = None;
    let mut current_border: Option<RawBorder> = None;
    let mut current_side: Option<Vec<u8>> = None;
    let mut current_xf: Option<CellXf> = None;
    let mut in_stop = false;

    loop {
        buf.clear();
        match xml.read_event_into(&mut buf)? {
            ref event @ (Event::Start(ref e) | Event::Empty(ref e)) => {
                let is_empty = matches!(event, Event::Empty(_));
                let name = e.local_name();

                match (section, name.as_ref()) {
                    (_, b"numFmts") => section = Section::NumFmts,
                    (_, b"fonts") => section = Section::Fonts,
                    (_, b"fills") => section = Section::Fills,
                    (_, b"borders") => section = Section::Borders,
                    (_, b"cellXfs") => section = Section::CellXfs,
                    (_, b"cellStyleXfs" | b"cellStyles" | b"dxfs" | b"colors") => {
                        section = Section::Other;
                    }

                    (Section::NumFmts, b"numFmt") => {
                        let id = attr_u32(e, b"numFmtId").unwrap_or(0);
                        let code = attr_string(e, b"formatCode").unwrap_or_default();
                        stylesheet.num_fmts.push((id, code));
                    }

                    (Section::Fonts, b"font") => {
                        if is_empty {
                            stylesheet.fonts.push(RawFont::default());
                        } else {
                            current_font = Some(RawFont::default());
                        }
                    }
                    (Section::Fonts, tag) => {
                        if let Some(font) = current_font.as_mut() {
                            apply_font_child(font, tag, e);
                        }
                    }

                    (Section::Fills, b"fill") => {
                        if is_empty {
                            stylesheet.fills.push(RawFill::default());
                        } else {
                            current_fill = Some(RawFill::default());
                        }
                    }
                    (Section::Fills, b"patternFill") => {
                        if let Some(fill) = current_fill.as_mut() {
                            fill.pattern_type = attr_string(e, b"patternType");
                        }
                    }
                    (Section::Fills, b"gradientFill") => {
                        if let Some(fill) = current_fill.as_mut() {
                            fill.gradient = Some(RawGradientFill {
                                gradient_type: attr_string(e, b"type")
                                    .unwrap_or_else(|| "linear".to_string()),
                                degree: attr_f64(e, b"degree").unwrap_or(0.0),
                                stops: Vec::new(),
                            });
                        }
                    }
                    (Section::Fills, b"stop") => in_stop = !is_empty,
                    (Section::Fills, b"color") if in_stop => {
                        let gradient = current_fill.as_mut().and_then(|f| f.gradient.as_mut());
                        if let (Some(gradient), Some(rgb)) = (gradient, attr_rgb(e)) {
                            gradient.stops.push(rgb);
                        }
                    }
                    (Section::Fills, b"fgColor") => {
                        if let Some(fill) = current_fill.as_mut() {
                            fill.fg_color = attr_rgb(e);
                        }
                    }
                    (Section::Fills, b"bgColor") => {
                        if let Some(fill) = current_fill.as_mut() {
                            fill.bg_color = attr_rgb(e);
                        }
                    }

                    (Section::Borders, b"border") => {
                        // Self-closing <border/> has no End event
                        if is_empty {
                            stylesheet.borders.push(RawBorder::default());
                        } else {
                            current_border = Some(RawBorder::default());
                        }
                    }
                    (Section::Borders, b"color") => {
                        let side = current_side.as_deref();
                        let slot = current_border
                            .as_mut()
                            .zip(side)
                            .and_then(|(border, side)| border.side_mut(side));
                        if let Some(Some(side)) = slot {
                            side.color = attr_rgb(e);
                        }
                    }
                    (Section::Borders, tag) => {
                        if let Some(border) = current_border.as_mut() {
                            if let Some(slot) = border.side_mut(tag) {
                                let style = attr_string(e, b"style").unwrap_or_default();
                                if !style.is_empty() && style != "none" {
                                    *slot = Some(RawBorderSide { style, color: None });
                                }
                                if !is_empty {
                                    current_side = Some(tag.to_vec());
                                }
                            }
                        }
                    }

                    (Section::CellXfs, b"xf") => {
                        let xf = CellXf {
                            num_fmt_id: attr_u32(e, b"numFmtId"),
                            font_id: attr_u32(e, b"fontId"),
                            fill_id: attr_u32(e, b"fillId"),
                            border_id: attr_u32(e, b"borderId"),
                            alignment: None,
                            protection: None,
                        };
                        // Self-closing <xf .../> has no End event
                        if is_empty {
                            stylesheet.cell_xfs.push(xf);
                        } else {
                            current_xf = Some(xf);
                        }
                    }
                    (Section::CellXfs, b"alignment") => {
                        if let Some(xf) = current_xf.as_mut() {
                            xf.alignment = Some(parse_alignment(e));
                        }
                    }
                    (Section::CellXfs, b"protection") => {
                        if let Some(xf) = current_xf.as_mut() {
                            xf.protection = Some(parse_cell_protection(e));
                        }
                    }
                    _ => {}
                }
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"font" => {
                    if let Some(font) = current_font.take() {
                        stylesheet.fonts.push(font);
                    }
                }
                b"fill" => {
                    if let Some(fill) = current_fill.take() {
                        stylesheet.fills.push(fill);
                    }
                }
                b"stop" => in_stop = false,
                b"border" => {
                    if let Some(border) = current_border.take() {
                        stylesheet.borders.push(border);
                    }
                }
                b"left" | b"right" | b"top" | b"bottom" | b"diagonal" | b"start" | b"end" => {
                    current_side = None;
                }
                b"xf" => {
                    if let Some(xf) = current_xf.take() {
                        if section == Section::CellXfs {
                            stylesheet.cell_xfs.push(xf);
                        }
                    }
                }
                b"numFmts" | b"fonts" | b"fills" | b"borders" | b"cellXfs" => {
                    section = Section::Other;
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(stylesheet)
}

fn apply_font_child(font: &mut RawFont, tag: &[u8], e: &BytesStart) {
    match tag {
        b"b" => font.bold = attr_val_toggle(e),
        b"i" => font.italic = attr_val_toggle(e),
        b"strike" => font.strike = attr_val_toggle(e),
        b"u" => {
            let val = attr_val(e).unwrap_or_else(|| "single".to_string());
            font.underline = (val != "none").then_some(val);
        }
        b"sz" => font.size = attr_val_f64(e),
        b"name" | b"rFont" => font.name = attr_val(e),
        b"color" => font.color = attr_rgb(e),
        _ => {}
    }
}

fn parse_alignment(e: &BytesStart) -> AlignmentStyle {
    AlignmentStyle {
        horizontal: attr_string(e, b"horizontal").unwrap_or_default(),
        vertical: attr_string(e, b"vertical").unwrap_or_default(),
        wrap_text: attr_bool(e, b"wrapText").unwrap_or(false),
        text_rotation: attr_i32(e, b"textRotation").unwrap_or(0),
        indent: attr_u32(e, b"indent").unwrap_or(0),
        shrink_to_fit: attr_bool(e, b"shrinkToFit").unwrap_or(false),
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

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="1"><numFmt numFmtId="164" formatCode="0.000"/></numFmts>
  <fonts count="2">
    <font><sz val="11"/><name val="Calibri"/></font>
    <font><b/><i val="0"/><u val="double"/><strike/><sz val="14"/><color rgb="FFFF0000"/><name val="Arial"/></font>
  </fonts>
  <fills count="4">
    <fill><patternFill patternType="none"/></fill>
    <fill><patternFill patternType="gray125"/></fill>
    <fill><patternFill patternType="solid"><fgColor rgb="FFFFFF00"/><bgColor indexed="64"/></patternFill></fill>
    <fill><gradientFill degree="90"><stop position="0"><color rgb="FF0000FF"/></stop><stop position="1"><color rgb="FF00FF00"/></stop></gradientFill></fill>
  </fills>
  <borders count="2">
    <border/>
    <border><left style="thin"><color rgb="FF000000"/></left><right/><top style="double"/><bottom style="none"/></border>
  </borders>
  <cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
  <cellXfs count="3">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>
    <xf numFmtId="164" fontId="1" fillId="2" borderId="1" xfId="0" applyAlignment="1">
      <alignment horizontal="center" vertical="top" wrapText="1" textRotation="45" indent="2"/>
      <protection locked="0"/>
    </xf>
    <xf numFmtId="14" fontId="0" fillId="3" borderId="0" xfId="0"/>
  </cellXfs>
  <cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>
</styleSheet>"#;

    #[test]
    fn test_parse_sections() {
        let sheet = parse_styles(STYLES.as_bytes()).unwrap();
        assert_eq!(sheet.num_fmts, vec![(164, "0.000".to_string())]);
        assert_eq!(sheet.fonts.len(), 2);
        assert_eq!(sheet.fills.len(), 4);
        assert_eq!(sheet.borders.len(), 2);
        // cellStyleXfs must not leak into cellXfs
        assert_eq!(sheet.cell_xfs.len(), 3);
    }

    #[test]
    fn test_parse_font() {
        let sheet = parse_styles(STYLES.as_bytes()).unwrap();
        let font = &sheet.fonts[1];
        assert!(font.bold);
        assert!(!font.italic);
        assert!(font.strike);
        assert_eq!(font.underline.as_deref(), Some("double"));
        assert_eq!(font.size, Some(14.0));
        assert_eq!(font.name.as_deref(), Some("Arial"));
        assert_eq!(font.color.as_deref(), Some("FF0000"));
    }

    #[test]
    fn test_parse_fills() {
        let sheet = parse_styles(STYLES.as_bytes()).unwrap();
        assert_eq!(sheet.fills[1].pattern_type.as_deref(), Some("gray125"));
        assert_eq!(sheet.fills[2].fg_color.as_deref(), Some("FFFF00"));
        assert_eq!(sheet.fills[2].bg_color, None);
        let gradient = sheet.fills[3].gradient.as_ref().unwrap();
        assert_eq!(gradient.gradient_type, "linear");
        assert_eq!(gradient.degree, 90.0);
        assert_eq!(gradient.stops, vec!["0000FF", "00FF00"]);
    }

    #[test]
    fn test_parse_borders() {
        let sheet = parse_styles(STYLES.as_bytes()).unwrap();
        let sides: Vec<_> = sheet.borders[1].sides().collect();
        assert_eq!(sides.len(), 2);
        assert_eq!(sides[0].0, "left");
        assert_eq!(sides[0].1.style, "thin");
        assert_eq!(sides[0].1.color.as_deref(), Some("000000"));
        assert_eq!(sides[1].0, "top");
        assert_eq!(sides[1].1.style, "double");
    }

    #[test]
    fn test_parse_cell_xf_children() {
        let sheet = parse_styles(STYLES.as_bytes()).unwrap();
        let xf = &sheet.cell_xfs[1];
        assert_eq!(xf.num_fmt_id, Some(164));
        assert_eq!(xf.font_id, Some(1));
        let align = xf.alignment.as_ref().unwrap();
        assert_eq!(align.horizontal, "center");
        assert_eq!(align.text_rotation, 45);
        assert_eq!(align.indent, 2);
        assert!(align.wrap_text);
        assert!(!xf.protection.as_ref().unwrap().locked);
    }
}
