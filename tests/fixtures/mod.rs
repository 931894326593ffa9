//! Test fixtures for generating valid XLSX files in memory.
//!
//! This module provides builders for creating XLSX packages programmatically,
//! useful for testing the extractor with known inputs.
//!
//! # Example
//!
//! ```rust
//! use fixtures::{SheetBuilder, StyleBuilder, XlsxBuilder};
//!
//! let xlsx = XlsxBuilder::new()
//!     .sheet(
//!         SheetBuilder::new("Sheet1")
//!             .cell("A1", "Product", Some(StyleBuilder::new().bold()))
//!             .formula("B2", "SUM(C2:D2)", 100.0),
//!     )
//!     .title("Inventory")
//!     .build();
//!
//! let source = xlsxmeta::XlsxSource::from_bytes(xlsx).unwrap();
//! ```
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic,
    clippy::cast_possible_truncation,
    clippy::cast_lossless
)]

use std::collections::BTreeMap;
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

// ============================================================================
// Style Builder
// ============================================================================

/// Builder for creating cell styles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleBuilder {
    // Font properties
    pub font_name: Option<String>,
    pub font_size: Option<f64>,
    pub font_color: Option<String>,
    pub bold: bool,
    pub italic: bool,
    pub underline: Option<String>,
    pub strikethrough: bool,

    // Fill properties
    pub bg_color: Option<String>,
    pub pattern_type: Option<String>,

    // Border properties
    pub border_top: Option<BorderSide>,
    pub border_right: Option<BorderSide>,
    pub border_bottom: Option<BorderSide>,
    pub border_left: Option<BorderSide>,

    // Alignment properties
    pub align_horizontal: Option<String>,
    pub align_vertical: Option<String>,
    pub wrap_text: bool,
    pub indent: Option<u32>,
    pub rotation: Option<i32>,

    // Number format id (built-in ids only)
    pub num_fmt_id: Option<u32>,

    // Protection
    pub unlocked: bool,
    pub formula_hidden: bool,
}

/// A border side definition.
#[derive(Debug, Clone, PartialEq)]
pub struct BorderSide {
    pub style: String,
    pub color: Option<String>,
}

impl BorderSide {
    /// Create a new border side with the given style.
    #[must_use]
    pub fn new(style: &str) -> Self {
        Self {
            style: style.to_string(),
            color: None,
        }
    }

    /// Set the border color.
    #[must_use]
    pub fn color(mut self, color: &str) -> Self {
        self.color = Some(color.to_string());
        self
    }
}

impl StyleBuilder {
    /// Create a new empty style builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn font_name(mut self, name: &str) -> Self {
        self.font_name = Some(name.to_string());
        self
    }

    #[must_use]
    pub fn font_size(mut self, size: f64) -> Self {
        self.font_size = Some(size);
        self
    }

    /// Set the font color (ARGB or RGB hex).
    #[must_use]
    pub fn font_color(mut self, color: &str) -> Self {
        self.font_color = Some(color.to_string());
        self
    }

    #[must_use]
    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    #[must_use]
    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    /// Underline with the given style name (`single`, `double`, ...).
    #[must_use]
    pub fn underline(mut self, kind: &str) -> Self {
        self.underline = Some(kind.to_string());
        self
    }

    #[must_use]
    pub fn strikethrough(mut self) -> Self {
        self.strikethrough = true;
        self
    }

    /// Solid fill with the given color.
    #[must_use]
    pub fn bg_color(mut self, color: &str) -> Self {
        self.bg_color = Some(color.to_string());
        self
    }

    /// Set the pattern type for the fill.
    #[must_use]
    pub fn pattern(mut self, pattern_type: &str) -> Self {
        self.pattern_type = Some(pattern_type.to_string());
        self
    }

    #[must_use]
    pub fn border_top(mut self, side: BorderSide) -> Self {
        self.border_top = Some(side);
        self
    }

    #[must_use]
    pub fn border_bottom(mut self, side: BorderSide) -> Self {
        self.border_bottom = Some(side);
        self
    }

    #[must_use]
    pub fn border_left(mut self, side: BorderSide) -> Self {
        self.border_left = Some(side);
        self
    }

    #[must_use]
    pub fn border_right(mut self, side: BorderSide) -> Self {
        self.border_right = Some(side);
        self
    }

    #[must_use]
    pub fn align_horizontal(mut self, align: &str) -> Self {
        self.align_horizontal = Some(align.to_string());
        self
    }

    #[must_use]
    pub fn align_vertical(mut self, align: &str) -> Self {
        self.align_vertical = Some(align.to_string());
        self
    }

    #[must_use]
    pub fn wrap_text(mut self) -> Self {
        self.wrap_text = true;
        self
    }

    #[must_use]
    pub fn indent(mut self, level: u32) -> Self {
        self.indent = Some(level);
        self
    }

    #[must_use]
    pub fn rotation(mut self, degrees: i32) -> Self {
        self.rotation = Some(degrees);
        self
    }

    #[must_use]
    pub fn num_fmt(mut self, id: u32) -> Self {
        self.num_fmt_id = Some(id);
        self
    }

    #[must_use]
    pub fn unlocked(mut self) -> Self {
        self.unlocked = true;
        self
    }

    #[must_use]
    pub fn formula_hidden(mut self) -> Self {
        self.formula_hidden = true;
        self
    }

    fn has_font(&self) -> bool {
        self.font_name.is_some()
            || self.font_size.is_some()
            || self.font_color.is_some()
            || self.bold
            || self.italic
            || self.underline.is_some()
            || self.strikethrough
    }

    fn has_alignment(&self) -> bool {
        self.align_horizontal.is_some()
            || self.align_vertical.is_some()
            || self.wrap_text
            || self.indent.is_some()
            || self.rotation.is_some()
    }
}

// ============================================================================
// Cell Value
// ============================================================================

/// Represents a cell value that can be added to a sheet.
#[derive(Debug, Clone)]
pub enum CellValue {
    /// A shared string.
    String(String),
    /// A numeric value.
    Number(f64),
    /// A boolean value.
    Boolean(bool),
    /// An error value (e.g., "#DIV/0!").
    Error(String),
    /// An inline string (not shared).
    InlineString(String),
    /// An empty cell (style only).
    Empty,
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(f64::from(n))
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

// ============================================================================
// Sheet Builder
// ============================================================================

/// The `<f>` element of a cell.
#[derive(Debug, Clone)]
pub enum FormulaEntry {
    Normal(String),
    /// `<f t="shared" ref=".." si="..">text</f>`
    SharedMaster { range: String, si: u32, text: String },
    /// `<f t="shared" si=".."/>`
    SharedChild { si: u32 },
}

/// A cell in the sheet.
#[derive(Debug, Clone)]
pub struct CellEntry {
    pub cell_ref: String,
    pub value: CellValue,
    pub style: Option<StyleBuilder>,
    /// Raw `s` attribute, bypassing the style collector.
    pub style_id: Option<u32>,
    pub formula: Option<FormulaEntry>,
}

/// A hyperlink on a cell or range.
#[derive(Debug, Clone)]
pub enum HyperlinkEntry {
    External { range: String, url: String },
    Internal { range: String, location: String },
}

/// A picture anchored with a two-cell anchor.
#[derive(Debug, Clone)]
pub struct ImageEntry {
    pub from_col: u32,
    pub from_row: u32,
    pub col_off_emu: i64,
    pub row_off_emu: i64,
    pub cx_emu: i64,
    pub cy_emu: i64,
    pub descr: String,
    pub data: Vec<u8>,
    pub extension: String,
}

/// Builder for a single worksheet.
#[derive(Debug, Clone, Default)]
pub struct SheetBuilder {
    pub name: String,
    pub state: Option<String>,
    pub cells: Vec<CellEntry>,
    pub merges: Vec<String>,
    pub col_widths: Vec<(u32, u32, f64)>,
    pub row_heights: Vec<(u32, f64)>,
    pub default_col_width: Option<f64>,
    pub default_row_height: Option<f64>,
    pub hyperlinks: Vec<HyperlinkEntry>,
    pub validations: Vec<String>,
    pub protection: Option<String>,
    pub images: Vec<ImageEntry>,
}

impl SheetBuilder {
    /// Create a new sheet builder with the given name.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Add a cell with a value and optional style.
    #[must_use]
    pub fn cell<V: Into<CellValue>>(
        mut self,
        cell_ref: &str,
        value: V,
        style: Option<StyleBuilder>,
    ) -> Self {
        self.cells.push(CellEntry {
            cell_ref: cell_ref.to_string(),
            value: value.into(),
            style,
            style_id: None,
            formula: None,
        });
        self
    }

    /// Add a cell carrying a raw style id.
    #[must_use]
    pub fn cell_with_style_id<V: Into<CellValue>>(
        mut self,
        cell_ref: &str,
        value: V,
        style_id: u32,
    ) -> Self {
        self.cells.push(CellEntry {
            cell_ref: cell_ref.to_string(),
            value: value.into(),
            style: None,
            style_id: Some(style_id),
            formula: None,
        });
        self
    }

    /// Add an empty cell with only a style.
    #[must_use]
    pub fn styled_cell(self, cell_ref: &str, style: StyleBuilder) -> Self {
        self.cell(cell_ref, CellValue::Empty, Some(style))
    }

    /// Add an inline string cell.
    #[must_use]
    pub fn inline_cell(self, cell_ref: &str, text: &str) -> Self {
        self.cell(cell_ref, CellValue::InlineString(text.to_string()), None)
    }

    /// Add a formula cell with a cached numeric result.
    #[must_use]
    pub fn formula(mut self, cell_ref: &str, formula: &str, cached: f64) -> Self {
        self.cells.push(CellEntry {
            cell_ref: cell_ref.to_string(),
            value: CellValue::Number(cached),
            style: None,
            style_id: None,
            formula: Some(FormulaEntry::Normal(formula.to_string())),
        });
        self
    }

    /// Add the master cell of a shared formula covering `range`.
    #[must_use]
    pub fn shared_formula(
        mut self,
        cell_ref: &str,
        range: &str,
        si: u32,
        formula: &str,
        cached: f64,
    ) -> Self {
        self.cells.push(CellEntry {
            cell_ref: cell_ref.to_string(),
            value: CellValue::Number(cached),
            style: None,
            style_id: None,
            formula: Some(FormulaEntry::SharedMaster {
                range: range.to_string(),
                si,
                text: formula.to_string(),
            }),
        });
        self
    }

    /// Add a cell that reuses shared formula `si`.
    #[must_use]
    pub fn shared_child(mut self, cell_ref: &str, si: u32, cached: f64) -> Self {
        self.cells.push(CellEntry {
            cell_ref: cell_ref.to_string(),
            value: CellValue::Number(cached),
            style: None,
            style_id: None,
            formula: Some(FormulaEntry::SharedChild { si }),
        });
        self
    }

    /// Add a merge range (e.g., "A1:B2").
    #[must_use]
    pub fn merge(mut self, range: &str) -> Self {
        self.merges.push(range.to_string());
        self
    }

    /// Set column width for a 1-based range of columns.
    #[must_use]
    pub fn col_width(mut self, min: u32, max: u32, width: f64) -> Self {
        self.col_widths.push((min, max, width));
        self
    }

    /// Set the height of a 1-based row.
    #[must_use]
    pub fn row_height(mut self, row: u32, height: f64) -> Self {
        self.row_heights.push((row, height));
        self
    }

    #[must_use]
    pub fn default_col_width(mut self, width: f64) -> Self {
        self.default_col_width = Some(width);
        self
    }

    #[must_use]
    pub fn default_row_height(mut self, height: f64) -> Self {
        self.default_row_height = Some(height);
        self
    }

    /// Mark the sheet `hidden` or `veryHidden`.
    #[must_use]
    pub fn state(mut self, state: &str) -> Self {
        self.state = Some(state.to_string());
        self
    }

    #[must_use]
    pub fn external_link(mut self, range: &str, url: &str) -> Self {
        self.hyperlinks.push(HyperlinkEntry::External {
            range: range.to_string(),
            url: url.to_string(),
        });
        self
    }

    #[must_use]
    pub fn internal_link(mut self, range: &str, location: &str) -> Self {
        self.hyperlinks.push(HyperlinkEntry::Internal {
            range: range.to_string(),
            location: location.to_string(),
        });
        self
    }

    /// Add an inline list validation (`"a,b,c"`).
    #[must_use]
    pub fn list_validation(self, sqref: &str, items: &[&str]) -> Self {
        let formula = format!("\"{}\"", items.join(","));
        self.validation_xml(&format!(
            r#"<dataValidation type="list" allowBlank="1" showErrorMessage="1" sqref="{}"><formula1>{}</formula1></dataValidation>"#,
            sqref,
            escape_xml(&formula)
        ))
    }

    /// Add a raw `<dataValidation>` element.
    #[must_use]
    pub fn validation_xml(mut self, xml: &str) -> Self {
        self.validations.push(xml.to_string());
        self
    }

    /// Add `<sheetProtection>` with the given raw attributes.
    #[must_use]
    pub fn protection(mut self, attrs: &str) -> Self {
        self.protection = Some(attrs.to_string());
        self
    }

    /// Anchor a PNG of `width` x `height` pixels at a 0-based cell, drawn at
    /// its native size.
    #[must_use]
    pub fn png_image(mut self, col: u32, row: u32, width: u32, height: u32, descr: &str) -> Self {
        self.images.push(ImageEntry {
            from_col: col,
            from_row: row,
            col_off_emu: 0,
            row_off_emu: 0,
            cx_emu: i64::from(width) * 9525,
            cy_emu: i64::from(height) * 9525,
            descr: descr.to_string(),
            data: png(width, height),
            extension: "png".to_string(),
        });
        self
    }

    /// Anchor an arbitrary image entry.
    #[must_use]
    pub fn image(mut self, image: ImageEntry) -> Self {
        self.images.push(image);
        self
    }
}

/// A minimal PNG: signature, IHDR and IEND.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let mut data = b"\x89PNG\r\n\x1a\n".to_vec();
    data.extend_from_slice(&13u32.to_be_bytes());
    data.extend_from_slice(b"IHDR");
    data.extend_from_slice(&width.to_be_bytes());
    data.extend_from_slice(&height.to_be_bytes());
    data.extend_from_slice(&[8, 6, 0, 0, 0]);
    data.extend_from_slice(&[0; 4]);
    data.extend_from_slice(&0u32.to_be_bytes());
    data.extend_from_slice(b"IEND");
    data.extend_from_slice(&[0xAE, 0x42, 0x60, 0x82]);
    data
}

// ============================================================================
// XLSX Builder
// ============================================================================

/// Builder for creating complete XLSX files.
#[derive(Debug, Default)]
pub struct XlsxBuilder {
    sheets: Vec<SheetBuilder>,
    /// (name, localSheetId, refersTo)
    defined_names: Vec<(String, Option<u32>, String)>,
    /// (qualified element name, text)
    core_props: Vec<(String, String)>,
    raw_styles: Option<String>,
}

impl XlsxBuilder {
    /// Create a new XLSX builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sheet.
    #[must_use]
    pub fn sheet(mut self, sheet: SheetBuilder) -> Self {
        self.sheets.push(sheet);
        self
    }

    /// Add a workbook-scoped defined name.
    #[must_use]
    pub fn defined_name(mut self, name: &str, refers_to: &str) -> Self {
        self.defined_names
            .push((name.to_string(), None, refers_to.to_string()));
        self
    }

    /// Add a defined name scoped to the sheet at `local_sheet_id`.
    #[must_use]
    pub fn local_defined_name(mut self, name: &str, local_sheet_id: u32, refers_to: &str) -> Self {
        self.defined_names
            .push((name.to_string(), Some(local_sheet_id), refers_to.to_string()));
        self
    }

    /// Set a `docProps/core.xml` element, e.g. `("dc:title", "Report")`.
    #[must_use]
    pub fn core_property(mut self, element: &str, value: &str) -> Self {
        self.core_props.push((element.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn title(self, title: &str) -> Self {
        self.core_property("dc:title", title)
    }

    #[must_use]
    pub fn creator(self, creator: &str) -> Self {
        self.core_property("dc:creator", creator)
    }

    /// Replace the generated `xl/styles.xml`.
    #[must_use]
    pub fn raw_styles(mut self, xml: &str) -> Self {
        self.raw_styles = Some(xml.to_string());
        self
    }

    /// Build the XLSX file as bytes.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        let cursor = Cursor::new(Vec::new());
        let mut zip = ZipWriter::new(cursor);
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        // Collect all unique styles and shared strings
        let mut styles_collector = StylesCollector::new();
        let mut shared_strings: Vec<String> = Vec::new();

        for sheet in &self.sheets {
            for cell in &sheet.cells {
                if let Some(ref style) = cell.style {
                    styles_collector.add_style(style);
                }
                if let CellValue::String(ref s) = cell.value {
                    if !shared_strings.contains(s) {
                        shared_strings.push(s.clone());
                    }
                }
            }
        }

        let mut put = |path: &str, content: &[u8]| {
            zip.start_file(path, options).unwrap();
            zip.write_all(content).unwrap();
        };

        put(
            "[Content_Types].xml",
            generate_content_types(&self.sheets, !self.core_props.is_empty()).as_bytes(),
        );
        put("_rels/.rels", generate_rels(!self.core_props.is_empty()).as_bytes());
        put(
            "xl/_rels/workbook.xml.rels",
            generate_workbook_rels(self.sheets.len()).as_bytes(),
        );
        put(
            "xl/workbook.xml",
            generate_workbook(&self.sheets, &self.defined_names).as_bytes(),
        );
        let styles = self
            .raw_styles
            .clone()
            .unwrap_or_else(|| styles_collector.generate_styles_xml());
        put("xl/styles.xml", styles.as_bytes());
        if !shared_strings.is_empty() {
            put(
                "xl/sharedStrings.xml",
                generate_shared_strings(&shared_strings).as_bytes(),
            );
        }
        if !self.core_props.is_empty() {
            put("docProps/core.xml", generate_core(&self.core_props).as_bytes());
        }

        let mut image_counter = 0;
        for (i, sheet) in self.sheets.iter().enumerate() {
            let n = i + 1;
            put(
                &format!("xl/worksheets/sheet{n}.xml"),
                generate_sheet_xml(sheet, &shared_strings, &styles_collector).as_bytes(),
            );

            let external: Vec<&String> = sheet
                .hyperlinks
                .iter()
                .filter_map(|h| match h {
                    HyperlinkEntry::External { url, .. } => Some(url),
                    HyperlinkEntry::Internal { .. } => None,
                })
                .collect();
            if external.is_empty() && sheet.images.is_empty() {
                continue;
            }
            put(
                &format!("xl/worksheets/_rels/sheet{n}.xml.rels"),
                generate_sheet_rels(&external, !sheet.images.is_empty(), n).as_bytes(),
            );

            if sheet.images.is_empty() {
                continue;
            }
            let mut media = Vec::new();
            for image in &sheet.images {
                image_counter += 1;
                let name = format!("image{image_counter}.{}", image.extension);
                put(&format!("xl/media/{name}"), &image.data);
                media.push(name);
            }
            put(
                &format!("xl/drawings/drawing{n}.xml"),
                generate_drawing(&sheet.images).as_bytes(),
            );
            put(
                &format!("xl/drawings/_rels/drawing{n}.xml.rels"),
                generate_drawing_rels(&media).as_bytes(),
            );
        }

        let cursor = zip.finish().expect("Failed to finish ZIP");
        cursor.into_inner()
    }
}

/// Zip the given `(path, content)` pairs as-is.
pub fn raw_package(files: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default();
    for (path, content) in files {
        zip.start_file(*path, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

// ============================================================================
// Styles Collector
// ============================================================================

/// Collects and deduplicates styles for the XLSX file. Style `i` in
/// insertion order becomes `cellXfs` index `i + 1`.
#[derive(Debug, Default)]
struct StylesCollector {
    styles: Vec<StyleBuilder>,
}

impl StylesCollector {
    fn new() -> Self {
        Self::default()
    }

    fn add_style(&mut self, style: &StyleBuilder) -> u32 {
        if let Some(idx) = self.styles.iter().position(|s| s == style) {
            return idx as u32 + 1;
        }
        self.styles.push(style.clone());
        self.styles.len() as u32
    }

    fn get_style_index(&self, style: &StyleBuilder) -> u32 {
        self.styles
            .iter()
            .position(|s| s == style)
            .map_or(0, |idx| idx as u32 + 1)
    }

    /// One font, fill and border per style, after the required defaults
    /// (font 0, fills 0-1, border 0).
    fn generate_styles_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push_str(
            r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
        );

        // Fonts
        xml.push_str(&format!(r#"<fonts count="{}">"#, self.styles.len() + 1));
        xml.push_str(r#"<font><sz val="11"/><name val="Calibri"/></font>"#);
        for style in &self.styles {
            xml.push_str("<font>");
            if style.bold {
                xml.push_str("<b/>");
            }
            if style.italic {
                xml.push_str("<i/>");
            }
            if let Some(ref u) = style.underline {
                xml.push_str(&format!(r#"<u val="{u}"/>"#));
            }
            if style.strikethrough {
                xml.push_str("<strike/>");
            }
            xml.push_str(&format!(r#"<sz val="{}"/>"#, style.font_size.unwrap_or(11.0)));
            if let Some(ref color) = style.font_color {
                xml.push_str(&format!(r#"<color rgb="{color}"/>"#));
            }
            let name = style.font_name.as_deref().unwrap_or("Calibri");
            xml.push_str(&format!(r#"<name val="{}"/>"#, escape_xml(name)));
            xml.push_str("</font>");
        }
        xml.push_str("</fonts>");

        // Fills
        xml.push_str(&format!(r#"<fills count="{}">"#, self.styles.len() + 2));
        xml.push_str(r#"<fill><patternFill patternType="none"/></fill>"#);
        xml.push_str(r#"<fill><patternFill patternType="gray125"/></fill>"#);
        for style in &self.styles {
            let pattern = style.pattern_type.as_deref().unwrap_or(if style.bg_color.is_some() {
                "solid"
            } else {
                "none"
            });
            xml.push_str(&format!(r#"<fill><patternFill patternType="{pattern}">"#));
            if let Some(ref color) = style.bg_color {
                xml.push_str(&format!(r#"<fgColor rgb="{color}"/>"#));
            }
            xml.push_str("</patternFill></fill>");
        }
        xml.push_str("</fills>");

        // Borders
        xml.push_str(&format!(r#"<borders count="{}">"#, self.styles.len() + 1));
        xml.push_str("<border><left/><right/><top/><bottom/><diagonal/></border>");
        for style in &self.styles {
            xml.push_str("<border>");
            xml.push_str(&format_border_side("left", style.border_left.as_ref()));
            xml.push_str(&format_border_side("right", style.border_right.as_ref()));
            xml.push_str(&format_border_side("top", style.border_top.as_ref()));
            xml.push_str(&format_border_side("bottom", style.border_bottom.as_ref()));
            xml.push_str("<diagonal/></border>");
        }
        xml.push_str("</borders>");

        xml.push_str(r#"<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>"#);

        // Cell formats (cellXfs)
        xml.push_str(&format!(r#"<cellXfs count="{}">"#, self.styles.len() + 1));
        xml.push_str(r#"<xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>"#);
        for (i, style) in self.styles.iter().enumerate() {
            let font_id = if style.has_font() { i + 1 } else { 0 };
            let fill_id = if style.bg_color.is_some() || style.pattern_type.is_some() {
                i + 2
            } else {
                0
            };
            let has_border = style.border_top.is_some()
                || style.border_right.is_some()
                || style.border_bottom.is_some()
                || style.border_left.is_some();
            let border_id = if has_border { i + 1 } else { 0 };
            xml.push_str(&format!(
                r#"<xf numFmtId="{}" fontId="{font_id}" fillId="{fill_id}" borderId="{border_id}" xfId="0">"#,
                style.num_fmt_id.unwrap_or(0)
            ));
            if style.has_alignment() {
                let mut attrs = String::new();
                if let Some(ref h) = style.align_horizontal {
                    attrs.push_str(&format!(r#" horizontal="{h}""#));
                }
                if let Some(ref v) = style.align_vertical {
                    attrs.push_str(&format!(r#" vertical="{v}""#));
                }
                if style.wrap_text {
                    attrs.push_str(r#" wrapText="1""#);
                }
                if let Some(indent) = style.indent {
                    attrs.push_str(&format!(r#" indent="{indent}""#));
                }
                if let Some(rotation) = style.rotation {
                    attrs.push_str(&format!(r#" textRotation="{rotation}""#));
                }
                xml.push_str(&format!("<alignment{attrs}/>"));
            }
            if style.unlocked || style.formula_hidden {
                xml.push_str(&format!(
                    r#"<protection locked="{}" hidden="{}"/>"#,
                    u8::from(!style.unlocked),
                    u8::from(style.formula_hidden)
                ));
            }
            xml.push_str("</xf>");
        }
        xml.push_str("</cellXfs>");

        xml.push_str(r#"<cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>"#);
        xml.push_str("</styleSheet>");
        xml
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Escape XML special characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Format a border side element.
fn format_border_side(name: &str, side: Option<&BorderSide>) -> String {
    match side {
        Some(side) => {
            let mut xml = format!(r#"<{} style="{}">"#, name, side.style);
            if let Some(ref c) = side.color {
                xml.push_str(&format!(r#"<color rgb="{c}"/>"#));
            }
            xml.push_str(&format!("</{name}>"));
            xml
        }
        None => format!("<{name}/>"),
    }
}

/// Split "B12" into (1-based column, 1-based row).
fn parse_cell_ref(cell_ref: &str) -> (u32, u32) {
    let letters: String = cell_ref.chars().take_while(char::is_ascii_alphabetic).collect();
    let digits: String = cell_ref.chars().skip(letters.len()).collect();
    let col = letters
        .bytes()
        .fold(0, |acc, b| acc * 26 + u32::from(b.to_ascii_uppercase() - b'A') + 1);
    (col, digits.parse().unwrap_or(1))
}

/// Generate [Content_Types].xml
fn generate_content_types(sheets: &[SheetBuilder], core: bool) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#);
    xml.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
    xml.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);
    xml.push_str(r#"<Default Extension="png" ContentType="image/png"/>"#);
    xml.push_str(r#"<Default Extension="jpeg" ContentType="image/jpeg"/>"#);
    xml.push_str(r#"<Default Extension="gif" ContentType="image/gif"/>"#);
    xml.push_str(r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#);
    xml.push_str(r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#);
    xml.push_str(r#"<Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>"#);
    if core {
        xml.push_str(r#"<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>"#);
    }
    for (i, sheet) in sheets.iter().enumerate() {
        xml.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
            i + 1
        ));
        if !sheet.images.is_empty() {
            xml.push_str(&format!(
                r#"<Override PartName="/xl/drawings/drawing{}.xml" ContentType="application/vnd.openxmlformats-officedocument.drawing+xml"/>"#,
                i + 1
            ));
        }
    }
    xml.push_str("</Types>");
    xml
}

/// Generate _rels/.rels
fn generate_rels(core: bool) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    xml.push_str(r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>"#);
    if core {
        xml.push_str(r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>"#);
    }
    xml.push_str("</Relationships>");
    xml
}

/// Generate xl/_rels/workbook.xml.rels
fn generate_workbook_rels(sheet_count: usize) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for i in 1..=sheet_count {
        xml.push_str(&format!(
            r#"<Relationship Id="rId{i}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{i}.xml"/>"#
        ));
    }
    xml.push_str(&format!(
        r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
        sheet_count + 1
    ));
    xml.push_str(&format!(
        r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>"#,
        sheet_count + 2
    ));
    xml.push_str("</Relationships>");
    xml
}

/// Generate xl/workbook.xml
fn generate_workbook(sheets: &[SheetBuilder], names: &[(String, Option<u32>, String)]) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#);
    xml.push_str("<sheets>");
    for (i, sheet) in sheets.iter().enumerate() {
        let state = sheet
            .state
            .as_ref()
            .map(|s| format!(r#" state="{s}""#))
            .unwrap_or_default();
        xml.push_str(&format!(
            r#"<sheet name="{}" sheetId="{}"{} r:id="rId{}"/>"#,
            escape_xml(&sheet.name),
            i + 1,
            state,
            i + 1
        ));
    }
    xml.push_str("</sheets>");
    if !names.is_empty() {
        xml.push_str("<definedNames>");
        for (name, local, refers_to) in names {
            let local = local
                .map(|id| format!(r#" localSheetId="{id}""#))
                .unwrap_or_default();
            xml.push_str(&format!(
                r#"<definedName name="{}"{}>{}</definedName>"#,
                escape_xml(name),
                local,
                escape_xml(refers_to)
            ));
        }
        xml.push_str("</definedNames>");
    }
    xml.push_str("</workbook>");
    xml
}

/// Generate xl/sharedStrings.xml
fn generate_shared_strings(strings: &[String]) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(&format!(
        r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{}" uniqueCount="{}">"#,
        strings.len(),
        strings.len()
    ));
    for s in strings {
        xml.push_str(&format!(
            r#"<si><t xml:space="preserve">{}</t></si>"#,
            escape_xml(s)
        ));
    }
    xml.push_str("</sst>");
    xml
}

/// Generate docProps/core.xml
fn generate_core(props: &[(String, String)]) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#);
    for (element, value) in props {
        xml.push_str(&format!("<{element}>{}</{element}>", escape_xml(value)));
    }
    xml.push_str("</cp:coreProperties>");
    xml
}

/// Generate xl/worksheets/_rels/sheetN.xml.rels. External links take
/// `rId1..`, the drawing follows them.
fn generate_sheet_rels(external: &[&String], drawing: bool, n: usize) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for (i, url) in external.iter().enumerate() {
        xml.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="{}" TargetMode="External"/>"#,
            i + 1,
            escape_xml(url)
        ));
    }
    if drawing {
        xml.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/drawing" Target="../drawings/drawing{n}.xml"/>"#,
            external.len() + 1
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

/// Generate xl/drawings/drawingN.xml with one two-cell anchor per image.
fn generate_drawing(images: &[ImageEntry]) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(r#"<xdr:wsDr xmlns:xdr="http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#);
    for (i, image) in images.iter().enumerate() {
        xml.push_str(r#"<xdr:twoCellAnchor editAs="oneCell">"#);
        xml.push_str(&format!(
            "<xdr:from><xdr:col>{}</xdr:col><xdr:colOff>{}</xdr:colOff><xdr:row>{}</xdr:row><xdr:rowOff>{}</xdr:rowOff></xdr:from>",
            image.from_col, image.col_off_emu, image.from_row, image.row_off_emu
        ));
        xml.push_str(&format!(
            "<xdr:to><xdr:col>{}</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>{}</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:to>",
            image.from_col + 2,
            image.from_row + 2
        ));
        xml.push_str("<xdr:pic><xdr:nvPicPr>");
        xml.push_str(&format!(
            r#"<xdr:cNvPr id="{}" name="Picture {}" descr="{}"/>"#,
            i + 2,
            i + 1,
            escape_xml(&image.descr)
        ));
        xml.push_str(r#"<xdr:cNvPicPr><a:picLocks noChangeAspect="1"/></xdr:cNvPicPr></xdr:nvPicPr>"#);
        xml.push_str(&format!(
            r#"<xdr:blipFill><a:blip r:embed="rId{}"/><a:stretch><a:fillRect/></a:stretch></xdr:blipFill>"#,
            i + 1
        ));
        xml.push_str(&format!(
            r#"<xdr:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{}" cy="{}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></xdr:spPr>"#,
            image.cx_emu, image.cy_emu
        ));
        xml.push_str("</xdr:pic><xdr:clientData/></xdr:twoCellAnchor>");
    }
    xml.push_str("</xdr:wsDr>");
    xml
}

/// Generate xl/drawings/_rels/drawingN.xml.rels
fn generate_drawing_rels(media: &[String]) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for (i, name) in media.iter().enumerate() {
        xml.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/{}"/>"#,
            i + 1,
            name
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

/// Generate a sheet XML file
fn generate_sheet_xml(
    sheet: &SheetBuilder,
    shared_strings: &[String],
    styles: &StylesCollector,
) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#);

    if sheet.default_col_width.is_some() || sheet.default_row_height.is_some() {
        let mut attrs = format!(
            r#" defaultRowHeight="{}""#,
            sheet.default_row_height.unwrap_or(15.0)
        );
        if let Some(w) = sheet.default_col_width {
            attrs.push_str(&format!(r#" defaultColWidth="{w}""#));
        }
        xml.push_str(&format!("<sheetFormatPr{attrs}/>"));
    }

    if !sheet.col_widths.is_empty() {
        xml.push_str("<cols>");
        for (min, max, width) in &sheet.col_widths {
            xml.push_str(&format!(
                r#"<col min="{min}" max="{max}" width="{width}" customWidth="1"/>"#
            ));
        }
        xml.push_str("</cols>");
    }

    xml.push_str("<sheetData>");
    let mut rows: BTreeMap<u32, Vec<&CellEntry>> = BTreeMap::new();
    for cell in &sheet.cells {
        let (_, row) = parse_cell_ref(&cell.cell_ref);
        rows.entry(row).or_default().push(cell);
    }
    for (row, _) in &sheet.row_heights {
        rows.entry(*row).or_default();
    }
    let heights: BTreeMap<u32, f64> = sheet.row_heights.iter().copied().collect();

    for (row_num, mut cells) in rows {
        cells.sort_by_key(|c| parse_cell_ref(&c.cell_ref).0);
        let mut row_attrs = format!(r#"r="{row_num}""#);
        if let Some(ht) = heights.get(&row_num) {
            row_attrs.push_str(&format!(r#" ht="{ht}" customHeight="1""#));
        }
        xml.push_str(&format!("<row {row_attrs}>"));
        for cell in cells {
            xml.push_str(&cell_xml(cell, shared_strings, styles));
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData>");

    if let Some(ref attrs) = sheet.protection {
        xml.push_str(&format!("<sheetProtection {attrs}/>"));
    }

    if !sheet.merges.is_empty() {
        xml.push_str(&format!(r#"<mergeCells count="{}">"#, sheet.merges.len()));
        for range in &sheet.merges {
            xml.push_str(&format!(r#"<mergeCell ref="{range}"/>"#));
        }
        xml.push_str("</mergeCells>");
    }

    if !sheet.validations.is_empty() {
        xml.push_str(&format!(
            r#"<dataValidations count="{}">"#,
            sheet.validations.len()
        ));
        for v in &sheet.validations {
            xml.push_str(v);
        }
        xml.push_str("</dataValidations>");
    }

    if !sheet.hyperlinks.is_empty() {
        xml.push_str("<hyperlinks>");
        let mut rid = 0;
        for link in &sheet.hyperlinks {
            match link {
                HyperlinkEntry::External { range, .. } => {
                    rid += 1;
                    xml.push_str(&format!(r#"<hyperlink ref="{range}" r:id="rId{rid}"/>"#));
                }
                HyperlinkEntry::Internal { range, location } => {
                    xml.push_str(&format!(
                        r#"<hyperlink ref="{range}" location="{}"/>"#,
                        escape_xml(location)
                    ));
                }
            }
        }
        xml.push_str("</hyperlinks>");
    }

    if !sheet.images.is_empty() {
        let external = sheet
            .hyperlinks
            .iter()
            .filter(|h| matches!(h, HyperlinkEntry::External { .. }))
            .count();
        xml.push_str(&format!(r#"<drawing r:id="rId{}"/>"#, external + 1));
    }

    xml.push_str("</worksheet>");
    xml
}

fn cell_xml(cell: &CellEntry, shared_strings: &[String], styles: &StylesCollector) -> String {
    let mut attrs = format!(r#"r="{}""#, cell.cell_ref);
    let style_idx = cell
        .style_id
        .or_else(|| cell.style.as_ref().map(|s| styles.get_style_index(s)))
        .unwrap_or(0);
    if style_idx > 0 {
        attrs.push_str(&format!(r#" s="{style_idx}""#));
    }

    let formula = match &cell.formula {
        None => String::new(),
        Some(FormulaEntry::Normal(f)) => format!("<f>{}</f>", escape_xml(f)),
        Some(FormulaEntry::SharedMaster { range, si, text }) => format!(
            r#"<f t="shared" ref="{range}" si="{si}">{}</f>"#,
            escape_xml(text)
        ),
        Some(FormulaEntry::SharedChild { si }) => format!(r#"<f t="shared" si="{si}"/>"#),
    };

    match &cell.value {
        CellValue::String(s) => {
            let idx = shared_strings.iter().position(|x| x == s).unwrap_or(0);
            format!(r#"<c {attrs} t="s">{formula}<v>{idx}</v></c>"#)
        }
        CellValue::Number(n) => format!("<c {attrs}>{formula}<v>{n}</v></c>"),
        CellValue::Boolean(b) => {
            format!(r#"<c {attrs} t="b">{formula}<v>{}</v></c>"#, u8::from(*b))
        }
        CellValue::Error(e) => format!(r#"<c {attrs} t="e">{formula}<v>{}</v></c>"#, escape_xml(e)),
        CellValue::InlineString(s) => format!(
            r#"<c {attrs} t="inlineStr"><is><t>{}</t></is></c>"#,
            escape_xml(s)
        ),
        CellValue::Empty => format!("<c {attrs}/>"),
    }
}
