//! Worksheet parsing - cells, rows, columns, merges and per-sheet records.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::{BTreeMap, HashMap};
use std::io::BufRead;

use crate::cell_ref::{cell_address, parse_cell_range, parse_cell_ref_bytes, MAX_COL, MAX_ROW};
use crate::data_validation::parse_data_validation;
use crate::drawings::AnchoredPicture;
use crate::error::Result;
use crate::formula::shift_formula;
use crate::hyperlinks::{parse_hyperlink_element, RawHyperlink, ResolvedHyperlink};
use crate::protection::parse_sheet_protection;
use crate::source::{DEFAULT_COL_WIDTH, DEFAULT_ROW_HEIGHT};
use crate::types::{CellType, DataValidation, MergedCell, SheetProtection};
use crate::xml_helpers::{attr_f64, attr_string, attr_string_local, attr_u32, read_element_text};

use super::styles::resolve_cell_text;

const HEIGHT_EPSILON: f64 = 1e-9;

/// One `<c>` element after value resolution.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ParsedCell {
    /// Display text (shared strings resolved, booleans as TRUE/FALSE).
    pub text: String,
    pub formula: String,
    pub style: u32,
    pub cell_type: CellType,
}

/// A `<col min max width>` entry; `min`/`max` are 1-based.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ColRange {
    pub min: u32,
    pub max: u32,
    pub width: f64,
}

/// Everything the source answers about one worksheet.
#[derive(Debug, Default)]
pub(crate) struct ParsedSheet {
    /// Keyed by 0-indexed (col, row).
    pub cells: HashMap<(u32, u32), ParsedCell>,
    /// Row-major display text, trailing empties trimmed.
    pub rows: Vec<Vec<String>>,
    /// Raw `ref` values of `<mergeCell>`.
    pub merges: Vec<String>,
    pub cols: Vec<ColRange>,
    pub default_col_width: Option<f64>,
    pub default_row_height: Option<f64>,
    /// `<row ht>` keyed by 1-based row number.
    pub heights: BTreeMap<u32, f64>,
    pub protection: Option<SheetProtection>,
    pub data_validations: Vec<DataValidation>,
    pub raw_hyperlinks: Vec<RawHyperlink>,
    /// `r:id` of the `<drawing>` element.
    pub drawing_id: Option<String>,
    /// Filled by the source after the sheet rels are read.
    pub hyperlinks: Vec<ResolvedHyperlink>,
    pub pictures: Vec<AnchoredPicture>,
}

impl ParsedSheet {
    /// Display text at a 0-indexed position, empty when absent.
    pub fn text_at(&self, col: u32, row: u32) -> &str {
        self.cells.get(&(col, row)).map_or("", |c| c.text.as_str())
    }

    /// Width of the 0-indexed column: its `<col>` entry, else the sheet
    /// default, else the format default.
    pub fn col_width(&self, col: u32) -> f64 {
        let one_based = col.saturating_add(1);
        self.cols
            .iter()
            .find(|c| (c.min..=c.max).contains(&one_based))
            .map(|c| c.width)
            .or(self.default_col_width)
            .unwrap_or(DEFAULT_COL_WIDTH)
    }

    /// Row heights that differ from the sheet's default row height.
    pub fn row_height_overrides(&self) -> BTreeMap<u32, f64> {
        let default = self.default_row_height.unwrap_or(DEFAULT_ROW_HEIGHT);
        self.heights
            .iter()
            .filter(|(_, h)| (**h - default).abs() > HEIGHT_EPSILON)
            .map(|(r, h)| (*r, *h))
            .collect()
    }

    /// Merged ranges with the display text of their top-left cell.
    pub fn merged_cells(&self) -> Vec<MergedCell> {
        self.merges
            .iter()
            .filter_map(|range| {
                let (r1, c1, r2, c2) = parse_cell_range(range)?;
                let (top, left) = (r1.min(r2), c1.min(c2));
                Some(MergedCell {
                    start_cell: cell_address(left, top),
                    end_cell: cell_address(c1.max(c2), r1.max(r2)),
                    value: self.text_at(left, top).to_string(),
                })
            })
            .collect()
    }

    fn build_rows(&mut self) {
        let mut by_row: BTreeMap<u32, Vec<(u32, &str)>> = BTreeMap::new();
        for ((col, row), cell) in &self.cells {
            if !cell.text.is_empty() {
                by_row.entry(*row).or_default().push((*col, cell.text.as_str()));
            }
        }
        let Some(last_row) = by_row.keys().next_back().copied() else {
            self.rows = Vec::new();
            return;
        };

        let mut rows = vec![Vec::new(); last_row as usize + 1];
        for (row, mut cells) in by_row {
            cells.sort_unstable_by_key(|(col, _)| *col);
            let width = cells.last().map_or(0, |(col, _)| *col as usize + 1);
            let mut values = vec![String::new(); width];
            for (col, text) in cells {
                if let Some(slot) = values.get_mut(col as usize) {
                    *slot = text.to_string();
                }
            }
            if let Some(slot) = rows.get_mut(row as usize) {
                *slot = values;
            }
        }
        self.rows = rows;
    }
}

/// Master of a shared formula group: text and 0-indexed anchor.
struct SharedMaster {
    formula: String,
    col: u32,
    row: u32,
}

/// Parse a worksheet part.
///
/// `shared_strings` resolves `t="s"` cells. Hyperlinks are returned raw and
/// pictures are left empty; both need the sheet rels.
pub(crate) fn parse_sheet<R: BufRead>(reader: R, shared_strings: &[String]) -> Result<ParsedSheet> {
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(false);

    let mut sheet = ParsedSheet::default();
    let mut shared: HashMap<u32, SharedMaster> = HashMap::new();
    let mut buf = Vec::new();
    let mut current_row: u32 = 0;
    let mut next_col: u32 = 0;
    let mut seen_row = false;

    loop {
        buf.clear();
        let event = xml.read_event_into(&mut buf)?;
        let (e, is_start) = match event {
            Event::Start(ref e) => (e, true),
            Event::Empty(ref e) => (e, false),
            Event::Eof => break,
            _ => continue,
        };

        match e.local_name().as_ref() {
            b"sheetFormatPr" => {
                sheet.default_col_width = attr_f64(e, b"defaultColWidth");
                sheet.default_row_height = attr_f64(e, b"defaultRowHeight");
            }
            b"col" => {
                let min = attr_u32(e, b"min");
                let max = attr_u32(e, b"max").or(min);
                if let (Some(min), Some(max), Some(width)) = (min, max, attr_f64(e, b"width")) {
                    sheet.cols.push(ColRange { min, max, width });
                }
            }
            b"row" => {
                current_row = match attr_u32(e, b"r") {
                    Some(r) if r > 0 => r - 1,
                    _ if seen_row => current_row.saturating_add(1),
                    _ => 0,
                };
                seen_row = true;
                next_col = 0;
                if let Some(ht) = attr_f64(e, b"ht").filter(|_| current_row <= MAX_ROW) {
                    sheet.heights.insert(current_row.saturating_add(1), ht);
                }
            }
            b"c" => {
                let position = match e.try_get_attribute("r").ok().flatten() {
                    Some(a) => parse_cell_ref_bytes(&a.value),
                    None => Some((next_col, current_row)),
                };
                let cell_type = CellType::from_attr(attr_string(e, b"t").as_deref());
                let style = attr_u32(e, b"s").unwrap_or(0);
                let body = if is_start {
                    read_cell_body(&mut xml)?
                } else {
                    CellBody::default()
                };

                let Some((col, row)) = position.filter(|&(c, r)| c <= MAX_COL && r <= MAX_ROW)
                else {
                    tracing::debug!(
                        row = current_row.saturating_add(1),
                        "cell outside the sheet grid skipped"
                    );
                    continue;
                };
                next_col = col.saturating_add(1);

                let formula = resolve_formula(body.formula, col, row, &mut shared);
                let text = resolve_cell_text(body.value.as_deref(), cell_type, shared_strings);
                sheet.cells.insert(
                    (col, row),
                    ParsedCell {
                        text,
                        formula,
                        style,
                        cell_type,
                    },
                );
            }
            b"mergeCell" => {
                if let Some(range) = attr_string(e, b"ref").filter(|r| !r.is_empty()) {
                    sheet.merges.push(range);
                }
            }
            b"sheetProtection" => {
                sheet.protection = Some(parse_sheet_protection(e));
            }
            b"dataValidation" => {
                if let Some(dv) = parse_data_validation(e, &mut xml, !is_start) {
                    sheet.data_validations.push(dv);
                }
            }
            b"hyperlink" => {
                if let Some(link) = parse_hyperlink_element(e) {
                    sheet.raw_hyperlinks.push(link);
                }
            }
            b"drawing" => {
                sheet.drawing_id = attr_string_local(e, b"id").filter(|id| !id.is_empty());
            }
            _ => {}
        }
    }

    sheet.build_rows();
    Ok(sheet)
}

/// `<f>` as written on a cell.
#[derive(Debug, Default)]
struct RawFormula {
    text: String,
    shared_index: Option<u32>,
}

#[derive(Debug, Default)]
struct CellBody {
    value: Option<String>,
    formula: Option<RawFormula>,
}

fn formula_attrs(e: &BytesStart<'_>) -> RawFormula {
    let shared_index = match attr_string(e, b"t").as_deref() {
        Some("shared") => attr_u32(e, b"si"),
        _ => None,
    };
    RawFormula {
        text: String::new(),
        shared_index,
    }
}

/// Read the children of a `<c>` start tag up to its end tag.
fn read_cell_body<R: BufRead>(xml: &mut Reader<R>) -> Result<CellBody> {
    let mut body = CellBody::default();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"v" => body.value = Some(read_element_text(xml, b"v")),
                b"f" => {
                    let mut formula = formula_attrs(e);
                    formula.text = read_element_text(xml, b"f");
                    body.formula = Some(formula);
                }
                b"is" => body.value = Some(read_inline_string(xml)?),
                _ => {}
            },
            Event::Empty(ref e) if e.local_name().as_ref() == b"f" => {
                body.formula = Some(formula_attrs(e));
            }
            Event::End(ref e) if e.local_name().as_ref() == b"c" => break,
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(body)
}

/// Concatenate the `<t>` runs of an `<is>` element, skipping phonetic runs.
fn read_inline_string<R: BufRead>(xml: &mut Reader<R>) -> Result<String> {
    let mut text = String::new();
    let mut buf = Vec::new();
    let mut in_phonetic = false;

    loop {
        buf.clear();
        match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"rPh" => in_phonetic = true,
                b"t" => {
                    let run = read_element_text(xml, b"t");
                    if !in_phonetic {
                        text.push_str(&run);
                    }
                }
                _ => {}
            },
            Event::End(ref e) => match e.local_name().as_ref() {
                b"rPh" => in_phonetic = false,
                b"is" => break,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(text)
}

/// Turn the raw `<f>` into the cell's formula text, registering shared
/// masters and expanding shared children.
fn resolve_formula(
    raw: Option<RawFormula>,
    col: u32,
    row: u32,
    shared: &mut HashMap<u32, SharedMaster>,
) -> String {
    let Some(raw) = raw else {
        return String::new();
    };
    let Some(si) = raw.shared_index else {
        return raw.text;
    };

    if !raw.text.is_empty() {
        shared.insert(
            si,
            SharedMaster {
                formula: raw.text.clone(),
                col,
                row,
            },
        );
        return raw.text;
    }

    match shared.get(&si) {
        Some(master) => shift_formula(
            &master.formula,
            i64::from(col) - i64::from(master.col),
            i64::from(row) - i64::from(master.row),
        ),
        None => {
            tracing::debug!(si, "shared formula child without master");
            String::new()
        }
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

    fn parse(xml: &str, sst: &[String]) -> ParsedSheet {
        parse_sheet(xml.as_bytes(), sst).unwrap()
    }

    const SHEET: &str = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheetFormatPr defaultRowHeight="15"/>
<cols><col min="2" max="3" width="20.5" customWidth="1"/></cols>
<sheetData>
  <row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="b"><v>1</v></c></row>
  <row r="2" ht="30" customHeight="1"><c r="A2" s="2"><v>10</v></c><c r="B2" s="2"><f>SUM(C2:D2)</f><v>100</v></c></row>
  <row r="4" ht="15"><c r="C4" t="inlineStr"><is><t xml:space="preserve">hello </t></is></c><c r="D4"/></row>
</sheetData>
<sheetProtection sheet="1" objects="1"/>
<mergeCells count="1"><mergeCell ref="A1:B1"/></mergeCells>
<hyperlinks><hyperlink ref="A2" location="Other!A1"/></hyperlinks>
<drawing r:id="rId7"/>
</worksheet>"#;

    #[test]
    fn test_parse_cells() {
        let sheet = parse(SHEET, &["Product".to_string()]);
        assert_eq!(sheet.text_at(0, 0), "Product");
        assert_eq!(sheet.cells[&(1, 0)].text, "TRUE");
        assert_eq!(sheet.cells[&(1, 0)].cell_type, CellType::Bool);
        let b2 = &sheet.cells[&(1, 1)];
        assert_eq!(b2.formula, "SUM(C2:D2)");
        assert_eq!(b2.style, 2);
        assert_eq!(b2.text, "100");
        assert_eq!(sheet.text_at(2, 3), "hello ");
        assert!(sheet.cells.contains_key(&(3, 3)));
    }

    #[test]
    fn test_rows_grid() {
        let sheet = parse(SHEET, &["Product".to_string()]);
        assert_eq!(
            sheet.rows,
            vec![
                vec!["Product".to_string(), "TRUE".to_string()],
                vec!["10".to_string(), "100".to_string()],
                Vec::new(),
                vec![String::new(), String::new(), "hello ".to_string()],
            ]
        );
    }

    #[test]
    fn test_sheet_records() {
        let sheet = parse(SHEET, &["Product".to_string()]);
        assert_eq!(sheet.col_width(0), DEFAULT_COL_WIDTH);
        assert_eq!(sheet.col_width(2), 20.5);
        assert_eq!(sheet.row_height_overrides(), BTreeMap::from([(2, 30.0)]));
        assert_eq!(
            sheet.merged_cells(),
            vec![MergedCell {
                start_cell: "A1".to_string(),
                end_cell: "B1".to_string(),
                value: "Product".to_string(),
            }]
        );
        let protection = sheet.protection.unwrap();
        assert!(protection.protected);
        assert!(!protection.edit_objects);
        assert_eq!(sheet.raw_hyperlinks.len(), 1);
        assert_eq!(sheet.drawing_id.as_deref(), Some("rId7"));
    }

    #[test]
    fn test_cells_outside_grid_are_skipped() {
        let xml = r#"<worksheet><sheetData>
<row r="1"><c r="A1" t="inlineStr"><is><t>ok</t></is></c><c r="A300000000"><v>1</v></c><c r="XFE1"/></row>
<row r="2000000" ht="30"><c><v>2</v></c></row>
</sheetData></worksheet>"#;
        let sheet = parse(xml, &[]);
        assert_eq!(sheet.cells.len(), 1);
        assert_eq!(sheet.text_at(0, 0), "ok");
        assert_eq!(sheet.rows, vec![vec!["ok".to_string()]]);
        assert!(sheet.heights.is_empty());
    }

    #[test]
    fn test_shared_formula_expansion() {
        let xml = r#"<worksheet><sheetData>
<row r="2"><c r="B2"><f t="shared" ref="B2:B4" si="0">A2*2</f><v>2</v></c></row>
<row r="3"><c r="B3"><f t="shared" si="0"/><v>4</v></c></row>
<row r="4"><c r="B4"><f t="shared" si="0"/><v>6</v></c></row>
</sheetData></worksheet>"#;
        let sheet = parse(xml, &[]);
        assert_eq!(sheet.cells[&(1, 1)].formula, "A2*2");
        assert_eq!(sheet.cells[&(1, 2)].formula, "A3*2");
        assert_eq!(sheet.cells[&(1, 3)].formula, "A4*2");
    }

    #[test]
    fn test_cells_without_refs() {
        let xml = r#"<worksheet><sheetData>
<row><c><v>1</v></c><c><v>2</v></c></row>
<row><c><v>3</v></c></row>
</sheetData></worksheet>"#;
        let sheet = parse(xml, &[]);
        assert_eq!(sheet.text_at(1, 0), "2");
        assert_eq!(sheet.text_at(0, 1), "3");
    }

    #[test]
    fn test_sheet_default_col_width() {
        let xml = r#"<worksheet><sheetFormatPr defaultColWidth="12" defaultRowHeight="18"/><sheetData><row r="1" ht="18"><c r="A1"><v>1</v></c></row></sheetData></worksheet>"#;
        let sheet = parse(xml, &[]);
        assert_eq!(sheet.col_width(5), 12.0);
        assert!(sheet.row_height_overrides().is_empty());
    }

    #[test]
    fn test_empty_sheet() {
        let sheet = parse("<worksheet><sheetData/></worksheet>", &[]);
        assert!(sheet.rows.is_empty());
        assert!(sheet.cells.is_empty());
    }
}
