//! Cell scanner.

use crate::cell_ref::cell_address;
use crate::source::WorkbookSource;
use crate::types::{CellMetadata, CellValue, Hyperlink};

/// Build cell records from a sheet's row grid in row-major order.
///
/// Empty values are skipped. Once `max_cells` records exist the scan
/// stops; 0 means no limit. Per-cell lookups that fail leave their field
/// at its default.
pub(super) fn scan_cells<S: WorkbookSource>(
    source: &mut S,
    sheet: &str,
    rows: &[Vec<String>],
    max_cells: usize,
) -> Vec<CellMetadata> {
    let mut cells = Vec::new();

    for (row_idx, row) in rows.iter().enumerate() {
        let row_idx = u32::try_from(row_idx).unwrap_or(u32::MAX);
        for (col_idx, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            if max_cells > 0 && cells.len() >= max_cells {
                tracing::debug!(sheet, max_cells, "cell limit reached");
                return cells;
            }

            let col_idx = u32::try_from(col_idx).unwrap_or(u32::MAX);
            let address = cell_address(col_idx, row_idx);
            cells.push(CellMetadata {
                value: CellValue::from_text(value.as_str()),
                formula: source.cell_formula(sheet, &address).unwrap_or_default(),
                style_id: source.cell_style(sheet, &address).unwrap_or(0),
                cell_type: source.cell_type(sheet, &address).unwrap_or_default(),
                hyperlink: source
                    .cell_hyperlink(sheet, &address)
                    .ok()
                    .flatten()
                    .map(|link| Hyperlink { link }),
                address,
            });
        }
    }

    cells
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
    use crate::extractor::mock::{MockSheet, MockSource};
    use crate::types::CellType;
    use std::collections::HashMap;
    use test_case::test_case;

    fn source() -> MockSource {
        let mut sheet = MockSheet::new(
            "Sheet1",
            &[&["Product", "", "x"], &[], &["", "100", "", "y", "z"]],
        );
        sheet.formulas = HashMap::from([("B3".to_string(), "SUM(C2:D2)".to_string())]);
        sheet.styles = HashMap::from([("B3".to_string(), 2)]);
        sheet.types = HashMap::from([("A1".to_string(), CellType::SharedString)]);
        sheet.links = HashMap::from([("C1".to_string(), "https://example.com".to_string())]);
        MockSource {
            sheets: vec![sheet],
            ..Default::default()
        }
    }

    fn scan(max: usize) -> Vec<CellMetadata> {
        let mut source = source();
        let rows = source.rows("Sheet1").unwrap();
        scan_cells(&mut source, "Sheet1", &rows, max)
    }

    #[test]
    fn test_row_major_order_skips_empty() {
        let addrs: Vec<String> = scan(0).into_iter().map(|c| c.address).collect();
        assert_eq!(addrs, vec!["A1", "C1", "B3", "D3", "E3"]);
    }

    #[test]
    fn test_fields_populated() {
        let cells = scan(0);
        assert_eq!(cells[0].cell_type, CellType::SharedString);
        assert_eq!(cells[0].value, CellValue::Text("Product".to_string()));
        assert_eq!(cells[1].hyperlink.as_ref().unwrap().link, "https://example.com");
        assert_eq!(cells[2].formula, "SUM(C2:D2)");
        assert_eq!(cells[2].style_id, 2);
        assert!(cells[3].formula.is_empty());
        assert!(cells[3].hyperlink.is_none());
    }

    #[test_case(1, &["A1"] ; "cap of one")]
    #[test_case(3, &["A1", "C1", "B3"] ; "cap below count")]
    #[test_case(5, &["A1", "C1", "B3", "D3", "E3"] ; "cap equal to count")]
    #[test_case(50, &["A1", "C1", "B3", "D3", "E3"] ; "cap above count")]
    fn test_cap(max: usize, expected: &[&str]) {
        let addrs: Vec<String> = scan(max).into_iter().map(|c| c.address).collect();
        assert_eq!(addrs, expected);
    }
}
