//! Utilities for Excel-style A1 cell references and ranges.
//!
//! Everything here is 0-indexed on the numeric side: column 0 is "A",
//! row 0 is "1".

/// Last 0-indexed column of a sheet (XFD).
pub const MAX_COL: u32 = 16_383;
/// Last 0-indexed row of a sheet (1048576).
pub const MAX_ROW: u32 = 1_048_575;

/// Parse a cell reference like "A1" into (col, row) where col and row are 0-indexed.
///
/// `$` anchors are ignored. Returns `None` when either part is missing or
/// the reference lies past XFD1048576.
pub fn parse_cell_ref(cell_ref: &str) -> Option<(u32, u32)> {
    parse_cell_ref_bytes(cell_ref.trim().as_bytes())
}

/// Parse a cell reference from raw bytes (ASCII) into (col, row) where col and row are 0-indexed.
///
/// This is the bytes equivalent of [`parse_cell_ref`] for use with raw
/// XML attribute values from quick-xml.
pub fn parse_cell_ref_bytes(ref_bytes: &[u8]) -> Option<(u32, u32)> {
    let mut col: u32 = 0;
    let mut row: u32 = 0;
    let mut saw_col = false;
    let mut saw_row = false;

    for &b in ref_bytes {
        if b == b'$' {
            continue;
        }
        if b.is_ascii_alphabetic() {
            // Letters after digits are not a cell reference
            if saw_row {
                return None;
            }
            let upper = b.to_ascii_uppercase();
            col = col * 26 + u32::from(upper - b'A') + 1;
            if col > MAX_COL + 1 {
                return None;
            }
            saw_col = true;
        } else if b.is_ascii_digit() {
            row = row * 10 + u32::from(b - b'0');
            if row > MAX_ROW + 1 {
                return None;
            }
            saw_row = true;
        } else {
            return None;
        }
    }

    if !saw_col || !saw_row || row == 0 {
        return None;
    }

    Some((col - 1, row - 1))
}

/// Parse a cell range like "A1:B10" or "A1" into (start_row, start_col, end_row, end_col).
pub fn parse_cell_range(range: &str) -> Option<(u32, u32, u32, u32)> {
    if let Some((start, end)) = range.split_once(':') {
        let (start_col, start_row) = parse_cell_ref(start)?;
        let (end_col, end_row) = parse_cell_ref(end)?;
        Some((start_row, start_col, end_row, end_col))
    } else {
        let (start_col, start_row) = parse_cell_ref(range)?;
        Some((start_row, start_col, start_row, start_col))
    }
}

/// Parse sqref string into a list of (start_row, start_col, end_row, end_col) ranges.
pub fn parse_sqref(sqref: &str) -> Vec<(u32, u32, u32, u32)> {
    sqref.split_whitespace().filter_map(parse_cell_range).collect()
}

/// Whether the 0-indexed (col, row) lies inside any range of a `ref`/`sqref` value.
pub fn range_contains(sqref: &str, col: u32, row: u32) -> bool {
    parse_sqref(sqref).into_iter().any(|(r1, c1, r2, c2)| {
        (r1.min(r2)..=r1.max(r2)).contains(&row) && (c1.min(c2)..=c1.max(c2)).contains(&col)
    })
}

/// Convert a 0-indexed column number to its letters (0 = A, 25 = Z, 26 = AA).
pub fn column_name(col: u32) -> String {
    let mut letters = Vec::new();
    let mut n = u64::from(col) + 1;
    while n > 0 {
        n -= 1;
        // n % 26 is always < 26
        letters.push(char::from(b'A' + u8::try_from(n % 26).unwrap_or(0)));
        n /= 26;
    }
    letters.iter().rev().collect()
}

/// Convert column letters to a 0-indexed column number ("A" = 0).
pub fn column_index(name: &str) -> Option<u32> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_alphabetic()) {
        return None;
    }
    let mut col: u32 = 0;
    for b in name.bytes() {
        col = col
            .checked_mul(26)?
            .checked_add(u32::from(b.to_ascii_uppercase() - b'A') + 1)?;
    }
    Some(col - 1)
}

/// Build an A1 address from a 0-indexed (col, row).
pub fn cell_address(col: u32, row: u32) -> String {
    format!("{}{}", column_name(col), u64::from(row) + 1)
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

    #[test_case(0, "A")]
    #[test_case(25, "Z")]
    #[test_case(26, "AA")]
    #[test_case(701, "ZZ")]
    #[test_case(702, "AAA")]
    #[test_case(16383, "XFD")]
    fn test_column_name(col: u32, expected: &str) {
        assert_eq!(column_name(col), expected);
        assert_eq!(column_index(expected), Some(col));
    }

    #[test]
    fn test_column_index_rejects_junk() {
        assert_eq!(column_index(""), None);
        assert_eq!(column_index("A1"), None);
        assert_eq!(column_index("a"), Some(0));
    }

    #[test]
    fn test_parse_cell_ref() {
        assert_eq!(parse_cell_ref("A1"), Some((0, 0)));
        assert_eq!(parse_cell_ref("$C$7"), Some((2, 6)));
        assert_eq!(parse_cell_ref("ab12"), Some((27, 11)));
        assert_eq!(parse_cell_ref("A"), None);
        assert_eq!(parse_cell_ref("12"), None);
        assert_eq!(parse_cell_ref("A0"), None);
        assert_eq!(parse_cell_ref("1A"), None);
    }

    #[test]
    fn test_parse_cell_ref_grid_bounds() {
        assert_eq!(parse_cell_ref("XFD1048576"), Some((MAX_COL, MAX_ROW)));
        assert_eq!(parse_cell_ref("XFE1"), None);
        assert_eq!(parse_cell_ref("A1048577"), None);
        assert_eq!(parse_cell_ref("A300000000"), None);
        assert_eq!(parse_cell_ref("ZZZZZZZZ1"), None);
        assert_eq!(parse_cell_range("A1:A99999999"), None);
    }

    #[test]
    fn test_cell_address() {
        assert_eq!(cell_address(0, 0), "A1");
        assert_eq!(cell_address(27, 99), "AB100");
    }

    #[test]
    fn test_parse_cell_range() {
        assert_eq!(parse_cell_range("A1:B10"), Some((0, 0, 9, 1)));
        assert_eq!(parse_cell_range("C3"), Some((2, 2, 2, 2)));
        assert_eq!(parse_cell_range("C3:"), None);
    }

    #[test]
    fn test_range_contains() {
        assert!(range_contains("A1:B2", 1, 1));
        assert!(!range_contains("A1:B2", 2, 1));
        assert!(range_contains("A1 D4:D9", 3, 5));
        assert!(!range_contains("", 0, 0));
    }
}
