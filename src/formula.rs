//! Shared formula expansion.
//!
//! A shared formula is stored once on its master cell (`<f t="shared"
//! ref=".." si="0">A2*2</f>`); the other cells of the range only carry the
//! group index. Their text is the master's with every relative reference
//! moved by the offset between the two cells.

use crate::cell_ref::{column_index, column_name, MAX_COL, MAX_ROW};

/// An A1 reference token with its anchors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CellToken {
    col: u32,
    row: u32,
    col_abs: bool,
    row_abs: bool,
}

impl CellToken {
    /// Parse `$?LETTERS$?DIGITS`, 0-indexed. Anything else is not a reference.
    fn parse(token: &str) -> Option<Self> {
        let (col_abs, rest) = match token.strip_prefix('$') {
            Some(rest) => (true, rest),
            None => (false, token),
        };
        let letters_end = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        let (letters, rest) = rest.split_at(letters_end);
        if letters.is_empty() || letters.len() > 3 {
            return None;
        }
        let (row_abs, digits) = match rest.strip_prefix('$') {
            Some(digits) => (true, digits),
            None => (false, rest),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let col = column_index(letters).filter(|c| *c <= MAX_COL)?;
        let row = digits.parse::<u32>().ok()?.checked_sub(1)?;
        if row > MAX_ROW {
            return None;
        }
        Some(Self {
            col,
            row,
            col_abs,
            row_abs,
        })
    }

    /// Render moved by the offset; `None` when the result leaves the grid.
    fn shifted(self, dcol: i64, drow: i64) -> Option<String> {
        let col = if self.col_abs {
            self.col
        } else {
            offset(self.col, dcol, MAX_COL)?
        };
        let row = if self.row_abs {
            self.row
        } else {
            offset(self.row, drow, MAX_ROW)?
        };
        Some(format!(
            "{}{}{}{}",
            if self.col_abs { "$" } else { "" },
            column_name(col),
            if self.row_abs { "$" } else { "" },
            u64::from(row) + 1
        ))
    }
}

fn offset(value: u32, delta: i64, max: u32) -> Option<u32> {
    let moved = i64::from(value).checked_add(delta)?;
    u32::try_from(moved).ok().filter(|v| *v <= max)
}

fn is_token_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '$')
}

/// Index just past the quoted run starting at `start`. A doubled quote
/// character inside the run is an escape.
fn quoted_end(chars: &[char], start: usize, quote: char) -> usize {
    let mut i = start + 1;
    while let Some(&c) = chars.get(i) {
        if c == quote {
            if chars.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    chars.len()
}

/// Move every relative A1 reference in `formula` by (`dcol`, `drow`).
///
/// String literals and quoted sheet names are copied untouched, `$`
/// anchored parts stay put, and a sheet prefix (`Data!A1`) is kept while
/// its cell part moves. Function names and defined names are left alone.
/// A reference pushed off the grid becomes `#REF!`.
pub fn shift_formula(formula: &str, dcol: i64, drow: i64) -> String {
    if dcol == 0 && drow == 0 {
        return formula.to_string();
    }

    let chars: Vec<char> = formula.chars().collect();
    let mut out = String::with_capacity(formula.len() + 8);
    let mut i = 0;

    while let Some(&c) = chars.get(i) {
        if c == '"' || c == '\'' {
            let end = quoted_end(&chars, i, c);
            out.extend(chars.get(i..end).unwrap_or_default());
            i = end;
        } else if is_token_char(c) {
            let mut end = i;
            while chars.get(end).copied().is_some_and(is_token_char) {
                end += 1;
            }
            let token: String = chars.get(i..end).unwrap_or_default().iter().collect();
            let next = chars.get(end).copied();
            match CellToken::parse(&token) {
                Some(cell) if !matches!(next, Some('(' | '!')) => {
                    match cell.shifted(dcol, drow) {
                        Some(moved) => out.push_str(&moved),
                        None => out.push_str("#REF!"),
                    }
                }
                _ => out.push_str(&token),
            }
            i = end;
        } else {
            out.push(c);
            i += 1;
        }
    }

    out
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

    #[test_case("A2*2", 0, 1, "A3*2" ; "row offset")]
    #[test_case("SUM(C2:D2)", 0, 3, "SUM(C5:D5)" ; "range in function")]
    #[test_case("$A$1+B1", 1, 1, "$A$1+C2" ; "absolute kept")]
    #[test_case("$A1+A$1", 2, 2, "$A3+C$1" ; "mixed anchors")]
    #[test_case("Data!B2*2", 1, 0, "Data!C2*2" ; "sheet prefix kept")]
    #[test_case("'Q1 Sales'!A1", 0, 1, "'Q1 Sales'!A2" ; "quoted sheet kept")]
    #[test_case("IF(A1=\"B2\",1,0)", 0, 1, "IF(A2=\"B2\",1,0)" ; "string literal untouched")]
    #[test_case("LOG10(A1)", 0, 1, "LOG10(A2)" ; "function name untouched")]
    #[test_case("A1*1.5", 1, 0, "B1*1.5" ; "number untouched")]
    #[test_case("A1-1", -1, 0, "#REF!-1" ; "off grid")]
    fn test_shift_formula(formula: &str, dcol: i64, drow: i64, expected: &str) {
        assert_eq!(shift_formula(formula, dcol, drow), expected);
    }

    #[test]
    fn test_zero_offset_is_identity() {
        assert_eq!(shift_formula("SUM(A1:A9)", 0, 0), "SUM(A1:A9)");
    }

    #[test]
    fn test_cell_token_parse() {
        assert_eq!(
            CellToken::parse("$AB$12"),
            Some(CellToken {
                col: 27,
                row: 11,
                col_abs: true,
                row_abs: true,
            })
        );
        assert!(CellToken::parse("Sheet1").is_none());
        assert!(CellToken::parse("A0").is_none());
        assert!(CellToken::parse("XFE1").is_none());
        assert!(CellToken::parse("1E10").is_none());
    }
}
