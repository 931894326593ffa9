//! Rust source encoding.
//!
//! Every type in the metadata model implements [`Literal`], which writes a
//! Rust expression that evaluates to an equal value. Records are written
//! as struct literals naming every field, so the generated code breaks
//! loudly if the model gains a field the encoder does not know about.
//! Maps are `BTreeMap`s and come out in ascending key order, which makes
//! the output for a given value byte-for-byte stable.

use std::collections::BTreeMap;
use std::fmt::{self, Write};

use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::error::Result;
use crate::types::{
    AlignmentStyle, BorderStyle, Bytes, CellMetadata, CellType, CellValue, DataValidation,
    DefinedName, DocumentProperties, FillStyle, FontStyle, Hyperlink, ImageFormat, ImageMetadata,
    MergedCell, Metadata, Protection, SheetDimensions, SheetMetadata, SheetProtection,
    StyleDetails,
};

const INDENT: &str = "    ";
const BYTES_PER_LINE: usize = 16;

/// File written by the recreated workbook program.
pub const RECREATED_FILE: &str = "sample.clone.xlsx";

/// A value that can be written as a Rust expression.
pub trait Literal {
    fn emit(&self, w: &mut LiteralWriter) -> fmt::Result;
}

/// Output buffer that tracks the indentation of nested blocks.
#[derive(Debug, Default)]
pub struct LiteralWriter {
    out: String,
    depth: usize,
}

impl Write for LiteralWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.out.push_str(s);
        Ok(())
    }
}

impl LiteralWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `depth` levels of indentation already open.
    pub fn with_depth(depth: usize) -> Self {
        Self {
            out: String::new(),
            depth,
        }
    }

    pub fn finish(self) -> String {
        self.out
    }

    fn line_break(&mut self) {
        self.out.push('\n');
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
    }

    /// `open`, then one indented line per item with a trailing comma, then
    /// `close` back at the current depth.
    fn block<T>(
        &mut self,
        open: &str,
        close: &str,
        items: impl IntoIterator<Item = T>,
        mut emit: impl FnMut(&mut Self, T) -> fmt::Result,
    ) -> fmt::Result {
        self.write_str(open)?;
        self.depth += 1;
        for item in items {
            self.line_break();
            emit(self, item)?;
            self.write_char(',')?;
        }
        self.depth = self.depth.saturating_sub(1);
        self.line_break();
        self.write_str(close)
    }

    /// A struct literal with every field spelled out.
    pub fn record(&mut self, name: &str, fields: &[(&str, &dyn Literal)]) -> fmt::Result {
        self.block(&format!("{name} {{"), "}", fields, |w, &(field, value)| {
            write!(w, "{field}: ")?;
            value.emit(w)
        })
    }
}

/// Write `value` as a standalone expression.
pub fn to_expression(value: &dyn Literal) -> Result<String> {
    let mut w = LiteralWriter::new();
    value.emit(&mut w)?;
    Ok(w.finish())
}

/// Encode `metadata` as a complete program. The value is built by a public
/// `metadata()` function, and `main` rebuilds the workbook from it with
/// [`Recreator`](crate::recreate::Recreator) and saves it as
/// [`RECREATED_FILE`].
pub fn to_literal(metadata: &Metadata) -> Result<String> {
    let mut w = LiteralWriter::with_depth(1);
    metadata.emit(&mut w)?;
    let expr = w.finish();

    let mut program = String::with_capacity(expr.len() + 640);
    program.push_str(
        "//! Generated by xlsxmeta. Rebuilds the workbook from its extracted metadata.\n\
         \n\
         use std::collections::BTreeMap;\n\
         \n\
         use chrono::prelude::*;\n\
         use xlsxmeta::recreate::{RecreateOptions, Recreator};\n\
         use xlsxmeta::types::*;\n\
         \n\
         /// The extracted workbook.\n\
         pub fn metadata() -> Result<Metadata, Box<dyn std::error::Error>> {\n    \
         Ok(",
    );
    program.push_str(&expr);
    write!(
        program,
        ")\n\
         }}\n\
         \n\
         fn main() -> Result<(), Box<dyn std::error::Error>> {{\n    \
         let metadata = metadata()?;\n    \
         let mut recreator = Recreator::new(&metadata, RecreateOptions::default());\n    \
         recreator.recreate()?;\n    \
         recreator.save({RECREATED_FILE:?})?;\n\
         \n    \
         Ok(())\n\
         }}\n"
    )?;
    Ok(program)
}

impl Literal for String {
    fn emit(&self, w: &mut LiteralWriter) -> fmt::Result {
        write!(w, "String::from({self:?})")
    }
}

macro_rules! display_literal {
    ($($ty:ty),*) => {
        $(
            impl Literal for $ty {
                fn emit(&self, w: &mut LiteralWriter) -> fmt::Result {
                    write!(w, "{self}")
                }
            }
        )*
    };
}

display_literal!(bool, u8, u32, i32, usize);

impl Literal for f64 {
    fn emit(&self, w: &mut LiteralWriter) -> fmt::Result {
        if self.is_nan() {
            w.write_str("f64::NAN")
        } else if self.is_infinite() {
            w.write_str(if *self > 0.0 {
                "f64::INFINITY"
            } else {
                "f64::NEG_INFINITY"
            })
        } else {
            // Debug keeps the decimal point, so the literal stays an f64
            write!(w, "{self:?}")
        }
    }
}

impl<T: Literal> Literal for Option<T> {
    fn emit(&self, w: &mut LiteralWriter) -> fmt::Result {
        match self {
            None => w.write_str("None"),
            Some(value) => {
                w.write_str("Some(")?;
                value.emit(w)?;
                w.write_char(')')
            }
        }
    }
}

impl<T: Literal> Literal for Vec<T> {
    fn emit(&self, w: &mut LiteralWriter) -> fmt::Result {
        if self.is_empty() {
            return w.write_str("Vec::new()");
        }
        w.block("vec![", "]", self, |w, item| item.emit(w))
    }
}

impl<K: Literal, V: Literal> Literal for BTreeMap<K, V> {
    fn emit(&self, w: &mut LiteralWriter) -> fmt::Result {
        if self.is_empty() {
            return w.write_str("BTreeMap::new()");
        }
        w.block("BTreeMap::from([", "])", self, |w, (key, value)| {
            w.write_char('(')?;
            key.emit(w)?;
            w.write_str(", ")?;
            value.emit(w)?;
            w.write_char(')')
        })
    }
}

impl Literal for Bytes {
    fn emit(&self, w: &mut LiteralWriter) -> fmt::Result {
        if self.is_empty() {
            return w.write_str("Bytes(Vec::new())");
        }
        w.block("Bytes(vec![", "])", self.0.chunks(BYTES_PER_LINE), |w, chunk| {
            for (i, byte) in chunk.iter().enumerate() {
                if i > 0 {
                    w.write_str(", ")?;
                }
                write!(w, "{byte:#04x}")?;
            }
            Ok(())
        })
    }
}

impl Literal for DateTime<Utc> {
    fn emit(&self, w: &mut LiteralWriter) -> fmt::Result {
        write!(
            w,
            "Utc.with_ymd_and_hms({}, {}, {}, {}, {}, {}).single().and_then(|t| t.with_nanosecond({})).ok_or(\"invalid timestamp\")?",
            self.year(),
            self.month(),
            self.day(),
            self.hour(),
            self.minute(),
            self.second(),
            self.nanosecond()
        )
    }
}

impl Literal for CellType {
    fn emit(&self, w: &mut LiteralWriter) -> fmt::Result {
        write!(w, "CellType::{}", self.name())
    }
}

impl Literal for CellValue {
    fn emit(&self, w: &mut LiteralWriter) -> fmt::Result {
        match self {
            Self::Empty => w.write_str("CellValue::Empty"),
            Self::Text(text) => {
                w.write_str("CellValue::Text(")?;
                text.emit(w)?;
                w.write_char(')')
            }
        }
    }
}

/// Implement [`Literal`] for a record. The destructuring pattern has no
/// `..`, so every field must be listed.
macro_rules! record_literal {
    ($ty:ident { $($field:ident),* $(,)? }) => {
        impl Literal for $ty {
            fn emit(&self, w: &mut LiteralWriter) -> fmt::Result {
                let $ty { $($field),* } = self;
                w.record(stringify!($ty), &[$((stringify!($field), $field as &dyn Literal)),*])
            }
        }
    };
}

record_literal!(Metadata {
    filename,
    properties,
    sheets,
    defined_names,
    styles,
    extracted_at,
});

record_literal!(DocumentProperties {
    title,
    subject,
    creator,
    keywords,
    description,
    last_modified_by,
    category,
    version,
    created,
    modified,
});

record_literal!(DefinedName {
    name,
    refers_to,
    scope,
});

record_literal!(SheetMetadata {
    index,
    name,
    visible,
    dimensions,
    merged_cells,
    data_validations,
    protection,
    row_heights,
    col_widths,
    cells,
    images,
});

record_literal!(SheetDimensions {
    start_cell,
    end_cell,
    row_count,
    col_count,
});

record_literal!(MergedCell {
    start_cell,
    end_cell,
    value,
});

record_literal!(DataValidation {
    range,
    validation_type,
    operator,
    formula1,
    formula2,
    show_error,
    error_title,
    error_message,
});

record_literal!(SheetProtection {
    protected,
    password,
    edit_objects,
    edit_scenarios,
    select_locked_cells,
    select_unlocked_cells,
});

record_literal!(CellMetadata {
    address,
    value,
    formula,
    style_id,
    cell_type,
    hyperlink,
});

record_literal!(Hyperlink { link });

record_literal!(StyleDetails {
    font,
    fill,
    border,
    alignment,
    number_format,
    protection,
});

record_literal!(FontStyle {
    bold,
    italic,
    underline,
    strike,
    family,
    size,
    color,
});

record_literal!(FillStyle {
    fill_type,
    pattern,
    color,
});

record_literal!(BorderStyle { side, color, style });

record_literal!(AlignmentStyle {
    horizontal,
    vertical,
    wrap_text,
    text_rotation,
    indent,
    shrink_to_fit,
});

record_literal!(Protection { hidden, locked });

record_literal!(ImageMetadata {
    cell,
    file,
    extension,
    insert_type,
    format,
});

record_literal!(ImageFormat {
    alt_text,
    print_object,
    locked,
    lock_aspect_ratio,
    auto_fit,
    auto_fit_ignore_aspect,
    offset_x,
    offset_y,
    scale_x,
    scale_y,
    hyperlink,
    hyperlink_type,
    positioning,
});

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(1.5, "1.5" ; "fraction")]
    #[test_case(20.0, "20.0" ; "whole number keeps point")]
    #[test_case(-0.25, "-0.25" ; "negative")]
    #[test_case(f64::NAN, "f64::NAN" ; "nan")]
    #[test_case(f64::NEG_INFINITY, "f64::NEG_INFINITY" ; "negative infinity")]
    fn test_f64_literal(value: f64, expected: &str) {
        assert_eq!(to_expression(&value).unwrap(), expected);
    }

    #[test]
    fn test_string_escaping() {
        let s = "say \"hi\"\n\\ done".to_string();
        assert_eq!(
            to_expression(&s).unwrap(),
            r#"String::from("say \"hi\"\n\\ done")"#
        );
    }

    #[test]
    fn test_option_and_vec() {
        let none: Option<String> = None;
        assert_eq!(to_expression(&none).unwrap(), "None");
        assert_eq!(to_expression(&Some(true)).unwrap(), "Some(true)");
        assert_eq!(to_expression(&Vec::<u32>::new()).unwrap(), "Vec::new()");
        assert_eq!(to_expression(&vec![1u32, 2]).unwrap(), "vec![\n    1,\n    2,\n]");
    }

    #[test]
    fn test_map_sorted_by_key() {
        let map = BTreeMap::from([("C".to_string(), 3.0), ("A".to_string(), 12.5)]);
        assert_eq!(
            to_expression(&map).unwrap(),
            "BTreeMap::from([\n    (String::from(\"A\"), 12.5),\n    (String::from(\"C\"), 3.0),\n])"
        );
        assert_eq!(
            to_expression(&BTreeMap::<u32, f64>::new()).unwrap(),
            "BTreeMap::new()"
        );
    }

    #[test]
    fn test_bytes_wrap_at_sixteen() {
        let bytes = Bytes((0u8..18).collect());
        let expr = to_expression(&bytes).unwrap();
        let lines: Vec<&str> = expr.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "Bytes(vec![");
        assert!(lines[1].starts_with("    0x00, 0x01,"));
        assert!(lines[1].ends_with("0x0f,"));
        assert_eq!(lines[2], "    0x10, 0x11,");
        assert_eq!(lines[3], "])");
        assert_eq!(to_expression(&Bytes::default()).unwrap(), "Bytes(Vec::new())");
    }

    #[test]
    fn test_timestamp() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 6).unwrap()
            + chrono::Duration::nanoseconds(42);
        assert_eq!(
            to_expression(&ts).unwrap(),
            "Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 6).single().and_then(|t| t.with_nanosecond(42)).ok_or(\"invalid timestamp\")?"
        );
    }

    #[test]
    fn test_record_lists_every_field() {
        let cell = CellMetadata {
            address: "B2".to_string(),
            value: CellValue::from_text("100"),
            formula: "SUM(C2:D2)".to_string(),
            style_id: 2,
            cell_type: CellType::Number,
            hyperlink: None,
        };
        assert_eq!(
            to_expression(&cell).unwrap(),
            "CellMetadata {\n    \
             address: String::from(\"B2\"),\n    \
             value: CellValue::Text(String::from(\"100\")),\n    \
             formula: String::from(\"SUM(C2:D2)\"),\n    \
             style_id: 2,\n    \
             cell_type: CellType::Number,\n    \
             hyperlink: None,\n\
             }"
        );
    }

    #[test]
    fn test_nested_indentation() {
        let link = Some(Hyperlink {
            link: "#Sheet2!A1".to_string(),
        });
        assert_eq!(
            to_expression(&vec![link]).unwrap(),
            "vec![\n    Some(Hyperlink {\n        link: String::from(\"#Sheet2!A1\"),\n    }),\n]"
        );
    }

    #[test]
    fn test_program_wrapper() {
        let program = to_literal(&Metadata::default()).unwrap();
        assert!(program.contains("use xlsxmeta::types::*;"));
        assert!(program.contains("pub fn metadata() -> Result<Metadata, Box<dyn std::error::Error>> {\n    Ok(Metadata {\n        filename: String::from(\"\"),"));
        assert!(program.contains("    })\n}\n\nfn main() -> Result<(), Box<dyn std::error::Error>> {\n    let metadata = metadata()?;\n"));
        assert!(program.contains("Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0)"));
        assert!(program.contains("recreator.save(\"sample.clone.xlsx\")?;"));
        assert!(program.ends_with("    Ok(())\n}\n"));
    }

    #[test]
    fn test_output_is_deterministic() {
        let mut meta = Metadata::default();
        for id in [9u32, 2, 5] {
            meta.styles.insert(
                id,
                StyleDetails {
                    number_format: id,
                    ..Default::default()
                },
            );
        }
        let first = to_literal(&meta).unwrap();
        let second = to_literal(&meta.clone()).unwrap();
        assert_eq!(first, second);
        let p2 = first.find("(2, StyleDetails").unwrap();
        let p5 = first.find("(5, StyleDetails").unwrap();
        let p9 = first.find("(9, StyleDetails").unwrap();
        assert!(p2 < p5 && p5 < p9);
    }
}
