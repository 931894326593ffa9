//! Workbook regeneration from extracted metadata.
//!
//! [`Recreator`] is what the generated Rust program calls: it turns a
//! [`Metadata`] value back into an `.xlsx` with `rust_xlsxwriter`.
//! Anything the writer rejects (an overlapping merge, an unreadable
//! image, a malformed validation) is logged and skipped; only sheet
//! creation and saving are fatal.

use std::collections::HashMap;
use std::path::Path;

use rust_xlsxwriter::{
    Color, DataValidation as XlsxValidation, DataValidationRule, DocProperties, Format,
    FormatAlign, FormatBorder, FormatPattern, FormatUnderline, Formula, Image, ObjectMovement,
    ProtectionOptions, Url, Workbook, Worksheet,
};

use crate::cell_ref::{column_index, parse_cell_ref, parse_cell_range, parse_sqref};
use crate::data_validation::parse_list_values;
use crate::error::{Result, XlsxMetaError};
use crate::types::{
    CellMetadata, CellType, DataValidation, DefinedName, DocumentProperties, ImageMetadata,
    Metadata, SheetMetadata, StyleDetails,
};

/// Number format ids from here up refer to `<numFmt>` codes in the source.
const FIRST_CUSTOM_NUM_FMT: u8 = 164;

/// Which parts of the metadata to write back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecreateOptions {
    pub cells: bool,
    pub styles: bool,
    pub merged_cells: bool,
    /// Column widths and row heights.
    pub layout: bool,
    pub data_validation: bool,
    pub protection: bool,
    pub images: bool,
    pub defined_names: bool,
    pub properties: bool,
}

impl Default for RecreateOptions {
    fn default() -> Self {
        Self {
            cells: true,
            styles: true,
            merged_cells: true,
            layout: true,
            data_validation: true,
            protection: true,
            images: true,
            defined_names: true,
            properties: true,
        }
    }
}

/// Rebuilds a workbook from a [`Metadata`] value.
pub struct Recreator<'a> {
    metadata: &'a Metadata,
    options: RecreateOptions,
    workbook: Workbook,
    formats: HashMap<u32, Format>,
}

impl<'a> Recreator<'a> {
    pub fn new(metadata: &'a Metadata, options: RecreateOptions) -> Self {
        Self {
            metadata,
            options,
            workbook: Workbook::new(),
            formats: HashMap::new(),
        }
    }

    /// Build the workbook in memory. Calling it again starts over.
    pub fn recreate(&mut self) -> Result<()> {
        self.workbook = Workbook::new();
        self.formats.clear();

        if self.options.properties {
            self.workbook
                .set_properties(&doc_properties(&self.metadata.properties));
        }

        if self.options.styles {
            self.formats = self
                .metadata
                .styles
                .iter()
                .map(|(id, details)| (*id, build_format(details)))
                .collect();
        }

        let mut sheets: Vec<&SheetMetadata> = self.metadata.sheets.iter().collect();
        sheets.sort_by_key(|s| s.index);
        let first_visible = sheets.iter().position(|s| s.visible);

        for (pos, sheet) in sheets.iter().enumerate() {
            let worksheet = self.workbook.add_worksheet().set_name(&sheet.name)?;
            if Some(pos) == first_visible {
                worksheet.set_active(true);
            } else if !sheet.visible {
                worksheet.set_hidden(true);
            }
            write_sheet(worksheet, sheet, &self.formats, &self.options);
        }

        if self.options.defined_names {
            for name in &self.metadata.defined_names {
                define_name(&mut self.workbook, name);
            }
        }

        tracing::debug!(
            sheets = sheets.len(),
            formats = self.formats.len(),
            "workbook recreated"
        );
        Ok(())
    }

    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.workbook.save(path)?;
        tracing::info!(path = %path.display(), "workbook saved");
        Ok(())
    }

    pub fn save_to_buffer(&mut self) -> Result<Vec<u8>> {
        Ok(self.workbook.save_to_buffer()?)
    }
}

fn write_sheet(
    worksheet: &mut Worksheet,
    sheet: &SheetMetadata,
    formats: &HashMap<u32, Format>,
    options: &RecreateOptions,
) {
    let name = sheet.name.as_str();

    // Merges first: merge_range blanks the whole range, then the anchor
    // cell is written over it.
    if options.merged_cells {
        let plain = Format::new();
        for merge in &sheet.merged_cells {
            let range = format!("{}:{}", merge.start_cell, merge.end_cell);
            let Some((r1, c1, r2, c2)) = grid_range(&range) else {
                tracing::debug!(sheet = name, range = %range, "skipping malformed merge");
                continue;
            };
            if let Err(e) = worksheet.merge_range(r1, c1, r2, c2, &merge.value, &plain) {
                tracing::debug!(sheet = name, range = %range, error = %e, "skipping merge");
            }
        }
    }

    if options.cells {
        for cell in &sheet.cells {
            if let Err(e) = write_cell(worksheet, cell, formats) {
                tracing::debug!(sheet = name, cell = %cell.address, error = %e, "skipping cell");
            }
        }
    }

    if options.layout {
        for (letters, width) in &sheet.col_widths {
            let Some(col) = column_index(letters).and_then(|c| u16::try_from(c).ok()) else {
                continue;
            };
            if let Err(e) = worksheet.set_column_width(col, *width) {
                tracing::debug!(sheet = name, col = %letters, error = %e, "skipping column width");
            }
        }
        for (row, height) in &sheet.row_heights {
            let Some(row0) = row.checked_sub(1) else {
                continue;
            };
            if let Err(e) = worksheet.set_row_height(row0, *height) {
                tracing::debug!(sheet = name, row, error = %e, "skipping row height");
            }
        }
    }

    if options.data_validation {
        for validation in &sheet.data_validations {
            let Some(rule) = build_validation(validation) else {
                tracing::debug!(
                    sheet = name,
                    kind = %validation.validation_type,
                    "unsupported data validation"
                );
                continue;
            };
            for (r1, c1, r2, c2) in parse_sqref(&validation.range) {
                let (Ok(c1), Ok(c2)) = (u16::try_from(c1), u16::try_from(c2)) else {
                    continue;
                };
                if let Err(e) = worksheet.add_data_validation(r1, c1, r2, c2, &rule) {
                    tracing::debug!(sheet = name, range = %validation.range, error = %e, "skipping data validation");
                }
            }
        }
    }

    if options.protection {
        if let Some(protection) = sheet.protection.as_ref().filter(|p| p.protected) {
            // Stored passwords are hashes and cannot be reapplied.
            worksheet.protect_with_options(&ProtectionOptions {
                select_locked_cells: protection.select_locked_cells,
                select_unlocked_cells: protection.select_unlocked_cells,
                edit_objects: protection.edit_objects,
                edit_scenarios: protection.edit_scenarios,
                ..Default::default()
            });
        }
    }

    if options.images {
        for image in &sheet.images {
            if let Err(e) = insert_image(worksheet, image) {
                tracing::debug!(sheet = name, cell = %image.cell, error = %e, "skipping image");
            }
        }
    }
}

fn write_cell(
    worksheet: &mut Worksheet,
    cell: &CellMetadata,
    formats: &HashMap<u32, Format>,
) -> Result<()> {
    let (col, row) = grid_cell(&cell.address)?;
    let format = formats.get(&cell.style_id);
    let text = cell.value.as_str();

    if let Some(link) = &cell.hyperlink {
        let url = Url::new(url_target(&link.link)).set_text(text);
        match format {
            Some(f) => worksheet.write_url_with_format(row, col, url, f)?,
            None => worksheet.write_url(row, col, url)?,
        };
        return Ok(());
    }

    if !cell.formula.is_empty() {
        let formula = Formula::new(&cell.formula).set_result(text);
        match format {
            Some(f) => worksheet.write_formula_with_format(row, col, formula, f)?,
            None => worksheet.write_formula(row, col, formula)?,
        };
        return Ok(());
    }

    let number = match cell.cell_type {
        CellType::Number | CellType::Unset => text.parse::<f64>().ok(),
        _ => None,
    };
    match (cell.cell_type, number) {
        (CellType::Bool, _) if matches!(text, "TRUE" | "FALSE") => {
            let value = text == "TRUE";
            match format {
                Some(f) => worksheet.write_boolean_with_format(row, col, value, f)?,
                None => worksheet.write_boolean(row, col, value)?,
            };
        }
        (_, Some(value)) => {
            match format {
                Some(f) => worksheet.write_number_with_format(row, col, value, f)?,
                None => worksheet.write_number(row, col, value)?,
            };
        }
        _ => {
            match format {
                Some(f) => worksheet.write_string_with_format(row, col, text, f)?,
                None => worksheet.write_string(row, col, text)?,
            };
        }
    }
    Ok(())
}

/// External targets keep their scheme; anything else is a location
/// inside the workbook.
fn url_target(link: &str) -> String {
    let is_external = link.contains("://")
        || ["mailto:", "file:", "tel:"]
            .iter()
            .any(|scheme| link.starts_with(scheme));
    if is_external {
        link.to_string()
    } else {
        format!("internal:{}", link.trim_start_matches('#'))
    }
}

fn insert_image(worksheet: &mut Worksheet, meta: &ImageMetadata) -> Result<()> {
    let (col, row) = grid_cell(&meta.cell)?;

    let mut image = Image::new_from_buffer(meta.file.as_slice())?;
    let (mut x, mut y) = (0, 0);
    if let Some(format) = &meta.format {
        if !format.alt_text.is_empty() {
            image = image.set_alt_text(&format.alt_text);
        }
        if format.scale_x > 0.0 {
            image = image.set_scale_width(format.scale_x);
        }
        if format.scale_y > 0.0 {
            image = image.set_scale_height(format.scale_y);
        }
        if let Some(movement) = object_movement(&format.positioning) {
            image = image.set_object_movement(movement);
        }
        x = u32::try_from(format.offset_x.max(0)).unwrap_or(0);
        y = u32::try_from(format.offset_y.max(0)).unwrap_or(0);
    }

    worksheet.insert_image_with_offset(row, col, &image, x, y)?;
    Ok(())
}

fn object_movement(positioning: &str) -> Option<ObjectMovement> {
    match positioning {
        "twoCell" => Some(ObjectMovement::MoveAndSizeWithCells),
        "oneCell" => Some(ObjectMovement::MoveButDontSizeWithCells),
        "absolute" => Some(ObjectMovement::DontMoveOrSizeWithCells),
        _ => None,
    }
}

fn define_name(workbook: &mut Workbook, name: &DefinedName) {
    // Built-in names (print areas, filter ranges) belong to the writer.
    if name.name.starts_with("_xlnm.") {
        tracing::debug!(name = %name.name, "skipping built-in defined name");
        return;
    }
    let qualified = if name.scope.is_empty() || name.scope == "Workbook" {
        name.name.clone()
    } else if name.scope.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        format!("{}!{}", name.scope, name.name)
    } else {
        format!("'{}'!{}", name.scope.replace('\'', "''"), name.name)
    };
    let refers_to = if name.refers_to.starts_with('=') {
        name.refers_to.clone()
    } else {
        format!("={}", name.refers_to)
    };
    if let Err(e) = workbook.define_name(&qualified, &refers_to) {
        tracing::debug!(name = %qualified, error = %e, "skipping defined name");
    }
}

fn doc_properties(props: &DocumentProperties) -> DocProperties {
    let mut out = DocProperties::new();
    if !props.title.is_empty() {
        out = out.set_title(&props.title);
    }
    if !props.subject.is_empty() {
        out = out.set_subject(&props.subject);
    }
    if !props.creator.is_empty() {
        out = out.set_author(&props.creator);
    }
    if !props.keywords.is_empty() {
        out = out.set_keywords(&props.keywords);
    }
    if !props.description.is_empty() {
        out = out.set_comment(&props.description);
    }
    if !props.category.is_empty() {
        out = out.set_category(&props.category);
    }
    out
}

/// 0-indexed `(col, row)` of an A1 address in writer units.
fn grid_cell(address: &str) -> Result<(u16, u32)> {
    parse_cell_ref(address)
        .and_then(|(col, row)| Some((u16::try_from(col).ok()?, row)))
        .ok_or_else(|| XlsxMetaError::CellRef(address.to_string()))
}

/// 0-indexed `(first_row, first_col, last_row, last_col)` in writer units.
fn grid_range(range: &str) -> Option<(u32, u16, u32, u16)> {
    let (r1, c1, r2, c2) = parse_cell_range(range)?;
    Some((
        r1.min(r2),
        u16::try_from(c1.min(c2)).ok()?,
        r1.max(r2),
        u16::try_from(c1.max(c2)).ok()?,
    ))
}

fn build_validation(v: &DataValidation) -> Option<XlsxValidation> {
    let mut dv = XlsxValidation::new();
    dv = match v.validation_type.as_str() {
        "list" => match parse_list_values(&v.formula1) {
            Some(values) => {
                let refs: Vec<&str> = values.iter().map(String::as_str).collect();
                dv.allow_list_strings(&refs).ok()?
            }
            None => dv.allow_list_formula(Formula::new(&v.formula1)),
        },
        "custom" => dv.allow_custom(Formula::new(&v.formula1)),
        "whole" => dv.allow_whole_number_formula(validation_rule(v)?),
        "decimal" => dv.allow_decimal_number_formula(validation_rule(v)?),
        "textLength" => dv.allow_text_length_formula(validation_rule(v)?),
        _ => return None,
    };
    if !v.show_error {
        dv = dv.show_error_message(false);
    }
    if let Some(title) = &v.error_title {
        dv = dv.set_error_title(title).ok()?;
    }
    if let Some(message) = &v.error_message {
        dv = dv.set_error_message(message).ok()?;
    }
    Some(dv)
}

fn validation_rule(v: &DataValidation) -> Option<DataValidationRule<Formula>> {
    let f1 = Formula::new(&v.formula1);
    let f2 = Formula::new(&v.formula2);
    Some(match v.operator.as_str() {
        "" | "between" => DataValidationRule::Between(f1, f2),
        "notBetween" => DataValidationRule::NotBetween(f1, f2),
        "equal" => DataValidationRule::EqualTo(f1),
        "notEqual" => DataValidationRule::NotEqualTo(f1),
        "greaterThan" => DataValidationRule::GreaterThan(f1),
        "lessThan" => DataValidationRule::LessThan(f1),
        "greaterThanOrEqual" => DataValidationRule::GreaterThanOrEqualTo(f1),
        "lessThanOrEqual" => DataValidationRule::LessThanOrEqualTo(f1),
        _ => return None,
    })
}

/// Build a writer format from decoded style details.
fn build_format(style: &StyleDetails) -> Format {
    let mut format = Format::new();

    if let Some(font) = &style.font {
        if font.bold {
            format = format.set_bold();
        }
        if font.italic {
            format = format.set_italic();
        }
        if font.strike {
            format = format.set_font_strikethrough();
        }
        if let Some(underline) = underline(&font.underline) {
            format = format.set_underline(underline);
        }
        if !font.family.is_empty() {
            format = format.set_font_name(&font.family);
        }
        if font.size > 0.0 {
            format = format.set_font_size(font.size);
        }
        if let Some(color) = parse_color(&font.color) {
            format = format.set_font_color(color);
        }
    }

    if let Some(fill) = style.fill.as_ref().filter(|f| f.fill_type == "pattern") {
        let pattern = fill_pattern(fill.pattern);
        let color = fill.color.first().and_then(|c| parse_color(c));
        if let Some(pattern) = pattern {
            format = format.set_pattern(pattern);
        }
        match (pattern, color) {
            (Some(FormatPattern::Solid) | None, Some(color)) => {
                format = format.set_background_color(color);
            }
            (Some(_), Some(color)) => format = format.set_foreground_color(color),
            (_, None) => {}
        }
    }

    for side in &style.border {
        let border = border_style(side.style);
        let color = parse_color(&side.color);
        format = match side.side.as_str() {
            "left" => format.set_border_left(border),
            "right" => format.set_border_right(border),
            "top" => format.set_border_top(border),
            "bottom" => format.set_border_bottom(border),
            "diagonal" => format.set_border_diagonal(border),
            _ => format,
        };
        if let Some(color) = color {
            format = match side.side.as_str() {
                "left" => format.set_border_left_color(color),
                "right" => format.set_border_right_color(color),
                "top" => format.set_border_top_color(color),
                "bottom" => format.set_border_bottom_color(color),
                "diagonal" => format.set_border_diagonal_color(color),
                _ => format,
            };
        }
    }

    if let Some(alignment) = &style.alignment {
        if let Some(align) = horizontal_align(&alignment.horizontal) {
            format = format.set_align(align);
        }
        if let Some(align) = vertical_align(&alignment.vertical) {
            format = format.set_align(align);
        }
        if alignment.wrap_text {
            format = format.set_text_wrap();
        }
        if let Ok(rotation) = i16::try_from(alignment.text_rotation) {
            if rotation != 0 {
                format = format.set_rotation(rotation);
            }
        }
        if let Ok(indent) = u8::try_from(alignment.indent) {
            if indent > 0 {
                format = format.set_indent(indent);
            }
        }
        if alignment.shrink_to_fit {
            format = format.set_shrink();
        }
    }

    // Only built-in ids survive; custom format codes are not part of the model.
    if let Ok(num_fmt) = u8::try_from(style.number_format) {
        if num_fmt > 0 && num_fmt < FIRST_CUSTOM_NUM_FMT {
            format = format.set_num_format_index(num_fmt);
        }
    }

    if let Some(protection) = &style.protection {
        if !protection.locked {
            format = format.set_unlocked();
        }
        if protection.hidden {
            format = format.set_hidden();
        }
    }

    format
}

/// `RRGGBB` or `AARRGGBB` hex into a writer color.
fn parse_color(hex: &str) -> Option<Color> {
    let hex = hex.trim().trim_start_matches('#');
    let rgb = match hex.len() {
        6 => hex,
        8 => hex.get(2..)?,
        _ => return None,
    };
    u32::from_str_radix(rgb, 16).ok().map(Color::RGB)
}

fn underline(name: &str) -> Option<FormatUnderline> {
    match name {
        "single" => Some(FormatUnderline::Single),
        "double" => Some(FormatUnderline::Double),
        "singleAccounting" => Some(FormatUnderline::SingleAccounting),
        "doubleAccounting" => Some(FormatUnderline::DoubleAccounting),
        _ => None,
    }
}

fn fill_pattern(index: u32) -> Option<FormatPattern> {
    Some(match index {
        1 => FormatPattern::Solid,
        2 => FormatPattern::MediumGray,
        3 => FormatPattern::DarkGray,
        4 => FormatPattern::LightGray,
        5 => FormatPattern::DarkHorizontal,
        6 => FormatPattern::DarkVertical,
        7 => FormatPattern::DarkDown,
        8 => FormatPattern::DarkUp,
        9 => FormatPattern::DarkGrid,
        10 => FormatPattern::DarkTrellis,
        11 => FormatPattern::LightHorizontal,
        12 => FormatPattern::LightVertical,
        13 => FormatPattern::LightDown,
        14 => FormatPattern::LightUp,
        15 => FormatPattern::LightGrid,
        16 => FormatPattern::LightTrellis,
        17 => FormatPattern::Gray125,
        18 => FormatPattern::Gray0625,
        _ => return None,
    })
}

fn border_style(index: u32) -> FormatBorder {
    match index {
        1 => FormatBorder::Thin,
        2 => FormatBorder::Medium,
        3 => FormatBorder::Dashed,
        4 => FormatBorder::Dotted,
        5 => FormatBorder::Thick,
        6 => FormatBorder::Double,
        7 => FormatBorder::Hair,
        8 => FormatBorder::MediumDashed,
        9 => FormatBorder::DashDot,
        10 => FormatBorder::MediumDashDot,
        11 => FormatBorder::DashDotDot,
        12 => FormatBorder::MediumDashDotDot,
        13 => FormatBorder::SlantDashDot,
        _ => FormatBorder::None,
    }
}

fn horizontal_align(name: &str) -> Option<FormatAlign> {
    match name {
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "fill" => Some(FormatAlign::Fill),
        "justify" => Some(FormatAlign::Justify),
        "centerContinuous" => Some(FormatAlign::CenterAcross),
        "distributed" => Some(FormatAlign::Distributed),
        _ => None,
    }
}

fn vertical_align(name: &str) -> Option<FormatAlign> {
    match name {
        "top" => Some(FormatAlign::Top),
        "center" => Some(FormatAlign::VerticalCenter),
        "bottom" => Some(FormatAlign::Bottom),
        "justify" => Some(FormatAlign::VerticalJustify),
        "distributed" => Some(FormatAlign::VerticalDistributed),
        _ => None,
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
    use crate::extractor::{Extractor, Options};
    use crate::parser::XlsxSource;
    use crate::types::{
        CellValue, FillStyle, FontStyle, Hyperlink, MergedCell, SheetProtection,
    };
    use std::collections::BTreeMap;
    use test_case::test_case;

    fn cell(address: &str, value: &str) -> CellMetadata {
        CellMetadata {
            address: address.to_string(),
            value: CellValue::from_text(value),
            ..Default::default()
        }
    }

    fn sample() -> Metadata {
        let mut product = cell("A1", "Product");
        product.style_id = 1;
        let mut total = cell("B2", "100");
        total.formula = "SUM(C2:D2)".to_string();
        let mut link = cell("A3", "Docs");
        link.hyperlink = Some(Hyperlink {
            link: "https://example.com/docs".to_string(),
        });

        Metadata {
            filename: "source.xlsx".to_string(),
            properties: DocumentProperties {
                title: "Inventory".to_string(),
                creator: "Ops".to_string(),
                ..Default::default()
            },
            sheets: vec![
                SheetMetadata {
                    index: 0,
                    name: "Sheet1".to_string(),
                    visible: true,
                    merged_cells: vec![MergedCell {
                        start_cell: "D1".to_string(),
                        end_cell: "E2".to_string(),
                        value: "Merged".to_string(),
                    }],
                    data_validations: vec![DataValidation {
                        range: "F1:F5".to_string(),
                        validation_type: "list".to_string(),
                        formula1: "\"a,b,c\"".to_string(),
                        show_error: true,
                        ..Default::default()
                    }],
                    protection: Some(SheetProtection {
                        protected: true,
                        select_locked_cells: true,
                        select_unlocked_cells: true,
                        ..Default::default()
                    }),
                    row_heights: BTreeMap::from([(2, 30.0)]),
                    col_widths: BTreeMap::from([("B".to_string(), 20.0)]),
                    cells: vec![product, total, link],
                    ..Default::default()
                },
                SheetMetadata {
                    index: 1,
                    name: "Hidden".to_string(),
                    visible: false,
                    cells: vec![cell("A1", "secret")],
                    ..Default::default()
                },
            ],
            defined_names: vec![DefinedName {
                name: "Totals".to_string(),
                refers_to: "Sheet1!$B$2".to_string(),
                scope: "Workbook".to_string(),
            }],
            styles: BTreeMap::from([(
                1,
                StyleDetails {
                    font: Some(FontStyle {
                        bold: true,
                        size: 11.0,
                        family: "Calibri".to_string(),
                        ..Default::default()
                    }),
                    fill: Some(FillStyle {
                        fill_type: "pattern".to_string(),
                        pattern: 1,
                        color: vec!["FFFF00".to_string()],
                    }),
                    ..Default::default()
                },
            )]),
            ..Default::default()
        }
    }

    fn rebuild(meta: &Metadata) -> Metadata {
        let mut recreator = Recreator::new(meta, RecreateOptions::default());
        recreator.recreate().unwrap();
        let bytes = recreator.save_to_buffer().unwrap();
        let source = XlsxSource::from_bytes(bytes).unwrap();
        let mut extractor = Extractor::new(source, "clone.xlsx", Options::default());
        extractor.extract().unwrap()
    }

    #[test]
    fn test_round_trip_structure() {
        let back = rebuild(&sample());
        let names: Vec<&str> = back.sheets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Sheet1", "Hidden"]);
        assert!(back.sheets[0].visible);
        assert!(!back.sheets[1].visible);
        assert_eq!(back.properties.title, "Inventory");
        assert_eq!(back.properties.creator, "Ops");
    }

    #[test]
    fn test_round_trip_cells() {
        let back = rebuild(&sample());
        let sheet = &back.sheets[0];
        let a1 = sheet.cells.iter().find(|c| c.address == "A1").unwrap();
        assert_eq!(a1.value.as_str(), "Product");
        let b2 = sheet.cells.iter().find(|c| c.address == "B2").unwrap();
        assert_eq!(b2.formula, "SUM(C2:D2)");
        assert_eq!(b2.value.as_str(), "100");
        let a3 = sheet.cells.iter().find(|c| c.address == "A3").unwrap();
        assert_eq!(a3.hyperlink.as_ref().unwrap().link, "https://example.com/docs");
    }

    #[test]
    fn test_round_trip_layout_and_parts() {
        let back = rebuild(&sample());
        let sheet = &back.sheets[0];
        // the writer stores widths with cell padding added
        let width = sheet.col_widths.get("B").copied().unwrap();
        assert!((20.0..21.0).contains(&width), "width {width}");
        assert_eq!(sheet.row_heights.get(&2), Some(&30.0));
        assert_eq!(sheet.merged_cells.len(), 1);
        assert_eq!(sheet.merged_cells[0].start_cell, "D1");
        assert_eq!(sheet.merged_cells[0].end_cell, "E2");
        assert_eq!(sheet.data_validations.len(), 1);
        assert_eq!(sheet.data_validations[0].validation_type, "list");
        assert_eq!(sheet.data_validations[0].range, "F1:F5");
        assert!(sheet.protection.as_ref().unwrap().protected);
        assert!(back.defined_names.iter().any(|n| n.name == "Totals"));
    }

    #[test]
    fn test_round_trip_style() {
        let back = rebuild(&sample());
        let a1 = back.sheets[0].cells.iter().find(|c| c.address == "A1").unwrap();
        let style = back.styles.get(&a1.style_id).unwrap();
        let font = style.font.as_ref().unwrap();
        assert!(font.bold);
        assert_eq!(font.family, "Calibri");
        let fill = style.fill.as_ref().unwrap();
        assert_eq!(fill.pattern, 1);
        assert!(fill.color.iter().any(|c| c.ends_with("FFFF00")));
    }

    #[test]
    fn test_bad_records_are_skipped() {
        let mut meta = sample();
        meta.sheets[0].cells.push(cell("not-an-address", "x"));
        meta.sheets[0].images.push(ImageMetadata {
            cell: "A1".to_string(),
            file: vec![1, 2, 3].into(),
            extension: ".png".to_string(),
            ..Default::default()
        });
        let expected = rebuild(&sample()).sheets[0].cells.len();
        let back = rebuild(&meta);
        assert_eq!(back.sheets[0].cells.len(), expected);
        assert!(back.sheets[0].images.is_empty());
    }

    #[test]
    fn test_options_disable_parts() {
        let meta = sample();
        let options = RecreateOptions {
            cells: false,
            merged_cells: false,
            ..Default::default()
        };
        let mut recreator = Recreator::new(&meta, options);
        recreator.recreate().unwrap();
        let bytes = recreator.save_to_buffer().unwrap();
        let source = XlsxSource::from_bytes(bytes).unwrap();
        let back = Extractor::new(source, "clone.xlsx", Options::default())
            .extract()
            .unwrap();
        assert!(back.sheets[0].cells.is_empty());
        assert!(back.sheets[0].merged_cells.is_empty());
    }

    #[test]
    fn test_recreate_twice_starts_over() {
        let meta = sample();
        let mut recreator = Recreator::new(&meta, RecreateOptions::default());
        recreator.recreate().unwrap();
        recreator.recreate().unwrap();
        assert!(recreator.save_to_buffer().is_ok());
    }

    #[test_case("https://example.com", "https://example.com")]
    #[test_case("mailto:a@b.c", "mailto:a@b.c")]
    #[test_case("Sheet2!A1", "internal:Sheet2!A1")]
    #[test_case("#Sheet2!A1", "internal:Sheet2!A1")]
    fn test_url_target(link: &str, expected: &str) {
        assert_eq!(url_target(link), expected);
    }

    #[test_case("FF0000", Some(0xFF0000))]
    #[test_case("FFFF0000", Some(0xFF0000))]
    #[test_case("#00ff00", Some(0x00FF00))]
    #[test_case("theme:1", None)]
    #[test_case("", None)]
    fn test_parse_color(hex: &str, expected: Option<u32>) {
        assert_eq!(parse_color(hex), expected.map(Color::RGB));
    }

    #[test]
    fn test_validation_rules() {
        let whole = DataValidation {
            validation_type: "whole".to_string(),
            operator: "greaterThan".to_string(),
            formula1: "10".to_string(),
            ..Default::default()
        };
        assert!(build_validation(&whole).is_some());
        let unknown_op = DataValidation {
            operator: "sideways".to_string(),
            ..whole.clone()
        };
        assert!(build_validation(&unknown_op).is_none());
        let date = DataValidation {
            validation_type: "date".to_string(),
            ..whole
        };
        assert!(build_validation(&date).is_none());
    }
}
