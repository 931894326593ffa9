//! Generated by xlsxmeta. Rebuilds the workbook from its extracted metadata.

use std::collections::BTreeMap;

use chrono::prelude::*;
use xlsxmeta::recreate::{RecreateOptions, Recreator};
use xlsxmeta::types::*;

/// The extracted workbook.
pub fn metadata() -> Result<Metadata, Box<dyn std::error::Error>> {
    Ok(Metadata {
        filename: String::from("fixture.xlsx"),
        properties: DocumentProperties {
            title: String::from("Ledger"),
            subject: String::from(""),
            creator: String::from("Accounts"),
            keywords: String::from(""),
            description: String::from(""),
            last_modified_by: String::from(""),
            category: String::from(""),
            version: String::from(""),
            created: String::from(""),
            modified: String::from(""),
        },
        sheets: vec![
            SheetMetadata {
                index: 0,
                name: String::from("Ledger"),
                visible: true,
                dimensions: SheetDimensions {
                    start_cell: String::from("A1"),
                    end_cell: String::from("C3"),
                    row_count: 3,
                    col_count: 3,
                },
                merged_cells: vec![
                    MergedCell {
                        start_cell: String::from("A3"),
                        end_cell: String::from("B3"),
                        value: String::from("Total"),
                    },
                ],
                data_validations: vec![
                    DataValidation {
                        range: String::from("C2:C9"),
                        validation_type: String::from("list"),
                        operator: String::from(""),
                        formula1: String::from("\"x,y\""),
                        formula2: String::from(""),
                        show_error: true,
                        error_title: None,
                        error_message: None,
                    },
                ],
                protection: Some(SheetProtection {
                    protected: true,
                    password: String::from(""),
                    edit_objects: true,
                    edit_scenarios: true,
                    select_locked_cells: true,
                    select_unlocked_cells: true,
                }),
                row_heights: BTreeMap::from([
                    (2, 22.5),
                ]),
                col_widths: BTreeMap::from([
                    (String::from("A"), 25.0),
                ]),
                cells: vec![
                    CellMetadata {
                        address: String::from("A1"),
                        value: CellValue::Text(String::from("Item")),
                        formula: String::from(""),
                        style_id: 1,
                        cell_type: CellType::SharedString,
                        hyperlink: None,
                    },
                    CellMetadata {
                        address: String::from("B1"),
                        value: CellValue::Text(String::from("42")),
                        formula: String::from(""),
                        style_id: 0,
                        cell_type: CellType::Unset,
                        hyperlink: None,
                    },
                    CellMetadata {
                        address: String::from("C1"),
                        value: CellValue::Text(String::from("84")),
                        formula: String::from("B1*2"),
                        style_id: 0,
                        cell_type: CellType::Unset,
                        hyperlink: None,
                    },
                    CellMetadata {
                        address: String::from("A2"),
                        value: CellValue::Text(String::from("docs")),
                        formula: String::from(""),
                        style_id: 0,
                        cell_type: CellType::SharedString,
                        hyperlink: Some(Hyperlink {
                            link: String::from("https://example.com"),
                        }),
                    },
                    CellMetadata {
                        address: String::from("A3"),
                        value: CellValue::Text(String::from("Total")),
                        formula: String::from(""),
                        style_id: 0,
                        cell_type: CellType::SharedString,
                        hyperlink: None,
                    },
                ],
                images: vec![
                    ImageMetadata {
                        cell: String::from("D5"),
                        file: Bytes(vec![
                            0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44, 0x52,
                            0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x02, 0x08, 0x06, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
                            0x00, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
                        ]),
                        extension: String::from(".png"),
                        insert_type: 0,
                        format: Some(ImageFormat {
                            alt_text: String::from("dot"),
                            print_object: Some(true),
                            locked: Some(true),
                            lock_aspect_ratio: true,
                            auto_fit: false,
                            auto_fit_ignore_aspect: false,
                            offset_x: 0,
                            offset_y: 0,
                            scale_x: 1.0,
                            scale_y: 1.0,
                            hyperlink: String::from(""),
                            hyperlink_type: String::from(""),
                            positioning: String::from("oneCell"),
                        }),
                    },
                ],
            },
            SheetMetadata {
                index: 1,
                name: String::from("Notes"),
                visible: false,
                dimensions: SheetDimensions {
                    start_cell: String::from("A1"),
                    end_cell: String::from("A1"),
                    row_count: 1,
                    col_count: 1,
                },
                merged_cells: Vec::new(),
                data_validations: Vec::new(),
                protection: None,
                row_heights: BTreeMap::new(),
                col_widths: BTreeMap::new(),
                cells: vec![
                    CellMetadata {
                        address: String::from("A1"),
                        value: CellValue::Text(String::from("draft")),
                        formula: String::from(""),
                        style_id: 0,
                        cell_type: CellType::SharedString,
                        hyperlink: None,
                    },
                ],
                images: Vec::new(),
            },
        ],
        defined_names: vec![
            DefinedName {
                name: String::from("Total"),
                refers_to: String::from("Ledger!$C$1"),
                scope: String::from("Workbook"),
            },
        ],
        styles: BTreeMap::from([
            (1, StyleDetails {
                font: Some(FontStyle {
                    bold: true,
                    italic: false,
                    underline: String::from(""),
                    strike: false,
                    family: String::from("Calibri"),
                    size: 11.0,
                    color: String::from(""),
                }),
                fill: None,
                border: Vec::new(),
                alignment: None,
                number_format: 0,
                protection: None,
            }),
        ]),
        extracted_at: Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).single().and_then(|t| t.with_nanosecond(0)).ok_or("invalid timestamp")?,
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let metadata = metadata()?;
    let mut recreator = Recreator::new(&metadata, RecreateOptions::default());
    recreator.recreate()?;
    recreator.save("sample.clone.xlsx")?;

    Ok(())
}
