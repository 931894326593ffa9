//! Image collector.

use crate::source::WorkbookSource;
use crate::types::{Bytes, ImageMetadata};

/// Resolve every picture anchored in `sheet`, in anchor-cell order.
///
/// A failing address is skipped; if the anchor list itself cannot be read
/// the sheet has no images.
pub(super) fn collect_images<S: WorkbookSource>(source: &mut S, sheet: &str) -> Vec<ImageMetadata> {
    let cells = match source.picture_cells(sheet) {
        Ok(cells) => cells,
        Err(e) => {
            tracing::debug!(sheet, error = %e, "cannot list picture cells");
            return Vec::new();
        }
    };

    let mut images = Vec::new();
    for cell in cells {
        let pictures = match source.pictures(sheet, &cell) {
            Ok(pictures) => pictures,
            Err(e) => {
                tracing::debug!(sheet, cell = %cell, error = %e, "skipping pictures");
                continue;
            }
        };
        images.extend(pictures.into_iter().map(|p| ImageMetadata {
            cell: cell.clone(),
            file: Bytes(p.file),
            extension: p.extension,
            insert_type: p.insert_type,
            format: p.format,
        }));
    }
    images
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
    use crate::extractor::mock::{MockSheet, MockSource};
    use crate::source::Picture;
    use crate::types::ImageFormat;

    fn picture(byte: u8) -> Picture {
        Picture {
            file: vec![byte; 4],
            extension: ".png".to_string(),
            insert_type: 0,
            format: Some(ImageFormat {
                alt_text: format!("pic {byte}"),
                scale_x: 1.0,
                scale_y: 1.0,
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_multiple_pictures_per_cell() {
        let mut sheet = MockSheet::new("S", &[]);
        sheet.pictures = vec![
            ("B2".to_string(), picture(1)),
            ("D4".to_string(), picture(2)),
            ("B2".to_string(), picture(3)),
        ];
        let mut source = MockSource {
            sheets: vec![sheet],
            ..Default::default()
        };

        let images = collect_images(&mut source, "S");
        let cells: Vec<&str> = images.iter().map(|i| i.cell.as_str()).collect();
        assert_eq!(cells, vec!["B2", "B2", "D4"]);
        assert_eq!(images[1].file.as_slice(), &[3, 3, 3, 3]);
        assert_eq!(images[0].extension, ".png");
        assert_eq!(images[2].format.as_ref().unwrap().alt_text, "pic 2");
    }

    #[test]
    fn test_failing_address_skipped() {
        let mut sheet = MockSheet::new("S", &[]);
        sheet.pictures = vec![("A1".to_string(), picture(1)), ("C3".to_string(), picture(2))];
        sheet.broken_pictures = vec!["A1".to_string()];
        let mut source = MockSource {
            sheets: vec![sheet],
            ..Default::default()
        };

        let images = collect_images(&mut source, "S");
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].cell, "C3");
    }

    #[test]
    fn test_unknown_sheet_has_no_images() {
        let mut source = MockSource::default();
        assert!(collect_images(&mut source, "Nope").is_empty());
    }
}
