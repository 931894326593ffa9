//! Style deduplication across sheets.

use std::collections::{BTreeMap, HashSet};

use crate::cell_ref::cell_address;
use crate::source::{Style, WorkbookSource};
use crate::types::StyleDetails;

/// Per-run cache of decoded styles.
///
/// Each id is handed to the source at most once. Ids that fail to decode
/// are remembered as attempted and never show up in the result.
#[derive(Debug, Default)]
pub struct StyleCache {
    styles: BTreeMap<u32, StyleDetails>,
    attempted: HashSet<u32>,
}

impl StyleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `id` unless it is 0 or has been seen before.
    pub fn visit<S: WorkbookSource>(&mut self, source: &mut S, id: u32) {
        if id == 0 || !self.attempted.insert(id) {
            return;
        }
        match source.style(id) {
            Ok(style) => {
                self.styles.insert(id, style_details(style));
            }
            Err(e) => tracing::debug!(style_id = id, error = %e, "skipping style"),
        }
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    pub fn into_styles(self) -> BTreeMap<u32, StyleDetails> {
        self.styles
    }
}

/// A fill without colors carries nothing and is dropped.
fn style_details(style: Style) -> StyleDetails {
    StyleDetails {
        font: style.font,
        fill: Some(style.fill).filter(|f| !f.color.is_empty()),
        border: style.border,
        alignment: style.alignment,
        number_format: style.num_fmt,
        protection: style.protection,
    }
}

/// Visit the style of every cell position in every sheet's row grid.
///
/// Sheets whose rows cannot be read are skipped.
pub(super) fn collect_styles<S: WorkbookSource>(
    source: &mut S,
    sheets: &[String],
) -> BTreeMap<u32, StyleDetails> {
    let mut cache = StyleCache::new();

    for sheet in sheets {
        let rows = match source.rows(sheet) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::debug!(sheet = %sheet, error = %e, "skipping styles of sheet");
                continue;
            }
        };
        for (row_idx, row) in rows.iter().enumerate() {
            let row_idx = u32::try_from(row_idx).unwrap_or(u32::MAX);
            for col_idx in 0..row.len() {
                let col_idx = u32::try_from(col_idx).unwrap_or(u32::MAX);
                let addr = cell_address(col_idx, row_idx);
                if let Ok(id) = source.cell_style(sheet, &addr) {
                    cache.visit(source, id);
                }
            }
        }
    }

    tracing::debug!(styles = cache.len(), "collected styles");
    cache.into_styles()
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
    use crate::types::{FillStyle, FontStyle};
    use std::collections::HashMap;

    fn bold() -> Style {
        Style {
            font: Some(FontStyle {
                bold: true,
                ..Default::default()
            }),
            num_fmt: 4,
            ..Default::default()
        }
    }

    #[test]
    fn test_shared_id_decoded_once() {
        let mut sheet = MockSheet::new("S", &[&["a", "b"], &["c"]]);
        sheet.styles = HashMap::from([
            ("A1".to_string(), 2),
            ("B1".to_string(), 2),
            ("A2".to_string(), 2),
        ]);
        let mut source = MockSource {
            sheets: vec![sheet],
            styles: HashMap::from([(2, bold())]),
            ..Default::default()
        };

        let styles = collect_styles(&mut source, &["S".to_string()]);
        assert_eq!(styles.len(), 1);
        assert_eq!(styles[&2].number_format, 4);
        assert_eq!(source.style_calls[&2], 1);
    }

    #[test]
    fn test_zero_and_failing_ids() {
        let mut source = MockSource::default();
        let mut cache = StyleCache::new();
        cache.visit(&mut source, 0);
        cache.visit(&mut source, 9);
        cache.visit(&mut source, 9);
        assert!(cache.is_empty());
        assert!(!source.style_calls.contains_key(&0));
        assert_eq!(source.style_calls[&9], 1);
    }

    #[test]
    fn test_fill_without_colors_dropped() {
        let details = style_details(Style {
            fill: FillStyle {
                fill_type: "pattern".to_string(),
                pattern: 0,
                color: Vec::new(),
            },
            ..Default::default()
        });
        assert!(details.fill.is_none());

        let details = style_details(Style {
            fill: FillStyle {
                fill_type: "pattern".to_string(),
                pattern: 1,
                color: vec!["FFFF00".to_string()],
            },
            ..Default::default()
        });
        assert_eq!(details.fill.unwrap().pattern, 1);
    }

    #[test]
    fn test_broken_sheet_skipped() {
        let mut broken = MockSheet::new("Bad", &[&["x"]]);
        broken.broken = true;
        broken.styles = HashMap::from([("A1".to_string(), 3)]);
        let mut source = MockSource {
            sheets: vec![broken],
            styles: HashMap::from([(3, bold())]),
            ..Default::default()
        };
        assert!(collect_styles(&mut source, &["Bad".to_string()]).is_empty());
    }
}
