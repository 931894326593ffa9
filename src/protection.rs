//! Cell and sheet protection parsing module
//! This module handles parsing of protection settings from XLSX files.

use quick_xml::events::BytesStart;

use crate::types::{Protection, SheetProtection};
use crate::xml_helpers::{attr_bool, attr_string};

/// Parse the `<protection>` child of an `<xf>` element.
///
/// Excel defaults are locked=true, hidden=false.
///
/// # Example XML
/// ```xml
/// <protection locked="0" hidden="1"/>
/// ```
pub fn parse_cell_protection(e: &BytesStart) -> Protection {
    Protection {
        locked: attr_bool(e, b"locked").unwrap_or(true),
        hidden: attr_bool(e, b"hidden").unwrap_or(false),
    }
}

/// Parse a `<sheetProtection>` element.
///
/// In the XML a `1` on `objects`, `scenarios`, `selectLockedCells` or
/// `selectUnlockedCells` means the action is PREVENTED. The model stores
/// permissions, so those flags are inverted here.
///
/// # Example XML
/// ```xml
/// <sheetProtection sheet="1" objects="1" scenarios="1"
///     selectLockedCells="1" password="CC1A"/>
/// ```
pub fn parse_sheet_protection(e: &BytesStart) -> SheetProtection {
    let locked = |key: &[u8]| attr_bool(e, key).unwrap_or(false);

    // The modern SHA-512 hash wins over the legacy 2-byte password hash
    let password = attr_string(e, b"hashValue")
        .filter(|s| !s.is_empty())
        .or_else(|| attr_string(e, b"password"))
        .unwrap_or_default();

    SheetProtection {
        protected: locked(b"sheet"),
        password,
        edit_objects: !locked(b"objects"),
        edit_scenarios: !locked(b"scenarios"),
        select_locked_cells: !locked(b"selectLockedCells"),
        select_unlocked_cells: !locked(b"selectUnlockedCells"),
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

    fn make_start(content: &str) -> BytesStart<'_> {
        BytesStart::from_content(content, content.find(' ').unwrap_or(content.len()))
    }

    #[test]
    fn test_cell_protection_defaults() {
        let p = parse_cell_protection(&make_start("protection"));
        assert!(p.locked);
        assert!(!p.hidden);
    }

    #[test]
    fn test_cell_protection_unlocked_hidden() {
        let p = parse_cell_protection(&make_start(r#"protection locked="0" hidden="1""#));
        assert!(!p.locked);
        assert!(p.hidden);
    }

    #[test]
    fn test_sheet_protection_inverts_lock_flags() {
        let p = parse_sheet_protection(&make_start(
            r#"sheetProtection sheet="1" objects="1" scenarios="0" selectLockedCells="1" password="CC1A""#,
        ));
        assert!(p.protected);
        assert_eq!(p.password, "CC1A");
        assert!(!p.edit_objects);
        assert!(p.edit_scenarios);
        assert!(!p.select_locked_cells);
        assert!(p.select_unlocked_cells);
    }

    #[test]
    fn test_sheet_protection_prefers_hash_value() {
        let p = parse_sheet_protection(&make_start(
            r#"sheetProtection sheet="1" password="CC1A" hashValue="abc==""#,
        ));
        assert_eq!(p.password, "abc==");
    }
}
