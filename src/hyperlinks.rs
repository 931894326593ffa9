//! Hyperlink parsing module
//! This module handles parsing of `<hyperlink>` elements and resolving
//! their targets through the sheet relationships.

use std::collections::HashMap;

use quick_xml::events::BytesStart;

use crate::cell_ref::range_contains;
use crate::xml_helpers::{attr_string, attr_string_local};

/// Hyperlink as written in the sheet XML.
///
/// External links carry an `r:id` that still needs resolving via the
/// sheet rels; internal links carry a `location`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHyperlink {
    /// Cell or range reference (e.g., "A1" or "A1:B2")
    pub cell_ref: String,
    pub r_id: Option<String>,
    /// Internal location (e.g., "Sheet2!A1")
    pub location: Option<String>,
}

/// A hyperlink with its final target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedHyperlink {
    pub cell_ref: String,
    pub target: String,
    pub is_external: bool,
}

/// Parse a single `<hyperlink>` element. Returns `None` without a `ref`.
pub fn parse_hyperlink_element(e: &BytesStart<'_>) -> Option<RawHyperlink> {
    let cell_ref = attr_string(e, b"ref").filter(|s| !s.is_empty())?;
    Some(RawHyperlink {
        cell_ref,
        r_id: attr_string_local(e, b"id").filter(|s| !s.is_empty()),
        location: attr_string(e, b"location").filter(|s| !s.is_empty()),
    })
}

/// Resolve raw hyperlinks against the sheet's `rId -> target` hyperlink rels.
///
/// An `r:id` missing from the rels falls back to the location; links with
/// neither are dropped.
pub fn resolve_hyperlinks(
    raw_hyperlinks: &[RawHyperlink],
    rels: &HashMap<String, String>,
) -> Vec<ResolvedHyperlink> {
    raw_hyperlinks
        .iter()
        .filter_map(|raw| {
            let external = raw.r_id.as_ref().and_then(|id| rels.get(id));
            let (target, is_external) = match (external, raw.location.as_ref()) {
                (Some(url), _) => (url.clone(), true),
                (None, Some(loc)) => (loc.clone(), false),
                (None, None) => return None,
            };
            Some(ResolvedHyperlink {
                cell_ref: raw.cell_ref.clone(),
                target,
                is_external,
            })
        })
        .collect()
}

/// First hyperlink whose `ref` covers the 0-indexed (col, row).
pub fn hyperlink_at(links: &[ResolvedHyperlink], col: u32, row: u32) -> Option<&ResolvedHyperlink> {
    links.iter().find(|l| range_contains(&l.cell_ref, col, row))
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
    use quick_xml::events::Event;
    use quick_xml::Reader;

    fn parse_all(xml_data: &str) -> Vec<RawHyperlink> {
        let mut reader = Reader::from_str(xml_data);
        reader.trim_text(true);
        let mut out = Vec::new();
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e) | Event::Start(ref e))
                    if e.local_name().as_ref() == b"hyperlink" =>
                {
                    out.extend(parse_hyperlink_element(e));
                }
                Ok(Event::Eof) | Err(_) => break,
                _ => {}
            }
            buf.clear();
        }
        out
    }

    #[test]
    fn test_parse_hyperlinks_xml() {
        let hyperlinks = parse_all(
            r#"<worksheet><hyperlinks>
                <hyperlink ref="A1" r:id="rId1" display="Click here"/>
                <hyperlink ref="B2" location="Sheet2!A1"/>
                <hyperlink location="nowhere"/>
            </hyperlinks></worksheet>"#,
        );

        assert_eq!(hyperlinks.len(), 2);
        assert_eq!(hyperlinks[0].cell_ref, "A1");
        assert_eq!(hyperlinks[0].r_id.as_deref(), Some("rId1"));
        assert_eq!(hyperlinks[1].cell_ref, "B2");
        assert!(hyperlinks[1].r_id.is_none());
        assert_eq!(hyperlinks[1].location.as_deref(), Some("Sheet2!A1"));
    }

    #[test]
    fn test_resolve_hyperlinks() {
        let raw = vec![
            RawHyperlink {
                cell_ref: "A1".to_string(),
                r_id: Some("rId1".to_string()),
                location: None,
            },
            RawHyperlink {
                cell_ref: "B2".to_string(),
                r_id: None,
                location: Some("Sheet2!A1".to_string()),
            },
            RawHyperlink {
                cell_ref: "C3".to_string(),
                r_id: Some("rId999".to_string()),
                location: None,
            },
        ];
        let mut rels = HashMap::new();
        rels.insert("rId1".to_string(), "https://example.com".to_string());

        let resolved = resolve_hyperlinks(&raw, &rels);

        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].target, "https://example.com");
        assert!(resolved[0].is_external);
        assert_eq!(resolved[1].target, "Sheet2!A1");
        assert!(!resolved[1].is_external);
    }

    #[test]
    fn test_hyperlink_at_range() {
        let links = vec![ResolvedHyperlink {
            cell_ref: "A1:B2".to_string(),
            target: "https://example.com".to_string(),
            is_external: true,
        }];
        assert!(hyperlink_at(&links, 1, 1).is_some());
        assert!(hyperlink_at(&links, 2, 0).is_none());
    }
}
