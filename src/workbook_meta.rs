//! Workbook metadata parsing module
//! This module handles parsing workbook.xml for sheets and defined names,
//! and docProps/core.xml for document properties.

use crate::error::Result;
use crate::parser::relationships::parse_relationships;
use crate::types::{DefinedName, DocumentProperties};
use crate::xml_helpers::{attr_string, attr_string_local, attr_u32, read_element_text};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{BufReader, Read, Seek};
use zip::ZipArchive;

pub const WORKBOOK_PATH: &str = "xl/workbook.xml";
pub const CORE_PROPS_PATH: &str = "docProps/core.xml";

/// Workbook relationships parsed from xl/_rels/workbook.xml.rels
///
/// Paths are resolved relative to the xl/ directory and stored as full paths.
#[derive(Default, Debug)]
pub struct WorkbookRelationships {
    /// Map of rId -> full path for worksheet relationships
    /// e.g., "rId1" -> "xl/worksheets/sheet1.xml"
    pub worksheets: HashMap<String, String>,
    /// Path to shared strings file (e.g., "xl/sharedStrings.xml")
    pub shared_strings: Option<String>,
    /// Path to styles file (e.g., "xl/styles.xml")
    pub styles: Option<String>,
}

/// Sheet entry from workbook.xml
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetInfo {
    pub name: String,
    pub path: String,
    /// `state="hidden"` or `state="veryHidden"`
    pub hidden: bool,
}

/// Workbook metadata parsed from workbook.xml
#[derive(Debug, Default)]
pub struct WorkbookMeta {
    pub sheets: Vec<SheetInfo>,
    pub defined_names: Vec<DefinedName>,
}

/// Scope reported for names without `localSheetId`.
pub const WORKBOOK_SCOPE: &str = "Workbook";

/// Parse workbook relationships (xl/_rels/workbook.xml.rels)
pub fn parse_workbook_relationships<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> Result<WorkbookRelationships> {
    let mut rels = WorkbookRelationships::default();
    for rel in parse_relationships(archive, WORKBOOK_PATH)? {
        if rel.is("worksheet") {
            rels.worksheets.insert(rel.id, rel.target);
        } else if rel.is("sharedStrings") {
            rels.shared_strings = Some(rel.target);
        } else if rel.is("styles") {
            rels.styles = Some(rel.target);
        }
    }
    Ok(rels)
}

/// Parse workbook.xml for sheet info and defined names
///
/// Parses:
/// - `<sheets><sheet name="..." r:id="rId1" state="hidden"/></sheets>`
/// - `<definedNames><definedName name="_xlnm.Print_Area" localSheetId="0">Sheet1!$A$1:$D$10</definedName></definedNames>`
///
/// A defined name's scope is the name of the sheet at `localSheetId`, or
/// [`WORKBOOK_SCOPE`] when the attribute is absent.
pub fn parse_workbook_xml<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    relationships: &HashMap<String, String>,
) -> Result<WorkbookMeta> {
    let file = archive.by_name(WORKBOOK_PATH)?;

    let reader = BufReader::new(file);
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(true);

    let mut sheets = Vec::new();
    // (name, localSheetId, refersTo)
    let mut raw_names: Vec<(String, Option<u32>, String)> = Vec::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) if e.local_name().as_ref() == b"definedName" => {
                let name = attr_string(e, b"name").unwrap_or_default();
                let local_sheet_id = attr_u32(e, b"localSheetId");
                let value = read_element_text(&mut xml, b"definedName");
                if !name.is_empty() {
                    raw_names.push((name, local_sheet_id, value));
                }
            }
            Event::Empty(ref e) | Event::Start(ref e) => match e.local_name().as_ref() {
                b"sheet" => {
                    if let Some(info) = parse_sheet_element(e, relationships, sheets.len()) {
                        sheets.push(info);
                    }
                }
                b"definedName" => {
                    let name = attr_string(e, b"name").unwrap_or_default();
                    if !name.is_empty() {
                        raw_names.push((name, attr_u32(e, b"localSheetId"), String::new()));
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    let defined_names = raw_names
        .into_iter()
        .map(|(name, local_sheet_id, refers_to)| {
            let scope = local_sheet_id
                .and_then(|id| sheets.get(id as usize))
                .map_or_else(|| WORKBOOK_SCOPE.to_string(), |s: &SheetInfo| s.name.clone());
            DefinedName {
                name,
                refers_to,
                scope,
            }
        })
        .collect();

    Ok(WorkbookMeta {
        sheets,
        defined_names,
    })
}

/// Parse a sheet element and return SheetInfo
fn parse_sheet_element(
    e: &BytesStart<'_>,
    relationships: &HashMap<String, String>,
    sheet_index: usize,
) -> Option<SheetInfo> {
    let name = attr_string(e, b"name").filter(|n| !n.is_empty())?;
    let hidden = matches!(
        attr_string(e, b"state").as_deref(),
        Some("hidden" | "veryHidden")
    );
    let r_id = attr_string_local(e, b"id").unwrap_or_default();

    // Try to get path from relationships, fallback to default
    let path = relationships.get(&r_id).cloned().unwrap_or_else(|| {
        let idx = sheet_index + 1;
        format!("xl/worksheets/sheet{idx}.xml")
    });

    Some(SheetInfo { name, path, hidden })
}

/// Parse docProps/core.xml.
///
/// A package without the part has empty properties; malformed XML is an error.
pub fn parse_core_properties<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> Result<DocumentProperties> {
    let mut props = DocumentProperties::default();
    let Ok(file) = archive.by_name(CORE_PROPS_PATH) else {
        return Ok(props);
    };

    let reader = BufReader::new(file);
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(true);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let field = match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"title" => Some(&mut props.title),
                b"subject" => Some(&mut props.subject),
                b"creator" => Some(&mut props.creator),
                b"keywords" => Some(&mut props.keywords),
                b"description" => Some(&mut props.description),
                b"lastModifiedBy" => Some(&mut props.last_modified_by),
                b"category" => Some(&mut props.category),
                b"version" => Some(&mut props.version),
                b"created" => Some(&mut props.created),
                b"modified" => Some(&mut props.modified),
                _ => None,
            }
            .map(|slot| (slot, e.local_name().as_ref().to_vec())),
            Event::Eof => break,
            _ => None,
        };
        if let Some((slot, end)) = field {
            *slot = read_element_text(&mut xml, &end);
        }
    }

    Ok(props)
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
    use std::io::{Cursor, Write};
    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn archive(files: &[(&str, &str)]) -> ZipArchive<Cursor<Vec<u8>>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in files {
            zip.start_file(*name, FileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        ZipArchive::new(zip.finish().unwrap()).unwrap()
    }

    const WORKBOOK: &str = r#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets>
    <sheet name="Data" sheetId="1" r:id="rId2"/>
    <sheet name="Secret" sheetId="2" state="veryHidden" r:id="rId1"/>
  </sheets>
  <definedNames>
    <definedName name="SalesRange">Data!$A$1:$B$10</definedName>
    <definedName name="_xlnm.Print_Area" localSheetId="1">Secret!$A$1:$C$3</definedName>
    <definedName name="Rate" localSheetId="9">0.0825</definedName>
  </definedNames>
</workbook>"#;

    #[test]
    fn test_parse_workbook_xml() {
        let mut ar = archive(&[("xl/workbook.xml", WORKBOOK)]);
        let mut rels = HashMap::new();
        rels.insert("rId2".to_string(), "xl/worksheets/data.xml".to_string());

        let meta = parse_workbook_xml(&mut ar, &rels).unwrap();
        assert_eq!(meta.sheets.len(), 2);
        assert_eq!(meta.sheets[0].path, "xl/worksheets/data.xml");
        assert!(!meta.sheets[0].hidden);
        assert!(meta.sheets[1].hidden);
        // rId1 is missing from rels: positional fallback
        assert_eq!(meta.sheets[1].path, "xl/worksheets/sheet2.xml");

        assert_eq!(
            meta.defined_names[0],
            DefinedName {
                name: "SalesRange".to_string(),
                refers_to: "Data!$A$1:$B$10".to_string(),
                scope: "Workbook".to_string(),
            }
        );
        assert_eq!(meta.defined_names[1].scope, "Secret");
        // Out-of-range localSheetId falls back to workbook scope
        assert_eq!(meta.defined_names[2].scope, "Workbook");
    }

    #[test]
    fn test_parse_workbook_relationships() {
        let mut ar = archive(&[(
            "xl/_rels/workbook.xml.rels",
            r#"<Relationships>
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="/xl/styles.xml"/>
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>
</Relationships>"#,
        )]);
        let rels = parse_workbook_relationships(&mut ar).unwrap();
        assert_eq!(
            rels.worksheets.get("rId1").map(String::as_str),
            Some("xl/worksheets/sheet1.xml")
        );
        assert_eq!(rels.styles.as_deref(), Some("xl/styles.xml"));
        assert_eq!(rels.shared_strings.as_deref(), Some("xl/sharedStrings.xml"));
    }

    #[test]
    fn test_parse_core_properties() {
        let mut ar = archive(&[(
            "docProps/core.xml",
            r#"<cp:coreProperties xmlns:cp="cp" xmlns:dc="dc" xmlns:dcterms="dcterms">
  <dc:title>Quarterly &amp; Annual</dc:title>
  <dc:creator>Finance</dc:creator>
  <cp:lastModifiedBy>Audit</cp:lastModifiedBy>
  <dcterms:created xsi:type="dcterms:W3CDTF">2024-01-02T03:04:05Z</dcterms:created>
</cp:coreProperties>"#,
        )]);
        let props = parse_core_properties(&mut ar).unwrap();
        assert_eq!(props.title, "Quarterly & Annual");
        assert_eq!(props.creator, "Finance");
        assert_eq!(props.last_modified_by, "Audit");
        assert_eq!(props.created, "2024-01-02T03:04:05Z");
        assert!(props.subject.is_empty());
    }

    #[test]
    fn test_missing_core_properties_is_empty() {
        let mut ar = archive(&[("xl/workbook.xml", "<workbook/>")]);
        assert_eq!(
            parse_core_properties(&mut ar).unwrap(),
            DocumentProperties::default()
        );
    }
}
