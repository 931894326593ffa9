//! Relationship parsing - `.rels` parts, shared strings, and package path helpers.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{BufReader, Read, Seek};
use zip::ZipArchive;

use crate::error::Result;
use crate::xml_helpers::attr_string;

/// One `<Relationship>` from a `.rels` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Relationship {
    pub id: String,
    pub rel_type: String,
    /// Package path for internal targets, raw target for external ones.
    pub target: String,
    pub external: bool,
}

impl Relationship {
    /// Whether the relationship `Type` URI ends with `/{kind}`.
    pub fn is(&self, kind: &str) -> bool {
        self.rel_type
            .rsplit('/')
            .next()
            .is_some_and(|last| last == kind)
    }
}

/// Parse the `.rels` part belonging to `part_path`.
///
/// Internal targets are resolved relative to the owning part's directory.
/// A missing rels part yields an empty list.
pub(crate) fn parse_relationships<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    part_path: &str,
) -> Result<Vec<Relationship>> {
    let part_path = part_path.trim_start_matches('/');
    let rels_path = construct_rels_path(part_path);

    let Ok(file) = archive.by_name(&rels_path) else {
        return Ok(Vec::new()); // Relationships file is optional
    };

    let base_dir = part_path.rsplit_once('/').map_or("", |(dir, _)| dir);

    let reader = BufReader::new(file);
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(true);

    let mut rels = Vec::new();
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Empty(ref e) | Event::Start(ref e) => {
                if e.local_name().as_ref() == b"Relationship" {
                    let id = attr_string(e, b"Id").unwrap_or_default();
                    let target = attr_string(e, b"Target").unwrap_or_default();
                    let rel_type = attr_string(e, b"Type").unwrap_or_default();
                    let external = attr_string(e, b"TargetMode")
                        .is_some_and(|m| m.eq_ignore_ascii_case("External"));

                    if !id.is_empty() && !target.is_empty() {
                        let target = if external {
                            target
                        } else {
                            resolve_relative_path(base_dir, &target)
                        };
                        rels.push(Relationship {
                            id,
                            rel_type,
                            target,
                            external,
                        });
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(rels)
}

/// `rId -> target` map of the relationships of one kind.
pub(crate) fn targets_of(rels: &[Relationship], kind: &str) -> HashMap<String, String> {
    rels.iter()
        .filter(|r| r.is(kind))
        .map(|r| (r.id.clone(), r.target.clone()))
        .collect()
}

/// Parse shared strings from the shared strings part.
///
/// Rich text runs are concatenated; phonetic runs (`<rPh>`) are skipped.
pub(crate) fn parse_shared_strings<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &str,
) -> Result<Vec<String>> {
    let Ok(file) = archive.by_name(path) else {
        return Ok(Vec::new()); // SharedStrings is optional
    };

    let reader = BufReader::new(file);
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(false);

    let mut strings = Vec::new();
    let mut buf = Vec::new();
    let mut current_string = String::new();
    let mut in_si = false;
    let mut in_t = false;
    let mut in_rph = false;

    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = true;
                    current_string.clear();
                }
                b"rPh" => in_rph = true,
                b"t" if in_si && !in_rph => in_t = true,
                _ => {}
            },
            Event::Empty(ref e) => {
                // <si/> is a valid empty string entry
                if e.local_name().as_ref() == b"si" {
                    strings.push(String::new());
                }
            }
            Event::Text(ref e) if in_t => {
                current_string.push_str(&e.unescape()?);
            }
            Event::CData(ref e) if in_t => {
                current_string.push_str(&String::from_utf8_lossy(e));
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"si" => {
                    strings.push(std::mem::take(&mut current_string));
                    in_si = false;
                }
                b"rPh" => in_rph = false,
                b"t" => in_t = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(strings)
}

/// Construct the relationships file path from a part path
/// e.g., "xl/worksheets/sheet1.xml" -> "xl/worksheets/_rels/sheet1.xml.rels"
pub(crate) fn construct_rels_path(part_path: &str) -> String {
    match part_path.rsplit_once('/') {
        Some((dir, filename)) => format!("{dir}/_rels/{filename}.rels"),
        None => format!("_rels/{part_path}.rels"),
    }
}

/// Resolve a relative path against a base directory
///
/// Handles paths like "../media/image1.png" relative to "xl/drawings".
/// Absolute targets ("/xl/styles.xml") are taken from the package root.
pub(crate) fn resolve_relative_path(base_dir: &str, relative: &str) -> String {
    if let Some(stripped) = relative.strip_prefix('/') {
        return stripped.to_string();
    }

    let mut components: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();

    for part in relative.split('/') {
        match part {
            ".." => {
                components.pop();
            }
            "." | "" => {}
            _ => components.push(part),
        }
    }

    components.join("/")
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
        let cursor = zip.finish().unwrap();
        ZipArchive::new(cursor).unwrap()
    }

    #[test]
    fn test_construct_rels_path() {
        assert_eq!(
            construct_rels_path("xl/worksheets/sheet1.xml"),
            "xl/worksheets/_rels/sheet1.xml.rels"
        );
        assert_eq!(construct_rels_path("sheet.xml"), "_rels/sheet.xml.rels");
    }

    #[test]
    fn test_resolve_relative_path() {
        assert_eq!(
            resolve_relative_path("xl/drawings", "../media/image1.png"),
            "xl/media/image1.png"
        );
        assert_eq!(
            resolve_relative_path("xl", "worksheets/sheet1.xml"),
            "xl/worksheets/sheet1.xml"
        );
        assert_eq!(
            resolve_relative_path("xl/drawings", "/xl/media/a.gif"),
            "xl/media/a.gif"
        );
    }

    #[test]
    fn test_parse_relationships_resolves_internal_only() {
        let mut ar = archive(&[(
            "xl/worksheets/_rels/sheet1.xml.rels",
            r#"<Relationships>
                <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com/a?b&amp;c" TargetMode="External"/>
                <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/drawing" Target="../drawings/drawing1.xml"/>
            </Relationships>"#,
        )]);
        let rels = parse_relationships(&mut ar, "xl/worksheets/sheet1.xml").unwrap();
        assert_eq!(rels.len(), 2);
        assert!(rels[0].external);
        assert_eq!(rels[0].target, "https://example.com/a?b&c");
        assert!(rels[1].is("drawing"));
        assert_eq!(rels[1].target, "xl/drawings/drawing1.xml");

        let links = targets_of(&rels, "hyperlink");
        assert_eq!(links.get("rId1").map(String::as_str), Some("https://example.com/a?b&c"));
    }

    #[test]
    fn test_missing_rels_is_empty() {
        let mut ar = archive(&[("xl/workbook.xml", "<workbook/>")]);
        assert!(parse_relationships(&mut ar, "xl/workbook.xml")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_parse_shared_strings_rich_text() {
        let mut ar = archive(&[(
            "xl/sharedStrings.xml",
            r#"<sst><si><t>Plain</t></si><si><r><rPr><b/></rPr><t>Bo</t></r><r><t xml:space="preserve">ld </t></r><rPh><t>x</t></rPh></si><si/></sst>"#,
        )]);
        let strings = parse_shared_strings(&mut ar, "xl/sharedStrings.xml").unwrap();
        assert_eq!(strings, vec!["Plain", "Bold ", ""]);
    }
}
