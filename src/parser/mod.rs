//! Main XLSX parser
//!
//! [`XlsxSource`] opens the ZIP package, reads the workbook-level parts up
//! front and parses each worksheet the first time it is queried.

pub(crate) mod relationships;
pub(crate) mod styles;
mod worksheet;

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

use zip::ZipArchive;

use crate::cell_ref::{cell_address, column_index, parse_cell_ref};
use crate::drawings::parse_drawing_pictures;
use crate::error::{Result, XlsxMetaError};
use crate::hyperlinks::{hyperlink_at, resolve_hyperlinks};
use crate::source::{Picture, Style, WorkbookSource};
use crate::styles::{parse_styles, StyleSheet};
use crate::types::{
    CellType, DataValidation, DefinedName, DocumentProperties, MergedCell, SheetProtection,
};
use crate::workbook_meta::{
    parse_core_properties, parse_workbook_relationships, parse_workbook_xml, SheetInfo,
    WorkbookMeta,
};

use relationships::{parse_relationships, parse_shared_strings, targets_of};
use styles::decode_style;
use worksheet::{parse_sheet, ParsedCell, ParsedSheet};

const DEFAULT_SHARED_STRINGS_PATH: &str = "xl/sharedStrings.xml";
const DEFAULT_STYLES_PATH: &str = "xl/styles.xml";

/// A [`WorkbookSource`] over an XLSX package.
///
/// Workbook structure, shared strings and the stylesheet are read on open.
/// Worksheets are parsed lazily and cached for the lifetime of the source.
pub struct XlsxSource<R: Read + Seek> {
    archive: Option<ZipArchive<R>>,
    meta: WorkbookMeta,
    shared_strings: Vec<String>,
    stylesheet: StyleSheet,
    sheets: HashMap<String, ParsedSheet>,
}

impl XlsxSource<BufReader<File>> {
    /// Open a workbook on disk. Any failure is reported as
    /// [`XlsxMetaError::Open`] carrying the path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| XlsxMetaError::open(path, e.into()))?;
        Self::from_reader(BufReader::new(file)).map_err(|e| XlsxMetaError::open(path, e))
    }
}

impl XlsxSource<Cursor<Vec<u8>>> {
    /// Open a workbook held in memory.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::from_reader(Cursor::new(data))
    }
}

impl<R: Read + Seek> XlsxSource<R> {
    pub fn from_reader(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;

        let rels = parse_workbook_relationships(&mut archive)?;
        let meta = parse_workbook_xml(&mut archive, &rels.worksheets)?;

        let sst_path = rels
            .shared_strings
            .as_deref()
            .unwrap_or(DEFAULT_SHARED_STRINGS_PATH);
        let shared_strings = parse_shared_strings(&mut archive, sst_path)?;

        let styles_path = rels.styles.as_deref().unwrap_or(DEFAULT_STYLES_PATH);
        let stylesheet = match archive.by_name(styles_path) {
            Ok(file) => parse_styles(BufReader::new(file))?,
            Err(_) => StyleSheet::default(),
        };

        tracing::debug!(
            sheets = meta.sheets.len(),
            shared_strings = shared_strings.len(),
            cell_xfs = stylesheet.cell_xfs.len(),
            "opened workbook"
        );

        Ok(Self {
            archive: Some(archive),
            meta,
            shared_strings,
            stylesheet,
            sheets: HashMap::new(),
        })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.archive.is_some() {
            Ok(())
        } else {
            Err(XlsxMetaError::Closed)
        }
    }

    fn sheet_info(&self, name: &str) -> Result<&SheetInfo> {
        self.meta
            .sheets
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| XlsxMetaError::SheetNotFound(name.to_string()))
    }

    /// Parsed worksheet, loading it on first use.
    fn sheet(&mut self, name: &str) -> Result<&ParsedSheet> {
        self.ensure_open()?;
        if !self.sheets.contains_key(name) {
            let parsed = self.load_sheet(name)?;
            self.sheets.insert(name.to_string(), parsed);
        }
        self.sheets
            .get(name)
            .ok_or_else(|| XlsxMetaError::SheetNotFound(name.to_string()))
    }

    fn load_sheet(&mut self, name: &str) -> Result<ParsedSheet> {
        let path = self.sheet_info(name)?.path.clone();
        let archive = self.archive.as_mut().ok_or(XlsxMetaError::Closed)?;

        let mut parsed = {
            let file = archive.by_name(&path)?;
            parse_sheet(BufReader::new(file), &self.shared_strings)?
        };

        let rels = parse_relationships(archive, &path)?;
        parsed.hyperlinks = resolve_hyperlinks(&parsed.raw_hyperlinks, &targets_of(&rels, "hyperlink"));

        let drawing = parsed
            .drawing_id
            .as_ref()
            .and_then(|id| rels.iter().find(|r| &r.id == id && r.is("drawing")));
        if let Some(drawing) = drawing {
            match parse_drawing_pictures(archive, &drawing.target) {
                Ok(pictures) => parsed.pictures = pictures,
                Err(e) => {
                    tracing::debug!(sheet = %name, drawing = %drawing.target, error = %e, "skipping drawing");
                }
            }
        }

        tracing::debug!(
            sheet = %name,
            cells = parsed.cells.len(),
            pictures = parsed.pictures.len(),
            "parsed worksheet"
        );
        Ok(parsed)
    }

    fn cell(&mut self, sheet: &str, addr: &str) -> Result<Option<&ParsedCell>> {
        let pos = cell_position(addr)?;
        Ok(self.sheet(sheet)?.cells.get(&pos))
    }
}

fn cell_position(addr: &str) -> Result<(u32, u32)> {
    parse_cell_ref(addr).ok_or_else(|| XlsxMetaError::CellRef(addr.to_string()))
}

impl<R: Read + Seek> WorkbookSource for XlsxSource<R> {
    fn sheet_list(&mut self) -> Result<Vec<String>> {
        self.ensure_open()?;
        Ok(self.meta.sheets.iter().map(|s| s.name.clone()).collect())
    }

    fn doc_props(&mut self) -> Result<DocumentProperties> {
        let archive = self.archive.as_mut().ok_or(XlsxMetaError::Closed)?;
        parse_core_properties(archive)
    }

    fn defined_names(&mut self) -> Result<Vec<DefinedName>> {
        self.ensure_open()?;
        Ok(self.meta.defined_names.clone())
    }

    fn sheet_visible(&mut self, sheet: &str) -> Result<bool> {
        self.ensure_open()?;
        Ok(!self.sheet_info(sheet)?.hidden)
    }

    fn rows(&mut self, sheet: &str) -> Result<Vec<Vec<String>>> {
        Ok(self.sheet(sheet)?.rows.clone())
    }

    fn merge_cells(&mut self, sheet: &str) -> Result<Vec<MergedCell>> {
        Ok(self.sheet(sheet)?.merged_cells())
    }

    fn data_validations(&mut self, sheet: &str) -> Result<Vec<DataValidation>> {
        Ok(self.sheet(sheet)?.data_validations.clone())
    }

    fn sheet_protection(&mut self, sheet: &str) -> Result<Option<SheetProtection>> {
        Ok(self.sheet(sheet)?.protection.clone())
    }

    fn col_width(&mut self, sheet: &str, col: &str) -> Result<f64> {
        let idx = column_index(col).ok_or_else(|| XlsxMetaError::CellRef(col.to_string()))?;
        Ok(self.sheet(sheet)?.col_width(idx))
    }

    fn row_heights(&mut self, sheet: &str) -> Result<BTreeMap<u32, f64>> {
        Ok(self.sheet(sheet)?.row_height_overrides())
    }

    fn cell_formula(&mut self, sheet: &str, addr: &str) -> Result<String> {
        Ok(self
            .cell(sheet, addr)?
            .map(|c| c.formula.clone())
            .unwrap_or_default())
    }

    fn cell_style(&mut self, sheet: &str, addr: &str) -> Result<u32> {
        Ok(self.cell(sheet, addr)?.map_or(0, |c| c.style))
    }

    fn cell_type(&mut self, sheet: &str, addr: &str) -> Result<CellType> {
        Ok(self.cell(sheet, addr)?.map_or(CellType::Unset, |c| c.cell_type))
    }

    fn cell_hyperlink(&mut self, sheet: &str, addr: &str) -> Result<Option<String>> {
        let (col, row) = cell_position(addr)?;
        let parsed = self.sheet(sheet)?;
        Ok(hyperlink_at(&parsed.hyperlinks, col, row).map(|l| l.target.clone()))
    }

    fn picture_cells(&mut self, sheet: &str) -> Result<Vec<String>> {
        let mut cells: Vec<String> = Vec::new();
        for anchored in &self.sheet(sheet)?.pictures {
            if !cells.contains(&anchored.cell) {
                cells.push(anchored.cell.clone());
            }
        }
        Ok(cells)
    }

    fn pictures(&mut self, sheet: &str, addr: &str) -> Result<Vec<Picture>> {
        let (col, row) = cell_position(addr)?;
        let normalized = cell_address(col, row);
        Ok(self
            .sheet(sheet)?
            .pictures
            .iter()
            .filter(|p| p.cell == normalized)
            .map(|p| p.picture.clone())
            .collect())
    }

    fn style(&mut self, id: u32) -> Result<Style> {
        self.ensure_open()?;
        decode_style(&self.stylesheet, id)
    }

    fn close(&mut self) -> Result<()> {
        self.archive = None;
        self.sheets.clear();
        Ok(())
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
    use std::io::Write;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn package(files: &[(&str, &str)]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in files {
            zip.start_file(*name, FileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    fn workbook() -> Vec<u8> {
        package(&[
            (
                "xl/workbook.xml",
                r#"<workbook xmlns:r="r"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/><sheet name="Hidden" sheetId="2" state="hidden" r:id="rId2"/></sheets></workbook>"#,
            ),
            (
                "xl/_rels/workbook.xml.rels",
                r#"<Relationships>
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/>
<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>
</Relationships>"#,
            ),
            (
                "xl/sharedStrings.xml",
                r#"<sst><si><t>Product</t></si></sst>"#,
            ),
            (
                "xl/worksheets/sheet1.xml",
                r#"<worksheet xmlns:r="r"><sheetData><row r="1"><c r="A1" t="s"><v>0</v></c></row><row r="2"><c r="B2" s="2"><f>SUM(C2:D2)</f><v>100</v></c></row></sheetData><hyperlinks><hyperlink ref="A1" r:id="rId1"/></hyperlinks></worksheet>"#,
            ),
            (
                "xl/worksheets/_rels/sheet1.xml.rels",
                r#"<Relationships><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com/" TargetMode="External"/></Relationships>"#,
            ),
            ("xl/worksheets/sheet2.xml", "<worksheet><sheetData/></worksheet>"),
        ])
    }

    #[test]
    fn test_source_queries() {
        let mut source = XlsxSource::from_bytes(workbook()).unwrap();
        assert_eq!(source.sheet_list().unwrap(), vec!["Sheet1", "Hidden"]);
        assert!(source.sheet_visible("Sheet1").unwrap());
        assert!(!source.sheet_visible("Hidden").unwrap());
        assert_eq!(
            source.rows("Sheet1").unwrap(),
            vec![
                vec!["Product".to_string()],
                vec![String::new(), "100".to_string()]
            ]
        );
        assert_eq!(source.cell_formula("Sheet1", "B2").unwrap(), "SUM(C2:D2)");
        assert_eq!(source.cell_style("Sheet1", "B2").unwrap(), 2);
        assert_eq!(source.cell_style("Sheet1", "Z9").unwrap(), 0);
        assert_eq!(source.cell_type("Sheet1", "A1").unwrap(), CellType::SharedString);
        assert_eq!(
            source.cell_hyperlink("Sheet1", "A1").unwrap().as_deref(),
            Some("https://example.com/")
        );
        assert_eq!(source.cell_hyperlink("Sheet1", "B2").unwrap(), None);
        assert!(source.rows("Hidden").unwrap().is_empty());
        assert_eq!(source.col_width("Sheet1", "C").unwrap(), 9.140625);
    }

    #[test]
    fn test_unknown_sheet() {
        let mut source = XlsxSource::from_bytes(workbook()).unwrap();
        assert!(matches!(
            source.rows("Nope"),
            Err(XlsxMetaError::SheetNotFound(name)) if name == "Nope"
        ));
    }

    #[test]
    fn test_queries_fail_after_close() {
        let mut source = XlsxSource::from_bytes(workbook()).unwrap();
        source.rows("Sheet1").unwrap();
        source.close().unwrap();
        assert!(matches!(source.rows("Sheet1"), Err(XlsxMetaError::Closed)));
        assert!(matches!(source.sheet_list(), Err(XlsxMetaError::Closed)));
    }

    #[test]
    fn test_missing_styles_part_rejects_ids() {
        let mut source = XlsxSource::from_bytes(workbook()).unwrap();
        assert!(matches!(source.style(1), Err(XlsxMetaError::Style(_))));
    }

    #[test]
    fn test_open_missing_file() {
        let err = XlsxSource::open("does/not/exist.xlsx").err().unwrap();
        assert!(matches!(err, XlsxMetaError::Open { .. }));
    }

    #[test]
    fn test_not_a_zip() {
        assert!(XlsxSource::from_bytes(b"plain text".to_vec()).is_err());
    }
}
