//! In-memory [`WorkbookSource`] for extractor tests.

use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::error::{Result, XlsxMetaError};
use crate::source::{Picture, Style, WorkbookSource, DEFAULT_COL_WIDTH};
use crate::types::{
    CellType, DataValidation, DefinedName, DocumentProperties, MergedCell, SheetProtection,
};

#[derive(Debug, Default, Clone)]
pub(crate) struct MockSheet {
    pub name: String,
    pub hidden: bool,
    pub rows: Vec<Vec<String>>,
    pub formulas: HashMap<String, String>,
    pub styles: HashMap<String, u32>,
    pub types: HashMap<String, CellType>,
    pub links: HashMap<String, String>,
    pub merges: Vec<MergedCell>,
    pub validations: Vec<DataValidation>,
    pub protection: Option<SheetProtection>,
    pub widths: HashMap<String, f64>,
    pub heights: BTreeMap<u32, f64>,
    pub pictures: Vec<(String, Picture)>,
    /// `rows` fails, which drops the sheet.
    pub broken: bool,
    /// `pictures` fails at these addresses.
    pub broken_pictures: Vec<String>,
}

impl MockSheet {
    pub fn new(name: &str, rows: &[&[&str]]) -> Self {
        Self {
            name: name.to_string(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(ToString::to_string).collect())
                .collect(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct MockSource {
    pub sheets: Vec<MockSheet>,
    /// `None` makes `doc_props` fail.
    pub props: Option<DocumentProperties>,
    pub names: Vec<DefinedName>,
    pub styles: HashMap<u32, Style>,
    /// Number of `style()` calls per id.
    pub style_calls: HashMap<u32, usize>,
    pub closed: Rc<Cell<bool>>,
}

impl MockSource {
    fn ensure_open(&self) -> Result<()> {
        if self.closed.get() {
            Err(XlsxMetaError::Closed)
        } else {
            Ok(())
        }
    }

    fn sheet(&self, name: &str) -> Result<&MockSheet> {
        self.ensure_open()?;
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| XlsxMetaError::SheetNotFound(name.to_string()))
    }
}

impl WorkbookSource for MockSource {
    fn sheet_list(&mut self) -> Result<Vec<String>> {
        self.ensure_open()?;
        Ok(self.sheets.iter().map(|s| s.name.clone()).collect())
    }

    fn doc_props(&mut self) -> Result<DocumentProperties> {
        self.props
            .clone()
            .ok_or_else(|| XlsxMetaError::Parse("no core properties".to_string()))
    }

    fn defined_names(&mut self) -> Result<Vec<DefinedName>> {
        Ok(self.names.clone())
    }

    fn sheet_visible(&mut self, sheet: &str) -> Result<bool> {
        Ok(!self.sheet(sheet)?.hidden)
    }

    fn rows(&mut self, sheet: &str) -> Result<Vec<Vec<String>>> {
        let s = self.sheet(sheet)?;
        if s.broken {
            return Err(XlsxMetaError::Parse(format!("{sheet} is broken")));
        }
        Ok(s.rows.clone())
    }

    fn merge_cells(&mut self, sheet: &str) -> Result<Vec<MergedCell>> {
        Ok(self.sheet(sheet)?.merges.clone())
    }

    fn data_validations(&mut self, sheet: &str) -> Result<Vec<DataValidation>> {
        Ok(self.sheet(sheet)?.validations.clone())
    }

    fn sheet_protection(&mut self, sheet: &str) -> Result<Option<SheetProtection>> {
        Ok(self.sheet(sheet)?.protection.clone())
    }

    fn col_width(&mut self, sheet: &str, col: &str) -> Result<f64> {
        Ok(self
            .sheet(sheet)?
            .widths
            .get(col)
            .copied()
            .unwrap_or(DEFAULT_COL_WIDTH))
    }

    fn row_heights(&mut self, sheet: &str) -> Result<BTreeMap<u32, f64>> {
        Ok(self.sheet(sheet)?.heights.clone())
    }

    fn cell_formula(&mut self, sheet: &str, addr: &str) -> Result<String> {
        Ok(self
            .sheet(sheet)?
            .formulas
            .get(addr)
            .cloned()
            .unwrap_or_default())
    }

    fn cell_style(&mut self, sheet: &str, addr: &str) -> Result<u32> {
        Ok(self.sheet(sheet)?.styles.get(addr).copied().unwrap_or(0))
    }

    fn cell_type(&mut self, sheet: &str, addr: &str) -> Result<CellType> {
        Ok(self
            .sheet(sheet)?
            .types
            .get(addr)
            .copied()
            .unwrap_or_default())
    }

    fn cell_hyperlink(&mut self, sheet: &str, addr: &str) -> Result<Option<String>> {
        Ok(self.sheet(sheet)?.links.get(addr).cloned())
    }

    fn picture_cells(&mut self, sheet: &str) -> Result<Vec<String>> {
        let mut cells: Vec<String> = Vec::new();
        for (cell, _) in &self.sheet(sheet)?.pictures {
            if !cells.contains(cell) {
                cells.push(cell.clone());
            }
        }
        Ok(cells)
    }

    fn pictures(&mut self, sheet: &str, addr: &str) -> Result<Vec<Picture>> {
        let s = self.sheet(sheet)?;
        if s.broken_pictures.iter().any(|a| a == addr) {
            return Err(XlsxMetaError::Parse(format!("picture at {addr}")));
        }
        Ok(s.pictures
            .iter()
            .filter(|(cell, _)| cell == addr)
            .map(|(_, p)| p.clone())
            .collect())
    }

    fn style(&mut self, id: u32) -> Result<Style> {
        self.ensure_open()?;
        *self.style_calls.entry(id).or_default() += 1;
        self.styles
            .get(&id)
            .cloned()
            .ok_or_else(|| XlsxMetaError::Style(format!("unknown style id {id}")))
    }

    fn close(&mut self) -> Result<()> {
        self.closed.set(true);
        Ok(())
    }
}
