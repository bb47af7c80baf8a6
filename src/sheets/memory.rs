//! In-process spreadsheet
//!
//! Behaves like the remote service at the cell level: missing worksheets are
//! structure errors, unwritten cells read as empty. An optional recompute
//! hook stands in for the workbook's formulas and runs after every write.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{CellRef, CellValue, Connector, SpreadsheetClient, SpreadsheetInfo};
use crate::error::{BridgeError, BridgeResult};

/// Sheets in creation order, each a map of A1 address to value.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    sheets: Vec<(String, BTreeMap<String, CellValue>)>,
}

impl Workbook {
    pub fn add_sheet(&mut self, name: &str) {
        if !self.has_sheet(name) {
            self.sheets.push((name.to_string(), BTreeMap::new()));
        }
    }

    pub fn has_sheet(&self, name: &str) -> bool {
        self.sheets.iter().any(|(n, _)| n == name)
    }

    pub fn sheet_titles(&self) -> Vec<String> {
        self.sheets.iter().map(|(n, _)| n.clone()).collect()
    }

    fn sheet(&self, name: &str) -> BridgeResult<&BTreeMap<String, CellValue>> {
        self.sheets
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, cells)| cells)
            .ok_or_else(|| BridgeError::RemoteStructure {
                sheet: name.to_string(),
            })
    }

    fn sheet_mut(&mut self, name: &str) -> BridgeResult<&mut BTreeMap<String, CellValue>> {
        self.sheets
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, cells)| cells)
            .ok_or_else(|| BridgeError::RemoteStructure {
                sheet: name.to_string(),
            })
    }

    pub fn get(&self, sheet: &str, cell: &str) -> BridgeResult<CellValue> {
        Ok(self.sheet(sheet)?.get(cell).cloned().unwrap_or_default())
    }

    pub fn set(&mut self, sheet: &str, cell: &str, value: CellValue) -> BridgeResult<()> {
        self.sheet_mut(sheet)?.insert(cell.to_string(), value);
        Ok(())
    }

    /// Numeric view of a cell; anything non-numeric reads as `0.0`.
    pub fn number(&self, sheet: &str, cell: &str) -> f64 {
        self.get(sheet, cell)
            .ok()
            .and_then(|v| v.to_number(cell).ok())
            .unwrap_or(0.0)
    }
}

type RecomputeHook = Box<dyn Fn(&mut Workbook) + Send + Sync>;

pub struct InMemorySpreadsheet {
    title: String,
    workbook: Mutex<Workbook>,
    recompute: Option<RecomputeHook>,
}

impl InMemorySpreadsheet {
    pub fn new(title: impl Into<String>, sheets: &[&str]) -> Self {
        let mut workbook = Workbook::default();
        for name in sheets {
            workbook.add_sheet(name);
        }
        Self {
            title: title.into(),
            workbook: Mutex::new(workbook),
            recompute: None,
        }
    }

    /// Run `hook` over the whole workbook after every write.
    pub fn with_recompute(mut self, hook: impl Fn(&mut Workbook) + Send + Sync + 'static) -> Self {
        self.recompute = Some(Box::new(hook));
        self
    }

    /// Direct access for seeding or inspecting cells.
    pub fn with_workbook<R>(&self, f: impl FnOnce(&mut Workbook) -> R) -> R {
        let mut workbook = self.workbook.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut workbook)
    }
}

#[async_trait]
impl SpreadsheetClient for InMemorySpreadsheet {
    async fn open(&self) -> BridgeResult<SpreadsheetInfo> {
        Ok(SpreadsheetInfo {
            title: self.title.clone(),
            sheet_titles: self.with_workbook(|wb| wb.sheet_titles()),
        })
    }

    async fn write_cell(&self, sheet: &str, cell: &CellRef, value: f64) -> BridgeResult<()> {
        self.with_workbook(|wb| {
            wb.set(sheet, &cell.to_string(), CellValue::Number(value))?;
            if let Some(hook) = &self.recompute {
                hook(wb);
            }
            Ok(())
        })
    }

    async fn read_cell(&self, sheet: &str, cell: &CellRef) -> BridgeResult<CellValue> {
        self.with_workbook(|wb| wb.get(sheet, &cell.to_string()))
    }
}

/// Hands out the same shared in-memory spreadsheet on every connect.
#[derive(Clone)]
pub struct InMemoryConnector {
    spreadsheet: Arc<InMemorySpreadsheet>,
}

impl InMemoryConnector {
    pub fn new(spreadsheet: Arc<InMemorySpreadsheet>) -> Self {
        Self { spreadsheet }
    }
}

#[async_trait]
impl Connector for InMemoryConnector {
    async fn connect(&self) -> BridgeResult<Arc<dyn SpreadsheetClient>> {
        Ok(self.spreadsheet.clone())
    }
}
