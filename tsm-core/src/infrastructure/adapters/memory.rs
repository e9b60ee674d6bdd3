// tsm-core/src/infrastructure/adapters/memory.rs

use std::collections::BTreeMap;

use crate::error::TsmError;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::workbook::{Cell, SheetGrid, WorkbookSource};

/// Workbook held in memory, sheet order preserved.
#[derive(Debug, Clone, Default)]
pub struct MemoryWorkbook {
    name: String,
    order: Vec<String>,
    sheets: BTreeMap<String, SheetGrid>,
}

impl MemoryWorkbook {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_sheet(mut self, name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        self.insert(name, SheetGrid::new(rows));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, grid: SheetGrid) {
        let name = name.into();
        if !self.sheets.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.sheets.insert(name, grid);
    }
}

impl WorkbookSource for MemoryWorkbook {
    fn origin(&self) -> String {
        self.name.clone()
    }

    fn sheet_names(&self) -> Vec<String> {
        self.order.clone()
    }

    fn read_sheet(&mut self, name: &str) -> Result<SheetGrid, TsmError> {
        self.sheets
            .get(name)
            .cloned()
            .ok_or_else(|| {
                InfrastructureError::Workbook {
                    path: self.name.clone(),
                    message: format!("sheet '{}' not found", name),
                }
                .into()
            })
    }
}
