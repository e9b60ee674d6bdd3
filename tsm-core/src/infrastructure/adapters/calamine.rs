// tsm-core/src/infrastructure/adapters/calamine.rs

use calamine::{DataType, Range, Reader, Sheets, open_workbook_auto};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::TsmError;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::workbook::{Cell, SheetGrid, WorkbookSource};

/// Spreadsheet file (xlsx, xlsm, xls, ods) read through calamine.
pub struct XlsxWorkbook {
    path: PathBuf,
    sheets: Sheets<BufReader<File>>,
}

impl XlsxWorkbook {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, InfrastructureError> {
        let path = path.as_ref().to_path_buf();
        let sheets = open_workbook_auto(&path).map_err(|e| InfrastructureError::Workbook {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { path, sheets })
    }

    fn error(&self, message: impl Into<String>) -> InfrastructureError {
        InfrastructureError::Workbook {
            path: self.path.display().to_string(),
            message: message.into(),
        }
    }
}

fn convert(value: &DataType) -> Cell {
    match value {
        DataType::Empty => Cell::Empty,
        DataType::Int(i) => Cell::Number(*i as f64),
        DataType::Float(f) => Cell::Number(*f),
        DataType::String(s) => Cell::Text(s.clone()),
        DataType::Bool(b) => Cell::Text(b.to_string()),
        // Error cells (#N/A, #DIV/0!) behave like blanks.
        DataType::Error(_) => Cell::Empty,
        other => Cell::Text(other.to_string()),
    }
}

/// Re-anchors the used range at A1 so row/column indices match the sheet.
fn to_grid(range: &Range<DataType>) -> SheetGrid {
    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); row_offset];
    for row in range.rows() {
        let mut cells = vec![Cell::Empty; col_offset];
        cells.extend(row.iter().map(convert));
        rows.push(cells);
    }
    SheetGrid::new(rows)
}

impl WorkbookSource for XlsxWorkbook {
    fn origin(&self) -> String {
        self.path.display().to_string()
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.sheet_names().to_vec()
    }

    fn read_sheet(&mut self, name: &str) -> Result<SheetGrid, TsmError> {
        let range = self
            .sheets
            .worksheet_range(name)
            .ok_or_else(|| self.error(format!("sheet '{}' not found", name)))?
            .map_err(|e| self.error(e.to_string()))?;
        let grid = to_grid(&range);
        debug!(sheet = name, rows = grid.height(), cols = grid.width(), "Sheet loaded");
        Ok(grid)
    }
}
