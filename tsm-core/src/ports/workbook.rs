// tsm-core/src/ports/workbook.rs

// What the pipeline needs from a spreadsheet, without knowing the file format.

use crate::error::TsmError;

/// A single cell, reduced to what extraction cares about.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

static EMPTY_CELL: Cell = Cell::Empty;

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }

    /// Header text. Numbers render without a trailing ".0" when integral.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Cell::Number(n) => Some(format_number(*n)),
        }
    }

    /// Numeric coercion. Anything unparsable or non-finite is missing.
    pub fn as_number(&self) -> Option<f64> {
        let value = match self {
            Cell::Empty => return None,
            Cell::Number(n) => *n,
            Cell::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Headerless matrix of cells for one sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetGrid {
    rows: Vec<Vec<Cell>>,
}

impl SheetGrid {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn row(&self, index: usize) -> &[Cell] {
        self.rows.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Out-of-bounds reads are empty cells (ragged rows are common in exports).
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn rows_from(&self, start: usize) -> impl Iterator<Item = (usize, &[Cell])> {
        self.rows
            .iter()
            .enumerate()
            .skip(start)
            .map(|(i, r)| (i, r.as_slice()))
    }
}

pub trait WorkbookSource {
    /// Display name of the source (file path for file-backed workbooks).
    fn origin(&self) -> String;

    fn sheet_names(&self) -> Vec<String>;

    fn read_sheet(&mut self, name: &str) -> Result<SheetGrid, TsmError>;

    /// Exact match first, then case-insensitive.
    fn resolve_sheet_name(&self, wanted: &str) -> Option<String> {
        let names = self.sheet_names();
        if let Some(exact) = names.iter().find(|n| n.as_str() == wanted) {
            return Some(exact.clone());
        }
        names
            .into_iter()
            .find(|n| n.trim().eq_ignore_ascii_case(wanted.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_coercion() {
        assert_eq!(Cell::Number(81.5).as_number(), Some(81.5));
        assert_eq!(Cell::text(" 72.25 ").as_number(), Some(72.25));
        assert_eq!(Cell::text("n/a").as_number(), None);
        assert_eq!(Cell::text("NaN").as_number(), None);
        assert_eq!(Cell::text("").as_number(), None);
        assert_eq!(Cell::Empty.as_number(), None);
    }

    #[test]
    fn test_text_rendering_of_integral_numbers() {
        assert_eq!(Cell::Number(4636.0).as_text(), Some("4636".to_string()));
        assert_eq!(Cell::Number(12.5).as_text(), Some("12.5".to_string()));
        assert_eq!(Cell::text("  L4004 ").as_text(), Some("L4004".to_string()));
        assert_eq!(Cell::text("   ").as_text(), None);
    }

    #[test]
    fn test_ragged_grid_reads_empty() {
        let grid = SheetGrid::new(vec![vec![Cell::text("a")], vec![]]);
        assert_eq!(grid.cell(0, 5), &Cell::Empty);
        assert_eq!(grid.cell(9, 0), &Cell::Empty);
        assert_eq!(grid.width(), 1);
        assert_eq!(grid.height(), 2);
    }
}
