// tsm-core/src/application/cache.rs

use std::collections::HashMap;
use tracing::debug;

use crate::error::TsmError;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::workbook::{SheetGrid, WorkbookSource};

/// Loaded sheets for one pipeline run. Owned by the run and dropped with it.
pub struct SheetCache<W: WorkbookSource> {
    source: W,
    grids: HashMap<String, SheetGrid>,
    reads: usize,
}

impl<W: WorkbookSource> SheetCache<W> {
    pub fn new(source: W) -> Self {
        Self {
            source,
            grids: HashMap::new(),
            reads: 0,
        }
    }

    pub fn origin(&self) -> String {
        self.source.origin()
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.source.sheet_names()
    }

    pub fn resolve(&self, wanted: &str) -> Option<String> {
        self.source.resolve_sheet_name(wanted)
    }

    /// Parses the sheet on first access, then serves it from memory.
    pub fn get(&mut self, name: &str) -> Result<&SheetGrid, TsmError> {
        if !self.grids.contains_key(name) {
            let grid = self.source.read_sheet(name)?;
            self.reads += 1;
            self.grids.insert(name.to_string(), grid);
        } else {
            debug!(sheet = name, "Sheet served from cache");
        }
        self.grids.get(name).ok_or_else(|| {
            InfrastructureError::Workbook {
                path: self.source.origin(),
                message: format!("sheet '{}' vanished from cache", name),
            }
            .into()
        })
    }

    /// Number of sheets actually parsed from the source.
    pub fn reads(&self) -> usize {
        self.reads
    }

    pub fn into_inner(self) -> W {
        self.source
    }
}
