// tsm-core/src/ports/mod.rs

pub mod store;
pub mod workbook;

pub use store::ScoreStore;
pub use workbook::{Cell, SheetGrid, WorkbookSource};
