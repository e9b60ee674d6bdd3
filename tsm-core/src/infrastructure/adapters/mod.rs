// tsm-core/src/infrastructure/adapters/mod.rs

pub mod calamine;
pub mod duckdb;
pub mod memory;

pub use self::calamine::XlsxWorkbook;
pub use self::duckdb::DuckDbStore;
pub use self::memory::MemoryWorkbook;
