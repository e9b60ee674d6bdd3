// tsm-core/src/error.rs

use crate::domain::error::DomainError;
use crate::infrastructure::error::InfrastructureError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TsmError {
    // --- DOMAIN ERRORS (isolation rules, missing sheets, lookups) ---
    #[error(transparent)]
    Domain(#[from] DomainError),

    // --- INFRASTRUCTURE ERRORS (IO, workbook parsing, DuckDB) ---
    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),

    // --- GENERIC ---
    #[error("Internal Error: {0}")]
    InternalError(String),
}

// Manual implementation to avoid a duplicate enum variant but keep ergonomics
impl From<std::io::Error> for TsmError {
    fn from(err: std::io::Error) -> Self {
        TsmError::Infrastructure(InfrastructureError::Io(err))
    }
}

impl From<duckdb::Error> for TsmError {
    fn from(err: duckdb::Error) -> Self {
        TsmError::Infrastructure(InfrastructureError::from(err))
    }
}
