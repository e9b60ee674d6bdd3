// tsm-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DomainError {
    #[error("Required sheet '{sheet}' not found in workbook for year {year}")]
    #[diagnostic(
        code(tsm::domain::missing_sheet),
        help("Check the sheet name templates in tsm_project.yaml (available: {available}).")
    )]
    MissingSheet {
        sheet: String,
        year: i32,
        available: String,
    },

    #[error("Dataset isolation violated: {0}")]
    #[diagnostic(
        code(tsm::domain::isolation),
        help("A provider may appear as LCRA and LCHO, never as COMBINED alongside either.")
    )]
    IsolationViolation(String),

    #[error("Unknown measure code '{0}'")]
    #[diagnostic(code(tsm::domain::measure), help("Expected one of TP01..TP12."))]
    UnknownMeasure(String),

    #[error("Unknown dataset type '{0}'")]
    #[diagnostic(code(tsm::domain::dataset), help("Expected LCRA, LCHO or COMBINED."))]
    UnknownDataset(String),

    #[error("Provider '{provider}' not found for year {year}")]
    #[diagnostic(code(tsm::domain::provider_not_found))]
    ProviderNotFound { provider: String, year: i32 },

    #[error("No measures available to prioritise for provider '{0}'")]
    #[diagnostic(code(tsm::domain::no_priority))]
    NoPriorityCandidates(String),

    #[error("Invalid header pattern '{pattern}': {reason}")]
    #[diagnostic(code(tsm::domain::pattern))]
    InvalidPattern { pattern: String, reason: String },
}
