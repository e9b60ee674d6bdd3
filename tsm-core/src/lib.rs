// tsm-core/src/lib.rs

// 1. Documentation is uneven for now
#![allow(missing_docs)]
// 2. Memory safety
#![deny(unsafe_code)]
// 3. Robustness
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
// 4. Performance
#![warn(clippy::perf)]

// --- HEXAGONAL MODULES ---

// 1. Ports (Interfaces / Traits)
// Workbook sources and the score store.
pub mod ports;

// 2. Domain
// Measure catalog, schema detection, extraction, statistics, analytics.
// Depends on nothing but itself.
pub mod domain;

// 3. Infrastructure (Adapters)
// DuckDB store, calamine workbooks, YAML configuration.
pub mod infrastructure;

// 4. Application (Use Cases)
// Yearly reload pipeline, read-side analytics, store validation.
pub mod application;

// --- GLOBAL ERROR HANDLING ---
pub mod error;

// --- RE-EXPORTS (FACADE) ---
pub use error::TsmError;
