// tsm/src/cli.rs
//
// Single source of truth for all CLI definitions (Clap structs).

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tsm")]
#[command(about = "Tenant Satisfaction Measures ETL & peer benchmarking", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Project directory (holds tsm_project.yaml)
    #[arg(long, global = true, default_value = ".")]
    pub project_dir: PathBuf,

    /// DuckDB file, overrides the project configuration
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Debug-level logging (RUST_LOG wins when set)
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 🚀 Loads one survey year from a workbook (replaces that year)
    Load {
        /// Workbook file (xlsx, xls, ods)
        #[arg(long, short)]
        file: PathBuf,

        /// Survey year
        #[arg(long, short)]
        year: i32,
    },

    /// 🏆 Ranks providers of a peer group by composite score
    Rank {
        #[arg(long, short)]
        year: i32,

        /// LCRA | LCHO | COMBINED
        #[arg(long, short, default_value = "LCRA")]
        dataset: String,

        /// Restrict peers to one landlord type
        #[arg(long)]
        category: Option<String>,

        /// Number of rows to display
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// 🎯 Improvement priorities for one provider
    Priority {
        #[arg(long, short)]
        provider: String,

        #[arg(long, short)]
        year: i32,

        #[arg(long, short)]
        dataset: Option<String>,
    },

    /// 📈 Year-over-year momentum for one provider
    Momentum {
        #[arg(long, short)]
        provider: String,

        #[arg(long)]
        from: i32,

        #[arg(long)]
        to: i32,

        #[arg(long, short)]
        dataset: Option<String>,
    },

    /// 🛡️ Integrity checks over the loaded tables
    Validate {
        /// Check a single year (default: all years)
        #[arg(long, short)]
        year: Option<i32>,
    },

    /// 🔍 Inspects a DuckDB table (schema + sample rows)
    Inspect {
        /// Table or view name
        #[arg(long, short)]
        table: String,

        /// Number of sample rows to display
        #[arg(long, default_value = "5")]
        limit: usize,
    },
}
