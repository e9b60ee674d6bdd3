// tsm/src/commands/load.rs
//
// USE CASE: Load (or reload) one survey year from a workbook.

use anyhow::Context;
use std::path::PathBuf;

use tsm_core::application::run_pipeline;
use tsm_core::infrastructure::adapters::{DuckDbStore, XlsxWorkbook};

use super::Session;
use crate::cli::GlobalArgs;

pub async fn execute(global: &GlobalArgs, file: PathBuf, year: i32) -> anyhow::Result<()> {
    let start = std::time::Instant::now();

    println!("⚙️  Loading configuration...");
    let session = Session::resolve(global)?;
    println!("   Project: {}", session.config.name);

    let workbook = XlsxWorkbook::open(&file)
        .with_context(|| format!("Failed to open workbook {:?}", file))?;
    let store = DuckDbStore::open(&session.db_path)
        .with_context(|| format!("Failed to initialize DuckDB at {}", session.db_path))?;
    println!("   Database: {} 🦆", session.db_path);

    let summary = run_pipeline(workbook, year, &session.config, &store, &session.target_dir).await?;

    let mut sheets = super::table(vec![
        "Dataset",
        "Sheet",
        "Mapping",
        "Confidence",
        "Rows kept",
        "Suspect columns",
    ]);
    for sheet in &summary.sheets {
        let suspect: Vec<String> = sheet
            .extraction
            .suspect_columns()
            .map(|c| c.measure.to_string())
            .collect();
        sheets.add_row(vec![
            sheet.dataset.to_string(),
            sheet.sheet.clone(),
            format!("{:?}", sheet.mapping_source),
            format!("{:.0}%", sheet.confidence * 100.0),
            sheet.extraction.rows_kept.to_string(),
            if suspect.is_empty() {
                "-".to_string()
            } else {
                suspect.join(", ")
            },
        ]);
    }
    println!("\n{}", sheets);

    let mut counts = super::table(vec!["Table", "Rows"]);
    let c = summary.counts;
    for (name, n) in [
        ("raw_scores", c.raw_scores),
        ("calculated_percentiles", c.calculated_percentiles),
        ("calculated_correlations", c.calculated_correlations),
        ("provider_dataset_mapping", c.provider_dataset_mapping),
        ("provider_summary", c.provider_summary),
    ] {
        counts.add_row(vec![name.to_string(), n.to_string()]);
    }
    println!("{}", counts);

    for (dataset, n) in &summary.providers {
        println!("   {} providers: {}", dataset, n);
    }
    if summary.dedup.combined_suppressed > 0 {
        println!(
            "   ⚠️  {} COMBINED row(s) suppressed (provider also filed LCRA/LCHO)",
            summary.dedup.combined_suppressed
        );
    }
    if summary.range_warnings() > 0 {
        println!(
            "   ⚠️  {} score(s) outside [0, 100], see run_{}.json",
            summary.range_warnings(),
            year
        );
    }

    println!(
        "\n✨ SUCCESS! Year {} loaded in {:.2?}",
        year,
        start.elapsed()
    );
    Ok(())
}
