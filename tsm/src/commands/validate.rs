// tsm/src/commands/validate.rs
//
// USE CASE: Integrity checks over the loaded tables (CI friendly).

use anyhow::bail;

use tsm_core::application::{CheckStatus, validate_store};

use super::Session;
use crate::cli::GlobalArgs;

pub async fn execute(global: &GlobalArgs, year: Option<i32>) -> anyhow::Result<()> {
    let session = Session::resolve(global)?;
    let store = session.open_existing()?;

    let report = validate_store(&store, year).await?;

    let mut table = super::table(vec!["Check", "Status", "Rows", "Detail"]);
    for check in &report.checks {
        table.add_row(vec![
            check.name.clone(),
            check.status.to_string(),
            check.offending_rows.to_string(),
            check.detail.clone(),
        ]);
    }
    println!("{}", table);

    match report.status() {
        CheckStatus::Fail => bail!("Integrity validation failed"),
        CheckStatus::Warn => println!("⚠️  Validation passed with warnings"),
        CheckStatus::Pass => println!("✅ All checks passed"),
    }
    Ok(())
}
