// tsm/src/commands/inspect.rs
//
// USE CASE: Inspect a DuckDB table (schema + sample rows).

use anyhow::bail;
use duckdb::{Connection, Row, types::ValueRef};

use tsm_core::infrastructure::adapters::duckdb::{SCORES_VIEW, TABLES};

use super::Session;
use crate::cli::GlobalArgs;

pub fn execute(global: &GlobalArgs, table: &str, limit: usize) -> anyhow::Result<()> {
    // Names are interpolated into SQL, so only the known relations are allowed.
    if !TABLES.contains(&table) && table != SCORES_VIEW {
        bail!(
            "Unknown table '{}'. Expected one of: {}, {}",
            table,
            TABLES.join(", "),
            SCORES_VIEW
        );
    }

    let session = Session::resolve(global)?;
    session.require_database()?;
    let conn = Connection::open(&session.db_path)?;

    println!("\n🔍 Inspecting Table: '{}'", table);

    let mut stmt_cols = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let column_names: Vec<String> = stmt_cols
        .query_map([], |row: &Row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;

    let total: i64 = conn.query_row(&format!("SELECT count(*) FROM {}", table), [], |r| {
        r.get(0)
    })?;

    let mut out = super::table(column_names.clone());

    let mut stmt = conn.prepare(&format!("SELECT * FROM {} LIMIT {}", table, limit))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let values: Vec<String> = (0..column_names.len())
            .map(|i| match row.get_ref(i) {
                Ok(val) => render(val),
                Err(_) => "ERROR".to_string(),
            })
            .collect();
        out.add_row(values);
    }

    println!("{}", out);
    println!("   {} of {} row(s)", limit.min(total.max(0) as usize), total);
    Ok(())
}

fn render(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        ValueRef::Double(v) => format!("{:.3}", v),
        ValueRef::Float(v) => format!("{:.3}", v),
        other => format!("{:?}", other),
    }
}
