// tsm/src/commands/priority.rs
//
// USE CASE: Improvement priorities for one provider.

use tsm_core::application::AnalyticsService;

use super::{Session, fmt_opt, parse_dataset};
use crate::cli::GlobalArgs;

pub async fn execute(
    global: &GlobalArgs,
    provider: &str,
    year: i32,
    dataset: Option<&str>,
) -> anyhow::Result<()> {
    let dataset = dataset.map(parse_dataset).transpose()?;
    let session = Session::resolve(global)?;
    let store = session.open_existing()?;
    let service = AnalyticsService::new(&store);

    let assessment = service.priority(provider, year, dataset).await?;

    let mut table = super::table(vec![
        "Measure",
        "Description",
        "Percentile",
        "Correlation",
        "Potential",
        "Score",
        "Level",
    ]);
    for m in &assessment.measures {
        table.add_row(vec![
            m.measure.to_string(),
            m.measure.description().to_string(),
            format!("{:.1}", m.percentile),
            fmt_opt(m.correlation),
            format!("{:.1}", m.improvement_potential),
            format!("{:.1}", m.priority_score),
            m.level.to_string(),
        ]);
    }

    println!(
        "\n🎯 {} ({} {})",
        assessment.provider_code, assessment.dataset_type, assessment.year
    );
    println!("{}", table);
    println!(
        "   Top priority: {} {} ({:.1}, {})",
        assessment.top.measure,
        assessment.top.measure.description(),
        assessment.top.priority_score,
        assessment.top.level
    );
    Ok(())
}
