// tsm/src/commands/momentum.rs
//
// USE CASE: Year-over-year movement for one provider.

use tsm_core::application::AnalyticsService;
use tsm_core::domain::analytics::Momentum;

use super::{Session, parse_dataset};
use crate::cli::GlobalArgs;

pub async fn execute(
    global: &GlobalArgs,
    provider: &str,
    from: i32,
    to: i32,
    dataset: Option<&str>,
) -> anyhow::Result<()> {
    let dataset = dataset.map(parse_dataset).transpose()?;
    let session = Session::resolve(global)?;
    let store = session.open_existing()?;
    let service = AnalyticsService::new(&store);

    let report = service.momentum(provider, from, to, dataset).await?;
    println!(
        "\n📈 {} ({}) {} → {}",
        report.provider_code, report.dataset_type, report.from_year, report.to_year
    );

    match &report.momentum {
        Momentum::InsufficientData { reason } => {
            println!("   Insufficient data: {}", reason);
        }
        Momentum::Assessed {
            average_change,
            trend,
            measures,
        } => {
            let mut table =
                super::table(vec!["Measure", "From", "To", "Change", "Direction"]);
            for m in measures {
                table.add_row(vec![
                    m.measure.to_string(),
                    format!("{:.1}", m.from),
                    format!("{:.1}", m.to),
                    format!("{:+.1}", m.change),
                    m.direction.to_string(),
                ]);
            }
            println!("{}", table);
            println!("   Average change: {:+.2} ({})", average_change, trend);
        }
    }
    Ok(())
}
