// tsm/src/commands/rank.rs
//
// USE CASE: Peer-group league table.

use tsm_core::application::AnalyticsService;
use tsm_core::domain::analytics::PeerFilter;

use super::{Session, parse_dataset};
use crate::cli::GlobalArgs;

pub async fn execute(
    global: &GlobalArgs,
    year: i32,
    dataset: &str,
    category: Option<String>,
    limit: usize,
) -> anyhow::Result<()> {
    let dataset = parse_dataset(dataset)?;
    let session = Session::resolve(global)?;
    let store = session.open_existing()?;
    let service = AnalyticsService::new(&store);

    let filter = category.map_or(PeerFilter::All, PeerFilter::ProviderCategory);
    let ranked = service.rankings(year, dataset, &filter).await?;

    if ranked.is_empty() {
        println!("No {} providers loaded for {}.", dataset, year);
        return Ok(());
    }

    let mut table = super::table(vec![
        "Rank",
        "Code",
        "Provider",
        "Composite",
        "Measures",
        "Percentile",
        "Quartile",
    ]);
    for r in ranked.iter().take(limit) {
        table.add_row(vec![
            r.rank.to_string(),
            r.provider_code.clone(),
            r.provider_name.clone(),
            format!("{:.2}", r.composite_score),
            r.measures_count.to_string(),
            format!("{:.1}", r.percentile),
            r.quartile.to_string(),
        ]);
    }

    println!("\n🏆 {} {} ({} providers)", dataset, year, ranked.len());
    println!("{}", table);
    Ok(())
}
