//! Report-level charts that compare sectors.

use crate::payload::{Sections, Stage};

use super::{ChartError, ChartFactory, SectorCharts, Series};

/// Mapping key the overview charts are stored under.
pub const OVERVIEW_KEY: &str = "overview";
pub const PIPELINE_SHARE: &str = "pipeline_share";

/// Pipeline share across sectors plus one donut per sector composition.
///
/// Returns an empty map when no sector carries enough data.
pub fn build_overview(factory: &ChartFactory, sections: &Sections) -> Result<SectorCharts, ChartError> {
    let mut charts = SectorCharts::new();

    let mut labels = Vec::new();
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); Stage::ALL.len()];
    for (sector, data) in sections.present() {
        let totals: Option<Vec<f64>> = Stage::ALL
            .iter()
            .map(|stage| data.total(sector.measure(), *stage))
            .collect();
        // Stacking needs all three stages; a partial sector would skew its column.
        if let Some(totals) = totals {
            labels.push(sector.label().to_string());
            for (column, total) in columns.iter_mut().zip(totals) {
                column.push(total);
            }
        }
    }
    if !labels.is_empty() {
        let series = Stage::ALL
            .iter()
            .zip(columns)
            .map(|(stage, values)| Series::new(stage.label(), values))
            .collect();
        let chart = factory.stacked_bar(
            labels,
            series,
            "Supply Pipeline Share by Sector",
            "Share of stock (%)",
            true,
            PIPELINE_SHARE,
        )?;
        charts.insert(PIPELINE_SHARE.to_string(), chart);
    }

    for (sector, data) in sections.present() {
        let shares = data.composition_shares();
        if shares.iter().map(|(_, s)| s).sum::<f64>() <= 0.0 {
            continue;
        }
        let name = format!("{}_composition", sector.key());
        let (labels, values) = shares.into_iter().unzip();
        let chart = factory.donut(
            labels,
            values,
            &format!("{}: Composition", sector.label()),
            &name,
        )?;
        charts.insert(name, chart);
    }

    Ok(charts)
}
