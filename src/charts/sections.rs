//! Per-sector chart adapters.
//!
//! Every sector yields the same three charts; only the unit differs. Figures
//! missing from a row are dropped from that chart, never replaced by zero.

use crate::payload::{Sector, SectorData, Sections, Stage};

use super::{ChartError, ChartFactory, ChartMap, SectorCharts, Series};

pub const EXISTING_BY_STATE: &str = "existing_by_state";
pub const INCOMING_VS_PLANNED: &str = "incoming_vs_planned";
pub const TRENDS: &str = "trends";

/// Maps one sector's block onto chart factory calls.
#[derive(Debug, Clone, Copy)]
pub struct SectionChartBuilder {
    sector: Sector,
}

impl SectionChartBuilder {
    pub fn new(sector: Sector) -> Self {
        Self { sector }
    }

    pub fn sector(&self) -> Sector {
        self.sector
    }

    /// Draw the charts the data supports; a chart with nothing to plot is skipped.
    pub fn build(&self, factory: &ChartFactory, data: &SectorData) -> Result<SectorCharts, ChartError> {
        let mut charts = SectorCharts::new();

        if let Some((labels, values)) = self.existing_by_state(data) {
            let chart = factory.horizontal_bar(
                labels,
                values,
                &format!("{}: Existing Stock by State", self.sector.label()),
                self.sector.measure().axis_label(),
                &self.file_name(EXISTING_BY_STATE),
            )?;
            charts.insert(EXISTING_BY_STATE.to_string(), chart);
        }

        if let Some((labels, series)) = self.incoming_vs_planned(data) {
            let chart = factory.grouped_bar_n(
                labels,
                series,
                &format!("{}: Incoming vs Planned Supply", self.sector.label()),
                self.sector.measure().axis_label(),
                &self.file_name(INCOMING_VS_PLANNED),
            )?;
            charts.insert(INCOMING_VS_PLANNED.to_string(), chart);
        }

        if let Some((labels, series)) = self.trends(data) {
            let chart = factory.line(
                labels,
                series,
                &format!("{}: Supply Trends", self.sector.label()),
                self.sector.measure().axis_label(),
                &self.file_name(TRENDS),
            )?;
            charts.insert(TRENDS.to_string(), chart);
        }

        Ok(charts)
    }

    fn file_name(&self, chart: &str) -> String {
        format!("{}_{}", self.sector.key(), chart)
    }

    fn existing_by_state(&self, data: &SectorData) -> Option<(Vec<String>, Vec<f64>)> {
        let measure = self.sector.measure();
        let (labels, values): (Vec<String>, Vec<f64>) = data
            .by_state
            .iter()
            .filter_map(|row| {
                row.figure(measure, Stage::Existing)
                    .map(|value| (row.state.clone(), value))
            })
            .unzip();
        (!labels.is_empty()).then_some((labels, values))
    }

    fn incoming_vs_planned(&self, data: &SectorData) -> Option<(Vec<String>, Vec<Series>)> {
        let measure = self.sector.measure();
        let mut labels = Vec::new();
        let mut incoming = Vec::new();
        let mut planned = Vec::new();
        for row in &data.by_state {
            if let (Some(i), Some(p)) = (
                row.figure(measure, Stage::Incoming),
                row.figure(measure, Stage::Planned),
            ) {
                labels.push(row.state.clone());
                incoming.push(i);
                planned.push(p);
            }
        }
        if labels.is_empty() {
            return None;
        }
        Some((
            labels,
            vec![
                Series::new(Stage::Incoming.label(), incoming),
                Series::new(Stage::Planned.label(), planned),
            ],
        ))
    }

    fn trends(&self, data: &SectorData) -> Option<(Vec<String>, Vec<Series>)> {
        let trends = data.trends.as_ref()?;
        if trends.half_year.is_empty() {
            return None;
        }
        let series: Vec<Series> = trends
            .all_series()
            .into_iter()
            .map(|(_, label, values)| Series::new(label, values.to_vec()))
            .collect();
        (!series.is_empty()).then(|| (trends.half_year.clone(), series))
    }
}

/// Charts for every present sector, keyed by sector name.
pub fn build_all(factory: &ChartFactory, sections: &Sections) -> Result<ChartMap, ChartError> {
    let mut map = ChartMap::new();
    for (sector, data) in sections.present() {
        let charts = SectionChartBuilder::new(sector).build(factory, data)?;
        log::debug!("{}: {} chart(s)", sector.key(), charts.len());
        if !charts.is_empty() {
            map.entry(sector.key().to_string()).or_default().extend(charts);
        }
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::StateRow;

    fn row(state: &str, existing: Option<f64>, incoming: Option<f64>, planned: Option<f64>) -> StateRow {
        StateRow {
            state: state.to_string(),
            existing,
            incoming,
            planned,
            ..Default::default()
        }
    }

    #[test]
    fn test_rows_missing_a_figure_are_dropped() {
        let builder = SectionChartBuilder::new(Sector::Shop);
        let data = SectorData {
            by_state: vec![
                row("Selangor", Some(10.0), Some(1.0), None),
                row("Johor", None, Some(2.0), Some(3.0)),
            ],
            ..Default::default()
        };

        let (labels, values) = builder.existing_by_state(&data).unwrap();
        assert_eq!(labels, vec!["Selangor".to_string()]);
        assert_eq!(values, vec![10.0]);

        let (labels, series) = builder.incoming_vs_planned(&data).unwrap();
        assert_eq!(labels, vec!["Johor".to_string()]);
        assert_eq!(series[0].name, "Incoming");
        assert_eq!(series[1].values, vec![3.0]);
    }

    #[test]
    fn test_space_variant_is_preferred() {
        let builder = SectionChartBuilder::new(Sector::PurposeBuiltOffice);
        let data = SectorData {
            by_state: vec![StateRow {
                state: "W.P. Kuala Lumpur".to_string(),
                existing: Some(1.0),
                existing_space_sm: Some(9_800_000.0),
                ..Default::default()
            }],
            ..Default::default()
        };
        let (_, values) = builder.existing_by_state(&data).unwrap();
        assert_eq!(values, vec![9_800_000.0]);
    }

    #[test]
    fn test_empty_sector_yields_no_charts() {
        let dir = tempfile::tempdir().unwrap();
        let factory = ChartFactory::new(dir.path());
        let charts = SectionChartBuilder::new(Sector::Leisure)
            .build(&factory, &SectorData::default())
            .unwrap();
        assert!(charts.is_empty());
    }
}
