//! Chart subsystem: a fixed catalog of chart kinds rendered to SVG files, and
//! the sector adapters that feed it from the payload.

pub mod factory;
pub mod overview;
pub mod sections;
pub mod spec;

use std::collections::BTreeMap;
use std::path::PathBuf;

use num_format::{Locale, ToFormattedString};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub use factory::ChartFactory;
pub use overview::{build_overview, OVERVIEW_KEY};
pub use sections::{build_all, SectionChartBuilder};
pub use spec::{ChartKind, ChartSpec, Series};

/// Errors raised while validating or drawing a chart.
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("chart '{name}' has no labels")]
    EmptyLabels { name: String },
    #[error("chart '{name}' has no series")]
    EmptySeries { name: String },
    #[error("chart '{name}': series '{series}' has {actual} values for {expected} labels")]
    LengthMismatch {
        name: String,
        series: String,
        actual: usize,
        expected: usize,
    },
    #[error("chart '{name}': series '{series}' contains a non-finite value")]
    NonFinite { name: String, series: String },
    #[error("chart '{name}': shares must be non-negative and sum above zero")]
    InvalidShares { name: String },
    #[error("invalid chart name '{0}'")]
    InvalidName(String),
    #[error("failed to prepare chart directory: {0}")]
    Io(#[source] std::io::Error),
    #[error("failed to draw chart '{name}': {message}")]
    Draw { name: String, message: String },
}

/// A rendered chart on disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartRef {
    /// Location of the file on the local filesystem.
    pub path: PathBuf,
    /// Path relative to the job directory, as referenced from the HTML.
    pub href: String,
}

/// Chart-name to reference, for one sector (or the overview group).
pub type SectorCharts = BTreeMap<String, ChartRef>;

/// Sector name to that sector's charts; the job-wide mapping.
pub type ChartMap = BTreeMap<String, SectorCharts>;

/// Every chart of a report: the sector charts plus the `overview` group.
pub fn build_report_charts(
    factory: &ChartFactory,
    sections: &crate::payload::Sections,
) -> Result<ChartMap, ChartError> {
    let mut charts = build_all(factory, sections)?;
    let overview = build_overview(factory, sections)?;
    if !overview.is_empty() {
        charts.insert(OVERVIEW_KEY.to_string(), overview);
    }
    Ok(charts)
}

/// Job-relative image locations keyed like the chart map.
pub fn chart_hrefs(charts: &ChartMap) -> Value {
    let map: BTreeMap<&str, BTreeMap<&str, &str>> = charts
        .iter()
        .map(|(sector, group)| {
            (
                sector.as_str(),
                group
                    .iter()
                    .map(|(name, chart)| (name.as_str(), chart.href.as_str()))
                    .collect(),
            )
        })
        .collect();
    serde_json::to_value(map).unwrap_or(Value::Null)
}

/// Format an axis or label value with thousands separators.
pub fn format_thousands(value: f64) -> String {
    if value.fract().abs() > 1e-9 && value.abs() < 1000.0 {
        return format!("{:.1}", value);
    }
    (value.round() as i64).to_formatted_string(&Locale::en)
}
