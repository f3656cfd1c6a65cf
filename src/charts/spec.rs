use plotters::style::RGBColor;

use super::ChartError;

/// The chart kinds the factory knows how to draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChartKind {
    /// Single series, ranked with the largest value on top.
    HorizontalBar,
    /// N series side by side per label.
    GroupedBar,
    /// Series stacked per label; `percent` normalizes each column to 100.
    StackedBar { percent: bool },
    /// One line per series over ordered labels.
    Line,
    /// Shares of a whole as wedges of a ring.
    Donut,
}

/// A named sequence of values aligned with the chart labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub values: Vec<f64>,
}

impl Series {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Everything needed to draw one chart.
#[derive(Debug, Clone)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub labels: Vec<String>,
    pub series: Vec<Series>,
    pub title: String,
    pub axis_label: String,
    /// File stem; the chart lands at `<charts dir>/<output_name>.svg`.
    pub output_name: String,
    /// Overrides the factory palette when set.
    pub colors: Option<Vec<RGBColor>>,
}

impl ChartSpec {
    pub fn new(kind: ChartKind, output_name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            kind,
            labels: Vec::new(),
            series: Vec::new(),
            title: title.into(),
            axis_label: String::new(),
            output_name: output_name.into(),
            colors: None,
        }
    }

    pub fn labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }

    pub fn series(mut self, series: Series) -> Self {
        self.series.push(series);
        self
    }

    pub fn axis_label(mut self, axis_label: impl Into<String>) -> Self {
        self.axis_label = axis_label.into();
        self
    }

    pub fn colors(mut self, colors: Vec<RGBColor>) -> Self {
        self.colors = Some(colors);
        self
    }

    /// Reject malformed input before anything touches the filesystem.
    pub fn validate(&self) -> Result<(), ChartError> {
        if !is_valid_name(&self.output_name) {
            return Err(ChartError::InvalidName(self.output_name.clone()));
        }
        let name = || self.output_name.clone();

        if self.labels.is_empty() {
            return Err(ChartError::EmptyLabels { name: name() });
        }
        if self.series.is_empty() {
            return Err(ChartError::EmptySeries { name: name() });
        }
        for series in &self.series {
            if series.values.len() != self.labels.len() {
                return Err(ChartError::LengthMismatch {
                    name: name(),
                    series: series.name.clone(),
                    actual: series.values.len(),
                    expected: self.labels.len(),
                });
            }
            if series.values.iter().any(|v| !v.is_finite()) {
                return Err(ChartError::NonFinite {
                    name: name(),
                    series: series.name.clone(),
                });
            }
        }

        if self.kind == ChartKind::Donut {
            let shares = &self.series[0].values;
            if shares.iter().any(|v| *v < 0.0) || shares.iter().sum::<f64>() <= 0.0 {
                return Err(ChartError::InvalidShares { name: name() });
            }
        }
        Ok(())
    }
}

/// Chart names become file stems, so keep them to a safe alphabet.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
