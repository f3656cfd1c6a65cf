//! SVG chart rendering on top of plotters.

use std::cmp::Ordering;
use std::f64::consts::PI;
use std::fs;
use std::path::{Path, PathBuf};

use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use super::spec::{ChartKind, ChartSpec, Series};
use super::{format_thousands, ChartError, ChartRef};

type Area<'a> = DrawingArea<SVGBackend<'a>, Shift>;
type Chart<'a, 'b> = ChartContext<'a, SVGBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;
type DrawResult = Result<(), Box<dyn std::error::Error>>;

const DEFAULT_SIZE: (u32, u32) = (1000, 560);
const DONUT_INNER_RATIO: f64 = 0.6;

/// Report palette: navy, azure, amber, green, violet, brick.
pub const DEFAULT_PALETTE: [RGBColor; 6] = [
    RGBColor(0x1f, 0x4e, 0x79),
    RGBColor(0x2e, 0x86, 0xc1),
    RGBColor(0xf3, 0x9c, 0x12),
    RGBColor(0x27, 0xae, 0x60),
    RGBColor(0x8e, 0x44, 0xad),
    RGBColor(0xc0, 0x39, 0x2b),
];

/// Draws charts into one directory, one `.svg` file per chart.
#[derive(Debug, Clone)]
pub struct ChartFactory {
    dir: PathBuf,
    href_prefix: String,
    size: (u32, u32),
    palette: Vec<RGBColor>,
}

impl ChartFactory {
    /// Charts go into `dir` and are referenced as `charts/<name>.svg`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            href_prefix: "charts".to_string(),
            size: DEFAULT_SIZE,
            palette: DEFAULT_PALETTE.to_vec(),
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = (width, height);
        self
    }

    pub fn with_palette(mut self, palette: Vec<RGBColor>) -> Self {
        if !palette.is_empty() {
            self.palette = palette;
        }
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn horizontal_bar(
        &self,
        labels: Vec<String>,
        values: Vec<f64>,
        title: &str,
        axis_label: &str,
        name: &str,
    ) -> Result<ChartRef, ChartError> {
        self.render(
            &ChartSpec::new(ChartKind::HorizontalBar, name, title)
                .labels(labels)
                .series(Series::new(axis_label, values))
                .axis_label(axis_label),
        )
    }

    pub fn grouped_bar_n(
        &self,
        labels: Vec<String>,
        series: Vec<Series>,
        title: &str,
        axis_label: &str,
        name: &str,
    ) -> Result<ChartRef, ChartError> {
        self.render(&with_series(
            ChartSpec::new(ChartKind::GroupedBar, name, title)
                .labels(labels)
                .axis_label(axis_label),
            series,
        ))
    }

    pub fn stacked_bar(
        &self,
        labels: Vec<String>,
        series: Vec<Series>,
        title: &str,
        axis_label: &str,
        percent: bool,
        name: &str,
    ) -> Result<ChartRef, ChartError> {
        self.render(&with_series(
            ChartSpec::new(ChartKind::StackedBar { percent }, name, title)
                .labels(labels)
                .axis_label(axis_label),
            series,
        ))
    }

    pub fn line(
        &self,
        x_labels: Vec<String>,
        series: Vec<Series>,
        title: &str,
        axis_label: &str,
        name: &str,
    ) -> Result<ChartRef, ChartError> {
        self.render(&with_series(
            ChartSpec::new(ChartKind::Line, name, title)
                .labels(x_labels)
                .axis_label(axis_label),
            series,
        ))
    }

    pub fn donut(
        &self,
        labels: Vec<String>,
        shares_pct: Vec<f64>,
        title: &str,
        name: &str,
    ) -> Result<ChartRef, ChartError> {
        self.render(
            &ChartSpec::new(ChartKind::Donut, name, title)
                .labels(labels)
                .series(Series::new("share", shares_pct)),
        )
    }

    /// Validate, draw and write one chart.
    pub fn render(&self, spec: &ChartSpec) -> Result<ChartRef, ChartError> {
        spec.validate()?;

        let mut buffer = String::new();
        {
            let root = SVGBackend::with_string(&mut buffer, self.size).into_drawing_area();
            let draw = || -> DrawResult {
                root.fill(&WHITE)?;
                match spec.kind {
                    ChartKind::HorizontalBar => self.draw_horizontal_bar(&root, spec)?,
                    ChartKind::GroupedBar => self.draw_grouped_bar(&root, spec)?,
                    ChartKind::StackedBar { percent } => self.draw_stacked_bar(&root, spec, percent)?,
                    ChartKind::Line => self.draw_line(&root, spec)?,
                    ChartKind::Donut => self.draw_donut(&root, spec)?,
                }
                root.present()?;
                Ok(())
            };
            draw().map_err(|e| ChartError::Draw {
                name: spec.output_name.clone(),
                message: e.to_string(),
            })?;
        }

        fs::create_dir_all(&self.dir).map_err(ChartError::Io)?;
        let file_name = format!("{}.svg", spec.output_name);
        let path = self.dir.join(&file_name);
        fs::write(&path, buffer).map_err(ChartError::Io)?;
        log::debug!("Rendered chart {}", path.display());

        Ok(ChartRef {
            path,
            href: format!("{}/{}", self.href_prefix, file_name),
        })
    }

    fn color(&self, spec: &ChartSpec, index: usize) -> RGBColor {
        let palette = spec
            .colors
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or(self.palette.as_slice());
        palette[index % palette.len()]
    }

    fn draw_horizontal_bar(&self, root: &Area<'_>, spec: &ChartSpec) -> DrawResult {
        let ranked = rank_descending(&spec.labels, &spec.series[0].values);
        let n = ranked.len();
        // Row 0 sits at the bottom of the axis, so the largest value gets the top row.
        let rows: Vec<String> = ranked.iter().rev().map(|(l, _)| l.clone()).collect();
        let max = axis_max(ranked.iter().map(|(_, v)| *v));

        let mut chart = ChartBuilder::on(root)
            .caption(&spec.title, caption_font())
            .margin(16)
            .x_label_area_size(48)
            .y_label_area_size(170)
            .build_cartesian_2d(0f64..max, -0.5f64..(n as f64 - 0.5))?;

        chart
            .configure_mesh()
            .disable_y_mesh()
            .y_labels(n)
            .y_label_formatter(&|y| category_label(&rows, *y))
            .x_label_formatter(&|x| format_thousands(*x))
            .x_desc(spec.axis_label.as_str())
            .draw()?;

        let color = self.color(spec, 0);
        chart.draw_series(ranked.iter().enumerate().map(|(i, (_, v))| {
            let y = (n - 1 - i) as f64;
            Rectangle::new([(0.0, y - 0.35), (*v, y + 0.35)], color.filled())
        }))?;
        chart.draw_series(ranked.iter().enumerate().map(|(i, (_, v))| {
            let y = (n - 1 - i) as f64;
            Text::new(
                format!(" {}", format_thousands(*v)),
                (*v, y),
                value_font().pos(Pos::new(HPos::Left, VPos::Center)),
            )
        }))?;
        Ok(())
    }

    fn draw_grouped_bar(&self, root: &Area<'_>, spec: &ChartSpec) -> DrawResult {
        let n = spec.labels.len();
        let max = axis_max(spec.series.iter().flat_map(|s| s.values.iter().copied()));

        let mut chart = ChartBuilder::on(root)
            .caption(&spec.title, caption_font())
            .margin(16)
            .x_label_area_size(60)
            .y_label_area_size(80)
            .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), 0f64..max)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(n)
            .x_label_formatter(&|x| category_label(&spec.labels, *x))
            .y_label_formatter(&|y| format_thousands(*y))
            .y_desc(spec.axis_label.as_str())
            .draw()?;

        let slots = group_slots(spec.series.len());
        for (j, series) in spec.series.iter().enumerate() {
            let color = self.color(spec, j);
            let (offset, width) = slots[j];
            chart
                .draw_series(series.values.iter().enumerate().map(|(i, v)| {
                    let x0 = i as f64 + offset;
                    Rectangle::new([(x0, 0.0), (x0 + width, *v)], color.filled())
                }))?
                .label(series.name.as_str())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
        }

        draw_legend(&mut chart)
    }

    fn draw_stacked_bar(&self, root: &Area<'_>, spec: &ChartSpec, percent: bool) -> DrawResult {
        let n = spec.labels.len();
        let stacked = stack_values(&spec.series, percent);
        let max = if percent {
            100.0
        } else {
            axis_max((0..n).map(|i| stacked.iter().map(|s| s[i]).sum::<f64>()))
        };

        let mut chart = ChartBuilder::on(root)
            .caption(&spec.title, caption_font())
            .margin(16)
            .x_label_area_size(60)
            .y_label_area_size(80)
            .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), 0f64..max)?;

        let y_format = |y: &f64| {
            if percent {
                format!("{:.0}%", y)
            } else {
                format_thousands(*y)
            }
        };
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(n)
            .x_label_formatter(&|x| category_label(&spec.labels, *x))
            .y_label_formatter(&y_format)
            .y_desc(spec.axis_label.as_str())
            .draw()?;

        let mut bottoms = vec![0.0; n];
        for (j, (series, values)) in spec.series.iter().zip(&stacked).enumerate() {
            let color = self.color(spec, j);
            let bars: Vec<_> = values
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    let bar = Rectangle::new(
                        [(i as f64 - 0.4, bottoms[i]), (i as f64 + 0.4, bottoms[i] + v)],
                        color.filled(),
                    );
                    bottoms[i] += v;
                    bar
                })
                .collect();
            chart
                .draw_series(bars)?
                .label(series.name.as_str())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
        }

        draw_legend(&mut chart)
    }

    fn draw_line(&self, root: &Area<'_>, spec: &ChartSpec) -> DrawResult {
        let n = spec.labels.len();
        let max = axis_max(spec.series.iter().flat_map(|s| s.values.iter().copied()));

        let mut chart = ChartBuilder::on(root)
            .caption(&spec.title, caption_font())
            .margin(16)
            .x_label_area_size(60)
            .y_label_area_size(80)
            .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), 0f64..max)?;

        chart
            .configure_mesh()
            .x_labels(n)
            .x_label_formatter(&|x| category_label(&spec.labels, *x))
            .y_label_formatter(&|y| format_thousands(*y))
            .y_desc(spec.axis_label.as_str())
            .draw()?;

        for (j, series) in spec.series.iter().enumerate() {
            let color = self.color(spec, j);
            let points: Vec<(f64, f64)> = series
                .values
                .iter()
                .enumerate()
                .map(|(i, v)| (i as f64, *v))
                .collect();
            chart
                .draw_series(LineSeries::new(points.clone(), color.stroke_width(2)))?
                .label(series.name.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 14, y)], color.stroke_width(2)));
            chart.draw_series(points.into_iter().map(|p| Circle::new(p, 4, color.filled())))?;
        }

        draw_legend(&mut chart)
    }

    fn draw_donut(&self, root: &Area<'_>, spec: &ChartSpec) -> DrawResult {
        let area = root.titled(&spec.title, caption_font())?;
        let (w, h) = area.dim_in_pixel();
        let (w, h) = (w as f64, h as f64);

        let center = (w * 0.36, h * 0.5);
        let outer = (w * 0.3).min(h * 0.44);
        let inner = outer * DONUT_INNER_RATIO;

        let shares = &spec.series[0].values;
        let total: f64 = shares.iter().sum();

        let mut start = -PI / 2.0;
        for (i, share) in shares.iter().enumerate() {
            let sweep = share / total * 2.0 * PI;
            if sweep <= 0.0 {
                continue;
            }
            let color = self.color(spec, i);
            area.draw(&Polygon::new(
                wedge(center, inner, outer, start, start + sweep),
                color.filled(),
            ))?;

            let mid = start + sweep / 2.0;
            let radius = (inner + outer) / 2.0;
            area.draw(&Text::new(
                format!("{:.1}%", share / total * 100.0),
                to_pixel(center, radius, mid),
                value_font()
                    .color(&WHITE)
                    .pos(Pos::new(HPos::Center, VPos::Center)),
            ))?;
            start += sweep;
        }

        let legend_x = (w * 0.72) as i32;
        let top = (h * 0.5) as i32 - (shares.len() as i32 * 24) / 2;
        for (i, (label, share)) in spec.labels.iter().zip(shares).enumerate() {
            let y = top + i as i32 * 24;
            let color = self.color(spec, i);
            area.draw(&Rectangle::new(
                [(legend_x, y), (legend_x + 14, y + 14)],
                color.filled(),
            ))?;
            area.draw(&Text::new(
                format!("{} ({:.1}%)", label, share / total * 100.0),
                (legend_x + 22, y),
                value_font(),
            ))?;
        }
        Ok(())
    }
}

fn with_series(spec: ChartSpec, series: Vec<Series>) -> ChartSpec {
    series.into_iter().fold(spec, ChartSpec::series)
}

fn draw_legend<'a>(chart: &mut Chart<'a, 'a>) -> DrawResult {
    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&WHITE.mix(0.85))
        .border_style(&BLACK)
        .label_font(value_font())
        .draw()?;
    Ok(())
}

fn caption_font() -> TextStyle<'static> {
    ("sans-serif", 22).into_font().color(&BLACK)
}

fn value_font() -> TextStyle<'static> {
    ("sans-serif", 13).into_font().color(&BLACK)
}

/// Pair labels with values, largest first; ties keep input order.
pub(crate) fn rank_descending(labels: &[String], values: &[f64]) -> Vec<(String, f64)> {
    let mut ranked: Vec<(String, f64)> = labels.iter().cloned().zip(values.iter().copied()).collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    ranked
}

/// Offset from the tick and width of each series' bar within a group.
pub(crate) fn group_slots(series_count: usize) -> Vec<(f64, f64)> {
    let width = 0.8 / series_count.max(1) as f64;
    (0..series_count)
        .map(|j| (-0.4 + j as f64 * width, width))
        .collect()
}

/// Series-major values, each label's column scaled to 100 when `percent`.
pub(crate) fn stack_values(series: &[Series], percent: bool) -> Vec<Vec<f64>> {
    if !percent {
        return series.iter().map(|s| s.values.clone()).collect();
    }
    let n = series.first().map(|s| s.values.len()).unwrap_or(0);
    let totals: Vec<f64> = (0..n)
        .map(|i| series.iter().map(|s| s.values[i]).sum())
        .collect();
    series
        .iter()
        .map(|s| {
            s.values
                .iter()
                .zip(&totals)
                .map(|(v, total)| if *total > 0.0 { v / total * 100.0 } else { 0.0 })
                .collect()
        })
        .collect()
}

fn axis_max(values: impl Iterator<Item = f64>) -> f64 {
    let max = values.fold(0.0_f64, f64::max);
    if max > 0.0 {
        max * 1.12
    } else {
        1.0
    }
}

fn category_label(labels: &[String], value: f64) -> String {
    let index = value.round();
    if (value - index).abs() > 1e-6 || index < 0.0 {
        return String::new();
    }
    labels.get(index as usize).cloned().unwrap_or_default()
}

fn to_pixel(center: (f64, f64), radius: f64, angle: f64) -> (i32, i32) {
    (
        (center.0 + radius * angle.cos()).round() as i32,
        (center.1 + radius * angle.sin()).round() as i32,
    )
}

fn wedge(center: (f64, f64), inner: f64, outer: f64, from: f64, to: f64) -> Vec<(i32, i32)> {
    let steps = (((to - from) / (2.0 * PI) * 180.0).ceil() as usize).max(2);
    let step = (to - from) / steps as f64;
    let mut points: Vec<(i32, i32)> = (0..=steps)
        .map(|k| to_pixel(center, outer, from + step * k as f64))
        .collect();
    points.extend((0..=steps).rev().map(|k| to_pixel(center, inner, from + step * k as f64)));
    points
}
