//! Chart rendering for evaluation and forecast results
//!
//! Every plotting method writes one PNG under the output directory and
//! returns its path. Figures are created per call and dropped before the
//! method returns, on success and on error alike.

pub mod canvas;
pub mod chart;
pub mod glyphs;

use crate::error::{ForecastError, Result};
use crate::frame::{self, DATE, PREDICTED, TARGET, YEAR};
use crate::quarter::YearQuarter;
use crate::trainer::{FEATURE, IMPORTANCE};
use canvas::{colors, LineStyle, Marker};
use chart::{BarChart, Figure, LineChart, LineSeries, VerticalLine, DPI};
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

/// Width of a full importance bar in characters
const BAR_SCALE: f64 = 50.0;
const IMPORTANCE_FIGSIZE: (f64, f64) = (10.0, 6.0);

/// Renders pipeline results to PNG files
#[derive(Debug, Clone)]
pub struct Visualizer {
    output_dir: PathBuf,
    figsize: (f64, f64),
    show_plots: bool,
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new((12.0, 5.0), false)
    }
}

impl Visualizer {
    /// Visualizer writing to `outputs/plots` with the given line-chart size in inches
    pub fn new(figsize: (f64, f64), show_plots: bool) -> Self {
        Self {
            output_dir: PathBuf::from("outputs/plots"),
            figsize,
            show_plots,
        }
    }

    pub fn with_output_dir<P: Into<PathBuf>>(mut self, output_dir: P) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn figsize(&self) -> (f64, f64) {
        self.figsize
    }

    pub fn show_plots(&self) -> bool {
        self.show_plots
    }

    /// Copy of `df` with a `date` column holding the first day of each row's quarter
    pub fn add_quarter_date(df: &DataFrame) -> Result<DataFrame> {
        let dates: Vec<NaiveDate> = frame::quarter_column(df)?
            .iter()
            .map(YearQuarter::start_date)
            .collect();
        let mut out = df.clone();
        out.with_column(DateChunked::from_naive_date(DATE, dates).into_series())?;
        Ok(out)
    }

    /// Actual and predicted cases for an evaluation year, with optional
    /// training history from the `hist_years` years before it
    pub fn plot_actual_vs_predicted(
        &self,
        test_df: &DataFrame,
        predictions: &[f64],
        model_name: &str,
        year: i32,
        historical_df: Option<&DataFrame>,
        hist_years: i32,
    ) -> Result<PathBuf> {
        if test_df.height() == 0 {
            return Err(ForecastError::VisualizationError(format!(
                "No test rows to plot for {}",
                year
            )));
        }
        if predictions.len() != test_df.height() {
            return Err(ForecastError::VisualizationError(format!(
                "{} predictions for {} test rows",
                predictions.len(),
                test_df.height()
            )));
        }

        let test = Self::add_quarter_date(test_df)?;
        let test_x = date_axis(&test)?;
        let actual = frame::f64_column(&test, TARGET)?;

        let mut chart = LineChart {
            title: format!("{}: Actual vs Predicted ({})", year, model_name),
            x_label: "Quarter".to_string(),
            y_label: "Quarterly Cases".to_string(),
            ..Default::default()
        };

        if let Some(history) = historical_df {
            let years = frame::i32_column(history, YEAR)?;
            let mask: Vec<bool> = years
                .iter()
                .map(|y| y.map_or(false, |y| y >= year - hist_years && y < year))
                .collect();
            let context = frame::filter_rows(history, &mask)?;
            if context.height() > 0 {
                let context = Self::add_quarter_date(&context)?;
                chart.series.push(LineSeries {
                    label: "Historical (train)".to_string(),
                    points: points(&date_axis(&context)?, &frame::f64_column(&context, TARGET)?),
                    color: colors::BLUE,
                    style: LineStyle::Solid,
                    marker: Marker::None,
                });
            }
        }

        chart.series.push(LineSeries {
            label: format!("Actual ({})", year),
            points: points(&test_x, &actual),
            color: colors::GREEN,
            style: LineStyle::Solid,
            marker: Marker::Circle,
        });
        let predicted: Vec<Option<f64>> = predictions.iter().copied().map(Some).collect();
        chart.series.push(LineSeries {
            label: format!("Predicted ({})", year),
            points: points(&test_x, &predicted),
            color: colors::RED,
            style: LineStyle::Dashed,
            marker: Marker::Square,
        });

        let start = test_x.iter().flatten().copied().fold(f64::INFINITY, f64::min);
        chart.vlines.push(VerticalLine {
            label: "Forecast start".to_string(),
            x: start,
            color: colors::GRAY,
            style: LineStyle::Dotted,
        });
        chart.x_ticks = quarter_ticks(&chart);

        let mut figure = Figure::new(self.figsize, DPI)?;
        chart.draw(&mut figure)?;
        self.finish(figure, &format!("actual_vs_predicted_{}_{}.png", year, model_name))
    }

    /// Forecast for `forecast_year` joined onto the observed history
    pub fn plot_forecast(
        &self,
        forecast_df: &DataFrame,
        historical_df: &DataFrame,
        forecast_year: i32,
        model_name: &str,
        hist_start_year: Option<i32>,
    ) -> Result<PathBuf> {
        let history = match hist_start_year {
            Some(start) => {
                let mask: Vec<bool> = frame::i32_column(historical_df, YEAR)?
                    .iter()
                    .map(|y| y.map_or(false, |y| y >= start))
                    .collect();
                frame::filter_rows(historical_df, &mask)?
            }
            None => historical_df.clone(),
        };
        if history.height() == 0 {
            return Err(ForecastError::VisualizationError(
                "Historical data is empty; cannot plot forecast".to_string(),
            ));
        }
        if forecast_df.height() == 0 {
            return Err(ForecastError::VisualizationError(
                "Forecast is empty".to_string(),
            ));
        }

        let history = crate::features::sorted_by_quarter(&Self::add_quarter_date(&history)?)?;
        let history_points = points(&date_axis(&history)?, &frame::f64_column(&history, TARGET)?);
        let forecast = Self::add_quarter_date(forecast_df)?;
        let forecast_x = date_axis(&forecast)?;
        let mut forecast_points = points(&forecast_x, &frame::f64_column(&forecast, PREDICTED)?);

        // connect the forecast line to the last observed quarter
        if let Some(&last) = history_points.last() {
            forecast_points.insert(0, last);
        }

        let start = forecast_x.iter().flatten().copied().fold(f64::INFINITY, f64::min);
        let mut chart = LineChart {
            title: format!("{} Forecast ({})", forecast_year, model_name),
            x_label: "Quarter".to_string(),
            y_label: "Quarterly Cases".to_string(),
            series: vec![
                LineSeries {
                    label: "Historical".to_string(),
                    points: history_points,
                    color: colors::BLUE,
                    style: LineStyle::Solid,
                    marker: Marker::None,
                },
                LineSeries {
                    label: format!("Forecast {}", forecast_year),
                    points: forecast_points,
                    color: colors::RED,
                    style: LineStyle::Dashed,
                    marker: Marker::Circle,
                },
            ],
            vlines: vec![VerticalLine {
                label: "Forecast start".to_string(),
                x: start,
                color: colors::BLACK,
                style: LineStyle::Dotted,
            }],
            x_ticks: Vec::new(),
        };
        chart.x_ticks = quarter_ticks(&chart);

        let mut figure = Figure::new(self.figsize, DPI)?;
        chart.draw(&mut figure)?;
        self.finish(figure, &format!("forecast_{}_{}.png", forecast_year, model_name))
    }

    /// Horizontal bar chart of an importance frame, highest first
    pub fn plot_feature_importance(&self, importance_df: &DataFrame, title: &str) -> Result<PathBuf> {
        let chart = BarChart {
            title: title.to_string(),
            x_label: IMPORTANCE.to_string(),
            bars: importance_rows(importance_df)?,
            color: Some(colors::STEEL_BLUE),
        };

        let mut figure = Figure::new(IMPORTANCE_FIGSIZE, DPI)?;
        chart.draw(&mut figure)?;
        self.finish(figure, &format!("feature_importance_{}.png", sanitize_title(title)))
    }

    /// Print the text rendering of an importance frame to stdout
    pub fn print_feature_importance(importance_df: &DataFrame, title: &str) -> Result<()> {
        print!("{}", Self::render_feature_importance(importance_df, title)?);
        Ok(())
    }

    /// Banner, title and one `name value bar` line per feature
    pub fn render_feature_importance(importance_df: &DataFrame, title: &str) -> Result<String> {
        let banner = "=".repeat(80);
        let mut out = format!("\n{}\n[SEARCH] {}\n{}\n", banner, title, banner);
        for (feature, importance) in importance_rows(importance_df)? {
            out.push_str(&format!(
                "   {:<25} {:.4} {}\n",
                feature,
                importance,
                importance_bar(importance)
            ));
        }
        Ok(out)
    }

    fn finish(&self, figure: Figure, filename: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(filename);
        figure.save(&path)?;
        drop(figure);
        debug!("Saved plot {}", path.display());

        if self.show_plots {
            open_in_viewer(&path);
        }
        Ok(path)
    }
}

/// Lower-case `title` and replace anything but letters, digits, `-` and `_`
/// with `_`
pub fn sanitize_title(title: &str) -> String {
    title
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `floor(importance * 50)` block characters, none for negative or NaN values
/// and at most 50 (a full bar)
pub fn importance_bar(importance: f64) -> String {
    let len = (importance * BAR_SCALE).floor();
    if len > 0.0 {
        "█".repeat(len.min(BAR_SCALE) as usize)
    } else {
        String::new()
    }
}

fn importance_rows(importance_df: &DataFrame) -> Result<Vec<(String, f64)>> {
    let names = frame::str_column(importance_df, FEATURE)?;
    let values = frame::f64_column(importance_df, IMPORTANCE)?;
    Ok(names
        .into_iter()
        .zip(values)
        .map(|(n, v)| (n.unwrap_or_default(), v.unwrap_or(0.0)))
        .collect())
}

/// Plot x coordinates: days since the epoch of the `date` column
fn date_axis(df: &DataFrame) -> Result<Vec<Option<f64>>> {
    let days = df.column(DATE)?.cast(&DataType::Int32)?;
    Ok(days.i32()?.into_iter().map(|d| d.map(f64::from)).collect())
}

/// Days from 0001-01-01 to 1970-01-01, matching the polars `Date` encoding
const UNIX_EPOCH_FROM_CE: i32 = 719_163;

fn days_since_epoch(date: NaiveDate) -> f64 {
    f64::from(date.num_days_from_ce() - UNIX_EPOCH_FROM_CE)
}

fn points(xs: &[Option<f64>], ys: &[Option<f64>]) -> Vec<(f64, f64)> {
    xs.iter()
        .zip(ys.iter())
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect()
}

/// A labelled tick at every quarter start spanned by the chart
fn quarter_ticks(chart: &LineChart) -> Vec<(f64, String)> {
    let xs = chart
        .series
        .iter()
        .flat_map(|s| s.points.iter().map(|p| p.0))
        .chain(chart.vlines.iter().map(|v| v.x))
        .filter(|x| x.is_finite());
    let (lo, hi) = xs.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
        (lo.min(x), hi.max(x))
    });
    if lo > hi {
        return Vec::new();
    }

    let Some(first) = NaiveDate::from_num_days_from_ce_opt(lo.floor() as i32 + UNIX_EPOCH_FROM_CE)
    else {
        return Vec::new();
    };
    let mut ticks = Vec::new();
    let mut quarter = YearQuarter::from_date(first);
    loop {
        let x = days_since_epoch(quarter.start_date());
        if x > hi {
            break;
        }
        if x >= lo {
            ticks.push((x, quarter.to_string()));
        }
        quarter = quarter.next();
    }
    ticks
}

fn open_in_viewer(path: &Path) {
    let result = if cfg!(target_os = "macos") {
        Command::new("open").arg(path).spawn()
    } else if cfg!(target_os = "windows") {
        Command::new("cmd").args(["/C", "start", ""]).arg(path).spawn()
    } else {
        Command::new("xdg-open").arg(path).spawn()
    };
    if let Err(e) = result {
        warn!("Could not open {} in a viewer: {}", path.display(), e);
    }
}
