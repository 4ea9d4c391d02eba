//! Line and horizontal bar charts drawn onto a figure

use super::canvas::{colors, Canvas, LineStyle, Marker};
use super::glyphs::{text_width, GLYPH_HEIGHT};
use crate::error::{ForecastError, Result};
use image::Rgb;
use std::path::Path;

/// Matplotlib-like resolution used for every chart
pub const DPI: u32 = 150;

const TITLE_SCALE: u32 = 3;
const LABEL_SCALE: u32 = 2;
const TICK_SCALE: u32 = 2;

/// An owned raster figure sized in inches.
///
/// Each plotting call creates one and drops it when done, so nothing is
/// shared between charts.
#[derive(Debug)]
pub struct Figure {
    canvas: Canvas,
    dpi: u32,
}

impl Figure {
    pub fn new(figsize: (f64, f64), dpi: u32) -> Result<Self> {
        let (w, h) = figsize;
        if !(w > 0.0 && h > 0.0 && w.is_finite() && h.is_finite()) {
            return Err(ForecastError::VisualizationError(format!(
                "Invalid figure size {:?}",
                figsize
            )));
        }
        let width = (w * dpi as f64).round() as u32;
        let height = (h * dpi as f64).round() as u32;
        Ok(Self {
            canvas: Canvas::new(width, height),
            dpi,
        })
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    /// Crop to a tight bounding box with 0.1 in padding and write a PNG
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let padding = (0.1 * self.dpi as f64).round() as u32;
        self.canvas.crop_to_content(padding).write_png(path, self.dpi)
    }
}

/// One plotted line
#[derive(Debug, Clone)]
pub struct LineSeries {
    pub label: String,
    pub points: Vec<(f64, f64)>,
    pub color: Rgb<u8>,
    pub style: LineStyle,
    pub marker: Marker,
}

/// A full-height vertical marker line
#[derive(Debug, Clone)]
pub struct VerticalLine {
    pub label: String,
    pub x: f64,
    pub color: Rgb<u8>,
    pub style: LineStyle,
}

/// Line chart with a labelled category axis
#[derive(Debug, Clone, Default)]
pub struct LineChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<LineSeries>,
    pub vlines: Vec<VerticalLine>,
    /// Candidate x tick positions and their labels
    pub x_ticks: Vec<(f64, String)>,
}

/// Horizontal bar chart, first bar on top
#[derive(Debug, Clone, Default)]
pub struct BarChart {
    pub title: String,
    pub x_label: String,
    pub bars: Vec<(String, f64)>,
    pub color: Option<Rgb<u8>>,
}

/// Pixel rectangle of the plotting area
#[derive(Debug, Clone, Copy)]
struct PlotArea {
    left: f64,
    top: f64,
    right: f64,
    bottom: f64,
}

impl PlotArea {
    fn map_x(&self, x: f64, range: (f64, f64)) -> f64 {
        self.left + (x - range.0) / (range.1 - range.0) * (self.right - self.left)
    }

    fn map_y(&self, y: f64, range: (f64, f64)) -> f64 {
        self.bottom - (y - range.0) / (range.1 - range.0) * (self.bottom - self.top)
    }
}

/// Step from the 1-2-5 sequence giving roughly `target` intervals over `span`
pub fn nice_step(span: f64, target: usize) -> f64 {
    if !(span > 0.0 && span.is_finite()) {
        return 1.0;
    }
    let raw = span / target.max(1) as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    let fraction = raw / magnitude;
    let nice = if fraction <= 1.0 {
        1.0
    } else if fraction <= 2.0 {
        2.0
    } else if fraction <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

/// Tick values that are multiples of `step` within `range`
pub fn ticks(range: (f64, f64), step: f64) -> Vec<f64> {
    let first = (range.0 / step).ceil() as i64;
    let last = (range.1 / step).floor() as i64;
    (first..=last).map(|i| i as f64 * step).collect()
}

/// Tick label with just enough decimals for `step`
pub fn format_tick(value: f64, step: f64) -> String {
    let decimals = if step >= 1.0 {
        0
    } else {
        (-step.log10().floor()) as usize
    };
    let text = format!("{:.*}", decimals, value);
    if text.trim_start_matches('-').chars().all(|c| c == '0' || c == '.') {
        format!("{:.*}", decimals, 0.0)
    } else {
        text
    }
}

fn padded_range(values: impl Iterator<Item = f64>, fraction: f64) -> Option<(f64, f64)> {
    let (min, max) = values
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })?;
    if max > min {
        let pad = (max - min) * fraction;
        Some((min - pad, max + pad))
    } else {
        Some((min - 1.0, max + 1.0))
    }
}

fn draw_title(canvas: &mut Canvas, title: &str, area: &PlotArea) {
    let width = text_width(title, TITLE_SCALE) as f64;
    let x = (area.left + area.right) / 2.0 - width / 2.0;
    let y = area.top - 20.0 - (GLYPH_HEIGHT * TITLE_SCALE) as f64;
    canvas.text(x.round() as i64, y.round() as i64, title, TITLE_SCALE, colors::BLACK);
}

fn draw_x_label(canvas: &mut Canvas, label: &str, area: &PlotArea, offset: f64) {
    let width = text_width(label, LABEL_SCALE) as f64;
    let x = (area.left + area.right) / 2.0 - width / 2.0;
    canvas.text(x.round() as i64, (area.bottom + offset).round() as i64, label, LABEL_SCALE, colors::BLACK);
}

impl LineChart {
    /// Render onto `figure`; fails when no series has a finite point
    pub fn draw(&self, figure: &mut Figure) -> Result<()> {
        let all_points = || self.series.iter().flat_map(|s| s.points.iter());
        let y_range = padded_range(all_points().map(|p| p.1), 0.05).ok_or_else(|| {
            ForecastError::VisualizationError("Nothing to plot".to_string())
        })?;
        let x_range = padded_range(
            all_points().map(|p| p.0).chain(self.vlines.iter().map(|v| v.x)),
            0.03,
        )
        .ok_or_else(|| ForecastError::VisualizationError("Nothing to plot".to_string()))?;

        let canvas = figure.canvas_mut();
        let (width, height) = (canvas.width() as f64, canvas.height() as f64);
        let area = PlotArea {
            left: 150.0,
            top: 80.0,
            right: width - 40.0,
            bottom: height - 110.0,
        };
        let line_width = (1.5 * DPI as f64 / 72.0).round();
        let marker_size = 6.0 * DPI as f64 / 72.0;

        // y grid and ticks
        let y_step = nice_step(y_range.1 - y_range.0, 6);
        for value in ticks(y_range, y_step) {
            let y = area.map_y(value, y_range);
            canvas.line((area.left, y), (area.right, y), colors::GRID, 1.0, LineStyle::Solid);
            let label = format_tick(value, y_step);
            let w = text_width(&label, TICK_SCALE) as f64;
            let h = (GLYPH_HEIGHT * TICK_SCALE) as f64;
            canvas.fill_rect((area.left - 8.0) as i64, y as i64, 8, 2, colors::BLACK);
            canvas.text((area.left - 14.0 - w) as i64, (y - h / 2.0) as i64, &label, TICK_SCALE, colors::BLACK);
        }

        // x grid and thinned ticks
        let visible: Vec<&(f64, String)> = self
            .x_ticks
            .iter()
            .filter(|(x, _)| *x >= x_range.0 && *x <= x_range.1)
            .collect();
        let widest = visible
            .iter()
            .map(|(_, l)| text_width(l, TICK_SCALE))
            .max()
            .unwrap_or(0) as f64;
        let spacing = if visible.len() > 1 {
            (area.right - area.left) / (x_range.1 - x_range.0) * (visible[1].0 - visible[0].0)
        } else {
            f64::INFINITY
        };
        let every = ((widest + 16.0) / spacing).ceil().max(1.0) as usize;
        for (x, label) in visible.into_iter().step_by(every) {
            let px = area.map_x(*x, x_range);
            canvas.line((px, area.top), (px, area.bottom), colors::GRID, 1.0, LineStyle::Solid);
            canvas.fill_rect(px as i64, area.bottom as i64, 2, 8, colors::BLACK);
            let w = text_width(label, TICK_SCALE) as f64;
            canvas.text((px - w / 2.0) as i64, (area.bottom + 14.0) as i64, label, TICK_SCALE, colors::BLACK);
        }

        canvas.stroke_rect(
            area.left as i64,
            area.top as i64,
            (area.right - area.left) as i64 + 1,
            (area.bottom - area.top) as i64 + 1,
            colors::BLACK,
        );

        for vline in &self.vlines {
            let px = area.map_x(vline.x, x_range);
            canvas.line((px, area.top), (px, area.bottom), vline.color, line_width, vline.style);
        }

        for series in &self.series {
            let pixels: Vec<(f64, f64)> = series
                .points
                .iter()
                .filter(|(x, y)| x.is_finite() && y.is_finite())
                .map(|&(x, y)| (area.map_x(x, x_range), area.map_y(y, y_range)))
                .collect();
            canvas.polyline(&pixels, series.color, line_width, series.style);
            for &(x, y) in &pixels {
                canvas.marker(x, y, series.marker, marker_size, series.color);
            }
        }

        self.draw_legend(canvas, &area, line_width, marker_size);
        draw_title(canvas, &self.title, &area);
        draw_x_label(canvas, &self.x_label, &area, 50.0);

        let y_label_width = text_width(&self.y_label, LABEL_SCALE) as f64;
        let y_label_bottom = (area.top + area.bottom) / 2.0 + y_label_width / 2.0;
        canvas.text_vertical(20, y_label_bottom as i64, &self.y_label, LABEL_SCALE, colors::BLACK);
        Ok(())
    }

    fn draw_legend(&self, canvas: &mut Canvas, area: &PlotArea, line_width: f64, marker_size: f64) {
        let entries: Vec<(&str, Rgb<u8>, LineStyle, Marker)> = self
            .series
            .iter()
            .map(|s| (s.label.as_str(), s.color, s.style, s.marker))
            .chain(
                self.vlines
                    .iter()
                    .map(|v| (v.label.as_str(), v.color, v.style, Marker::None)),
            )
            .filter(|(label, ..)| !label.is_empty())
            .collect();
        if entries.is_empty() {
            return;
        }

        let row_height = 30.0;
        let sample = 50.0;
        let text_w = entries
            .iter()
            .map(|(label, ..)| text_width(label, TICK_SCALE))
            .max()
            .unwrap_or(0) as f64;
        let (x0, y0) = (area.left + 15.0, area.top + 15.0);
        let box_w = sample + text_w + 40.0;
        let box_h = row_height * entries.len() as f64 + 12.0;

        canvas.fill_rect(x0 as i64, y0 as i64, box_w as i64, box_h as i64, colors::WHITE);
        canvas.stroke_rect(x0 as i64, y0 as i64, box_w as i64, box_h as i64, colors::LEGEND_EDGE);

        for (i, (label, color, style, marker)) in entries.into_iter().enumerate() {
            let cy = y0 + 6.0 + row_height * (i as f64 + 0.5);
            let (sx0, sx1) = (x0 + 10.0, x0 + 10.0 + sample);
            canvas.line((sx0, cy), (sx1, cy), color, line_width, style);
            canvas.marker((sx0 + sx1) / 2.0, cy, marker, marker_size, color);
            let h = (GLYPH_HEIGHT * TICK_SCALE) as f64;
            canvas.text((sx1 + 12.0) as i64, (cy - h / 2.0) as i64, label, TICK_SCALE, colors::BLACK);
        }
    }
}

impl BarChart {
    /// Render onto `figure`; fails when there are no bars
    pub fn draw(&self, figure: &mut Figure) -> Result<()> {
        if self.bars.is_empty() {
            return Err(ForecastError::VisualizationError(
                "No bars to plot".to_string(),
            ));
        }
        let max = self.bars.iter().map(|b| b.1).fold(0.0_f64, f64::max);
        let min = self.bars.iter().map(|b| b.1).fold(0.0_f64, f64::min);
        let span = if max > min { max - min } else { 1.0 };
        let x_range = (min, max + span * 0.05);

        let label_w = self
            .bars
            .iter()
            .map(|(name, _)| text_width(name, TICK_SCALE))
            .max()
            .unwrap_or(0) as f64;

        let canvas = figure.canvas_mut();
        let (width, height) = (canvas.width() as f64, canvas.height() as f64);
        let area = PlotArea {
            left: label_w + 40.0,
            top: 80.0,
            right: width - 40.0,
            bottom: height - 100.0,
        };
        if area.right - area.left < 50.0 {
            return Err(ForecastError::VisualizationError(
                "Feature names too long for the figure width".to_string(),
            ));
        }

        let x_step = nice_step(x_range.1 - x_range.0, 6);
        for value in ticks(x_range, x_step) {
            let px = area.map_x(value, x_range);
            canvas.line((px, area.top), (px, area.bottom), colors::GRID, 1.0, LineStyle::Solid);
            canvas.fill_rect(px as i64, area.bottom as i64, 2, 8, colors::BLACK);
            let label = format_tick(value, x_step);
            let w = text_width(&label, TICK_SCALE) as f64;
            canvas.text((px - w / 2.0) as i64, (area.bottom + 14.0) as i64, &label, TICK_SCALE, colors::BLACK);
        }

        let slot = (area.bottom - area.top) / self.bars.len() as f64;
        let color = self.color.unwrap_or(colors::STEEL_BLUE);
        let zero = area.map_x(0.0, x_range);
        for (i, (name, value)) in self.bars.iter().enumerate() {
            let top = area.top + slot * (i as f64 + 0.1);
            let end = area.map_x(*value, x_range);
            let (x0, x1) = if end >= zero { (zero, end) } else { (end, zero) };
            canvas.fill_rect(
                x0.round() as i64,
                top.round() as i64,
                (x1 - x0).round().max(1.0) as i64,
                (slot * 0.8).round().max(1.0) as i64,
                color,
            );

            let w = text_width(name, TICK_SCALE) as f64;
            let h = (GLYPH_HEIGHT * TICK_SCALE) as f64;
            let cy = area.top + slot * (i as f64 + 0.5);
            canvas.text((area.left - 12.0 - w) as i64, (cy - h / 2.0) as i64, name, TICK_SCALE, colors::BLACK);
        }

        canvas.stroke_rect(
            area.left as i64,
            area.top as i64,
            (area.right - area.left) as i64 + 1,
            (area.bottom - area.top) as i64 + 1,
            colors::BLACK,
        );
        draw_title(canvas, &self.title, &area);
        draw_x_label(canvas, &self.x_label, &area, 45.0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nice_steps() {
        assert_eq!(nice_step(10.0, 5), 2.0);
        assert_eq!(nice_step(1000.0, 4), 500.0);
        assert_eq!(nice_step(0.7, 6), 0.2);
        assert_eq!(nice_step(0.0, 6), 1.0);
    }

    #[test]
    fn test_ticks_and_labels() {
        assert_eq!(ticks((-1.0, 7.5), 2.0), vec![0.0, 2.0, 4.0, 6.0]);
        assert_eq!(format_tick(1500.0, 500.0), "1500");
        assert_eq!(format_tick(0.30000000000000004, 0.1), "0.3");
        assert_eq!(format_tick(-0.0, 0.1), "0.0");
    }

    #[test]
    fn test_figure_pixel_size() {
        let figure = Figure::new((12.0, 5.0), DPI).unwrap();
        assert_eq!((figure.canvas().width(), figure.canvas().height()), (1800, 750));
        assert!(Figure::new((0.0, 5.0), DPI).is_err());
    }

    #[test]
    fn test_empty_line_chart_is_an_error() {
        let mut figure = Figure::new((4.0, 3.0), DPI).unwrap();
        assert!(LineChart::default().draw(&mut figure).is_err());
        assert!(BarChart::default().draw(&mut figure).is_err());
    }
}
