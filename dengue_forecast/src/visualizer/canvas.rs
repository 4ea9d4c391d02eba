//! Raster drawing primitives on an RGB image

use super::glyphs::{self, ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH};
use crate::error::Result;
use image::{imageops, Rgb, RgbImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Chart colors
pub mod colors {
    use image::Rgb;

    pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
    pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
    pub const BLUE: Rgb<u8> = Rgb([0, 0, 255]);
    pub const GREEN: Rgb<u8> = Rgb([0, 128, 0]);
    pub const RED: Rgb<u8> = Rgb([255, 0, 0]);
    pub const GRAY: Rgb<u8> = Rgb([128, 128, 128]);
    pub const GRID: Rgb<u8> = Rgb([225, 225, 225]);
    pub const STEEL_BLUE: Rgb<u8> = Rgb([70, 130, 180]);
    pub const LEGEND_EDGE: Rgb<u8> = Rgb([204, 204, 204]);
}

/// Stroke pattern of a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Solid,
    Dashed,
    Dotted,
}

impl LineStyle {
    /// (on, off) lengths in pixels for a line of the given width
    fn pattern(self, width: f64) -> Option<(f64, f64)> {
        match self {
            LineStyle::Solid => None,
            LineStyle::Dashed => Some((3.7 * width, 1.6 * width)),
            LineStyle::Dotted => Some((width, 1.65 * width)),
        }
    }
}

/// Point marker drawn at each data point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    None,
    Circle,
    Square,
}

/// White RGB canvas with anti-alias-free primitives
#[derive(Debug, Clone)]
pub struct Canvas {
    image: RgbImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbImage::from_pixel(width.max(1), height.max(1), colors::WHITE),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Set a pixel, ignoring coordinates outside the canvas
    pub fn put(&mut self, x: i64, y: i64, color: Rgb<u8>) {
        if x >= 0 && y >= 0 && x < self.width() as i64 && y < self.height() as i64 {
            self.image.put_pixel(x as u32, y as u32, color);
        }
    }

    pub fn fill_rect(&mut self, x: i64, y: i64, width: i64, height: i64, color: Rgb<u8>) {
        for py in y..y + height {
            for px in x..x + width {
                self.put(px, py, color);
            }
        }
    }

    /// One-pixel rectangle outline
    pub fn stroke_rect(&mut self, x: i64, y: i64, width: i64, height: i64, color: Rgb<u8>) {
        self.fill_rect(x, y, width, 1, color);
        self.fill_rect(x, y + height - 1, width, 1, color);
        self.fill_rect(x, y, 1, height, color);
        self.fill_rect(x + width - 1, y, 1, height, color);
    }

    /// Filled disc centred on `(cx, cy)`
    pub fn disc(&mut self, cx: f64, cy: f64, radius: f64, color: Rgb<u8>) {
        let r = radius.max(0.75);
        let (x0, x1) = ((cx - r).floor() as i64, (cx + r).ceil() as i64);
        let (y0, y1) = ((cy - r).floor() as i64, (cy + r).ceil() as i64);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let (dx, dy) = (x as f64 - cx, y as f64 - cy);
                if dx * dx + dy * dy <= r * r {
                    self.put(x, y, color);
                }
            }
        }
    }

    /// Connected line through `points`; dash patterns continue across vertices
    pub fn polyline(&mut self, points: &[(f64, f64)], color: Rgb<u8>, width: f64, style: LineStyle) {
        let pattern = style.pattern(width);
        let radius = width / 2.0;
        let mut travelled = 0.0;

        for pair in points.windows(2) {
            let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
            let length = ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt();
            let steps = (length / 0.5).ceil().max(1.0) as usize;

            for i in 0..=steps {
                let t = i as f64 / steps as f64;
                let along = travelled + t * length;
                let on = pattern.map_or(true, |(on, off)| along % (on + off) < on);
                if on {
                    self.disc(x0 + t * (x1 - x0), y0 + t * (y1 - y0), radius, color);
                }
            }
            travelled += length;
        }
    }

    pub fn line(&mut self, from: (f64, f64), to: (f64, f64), color: Rgb<u8>, width: f64, style: LineStyle) {
        self.polyline(&[from, to], color, width, style);
    }

    pub fn marker(&mut self, x: f64, y: f64, marker: Marker, size: f64, color: Rgb<u8>) {
        match marker {
            Marker::None => {}
            Marker::Circle => self.disc(x, y, size / 2.0, color),
            Marker::Square => {
                let half = size / 2.0;
                self.fill_rect(
                    (x - half).round() as i64,
                    (y - half).round() as i64,
                    size.round() as i64,
                    size.round() as i64,
                    color,
                );
            }
        }
    }

    /// Draw `text` with its top-left corner at `(x, y)`
    pub fn text(&mut self, x: i64, y: i64, text: &str, scale: u32, color: Rgb<u8>) {
        let s = scale as i64;
        for (i, c) in text.chars().enumerate() {
            let rows = glyphs::glyph(c);
            let origin = x + i as i64 * ADVANCE as i64 * s;
            for gy in 0..GLYPH_HEIGHT {
                for gx in 0..GLYPH_WIDTH {
                    if glyphs::is_set(&rows, gx, gy) {
                        self.fill_rect(origin + gx as i64 * s, y + gy as i64 * s, s, s, color);
                    }
                }
            }
        }
    }

    /// Draw `text` rotated a quarter turn counter-clockwise, reading upwards
    /// from `(x, bottom)`
    pub fn text_vertical(&mut self, x: i64, bottom: i64, text: &str, scale: u32, color: Rgb<u8>) {
        let s = scale as i64;
        for (i, c) in text.chars().enumerate() {
            let rows = glyphs::glyph(c);
            let offset = i as i64 * ADVANCE as i64;
            for gy in 0..GLYPH_HEIGHT {
                for gx in 0..GLYPH_WIDTH {
                    if glyphs::is_set(&rows, gx, gy) {
                        let px = x + gy as i64 * s;
                        let py = bottom - (offset + gx as i64 + 1) * s;
                        self.fill_rect(px, py, s, s, color);
                    }
                }
            }
        }
    }

    /// Smallest rectangle `(x, y, width, height)` holding every non-white pixel
    pub fn content_bounds(&self) -> Option<(u32, u32, u32, u32)> {
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for (x, y, pixel) in self.image.enumerate_pixels() {
            if *pixel == colors::WHITE {
                continue;
            }
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }
        bounds.map(|(x0, y0, x1, y1)| (x0, y0, x1 - x0 + 1, y1 - y0 + 1))
    }

    /// Crop to the content plus `padding` pixels on each side
    pub fn crop_to_content(&self, padding: u32) -> Canvas {
        let Some((x, y, w, h)) = self.content_bounds() else {
            return self.clone();
        };
        let x0 = x.saturating_sub(padding);
        let y0 = y.saturating_sub(padding);
        let x1 = (x + w + padding).min(self.width());
        let y1 = (y + h + padding).min(self.height());
        Canvas {
            image: imageops::crop_imm(&self.image, x0, y0, x1 - x0, y1 - y0).to_image(),
        }
    }

    /// Encode as PNG with the resolution recorded in the `pHYs` chunk
    pub fn write_png<P: AsRef<Path>>(&self, path: P, dpi: u32) -> Result<()> {
        let file = File::create(path.as_ref())?;
        let mut encoder = png::Encoder::new(BufWriter::new(file), self.width(), self.height());
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);

        let pixels_per_meter = (dpi as f64 / 0.0254).round() as u32;
        encoder.set_pixel_dims(Some(png::PixelDimensions {
            xppu: pixels_per_meter,
            yppu: pixels_per_meter,
            unit: png::Unit::Meter,
        }));

        let mut writer = encoder.write_header()?;
        writer.write_image_data(self.image.as_raw())?;
        writer.finish()?;
        Ok(())
    }
}
