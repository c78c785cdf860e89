//! Deterministic raster rendering of simple figures.
//!
//! The comparison engine treats rendering as an opaque step that produces an
//! image file; this module is the in-crate implementation of that step for
//! fixtures, the CLI demo and the benchmark. Everything here is fully
//! deterministic: no timestamps, no randomness, no platform-dependent fonts
//! (text uses fixed 8x8 glyphs), so identical input series always encode to
//! identical PNG bytes.

use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::{ImageBuffer, RgbImage};
use std::io::Cursor;

/// Result type for render operations
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors raised while encoding or decoding framebuffer images
#[derive(Debug)]
pub enum RenderError {
    /// PNG encode/decode failure
    Codec(String),
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::Codec(msg) => write!(f, "Codec error: {}", msg),
        }
    }
}

impl std::error::Error for RenderError {}

/// Width of the figures produced by [`plot_series`]
pub const PLOT_WIDTH: u32 = 320;

/// Height of the figures produced by [`plot_series`]
pub const PLOT_HEIGHT: u32 = 240;

/// Margin between the figure edge and the axes frame
const PLOT_MARGIN: u32 = 24;

/// An RGB framebuffer with a small drawing API
///
/// - `fill()` - Fill the buffer with a color
/// - `draw_rect()` - Draw a filled rectangle
/// - `draw_line()` - Draw a one-pixel line (Bresenham)
/// - `draw_text()` - Draw text using font8x8 glyphs
/// - `get_pixel()` / `set_pixel()` - Direct pixel access
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framebuffer {
    /// Width in pixels
    width: u32,
    /// Height in pixels
    height: u32,
    /// RGB pixel buffer (row-major, 3 bytes per pixel)
    buffer: Vec<u8>,
}

impl Framebuffer {
    /// Create a framebuffer with the given dimensions, initialized to black
    pub fn new(width: u32, height: u32) -> Self {
        let buffer = vec![0u8; (width * height * 3) as usize];
        Self {
            width,
            height,
            buffer,
        }
    }

    /// Create a framebuffer initialized to a specific color
    pub fn with_color(width: u32, height: u32, color: [u8; 3]) -> Self {
        let mut fb = Self::new(width, height);
        fb.fill(color);
        fb
    }

    /// Load a framebuffer from PNG image bytes
    pub fn from_png_bytes(data: &[u8]) -> RenderResult<Self> {
        let img = image::load_from_memory(data)
            .map_err(|e| RenderError::Codec(format!("failed to load PNG: {}", e)))?;
        let rgb = img.to_rgb8();
        Ok(Self {
            width: rgb.width(),
            height: rgb.height(),
            buffer: rgb.into_raw(),
        })
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Fill the entire framebuffer with a color
    pub fn fill(&mut self, color: [u8; 3]) {
        for chunk in self.buffer.chunks_exact_mut(3) {
            chunk[0] = color[0];
            chunk[1] = color[1];
            chunk[2] = color[2];
        }
    }

    /// Set a single pixel; out-of-bounds coordinates are ignored
    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = ((y * self.width + x) * 3) as usize;
        self.buffer[idx] = color[0];
        self.buffer[idx + 1] = color[1];
        self.buffer[idx + 2] = color[2];
    }

    /// Read a single pixel
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let idx = ((y * self.width + x) * 3) as usize;
        [self.buffer[idx], self.buffer[idx + 1], self.buffer[idx + 2]]
    }

    /// Draw a filled rectangle
    pub fn draw_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: [u8; 3]) {
        for py in y..(y + h).min(self.height) {
            for px in x..(x + w).min(self.width) {
                self.set_pixel(px, py, color);
            }
        }
    }

    /// Draw a one-pixel-wide line between two points (Bresenham)
    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: [u8; 3]) {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let (mut x, mut y) = (x0, y0);

        loop {
            if x >= 0 && y >= 0 {
                self.set_pixel(x as u32, y as u32, color);
            }
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Draw text using font8x8 glyphs
    ///
    /// Each character is 8x8 pixels. Text does not wrap.
    pub fn draw_text(&mut self, x: u32, y: u32, text: &str, fg: [u8; 3], bg: [u8; 3]) {
        let mut cursor_x = x;
        for ch in text.chars() {
            self.draw_char(cursor_x, y, ch, fg, bg);
            cursor_x += 8;
            if cursor_x >= self.width {
                break;
            }
        }
    }

    /// Draw a single character using font8x8
    fn draw_char(&mut self, x: u32, y: u32, ch: char, fg: [u8; 3], bg: [u8; 3]) {
        let glyph = BASIC_FONTS.get(ch).unwrap_or([0u8; 8]);
        for (row_idx, row) in glyph.iter().enumerate() {
            let py = y + row_idx as u32;
            for bit in 0..8u32 {
                let px = x + bit;
                let on = (row >> bit) & 1 == 1;
                self.set_pixel(px, py, if on { fg } else { bg });
            }
        }
    }

    /// Encode the framebuffer as PNG bytes
    pub fn to_png(&self) -> RenderResult<Vec<u8>> {
        let img: RgbImage =
            ImageBuffer::from_raw(self.width, self.height, self.buffer.clone())
                .ok_or_else(|| RenderError::Codec("buffer size mismatch".to_string()))?;
        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .map_err(|e| RenderError::Codec(e.to_string()))?;
        Ok(png)
    }
}

/// Render a line plot of a data series into a fixed-size figure.
///
/// White background, dark axes frame, a single polyline through the series
/// with square point markers, and a fixed title. A one-element series draws
/// its point without a line. Values are scaled to the data range; a constant
/// series plots along the vertical center.
pub fn plot_series(series: &[f64]) -> Framebuffer {
    let mut fb = Framebuffer::with_color(PLOT_WIDTH, PLOT_HEIGHT, [255, 255, 255]);

    let left = PLOT_MARGIN;
    let top = PLOT_MARGIN;
    let right = PLOT_WIDTH - PLOT_MARGIN;
    let bottom = PLOT_HEIGHT - PLOT_MARGIN;

    // Axes frame
    fb.draw_line(left as i32, top as i32, right as i32, top as i32, [40, 40, 40]);
    fb.draw_line(left as i32, bottom as i32, right as i32, bottom as i32, [40, 40, 40]);
    fb.draw_line(left as i32, top as i32, left as i32, bottom as i32, [40, 40, 40]);
    fb.draw_line(right as i32, top as i32, right as i32, bottom as i32, [40, 40, 40]);

    fb.draw_text(left, 8, "figcheck", [40, 40, 40], [255, 255, 255]);

    if series.is_empty() {
        return fb;
    }

    let min = series.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = series.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;

    let inner_w = (right - left - 8) as f64;
    let inner_h = (bottom - top - 8) as f64;

    let coords: Vec<(i32, i32)> = series
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let fx = if series.len() > 1 {
                i as f64 / (series.len() - 1) as f64
            } else {
                0.5
            };
            let fy = if span > 0.0 { (value - min) / span } else { 0.5 };
            let x = left as f64 + 4.0 + fx * inner_w;
            let y = bottom as f64 - 4.0 - fy * inner_h;
            (x as i32, y as i32)
        })
        .collect();

    for pair in coords.windows(2) {
        fb.draw_line(pair[0].0, pair[0].1, pair[1].0, pair[1].1, [30, 80, 200]);
    }
    for (x, y) in &coords {
        fb.draw_rect((x - 1).max(0) as u32, (y - 1).max(0) as u32, 3, 3, [30, 80, 200]);
    }

    fb
}
