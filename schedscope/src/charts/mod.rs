//! # Charts
//!
//! Drawing of the per-process strips, the relative time bar, the
//! parallel-process band chart and the histogram. Chart builders only talk to the [`Canvas`] trait, so the
//! image format is up to the caller:
//!
//! - [`RecordingCanvas`] keeps the primitives in memory (tests, custom
//!   renderers)
//! - [`SvgCanvas`] writes them out as an SVG document
//!
//! Coordinates are in pixels with the origin at the top-left corner. Text
//! is positioned by its baseline.

pub mod histogram_chart;
pub mod parallel;
pub mod process_strip;
pub mod svg;
pub mod theme;
pub mod time_bar;

pub use histogram_chart::{draw_histogram_chart, HISTOGRAM_CHART_H, HISTOGRAM_CHART_W};
pub use parallel::{draw_parallel_chart, PARALLEL_CHART_H};
pub use process_strip::{draw_process_strip, TRACE_H};
pub use svg::SvgCanvas;
pub use time_bar::{draw_time_bar, TimeScale, TIME_BAR_H};

/// Approximate advance of one character of the default font
pub const CHAR_WIDTH: u32 = 7;

/// Distance from the top of a text line to its baseline
pub const TEXT_ASCENT: i32 = 11;

/// 8-bit color with alpha
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub alpha: u8,
}

impl Rgb {
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, alpha: 255 }
    }

    #[must_use]
    pub const fn with_alpha(self, alpha: u8) -> Self {
        Self { alpha, ..self }
    }

    /// `#rrggbb`, without alpha
    pub fn hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Drawing surface used by the chart builders
pub trait Canvas {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32, color: Rgb);
    fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgb);
    /// Draw `text` with its baseline at `y`
    fn draw_text(&mut self, x: i32, y: i32, text: &str, color: Rgb);

    /// Draw `text` turned by `degrees` around its start point, clockwise.
    /// Surfaces that cannot rotate draw it level.
    fn draw_text_rotated(&mut self, x: i32, y: i32, text: &str, _degrees: i32, color: Rgb) {
        self.draw_text(x, y, text, color);
    }

    fn text_width(&self, text: &str) -> u32 {
        u32::try_from(text.chars().count()).unwrap_or(u32::MAX).saturating_mul(CHAR_WIDTH)
    }
}

/// One drawing call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Primitive {
    Rect { x: i32, y: i32, w: u32, h: u32, color: Rgb },
    Line { x0: i32, y0: i32, x1: i32, y1: i32, color: Rgb },
    Text { x: i32, y: i32, text: String, color: Rgb },
}

/// Canvas that remembers every drawing call
#[derive(Debug, Clone)]
pub struct RecordingCanvas {
    width: u32,
    height: u32,
    pub primitives: Vec<Primitive>,
}

impl RecordingCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, primitives: Vec::new() }
    }

    /// Rectangles drawn in `color`
    pub fn rects(&self, color: Rgb) -> Vec<(i32, i32, u32, u32)> {
        self.primitives
            .iter()
            .filter_map(|p| match *p {
                Primitive::Rect { x, y, w, h, color: c } if c == color => Some((x, y, w, h)),
                _ => None,
            })
            .collect()
    }

    /// Lines drawn in `color`
    pub fn lines(&self, color: Rgb) -> Vec<(i32, i32, i32, i32)> {
        self.primitives
            .iter()
            .filter_map(|p| match *p {
                Primitive::Line { x0, y0, x1, y1, color: c } if c == color => Some((x0, y0, x1, y1)),
                _ => None,
            })
            .collect()
    }

    pub fn texts(&self) -> Vec<&str> {
        self.primitives
            .iter()
            .filter_map(|p| match p {
                Primitive::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Canvas for RecordingCanvas {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32, color: Rgb) {
        self.primitives.push(Primitive::Rect { x, y, w, h, color });
    }

    fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgb) {
        self.primitives.push(Primitive::Line { x0, y0, x1, y1, color });
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str, color: Rgb) {
        self.primitives.push(Primitive::Text { x, y, text: text.to_string(), color });
    }
}

/// Horizontal pixel of `offset_us` on a chart `width` pixels wide that
/// spans `duration_us`
pub(crate) fn time_to_x(offset_us: u64, duration_us: u64, width: u32) -> i32 {
    if duration_us == 0 {
        return 0;
    }
    let x = u128::from(offset_us) * u128::from(width) / u128::from(duration_us);
    i32::try_from(x).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_to_x() {
        assert_eq!(time_to_x(0, 200, 600), 0);
        assert_eq!(time_to_x(50, 200, 600), 150);
        assert_eq!(time_to_x(200, 200, 600), 600);
        assert_eq!(time_to_x(10, 0, 600), 0);
    }

    #[test]
    fn test_hex() {
        assert_eq!(theme::DISK_WAIT.hex(), "#ffff00");
        assert_eq!(theme::GUIDELINE.alpha, 128);
    }

    #[test]
    fn test_recording_canvas_filters() {
        let mut canvas = RecordingCanvas::new(10, 10);
        canvas.fill_rect(0, 0, 10, 10, theme::BLACK);
        canvas.draw_line(0, 5, 9, 5, theme::DISK_WAIT);
        canvas.draw_text(1, 2, "hi", theme::WHITE);

        assert_eq!(canvas.rects(theme::BLACK), vec![(0, 0, 10, 10)]);
        assert_eq!(canvas.lines(theme::DISK_WAIT), vec![(0, 5, 9, 5)]);
        assert_eq!(canvas.texts(), vec!["hi"]);
        assert_eq!(canvas.text_width("hi"), 14);
    }
}
