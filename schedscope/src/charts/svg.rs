//! SVG rendering of chart primitives.

use log::info;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use super::{Canvas, Rgb};
use crate::domain::ExportError;

/// Canvas that accumulates an SVG document
#[derive(Debug, Clone)]
pub struct SvgCanvas {
    width: u32,
    height: u32,
    body: String,
}

impl SvgCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, body: String::new() }
    }

    /// The finished document
    #[must_use]
    pub fn into_svg(self) -> String {
        format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\" \
             shape-rendering=\"crispEdges\" font-family=\"monospace\" font-size=\"12\">\n{body}</svg>\n",
            w = self.width,
            h = self.height,
            body = self.body,
        )
    }

    /// # Errors
    /// Returns [`ExportError::WriteFailed`] naming the file if it cannot be
    /// written.
    pub fn save(self, path: &Path) -> Result<(), ExportError> {
        fs::write(path, self.into_svg()).map_err(|e| ExportError::WriteFailed {
            what: "chart",
            error: format!("{}: {e}", path.display()),
        })?;
        info!("Chart saved as {}", path.display());
        Ok(())
    }
}

fn paint(color: Rgb) -> String {
    if color.alpha == u8::MAX {
        color.hex()
    } else {
        format!("{}\" fill-opacity=\"{:.3}", color.hex(), f64::from(color.alpha) / 255.0)
    }
}

fn stroke(color: Rgb) -> String {
    if color.alpha == u8::MAX {
        color.hex()
    } else {
        format!("{}\" stroke-opacity=\"{:.3}", color.hex(), f64::from(color.alpha) / 255.0)
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

// Writing into a String cannot fail
impl Canvas for SvgCanvas {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32, color: Rgb) {
        let _ = writeln!(self.body, "<rect x=\"{x}\" y=\"{y}\" width=\"{w}\" height=\"{h}\" fill=\"{}\"/>", paint(color));
    }

    fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgb) {
        // Pixel centers, so a horizontal line covers exactly one row
        let _ = writeln!(
            self.body,
            "<line x1=\"{x0}.5\" y1=\"{y0}.5\" x2=\"{x1}.5\" y2=\"{y1}.5\" stroke=\"{}\"/>",
            stroke(color)
        );
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str, color: Rgb) {
        let _ = writeln!(self.body, "<text x=\"{x}\" y=\"{y}\" fill=\"{}\">{}</text>", paint(color), escape(text));
    }

    fn draw_text_rotated(&mut self, x: i32, y: i32, text: &str, degrees: i32, color: Rgb) {
        let _ = writeln!(
            self.body,
            "<text x=\"{x}\" y=\"{y}\" transform=\"rotate({degrees} {x} {y})\" fill=\"{}\">{}</text>",
            paint(color),
            escape(text)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::theme;

    #[test]
    fn test_document() {
        let mut canvas = SvgCanvas::new(600, 24);
        canvas.fill_rect(0, 0, 600, 24, theme::BLACK);
        canvas.draw_line(150, 12, 300, 12, theme::DISK_WAIT);
        let svg = canvas.into_svg();

        assert!(svg.starts_with("<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"600\" height=\"24\""));
        assert!(svg.contains("<rect x=\"0\" y=\"0\" width=\"600\" height=\"24\" fill=\"#000000\"/>"));
        assert!(svg.contains("<line x1=\"150.5\" y1=\"12.5\" x2=\"300.5\" y2=\"12.5\" stroke=\"#ffff00\"/>"));
        assert!(svg.ends_with("</svg>\n"));
    }

    #[test]
    fn test_translucent_colors() {
        let mut canvas = SvgCanvas::new(10, 10);
        canvas.draw_line(0, 1, 10, 1, theme::GUIDELINE);
        assert!(canvas.into_svg().contains("stroke=\"#ffffff\" stroke-opacity=\"0.502\""));
    }

    #[test]
    fn test_text_is_escaped() {
        let mut canvas = SvgCanvas::new(10, 10);
        canvas.draw_text(1, 11, "<idle> & co", theme::BLACK);
        assert!(canvas.into_svg().contains(">&lt;idle&gt; &amp; co</text>"));
    }

    #[test]
    fn test_rotated_text() {
        let mut canvas = SvgCanvas::new(10, 10);
        canvas.draw_text_rotated(3, 8, "0.200s", -45, theme::BLACK);
        assert!(canvas.into_svg().contains("<text x=\"3\" y=\"8\" transform=\"rotate(-45 3 8)\" fill=\"#000000\">0.200s</text>"));
    }

    #[test]
    fn test_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strip.svg");
        let mut canvas = SvgCanvas::new(4, 4);
        canvas.fill_rect(0, 0, 4, 4, theme::WHITE);
        canvas.save(&path).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("fill=\"#ffffff\""));
    }
}
