//! SVG-backed surface and its rasterizer
//!
//! [`SvgSurface`] records drawing commands as SVG elements; [`Rasterizer`]
//! turns the recorded scene into RGBA pixels with resvg, resolving text against
//! a font database loaded once and shared between frames.

use crate::error::{RenderError, Result};
use crate::surface::{Color, Font, FontWeight, Point, Rect, Surface, TextAlign, TextBaseline};
use image::RgbaImage;
use resvg::tiny_skia::{Pixmap, Transform};
use std::fmt::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use usvg::fontdb::Database;

const FONT_FAMILY: &str = "DejaVu Sans, Liberation Sans, Arial, Helvetica, sans-serif";

/// A surface that accumulates SVG markup
#[derive(Debug)]
pub struct SvgSurface {
    width: u32,
    height: u32,
    body: String,
    fill: Color,
    stroke: Color,
    line_width: f32,
    font: Font,
    align: TextAlign,
    baseline: TextBaseline,
}

impl SvgSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            body: String::new(),
            fill: Color::rgb(0, 0, 0),
            stroke: Color::rgb(0, 0, 0),
            line_width: 1.0,
            font: Font::default(),
            align: TextAlign::default(),
            baseline: TextBaseline::default(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Drop recorded elements and reset styles, keeping the allocation
    pub fn clear(&mut self) {
        let body = std::mem::take(&mut self.body);
        *self = Self {
            body,
            ..Self::new(self.width, self.height)
        };
        self.body.clear();
    }

    /// The complete SVG document for everything drawn so far
    pub fn to_svg(&self) -> String {
        format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">{body}</svg>",
            w = self.width,
            h = self.height,
            body = self.body
        )
    }
}

impl Surface for SvgSurface {
    fn set_fill_style(&mut self, color: Color) {
        self.fill = color;
    }

    fn set_stroke_style(&mut self, color: Color, line_width: f32) {
        self.stroke = color;
        self.line_width = line_width;
    }

    fn set_font(&mut self, font: Font) {
        self.font = font;
    }

    fn set_align(&mut self, align: TextAlign) {
        self.align = align;
    }

    fn set_baseline(&mut self, baseline: TextBaseline) {
        self.baseline = baseline;
    }

    fn fill_rect(&mut self, rect: Rect) {
        let _ = write!(
            self.body,
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\"/>",
            rect.x,
            rect.y,
            rect.width,
            rect.height,
            self.fill.to_hex()
        );
    }

    fn stroke_rect(&mut self, rect: Rect) {
        let _ = write!(
            self.body,
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{:.2}\"/>",
            rect.x,
            rect.y,
            rect.width,
            rect.height,
            self.stroke.to_hex(),
            self.line_width
        );
    }

    fn stroke_line(&mut self, from: Point, to: Point) {
        let _ = write!(
            self.body,
            "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" stroke=\"{}\" stroke-width=\"{:.2}\" stroke-linecap=\"square\"/>",
            from.x,
            from.y,
            to.x,
            to.y,
            self.stroke.to_hex(),
            self.line_width
        );
    }

    fn fill_text(&mut self, text: &str, at: Point) {
        let anchor = match self.align {
            TextAlign::Left => "start",
            TextAlign::Center => "middle",
            TextAlign::Right => "end",
        };
        let baseline = match self.baseline {
            TextBaseline::Top => "text-before-edge",
            TextBaseline::Middle => "central",
            TextBaseline::Alphabetic => "alphabetic",
            TextBaseline::Bottom => "text-after-edge",
        };
        let weight = match self.font.weight {
            FontWeight::Normal => "normal",
            FontWeight::Bold => "bold",
        };
        let _ = write!(
            self.body,
            "<text x=\"{:.2}\" y=\"{:.2}\" font-family=\"{}\" font-size=\"{:.2}\" font-weight=\"{}\" text-anchor=\"{}\" dominant-baseline=\"{}\" fill=\"{}\">{}</text>",
            at.x,
            at.y,
            FONT_FAMILY,
            self.font.size,
            weight,
            anchor,
            baseline,
            self.fill.to_hex(),
            escape_text(text)
        );
    }
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Converts recorded SVG scenes into straight-alpha RGBA images
#[derive(Clone)]
pub struct Rasterizer {
    fontdb: Arc<Database>,
}

impl Rasterizer {
    /// Rasterizer backed by the host's installed fonts plus any fonts found
    /// in `font_dir`
    pub fn new(font_dir: Option<&Path>) -> Self {
        let mut db = Database::new();
        db.load_system_fonts();
        if let Some(dir) = font_dir {
            db.load_fonts_dir(dir);
        }
        debug!(faces = db.len(), "Loaded font database");
        Self::from_database(db)
    }

    pub fn from_database(db: Database) -> Self {
        Self {
            fontdb: Arc::new(db),
        }
    }

    pub fn font_faces(&self) -> usize {
        self.fontdb.len()
    }

    pub fn rasterize(&self, surface: &SvgSurface) -> Result<RgbaImage> {
        let (width, height) = (surface.width(), surface.height());

        let options = usvg::Options {
            fontdb: Arc::clone(&self.fontdb),
            ..Default::default()
        };
        let tree = usvg::Tree::from_str(&surface.to_svg(), &options)?;

        let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
            RenderError::Canvas(format!("cannot allocate {width}x{height} pixmap"))
        })?;
        resvg::render(&tree, Transform::identity(), &mut pixmap.as_mut());

        let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
        for pixel in pixmap.pixels() {
            let c = pixel.demultiply();
            rgba.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }

        RgbaImage::from_raw(width, height, rgba)
            .ok_or_else(|| RenderError::Canvas("pixel buffer size mismatch".to_string()))
    }
}

impl std::fmt::Debug for Rasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rasterizer")
            .field("font_faces", &self.fontdb.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rasterizer() -> Rasterizer {
        Rasterizer::from_database(Database::new())
    }

    #[test]
    fn test_fill_rect_markup() {
        let mut surface = SvgSurface::new(10, 10);
        surface.set_fill_style(Color::rgb(255, 0, 0));
        surface.fill_rect(Rect::new(0.0, 0.0, 10.0, 10.0));

        let svg = surface.to_svg();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("fill=\"#ff0000\""));
        assert!(svg.contains("width=\"10.00\""));
    }

    #[test]
    fn test_text_is_escaped_and_anchored() {
        let mut surface = SvgSurface::new(100, 40);
        surface.set_align(TextAlign::Center);
        surface.set_baseline(TextBaseline::Middle);
        surface.fill_text("<T&C>", Point::new(50.0, 20.0));

        let svg = surface.to_svg();
        assert!(svg.contains("&lt;T&amp;C&gt;"));
        assert!(svg.contains("text-anchor=\"middle\""));
        assert!(svg.contains("dominant-baseline=\"central\""));
    }

    #[test]
    fn test_clear_resets_state_and_elements() {
        let mut surface = SvgSurface::new(20, 20);
        surface.set_fill_style(Color::rgb(1, 2, 3));
        surface.set_align(TextAlign::Right);
        surface.fill_rect(Rect::new(0.0, 0.0, 5.0, 5.0));

        surface.clear();

        assert_eq!(
            surface.to_svg(),
            SvgSurface::new(20, 20).to_svg(),
            "cleared surface should match a fresh one"
        );
        surface.fill_text("x", Point::new(0.0, 0.0));
        assert!(surface.to_svg().contains("text-anchor=\"start\""));
        assert!(surface.to_svg().contains("fill=\"#000000\""));
    }

    #[test]
    fn test_rasterize_fills_pixels() {
        let mut surface = SvgSurface::new(8, 4);
        surface.set_fill_style(Color::rgb(10, 200, 30));
        surface.fill_rect(Rect::new(0.0, 0.0, 8.0, 4.0));

        let image = rasterizer().rasterize(&surface).unwrap();
        assert_eq!(image.dimensions(), (8, 4));
        assert_eq!(image.get_pixel(3, 2).0, [10, 200, 30, 255]);
    }

    #[test]
    fn test_rasterize_without_fonts_still_succeeds() {
        let mut surface = SvgSurface::new(40, 20);
        surface.set_fill_style(Color::rgb(255, 255, 255));
        surface.fill_rect(Rect::new(0.0, 0.0, 40.0, 20.0));
        surface.fill_text("00", Point::new(5.0, 15.0));

        let image = rasterizer().rasterize(&surface).unwrap();
        assert_eq!(image.dimensions(), (40, 20));
    }

    #[test]
    fn test_zero_sized_canvas_is_an_error() {
        let surface = SvgSurface::new(0, 0);
        assert!(rasterizer().rasterize(&surface).is_err());
    }
}
