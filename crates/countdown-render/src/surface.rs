//! Drawing surface abstraction
//!
//! The frame layout issues its commands through [`Surface`]. Style setters
//! change the state used by subsequent draw calls, the same way a 2D canvas
//! context behaves.

/// An opaque sRGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `#rrggbb` form
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Shrink by `by` on every side, never below zero size
    pub fn inset(self, by: f32) -> Self {
        Self {
            x: self.x + by,
            y: self.y + by,
            width: (self.width - 2.0 * by).max(0.0),
            height: (self.height - 2.0 * by).max(0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Font {
    pub size: f32,
    pub weight: FontWeight,
}

impl Font {
    pub const fn new(size: f32, weight: FontWeight) -> Self {
        Self { size, weight }
    }
}

impl Default for Font {
    fn default() -> Self {
        Self::new(10.0, FontWeight::Normal)
    }
}

/// Horizontal anchoring of text relative to its draw point
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Vertical anchoring of text relative to its draw point
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextBaseline {
    Top,
    Middle,
    #[default]
    Alphabetic,
    Bottom,
}

/// The capability set a raster backend must provide to draw a frame
pub trait Surface {
    fn set_fill_style(&mut self, color: Color);
    fn set_stroke_style(&mut self, color: Color, line_width: f32);
    fn set_font(&mut self, font: Font);
    fn set_align(&mut self, align: TextAlign);
    fn set_baseline(&mut self, baseline: TextBaseline);

    fn fill_rect(&mut self, rect: Rect);
    fn stroke_rect(&mut self, rect: Rect);
    fn stroke_line(&mut self, from: Point, to: Point);
    fn fill_text(&mut self, text: &str, at: Point);
}
