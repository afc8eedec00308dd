//! Countdown frame layout
//!
//! Every measurement is a fraction of the canvas size so that any requested
//! dimensions keep the same proportions.

use crate::countdown::Countdown;
use crate::surface::{Color, Font, FontWeight, Point, Rect, Surface, TextAlign, TextBaseline};
use chrono::{DateTime, Utc};

/// Column captions, in display order
pub const LABELS: [&str; 4] = ["DAYS", "HOURS", "MINUTES", "SECONDS"];

/// Colors and caption used when drawing a frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameStyle {
    pub title: String,
    pub background: Color,
    pub title_band: Color,
    pub border: Color,
    pub divider: Color,
    pub title_text: Color,
    pub digits: Color,
    pub labels: Color,
}

impl Default for FrameStyle {
    fn default() -> Self {
        Self {
            title: "COUNTDOWN".to_string(),
            background: Color::rgb(0x0f, 0x17, 0x2a),
            title_band: Color::rgb(0x1e, 0x29, 0x3b),
            border: Color::rgb(0xf5, 0x9e, 0x0b),
            divider: Color::rgb(0x33, 0x41, 0x55),
            title_text: Color::rgb(0xf8, 0xfa, 0xfc),
            digits: Color::rgb(0xff, 0xff, 0xff),
            labels: Color::rgb(0x94, 0xa3, 0xb8),
        }
    }
}

/// Canvas measurements derived from the requested size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub width: f32,
    pub height: f32,
    pub border: f32,
    pub padding_x: f32,
    pub title_band: f32,
    pub column_width: f32,
    pub title_size: f32,
    pub digit_size: f32,
    pub label_size: f32,
    pub digit_y: f32,
    pub label_y: f32,
}

impl Layout {
    pub fn new(width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);

        let border = (w.min(h) * 0.02).max(1.0);
        let padding_x = w * 0.04;
        let title_band = h * 0.24;
        let column_width = (w - 2.0 * padding_x) / 4.0;
        let body = h - title_band;

        Self {
            width: w,
            height: h,
            border,
            padding_x,
            title_band,
            column_width,
            title_size: title_band * 0.5,
            digit_size: (body * 0.48).min(column_width * 0.6),
            label_size: (body * 0.13).min(column_width * 0.16),
            digit_y: title_band + body * 0.42,
            label_y: title_band + body * 0.82,
        }
    }

    /// Horizontal center of column `index` (0 = days)
    pub fn column_center(&self, index: usize) -> f32 {
        self.padding_x + self.column_width * (index as f32 + 0.5)
    }
}

/// Draws the countdown for a given instant
#[derive(Debug, Clone)]
pub struct FrameRenderer {
    countdown: Countdown,
    style: FrameStyle,
}

impl FrameRenderer {
    pub fn new(countdown: Countdown, style: FrameStyle) -> Self {
        Self { countdown, style }
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    pub fn style(&self) -> &FrameStyle {
        &self.style
    }

    /// Issue the drawing commands for the frame showing `now`.
    ///
    /// Each call sets every style it relies on before drawing, so a surface
    /// carried over from a previous frame draws identically to a fresh one.
    pub fn render<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        width: u32,
        height: u32,
        now: DateTime<Utc>,
    ) {
        let layout = Layout::new(width, height);
        let style = &self.style;
        let canvas = Rect::new(0.0, 0.0, layout.width, layout.height);

        surface.set_fill_style(style.background);
        surface.fill_rect(canvas);

        surface.set_fill_style(style.title_band);
        surface.fill_rect(Rect::new(0.0, 0.0, layout.width, layout.title_band));

        surface.set_stroke_style(style.border, layout.border);
        surface.stroke_rect(canvas.inset(layout.border / 2.0));

        // Title band separator and column dividers
        surface.set_stroke_style(style.divider, (layout.border / 2.0).max(1.0));
        surface.stroke_line(
            Point::new(layout.padding_x, layout.title_band),
            Point::new(layout.width - layout.padding_x, layout.title_band),
        );
        let gap = (layout.height - layout.title_band) * 0.15;
        for i in 1..LABELS.len() {
            let x = layout.padding_x + layout.column_width * i as f32;
            surface.stroke_line(
                Point::new(x, layout.title_band + gap),
                Point::new(x, layout.height - gap),
            );
        }

        surface.set_align(TextAlign::Center);
        surface.set_baseline(TextBaseline::Middle);
        surface.set_font(Font::new(layout.title_size, FontWeight::Bold));
        surface.set_fill_style(style.title_text);
        surface.fill_text(
            &style.title,
            Point::new(layout.width / 2.0, layout.title_band / 2.0),
        );

        let digits = self.countdown.remaining(now).digits();

        surface.set_font(Font::new(layout.digit_size, FontWeight::Bold));
        surface.set_fill_style(style.digits);
        for (i, value) in digits.iter().enumerate() {
            surface.fill_text(value, Point::new(layout.column_center(i), layout.digit_y));
        }

        surface.set_font(Font::new(layout.label_size, FontWeight::Normal));
        surface.set_fill_style(style.labels);
        for (i, label) in LABELS.iter().enumerate() {
            surface.fill_text(label, Point::new(layout.column_center(i), layout.label_y));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::recording::{DrawCommand, RecordingSurface};
    use chrono::Duration;

    fn renderer() -> FrameRenderer {
        let countdown = Countdown::parse("2026-12-31T00:00:00+02:00").unwrap();
        FrameRenderer::new(countdown, FrameStyle::default())
    }

    fn target(r: &FrameRenderer) -> DateTime<Utc> {
        r.countdown().target().with_timezone(&Utc)
    }

    #[test]
    fn test_layout_scales_with_canvas() {
        let small = Layout::new(320, 140);
        let large = Layout::new(640, 280);

        assert!((large.title_band - 2.0 * small.title_band).abs() < 1e-3);
        assert!((large.column_width - 2.0 * small.column_width).abs() < 1e-3);
        assert!((large.digit_size - 2.0 * small.digit_size).abs() < 1e-3);
        assert!((large.border - 2.0 * small.border).abs() < 1e-3);
    }

    #[test]
    fn test_columns_are_equal_width_and_inside_padding() {
        let layout = Layout::new(640, 200);
        let first = layout.column_center(0) - layout.column_width / 2.0;
        let last = layout.column_center(3) + layout.column_width / 2.0;

        assert!((first - layout.padding_x).abs() < 1e-3);
        assert!((last - (layout.width - layout.padding_x)).abs() < 1e-3);
        assert!(
            ((layout.column_center(2) - layout.column_center(1)) - layout.column_width).abs()
                < 1e-3
        );
    }

    #[test]
    fn test_texts_one_second_before_target() {
        let r = renderer();
        let mut surface = RecordingSurface::default();
        r.render(&mut surface, 640, 200, target(&r) - Duration::seconds(1));

        assert_eq!(
            surface.texts(),
            vec![
                "COUNTDOWN", "00", "00", "00", "01", "DAYS", "HOURS", "MINUTES", "SECONDS"
            ]
        );
    }

    #[test]
    fn test_elapsed_renders_zero_digits() {
        let r = renderer();
        let mut surface = RecordingSurface::default();
        r.render(&mut surface, 640, 200, target(&r) + Duration::hours(5));

        assert_eq!(&surface.texts()[1..5], &["00", "00", "00", "00"]);
    }

    #[test]
    fn test_render_is_deterministic() {
        let r = renderer();
        let now = target(&r) - Duration::seconds(90_061);

        let mut a = RecordingSurface::default();
        let mut b = RecordingSurface::default();
        r.render(&mut a, 500, 180, now);
        // Render an unrelated frame first to dirty the state
        r.render(&mut b, 900, 400, now - Duration::days(9));
        b.commands.clear();
        r.render(&mut b, 500, 180, now);

        assert_eq!(a.commands, b.commands);
        assert_eq!(&a.texts()[1..5], &["01", "01", "01", "01"]);
    }

    #[test]
    fn test_styles_set_before_each_draw() {
        let r = renderer();
        let mut surface = RecordingSurface::default();
        r.render(&mut surface, 640, 200, target(&r));

        let first_draw = surface
            .commands
            .iter()
            .position(|c| matches!(c, DrawCommand::FillRect(_)))
            .unwrap();
        assert!(matches!(
            surface.commands[first_draw - 1],
            DrawCommand::FillStyle(_)
        ));

        let first_text = surface
            .commands
            .iter()
            .position(|c| matches!(c, DrawCommand::FillText(..)))
            .unwrap();
        let before = &surface.commands[..first_text];
        assert!(before.iter().any(|c| matches!(c, DrawCommand::Align(_))));
        assert!(before.iter().any(|c| matches!(c, DrawCommand::Baseline(_))));
        assert!(before.iter().any(|c| matches!(c, DrawCommand::Font(_))));
    }

    #[test]
    fn test_background_covers_canvas() {
        let r = renderer();
        let mut surface = RecordingSurface::default();
        r.render(&mut surface, 320, 140, target(&r));

        assert_eq!(
            surface.commands[1],
            DrawCommand::FillRect(Rect::new(0.0, 0.0, 320.0, 140.0))
        );
    }

    #[test]
    fn test_custom_title() {
        let style = FrameStyle {
            title: "LAUNCH".to_string(),
            ..FrameStyle::default()
        };
        let r = FrameRenderer::new(*renderer().countdown(), style);
        let mut surface = RecordingSurface::default();
        r.render(&mut surface, 640, 200, target(&r));

        assert_eq!(surface.texts()[0], "LAUNCH");
    }
}
