//! Still image and animation encoding

use crate::error::Result;
use crate::frame::FrameRenderer;
use crate::svg::{Rasterizer, SvgSurface};
use chrono::{DateTime, Duration, SubsecRound, Utc};
use image::codecs::gif::{GifEncoder, Repeat};
use image::codecs::png::PngEncoder;
use image::{Delay, ExtendedColorType, Frame, ImageEncoder};
use std::time::Instant;
use tracing::debug;

/// Display time of each animation frame; one frame per simulated second
pub const FRAME_DELAY_MS: u32 = 1000;

/// GIF quantizer speed, 1 (best quality) to 30 (fastest)
pub const GIF_ENCODER_SPEED: i32 = 10;

/// Freeze instant for an animation: `now` truncated to whole seconds
pub fn animation_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.trunc_subsecs(0)
}

/// Instants shown by each frame: `start`, `start + 1s`, ... for `frames` frames
pub fn frame_instants(start: DateTime<Utc>, frames: u32) -> impl Iterator<Item = DateTime<Utc>> {
    (0..frames).map(move |i| start + Duration::seconds(i64::from(i)))
}

/// Renders countdown frames and encodes them
#[derive(Debug, Clone)]
pub struct ImageBuilder {
    renderer: FrameRenderer,
    rasterizer: Rasterizer,
}

impl ImageBuilder {
    pub fn new(renderer: FrameRenderer, rasterizer: Rasterizer) -> Self {
        Self {
            renderer,
            rasterizer,
        }
    }

    pub fn renderer(&self) -> &FrameRenderer {
        &self.renderer
    }

    /// PNG of the countdown as of right now
    pub fn build_image(&self, width: u32, height: u32) -> Result<Vec<u8>> {
        self.build_image_at(width, height, Utc::now())
    }

    pub fn build_image_at(&self, width: u32, height: u32, now: DateTime<Utc>) -> Result<Vec<u8>> {
        let mut surface = SvgSurface::new(width, height);
        self.renderer.render(&mut surface, width, height, now);
        let pixels = self.rasterizer.rasterize(&surface)?;

        let mut bytes = Vec::new();
        PngEncoder::new(&mut bytes).write_image(
            pixels.as_raw(),
            width,
            height,
            ExtendedColorType::Rgba8,
        )?;
        Ok(bytes)
    }

    /// Looping GIF of `frames` one-second frames starting at the current second
    pub fn build_animation(&self, width: u32, height: u32, frames: u32) -> Result<Vec<u8>> {
        self.build_animation_at(animation_start(Utc::now()), width, height, frames)
    }

    pub fn build_animation_at(
        &self,
        start: DateTime<Utc>,
        width: u32,
        height: u32,
        frames: u32,
    ) -> Result<Vec<u8>> {
        let started = Instant::now();
        let mut bytes = Vec::new();
        {
            let mut encoder = GifEncoder::new_with_speed(&mut bytes, GIF_ENCODER_SPEED);
            encoder.set_repeat(Repeat::Infinite)?;

            let mut surface = SvgSurface::new(width, height);
            for instant in frame_instants(start, frames) {
                surface.clear();
                self.renderer.render(&mut surface, width, height, instant);
                let pixels = self.rasterizer.rasterize(&surface)?;
                encoder.encode_frame(Frame::from_parts(
                    pixels,
                    0,
                    0,
                    Delay::from_numer_denom_ms(FRAME_DELAY_MS, 1),
                ))?;
            }
            // Dropping the encoder writes the GIF trailer
        }

        debug!(
            width,
            height,
            frames,
            size = bytes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Encoded animation"
        );
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::countdown::Countdown;
    use crate::frame::FrameStyle;
    use crate::surface::recording::RecordingSurface;
    use image::codecs::gif::GifDecoder;
    use image::{AnimationDecoder, ImageFormat};
    use std::io::Cursor;
    use usvg::fontdb::Database;

    fn builder() -> ImageBuilder {
        let countdown = Countdown::parse("2026-12-31T00:00:00+02:00").unwrap();
        ImageBuilder::new(
            FrameRenderer::new(countdown, FrameStyle::default()),
            Rasterizer::from_database(Database::new()),
        )
    }

    fn target(b: &ImageBuilder) -> DateTime<Utc> {
        b.renderer().countdown().target().with_timezone(&Utc)
    }

    #[test]
    fn test_animation_start_truncates() {
        let now = DateTime::parse_from_rfc3339("2026-05-01T10:20:30.987Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            animation_start(now).to_rfc3339(),
            "2026-05-01T10:20:30+00:00"
        );
    }

    #[test]
    fn test_frame_instants_one_second_apart() {
        let start = Utc::now().trunc_subsecs(0);
        let instants: Vec<_> = frame_instants(start, 3).collect();
        assert_eq!(
            instants,
            vec![
                start,
                start + Duration::seconds(1),
                start + Duration::seconds(2)
            ]
        );
        assert_eq!(frame_instants(start, 0).count(), 0);
    }

    #[test]
    fn test_build_image_is_png_of_requested_size() {
        let b = builder();
        let bytes = b.build_image(640, 200).unwrap();

        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (640, 200));
    }

    #[test]
    fn test_build_image_at_fixed_instant_is_stable() {
        let b = builder();
        let now = target(&b) - Duration::seconds(1);
        assert_eq!(
            b.build_image_at(320, 140, now).unwrap(),
            b.build_image_at(320, 140, now).unwrap()
        );
    }

    #[test]
    fn test_animation_frames_loop_and_delay() {
        let b = builder();
        let start = target(&b) - Duration::seconds(30);
        let bytes = b.build_animation_at(start, 320, 140, 10).unwrap();

        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Gif);
        // NETSCAPE2.0 application extension marks an infinite loop
        assert!(bytes.windows(11).any(|w| w == b"NETSCAPE2.0"));

        let decoder = GifDecoder::new(Cursor::new(&bytes)).unwrap();
        let frames = decoder.into_frames().collect_frames().unwrap();
        assert_eq!(frames.len(), 10);
        for frame in &frames {
            assert_eq!(frame.delay().numer_denom_ms(), (FRAME_DELAY_MS, 1));
            assert_eq!(frame.buffer().dimensions(), (320, 140));
        }
    }

    #[test]
    fn test_animation_frame_i_shows_start_plus_i() {
        let b = builder();
        let start = target(&b) - Duration::seconds(5);

        // Each frame draws the remaining time at start + i; past the target
        // the digits stay at zero.
        let expected = ["05", "04", "03", "02", "01", "00", "00"];
        for (instant, seconds) in frame_instants(start, 7).zip(expected) {
            let mut surface = RecordingSurface::default();
            b.renderer().render(&mut surface, 320, 140, instant);
            assert_eq!(surface.texts()[4], seconds);
        }
    }

    #[test]
    fn test_zero_sized_image_fails() {
        assert!(builder().build_image(0, 0).is_err());
    }
}
