//! Countdown frame rendering
//!
//! Turns a fixed deadline and an evaluation instant into a drawn frame, and
//! encodes frames into still PNG images or looping GIF animations. Drawing goes
//! through the [`Surface`] trait, so the layout code never knows which raster
//! backend it runs on.

mod builder;
mod countdown;
mod error;
mod frame;
mod surface;
mod svg;

pub use builder::{
    animation_start, frame_instants, ImageBuilder, FRAME_DELAY_MS, GIF_ENCODER_SPEED,
};
pub use countdown::{Countdown, RemainingTime};
pub use error::{RenderError, Result};
pub use frame::{FrameRenderer, FrameStyle, Layout, LABELS};
pub use surface::{Color, Font, FontWeight, Point, Rect, Surface, TextAlign, TextBaseline};
pub use svg::{Rasterizer, SvgSurface};
pub use usvg::fontdb;
