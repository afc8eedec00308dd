//! Error types for countdown rendering

use std::fmt;

#[derive(Debug)]
pub enum RenderError {
    /// The raster canvas could not be allocated
    Canvas(String),
    /// The recorded scene could not be parsed back into a render tree
    Svg(usvg::Error),
    /// PNG or GIF encoding failed
    Encode(image::ImageError),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Canvas(msg) => write!(f, "Canvas error: {msg}"),
            Self::Svg(e) => write!(f, "Scene error: {e}"),
            Self::Encode(e) => write!(f, "Encode error: {e}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Svg(e) => Some(e),
            Self::Encode(e) => Some(e),
            Self::Canvas(_) => None,
        }
    }
}

impl From<usvg::Error> for RenderError {
    fn from(err: usvg::Error) -> Self {
        Self::Svg(err)
    }
}

impl From<image::ImageError> for RenderError {
    fn from(err: image::ImageError) -> Self {
        Self::Encode(err)
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canvas_error_display() {
        let err = RenderError::Canvas("0x0 pixmap".to_string());
        assert_eq!(format!("{}", err), "Canvas error: 0x0 pixmap");
    }

    #[test]
    fn test_encode_error_has_source() {
        let err = RenderError::from(image::ImageError::Limits(
            image::error::LimitError::from_kind(image::error::LimitErrorKind::DimensionError),
        ));
        assert!(format!("{}", err).starts_with("Encode error"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
