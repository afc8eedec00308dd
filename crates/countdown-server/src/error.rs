//! Error types for the countdown server

use std::fmt;

#[derive(Debug)]
pub enum CountdownError {
    Config(String),
    Io(Box<std::io::Error>),
    Render(countdown_render::RenderError),
    /// The build task panicked or was torn down before producing a result
    BuildAborted(String),
}

impl fmt::Display for CountdownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountdownError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CountdownError::Io(err) => write!(f, "IO error: {}", err),
            CountdownError::Render(err) => write!(f, "Render error: {}", err),
            CountdownError::BuildAborted(msg) => write!(f, "Build aborted: {}", msg),
        }
    }
}

impl std::error::Error for CountdownError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CountdownError::Render(err) => Some(err),
            CountdownError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<countdown_render::RenderError> for CountdownError {
    fn from(err: countdown_render::RenderError) -> Self {
        CountdownError::Render(err)
    }
}

impl From<std::io::Error> for CountdownError {
    fn from(err: std::io::Error) -> Self {
        CountdownError::Io(Box::new(err))
    }
}

impl From<tokio::task::JoinError> for CountdownError {
    fn from(err: tokio::task::JoinError) -> Self {
        CountdownError::BuildAborted(err.to_string())
    }
}

impl From<tracing_subscriber::filter::ParseError> for CountdownError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        CountdownError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CountdownError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = CountdownError::Config("bad COUNTDOWN_TARGET".to_string());
        assert_eq!(
            format!("{}", err),
            "Configuration error: bad COUNTDOWN_TARGET"
        );
    }

    #[test]
    fn test_render_error_display_and_source() {
        let err = CountdownError::from(countdown_render::RenderError::Canvas(
            "out of memory".to_string(),
        ));
        assert!(format!("{}", err).contains("out of memory"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_build_aborted_display() {
        let err = CountdownError::BuildAborted("task panicked".to_string());
        assert_eq!(format!("{}", err), "Build aborted: task panicked");
    }

    #[test]
    fn test_error_is_debug() {
        let err = CountdownError::Config("test".to_string());
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("Config"));
    }
}
