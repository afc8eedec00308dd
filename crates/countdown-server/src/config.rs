use crate::error::{CountdownError, Result};
use countdown_render::Countdown;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TARGET: &str = "2026-12-31T00:00:00+02:00";

/// Service configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct CountdownConfig {
    pub port: u16,
    pub countdown: Countdown,
    pub title: String,
    pub cache_ttl: Duration,
    pub cache_max_entries: u64,
    pub max_concurrent_builds: usize,
    pub font_dir: Option<PathBuf>,
}

impl CountdownConfig {
    /// Parse configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = var("PORT")
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(3000);

        let raw_target = var("COUNTDOWN_TARGET").unwrap_or_else(|| DEFAULT_TARGET.to_string());
        let countdown = Countdown::parse(&raw_target).map_err(|e| {
            CountdownError::Config(format!("invalid COUNTDOWN_TARGET {raw_target:?}: {e}"))
        })?;

        let title = var("COUNTDOWN_TITLE").unwrap_or_else(|| "COUNTDOWN".to_string());

        let cache_ttl_secs = var("CACHE_TTL_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(30);

        let cache_max_entries = var("CACHE_MAX_ENTRIES")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(256);

        let max_concurrent_builds = var("MAX_CONCURRENT_BUILDS")
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(2);

        let font_dir = var("FONT_DIR").map(PathBuf::from);

        Ok(Self {
            port,
            countdown,
            title,
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            cache_max_entries,
            max_concurrent_builds,
            font_dir,
        })
    }
}
