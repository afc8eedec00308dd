//! Request parameter normalization and cache keys

use std::fmt;

/// Accepted range and fallback for one numeric query parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min: u32,
    pub max: u32,
    pub default: u32,
}

impl Bounds {
    /// Missing or non-numeric input falls back to the default; numbers are
    /// clamped into range.
    pub fn resolve(&self, raw: Option<&str>) -> u32 {
        match raw.and_then(parse_integer) {
            Some(value) => value.clamp(i64::from(self.min), i64::from(self.max)) as u32,
            None => self.default,
        }
    }
}

pub const WIDTH: Bounds = Bounds {
    min: 320,
    max: 1200,
    default: 640,
};

pub const HEIGHT: Bounds = Bounds {
    min: 140,
    max: 600,
    default: 200,
};

pub const DURATION: Bounds = Bounds {
    min: 10,
    max: 120,
    default: 60,
};

fn parse_integer(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|v| v.trunc() as i64)
    })
}

/// Raw query string parameters shared by both image routes
#[derive(Debug, Default)]
pub struct CountdownQuery {
    pub w: Option<String>,
    pub h: Option<String>,
    pub s: Option<String>,
}

impl CountdownQuery {
    /// Collect `w`, `h` and `s` from decoded query pairs. The first
    /// occurrence of a repeated key wins; unknown keys are ignored.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut query = Self::default();
        for (name, value) in pairs {
            let slot = match name.as_str() {
                "w" => &mut query.w,
                "h" => &mut query.h,
                "s" => &mut query.s,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        query
    }
}

/// Normalized render parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderRequest {
    pub width: u32,
    pub height: u32,
    /// Only set for animations
    pub duration_seconds: Option<u32>,
}

impl RenderRequest {
    pub fn still(query: &CountdownQuery) -> Self {
        Self {
            width: WIDTH.resolve(query.w.as_deref()),
            height: HEIGHT.resolve(query.h.as_deref()),
            duration_seconds: None,
        }
    }

    pub fn animation(query: &CountdownQuery) -> Self {
        Self {
            duration_seconds: Some(DURATION.resolve(query.s.as_deref())),
            ..Self::still(query)
        }
    }

    /// Number of one-second frames to render
    pub fn frames(&self) -> u32 {
        self.duration_seconds.unwrap_or(DURATION.default)
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey {
            width: self.width,
            height: self.height,
            duration_seconds: self.frames(),
        }
    }
}

/// Identity of a rendered animation in the render cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub width: u32,
    pub height: u32,
    pub duration_seconds: u32,
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}x{}",
            self.width, self.height, self.duration_seconds
        )
    }
}
