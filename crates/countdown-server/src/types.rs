//! Response types for the countdown server

use serde::{Deserialize, Serialize};

/// Render cache counters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: u64,
    pub hits: u64,
    pub misses: u64,
    pub joins: u64,
    pub builds: u64,
    pub failures: u64,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub target: String,
    pub in_flight: usize,
    pub cache: CacheStats,
}
