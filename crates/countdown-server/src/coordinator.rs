//! Render cache and single-flight build coordination
//!
//! Finished animations live in a moka cache with a fixed time-to-live.
//! Builds in progress are tracked in a separate map of shared futures so that
//! concurrent requests for the same key wait on one build instead of starting
//! their own. Each build runs in a detached task, so a caller going away never
//! cancels work other callers are waiting on.

use crate::error::CountdownError;
use crate::request::{CacheKey, RenderRequest};
use crate::types::CacheStats;
use axum::body::Bytes;
use countdown_render::ImageBuilder;
use futures::future::{BoxFuture, FutureExt, Shared};
use moka::future::Cache;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, error, info, warn};

/// Something that can produce an encoded animation for a request
pub trait AnimationSource: Send + Sync + 'static {
    fn build_animation(&self, request: &RenderRequest) -> countdown_render::Result<Vec<u8>>;
}

impl AnimationSource for ImageBuilder {
    fn build_animation(&self, request: &RenderRequest) -> countdown_render::Result<Vec<u8>> {
        ImageBuilder::build_animation(self, request.width, request.height, request.frames())
    }
}

/// Where a response body came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from the render cache
    Hit,
    /// This request started the build
    Miss,
    /// This request waited on a build another request started
    Join,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
            CacheStatus::Join => "JOIN",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Rendered {
    pub bytes: Bytes,
    pub status: CacheStatus,
}

type BuildResult = std::result::Result<Bytes, Arc<CountdownError>>;
type SharedBuild = Shared<BoxFuture<'static, BuildResult>>;
type InFlightMap = Arc<Mutex<HashMap<CacheKey, SharedBuild>>>;

/// A build's in-flight registration. Released explicitly when the build task
/// finishes; if the task unwinds first, dropping it removes the entry.
struct InFlightEntry {
    in_flight: InFlightMap,
    key: CacheKey,
    armed: bool,
}

impl InFlightEntry {
    fn new(in_flight: InFlightMap, key: CacheKey) -> Self {
        Self {
            in_flight,
            key,
            armed: true,
        }
    }

    async fn release(mut self) {
        self.in_flight.lock().await.remove(&self.key);
        self.armed = false;
    }
}

impl Drop for InFlightEntry {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Ok(mut in_flight) = self.in_flight.try_lock() {
            in_flight.remove(&self.key);
            return;
        }

        // Lock is contended; finish the removal on the runtime
        let in_flight = Arc::clone(&self.in_flight);
        let key = self.key;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    in_flight.lock().await.remove(&key);
                });
            }
            Err(e) => warn!(key = %key, error = %e, "Could not clear in-flight build"),
        }
    }
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    joins: AtomicU64,
    builds: AtomicU64,
    failures: AtomicU64,
}

/// Settings for [`RenderCoordinator`]
#[derive(Debug, Clone, Copy)]
pub struct CoordinatorConfig {
    pub ttl: Duration,
    pub max_entries: u64,
    pub max_concurrent_builds: usize,
}

/// Owns the render cache and the in-flight build map
pub struct RenderCoordinator {
    source: Arc<dyn AnimationSource>,
    cache: Cache<CacheKey, Bytes>,
    in_flight: InFlightMap,
    build_permits: Arc<Semaphore>,
    counters: Arc<Counters>,
}

impl RenderCoordinator {
    pub fn new(source: Arc<dyn AnimationSource>, config: CoordinatorConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.ttl)
            .build();

        Self {
            source,
            cache,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            build_permits: Arc::new(Semaphore::new(config.max_concurrent_builds.max(1))),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.cache.entry_count(),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            joins: self.counters.joins.load(Ordering::Relaxed),
            builds: self.counters.builds.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
        }
    }

    /// Number of builds currently registered as in flight
    pub async fn in_flight(&self) -> usize {
        self.in_flight.lock().await.len()
    }

    /// Return the cached animation for `request`, join a build already running
    /// for the same key, or start a new one.
    pub async fn get_or_build(
        &self,
        request: &RenderRequest,
    ) -> Result<Rendered, Arc<CountdownError>> {
        let key = request.cache_key();

        if let Some(bytes) = self.cache.get(&key).await {
            return Ok(self.hit(key, bytes));
        }

        let (build, status) = {
            let mut in_flight = self.in_flight.lock().await;

            // A build may have finished between the lookup above and taking the lock
            if let Some(bytes) = self.cache.get(&key).await {
                return Ok(self.hit(key, bytes));
            }

            match in_flight.get(&key) {
                Some(build) => {
                    self.counters.joins.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %key, "Joining in-flight build");
                    (build.clone(), CacheStatus::Join)
                }
                None => {
                    self.counters.misses.fetch_add(1, Ordering::Relaxed);
                    let build = self.start_build(key, *request);
                    in_flight.insert(key, build.clone());
                    (build, CacheStatus::Miss)
                }
            }
        };

        let bytes = build.await?;
        Ok(Rendered { bytes, status })
    }

    fn hit(&self, key: CacheKey, bytes: Bytes) -> Rendered {
        self.counters.hits.fetch_add(1, Ordering::Relaxed);
        debug!(key = %key, "Render cache hit");
        Rendered {
            bytes,
            status: CacheStatus::Hit,
        }
    }

    /// Spawn the build task. Must be called with the in-flight lock held, so
    /// the task's own removal of `key` cannot run before the insert.
    fn start_build(&self, key: CacheKey, request: RenderRequest) -> SharedBuild {
        let source = Arc::clone(&self.source);
        let permits = Arc::clone(&self.build_permits);
        let cache = self.cache.clone();
        let in_flight = Arc::clone(&self.in_flight);
        let counters = Arc::clone(&self.counters);

        let task = tokio::spawn(async move {
            let entry = InFlightEntry::new(in_flight, key);
            let result = run_build(source, permits, key, request).await;

            match &result {
                Ok(bytes) => {
                    counters.builds.fetch_add(1, Ordering::Relaxed);
                    cache.insert(key, bytes.clone()).await;
                }
                Err(e) => {
                    counters.failures.fetch_add(1, Ordering::Relaxed);
                    error!(key = %key, error = %e, "Animation build failed");
                }
            }

            entry.release().await;
            result.map_err(Arc::new)
        });

        async move {
            task.await
                .unwrap_or_else(|e| Err(Arc::new(CountdownError::from(e))))
        }
        .boxed()
        .shared()
    }
}

async fn run_build(
    source: Arc<dyn AnimationSource>,
    permits: Arc<Semaphore>,
    key: CacheKey,
    request: RenderRequest,
) -> crate::error::Result<Bytes> {
    let _permit = permits
        .acquire_owned()
        .await
        .map_err(|e| CountdownError::BuildAborted(e.to_string()))?;

    let started = Instant::now();
    let bytes = tokio::task::spawn_blocking(move || source.build_animation(&request)).await??;

    info!(
        key = %key,
        size = bytes.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Built animation"
    );
    Ok(Bytes::from(bytes))
}
