//! Caching layer for departure payloads.
//!
//! Several configured sensors may watch the same station with different
//! platform or line filters. They all poll on the same interval, so we cache
//! the raw payload per (station, radius, window start) for a short time and
//! let them share one backend request.
//!
//! The window start is truncated to the minute, which bounds cache
//! cardinality while ensuring a new minute always triggers a new fetch.

use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache as MokaCache;
use tracing::trace;

use super::{DepartureSource, FetchRequest, RawPayload, SourceError, WindowPolicy};

/// Cache key: (station id, radius, window start).
type PayloadKey = (String, Option<u32>, DateTime<Utc>);

/// Configuration for the payload cache.
#[derive(Debug, Clone)]
pub struct PayloadCacheConfig {
    /// TTL for cached payloads.
    pub ttl: Duration,

    /// Maximum number of cached payloads.
    pub max_capacity: u64,
}

impl Default for PayloadCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30),
            max_capacity: 256,
        }
    }
}

/// Departure source with payload caching.
///
/// Wraps another source. Only successful payloads are cached; absent
/// results and errors always go back to the inner source next time.
pub struct CachedSource<S> {
    inner: S,
    payloads: MokaCache<PayloadKey, RawPayload>,
}

impl<S: DepartureSource> CachedSource<S> {
    /// Create a new cached source.
    pub fn new(inner: S, config: &PayloadCacheConfig) -> Self {
        let payloads = MokaCache::builder()
            .time_to_live(config.ttl)
            .max_capacity(config.max_capacity)
            .build();

        Self { inner, payloads }
    }
}

impl<S: DepartureSource> DepartureSource for CachedSource<S> {
    fn window_policy(&self) -> WindowPolicy {
        self.inner.window_policy()
    }

    fn needs_credential(&self) -> bool {
        self.inner.needs_credential()
    }

    async fn fetch(&self, request: &FetchRequest<'_>) -> Result<Option<RawPayload>, SourceError> {
        let key = (
            request.query.station_id().to_string(),
            request.query.radius(),
            request.window.start,
        );

        if let Some(cached) = self.payloads.get(&key).await {
            trace!(station = %key.0, "payload cache hit");
            return Ok(Some(cached));
        }

        let payload = self.inner.fetch(request).await?;

        if let Some(payload) = &payload {
            self.payloads.insert(key, payload.clone()).await;
        }

        Ok(payload)
    }
}
