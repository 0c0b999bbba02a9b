//! Departure sources.
//!
//! A source fetches one raw payload per station and polling cycle. The two
//! backends speak different schemas, so the payload stays tagged with its
//! schema until the normalizer maps it to departures.
//!
//! Sources never fail for ordinary HTTP trouble (timeouts, 4xx/5xx, bad
//! JSON): they log it and return `Ok(None)`. Only hard transport errors and
//! rejected credentials come back as `Err`.

mod cached;
mod combined;
mod error;
pub(crate) mod http;
mod window;

use std::future::Future;

use crate::auth::Credential;
use crate::domain::StationQuery;

pub use cached::{CachedSource, PayloadCacheConfig};
pub use combined::CombinedSource;
pub use error::SourceError;
pub use window::{QueryWindow, WindowPolicy};

/// Raw backend payload, tagged by schema.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    /// Motis `v5/stoptimes` response.
    StopTimes(serde_json::Value),

    /// RNV GraphQL `station { journeys }` response.
    StationJourneys(serde_json::Value),

    /// Payloads from several sources for the same station, in priority order.
    Merged(Vec<RawPayload>),
}

/// Everything a source needs for one fetch.
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    pub query: &'a StationQuery,
    pub window: QueryWindow,
    /// Current access token, for backends that need one.
    pub credential: Option<&'a Credential>,
}

/// A backend that can deliver departures for a station.
///
/// This abstraction allows the coordinator to be tested with mock data.
pub trait DepartureSource: Send + Sync {
    /// How this backend wants its query window sized.
    fn window_policy(&self) -> WindowPolicy;

    /// Whether every fetch needs an access token. A source that can still
    /// answer without one is fetched even when the token refresh fails.
    fn needs_credential(&self) -> bool {
        false
    }

    /// Fetch the raw departures payload for one station.
    ///
    /// `Ok(None)` means the backend gave no usable answer this time.
    fn fetch(
        &self,
        request: &FetchRequest<'_>,
    ) -> impl Future<Output = Result<Option<RawPayload>, SourceError>> + Send;
}
