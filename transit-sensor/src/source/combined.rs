//! Two independent backends queried for the same station.

use tracing::warn;

use super::{DepartureSource, FetchRequest, RawPayload, SourceError, WindowPolicy};

/// Queries both sources concurrently and merges what comes back.
///
/// Each source fails independently. If one fails, the other's payload is
/// used on its own; only when both fail does the fetch fail.
pub struct CombinedSource<A, B> {
    primary: A,
    secondary: B,
}

impl<A, B> CombinedSource<A, B> {
    /// Results from `primary` win when both sources report the same departure.
    pub fn new(primary: A, secondary: B) -> Self {
        Self { primary, secondary }
    }
}

impl<A: DepartureSource, B: DepartureSource> DepartureSource for CombinedSource<A, B> {
    fn window_policy(&self) -> WindowPolicy {
        match (self.primary.window_policy(), self.secondary.window_policy()) {
            (WindowPolicy::Fixed, WindowPolicy::Fixed) => WindowPolicy::Fixed,
            _ => WindowPolicy::Dynamic,
        }
    }

    /// Only when both legs need it; otherwise the other leg still answers.
    fn needs_credential(&self) -> bool {
        self.primary.needs_credential() && self.secondary.needs_credential()
    }

    async fn fetch(&self, request: &FetchRequest<'_>) -> Result<Option<RawPayload>, SourceError> {
        let (primary, secondary) =
            futures::join!(self.primary.fetch(request), self.secondary.fetch(request));

        let station = request.query.station_id();
        merge(station, primary, secondary)
    }
}

fn merge(
    station: &str,
    primary: Result<Option<RawPayload>, SourceError>,
    secondary: Result<Option<RawPayload>, SourceError>,
) -> Result<Option<RawPayload>, SourceError> {
    match (primary, secondary) {
        (Ok(Some(a)), Ok(Some(b))) => Ok(Some(RawPayload::Merged(vec![a, b]))),
        (Ok(Some(a)), failed) => {
            log_failure(station, "primary", "secondary", &failed);
            Ok(Some(a))
        }
        (failed, Ok(Some(b))) => {
            log_failure(station, "secondary", "primary", &failed);
            Ok(Some(b))
        }
        (Err(e), _) | (Ok(None), Err(e)) => Err(e),
        (Ok(None), Ok(None)) => Ok(None),
    }
}

fn log_failure(
    station: &str,
    used: &'static str,
    failed_source: &'static str,
    failed: &Result<Option<RawPayload>, SourceError>,
) {
    match failed {
        Err(e) => warn!(station, used, failed_source, error = %e, "one source failed"),
        _ => warn!(station, used, failed_source, "one source returned no data"),
    }
}
