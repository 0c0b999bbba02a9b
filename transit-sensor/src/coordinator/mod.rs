//! Polling coordinator.
//!
//! One coordinator owns one station's cache. Each cycle it:
//!
//! 1. makes sure the access token is usable (credentialed backends only);
//!    if that fails and the source has a leg that needs no token, it
//!    fetches anyway and only reports the auth fault if nothing answers;
//! 2. sizes the query window for the backend;
//! 3. fetches with a timeout;
//! 4. normalizes the payload and lets the cache absorb it;
//! 5. publishes a new `StationSnapshot` to the sensors.
//!
//! Failures never clear cached state. There are no retries inside a cycle;
//! the next tick is the retry.

mod outcome;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::auth::{Anonymous, AuthError, TokenGuard, TokenIssuer, TokenOutcome};
use crate::cache::{RestoredSnapshot, StationSnapshot};
use crate::domain::{Locale, Slot, StationQuery};
use crate::normalize::normalize;
use crate::source::{DepartureSource, FetchRequest, QueryWindow, SourceError};

pub use outcome::{CycleOutcome, CycleReport, FetchFault};

/// Timing for the polling loop.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Upper bound on one fetch, including any retries inside the client.
    pub request_timeout: Duration,

    /// Time between cycles.
    pub poll_interval: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_secs(60),
        }
    }
}

/// Drives polling for one station.
pub struct Coordinator<S, I = Anonymous> {
    source: Arc<S>,
    query: StationQuery,
    locale: Locale,
    auth: Option<TokenGuard<I>>,
    config: CoordinatorConfig,
    snapshot: StationSnapshot,
    publisher: watch::Sender<StationSnapshot>,
}

impl<S: DepartureSource> Coordinator<S, Anonymous> {
    /// Create a coordinator for a backend that needs no credential.
    pub fn new(
        source: Arc<S>,
        query: StationQuery,
        locale: Locale,
        config: CoordinatorConfig,
    ) -> Self {
        let snapshot = StationSnapshot::new();
        let (publisher, _) = watch::channel(snapshot.clone());

        Self {
            source,
            query,
            locale,
            auth: None,
            config,
            snapshot,
            publisher,
        }
    }
}

impl<S: DepartureSource, I: TokenIssuer> Coordinator<S, I> {
    /// Attach a token guard. Every cycle checks it before fetching.
    pub fn with_auth<J: TokenIssuer>(self, guard: TokenGuard<J>) -> Coordinator<S, J> {
        Coordinator {
            source: self.source,
            query: self.query,
            locale: self.locale,
            auth: Some(guard),
            config: self.config,
            snapshot: self.snapshot,
            publisher: self.publisher,
        }
    }

    /// Seed a slot with state persisted before a restart.
    pub fn with_restored(mut self, slot: Slot, snapshot: RestoredSnapshot) -> Self {
        self.snapshot.restore(slot, snapshot);
        self.publisher.send_replace(self.snapshot.clone());
        self
    }

    /// Receiver for the snapshots this coordinator publishes.
    pub fn subscribe(&self) -> watch::Receiver<StationSnapshot> {
        self.publisher.subscribe()
    }

    pub fn query(&self) -> &StationQuery {
        &self.query
    }

    pub fn snapshot(&self) -> &StationSnapshot {
        &self.snapshot
    }

    pub fn token_guard(&self) -> Option<&TokenGuard<I>> {
        self.auth.as_ref()
    }

    /// Run one polling cycle at `now` and publish the result.
    pub async fn refresh(&mut self, now: DateTime<Utc>) -> CycleReport {
        let mut token_refreshed = false;
        let mut token_failure = None;
        let limit = self.config.request_timeout;

        if let Some(guard) = self.auth.as_mut() {
            let checked = tokio::time::timeout(limit, guard.ensure_fresh(now))
                .await
                .unwrap_or_else(|_| {
                    TokenOutcome::Failed(AuthError::Unreachable(format!(
                        "token request timed out after {limit:?}"
                    )))
                });

            match checked {
                TokenOutcome::Unchanged => {}
                TokenOutcome::Refreshed => {
                    debug!(station = %self.query.station_id(), "access token refreshed");
                    token_refreshed = true;
                }
                TokenOutcome::Failed(e) if !self.source.needs_credential() => {
                    warn!(
                        station = %self.query.station_id(),
                        error = %e,
                        "token refresh failed, fetching without credential"
                    );
                    token_failure = Some(e);
                }
                TokenOutcome::Failed(e) => {
                    return self.finish(
                        now,
                        CycleReport {
                            token_refreshed,
                            outcome: CycleOutcome::AuthenticationFault(e),
                        },
                    );
                }
            }
        }

        let fetched = self.fetch_and_absorb(now, token_failure.is_none()).await;
        let outcome = match (fetched, token_failure) {
            (CycleOutcome::TransientFailure(_), Some(e)) => CycleOutcome::AuthenticationFault(e),
            (outcome, _) => outcome,
        };
        self.finish(
            now,
            CycleReport {
                token_refreshed,
                outcome,
            },
        )
    }

    /// Fetch, normalize and absorb. Without `with_credential` the request
    /// carries no token, so only legs that need none can answer.
    async fn fetch_and_absorb(
        &mut self,
        now: DateTime<Utc>,
        with_credential: bool,
    ) -> CycleOutcome {
        let window = QueryWindow::for_policy(self.source.window_policy(), now, &self.locale);
        let fetched = {
            let request = FetchRequest {
                query: &self.query,
                window,
                credential: self
                    .auth
                    .as_ref()
                    .and_then(TokenGuard::credential)
                    .filter(|_| with_credential),
            };
            tokio::time::timeout(self.config.request_timeout, self.source.fetch(&request)).await
        };

        let payload = match fetched {
            Err(_) => {
                return CycleOutcome::TransientFailure(FetchFault::Timeout(
                    self.config.request_timeout,
                ));
            }
            Ok(Err(SourceError::Unauthorized { status })) => {
                if let Some(guard) = self.auth.as_mut() {
                    guard.invalidate();
                }
                return CycleOutcome::AuthenticationFault(AuthError::Rejected { status });
            }
            Ok(Err(e)) => return CycleOutcome::TransientFailure(e.into()),
            Ok(Ok(None)) => return CycleOutcome::TransientFailure(FetchFault::Empty),
            Ok(Ok(Some(payload))) => payload,
        };

        match normalize(&payload, &self.query, now, &self.locale) {
            Some(departures) => {
                self.snapshot.absorb_departures(&departures, now);
                CycleOutcome::Fresh {
                    departures: departures.len(),
                }
            }
            None => CycleOutcome::TransientFailure(FetchFault::Malformed),
        }
    }

    fn finish(&mut self, now: DateTime<Utc>, report: CycleReport) -> CycleReport {
        let station = self.query.station_id();

        match &report.outcome {
            CycleOutcome::Fresh { departures } => {
                debug!(station, departures, %now, "cycle complete");
            }
            CycleOutcome::TransientFailure(fault) => {
                self.snapshot.absorb_fault(false);
                warn!(station, error = %fault, "fetch failed, keeping cached departures");
            }
            CycleOutcome::AuthenticationFault(e) => {
                self.snapshot.absorb_fault(true);
                error!(station, error = %e, "authentication failed");
            }
        }

        self.publisher.send_replace(self.snapshot.clone());
        report
    }

    /// Poll until every subscriber is gone.
    ///
    /// Ticks that fall behind are delayed rather than bunched, and a cycle
    /// always finishes before the next one starts.
    pub async fn run(mut self) {
        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            station = %self.query.station_id(),
            interval = ?self.config.poll_interval,
            "polling started"
        );

        loop {
            interval.tick().await;
            if self.publisher.is_closed() {
                break;
            }
            self.refresh(Utc::now()).await;
        }

        debug!(station = %self.query.station_id(), "polling stopped");
    }
}

#[cfg(test)]
mod tests;
