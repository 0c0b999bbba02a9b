//! Coordinator scenarios against mock sources and issuers.

use super::*;
use crate::auth::Credential;
use crate::source::{CombinedSource, RawPayload, WindowPolicy};
use chrono::{Duration as ChronoDuration, TimeZone};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap()
}

fn iso(offset_minutes: i64) -> String {
    (now() + ChronoDuration::minutes(offset_minutes)).to_rfc3339()
}

fn stop_times(offsets: &[i64]) -> RawPayload {
    let entries: Vec<_> = offsets
        .iter()
        .map(|m| json!({"place": {"departure": iso(*m), "track": "1"}, "displayName": "5"}))
        .collect();
    RawPayload::StopTimes(json!({ "stopTimes": entries }))
}

type Response = Result<Option<RawPayload>, SourceError>;

/// Source that replays scripted responses and records what it was asked.
struct MockSource {
    policy: WindowPolicy,
    responses: Mutex<VecDeque<Response>>,
    calls: AtomicUsize,
    tokens_seen: Mutex<Vec<Option<String>>>,
    delay: Option<Duration>,
    needs_credential: bool,
}

impl MockSource {
    fn new(responses: Vec<Response>) -> Self {
        Self {
            policy: WindowPolicy::Fixed,
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
            tokens_seen: Mutex::new(Vec::new()),
            delay: None,
            needs_credential: false,
        }
    }

    /// Answers only requests that carry a token, like the GraphQL backend.
    fn credentialed(responses: Vec<Response>) -> Self {
        Self {
            needs_credential: true,
            ..Self::new(responses)
        }
    }

    fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new(vec![])
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DepartureSource for MockSource {
    fn window_policy(&self) -> WindowPolicy {
        self.policy
    }

    fn needs_credential(&self) -> bool {
        self.needs_credential
    }

    async fn fetch(&self, request: &FetchRequest<'_>) -> Response {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tokens_seen
            .lock()
            .unwrap()
            .push(request.credential.map(|c| c.access_token.clone()));

        if self.needs_credential && request.credential.is_none() {
            return Err(SourceError::MissingCredential { backend: "mock" });
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.responses.lock().unwrap().pop_front().unwrap_or(Ok(None))
    }
}

/// Shared handle, so a test can inspect a source wrapped in a combined one.
impl DepartureSource for Arc<MockSource> {
    fn window_policy(&self) -> WindowPolicy {
        (**self).window_policy()
    }

    fn needs_credential(&self) -> bool {
        (**self).needs_credential()
    }

    async fn fetch(&self, request: &FetchRequest<'_>) -> Response {
        (**self).fetch(request).await
    }
}

/// Issuer with a fixed answer that counts calls.
struct MockIssuer {
    calls: AtomicUsize,
    result: Result<Credential, AuthError>,
    delay: Option<Duration>,
}

impl MockIssuer {
    fn ok(token: &str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            result: Ok(Credential::new(token, now().timestamp() + 3600)),
            delay: None,
        }
    }

    fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            result: Err(AuthError::Unreachable("connection refused".into())),
            delay: None,
        }
    }

    fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::ok("late")
        }
    }
}

impl TokenIssuer for MockIssuer {
    async fn issue_token(&self) -> Result<Credential, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.result.clone()
    }
}

fn query() -> StationQuery {
    StationQuery::new("2417").unwrap()
}

fn coordinator(source: MockSource) -> (Arc<MockSource>, Coordinator<MockSource>) {
    let source = Arc::new(source);
    let coordinator = Coordinator::new(
        Arc::clone(&source),
        query(),
        Locale::default(),
        CoordinatorConfig::default(),
    );
    (source, coordinator)
}

#[tokio::test]
async fn fresh_cycle_fills_slots() {
    let (_, mut coordinator) = coordinator(MockSource::new(vec![Ok(Some(stop_times(&[8, 2, 5])))]));
    let rx = coordinator.subscribe();

    let report = coordinator.refresh(now()).await;
    assert!(matches!(report.outcome, CycleOutcome::Fresh { departures: 3 }));
    assert!(!report.token_refreshed);

    let snapshot = rx.borrow().clone();
    assert_eq!(snapshot.slot(Slot::NEXT).current_state(now()), Some(iso(2)));
    assert_eq!(snapshot.slot(Slot::THIRD).current_state(now()), Some(iso(8)));
    assert!(snapshot.available(Slot::NEXT, now()));
}

#[tokio::test]
async fn transport_fault_keeps_previous_state() {
    let (_, mut coordinator) = coordinator(MockSource::new(vec![
        Ok(Some(stop_times(&[2, 5, 8]))),
        Ok(None),
        Ok(Some(RawPayload::StopTimes(json!({"unexpected": true})))),
    ]));
    let rx = coordinator.subscribe();

    coordinator.refresh(now()).await;

    let report = coordinator.refresh(now() + ChronoDuration::minutes(1)).await;
    assert!(matches!(
        report.outcome,
        CycleOutcome::TransientFailure(FetchFault::Empty)
    ));

    let report = coordinator.refresh(now() + ChronoDuration::minutes(2)).await;
    assert!(matches!(
        report.outcome,
        CycleOutcome::TransientFailure(FetchFault::Malformed)
    ));

    let later = now() + ChronoDuration::minutes(2);
    let snapshot = rx.borrow().clone();
    assert_eq!(snapshot.slot(Slot::NEXT).current_state(later), Some(iso(2)));
    assert!(snapshot.available(Slot::NEXT, later));
}

#[tokio::test]
async fn shorter_cycle_keeps_previous_departures() {
    let (_, mut coordinator) = coordinator(MockSource::new(vec![
        Ok(Some(stop_times(&[2, 5, 8]))),
        Ok(Some(stop_times(&[5, 8]))),
        Ok(Some(stop_times(&[]))),
    ]));

    coordinator.refresh(now()).await;

    let report = coordinator.refresh(now()).await;
    assert!(matches!(report.outcome, CycleOutcome::Fresh { departures: 2 }));
    let snapshot = coordinator.snapshot();
    assert_eq!(snapshot.slot(Slot::NEXT).current_state(now()), Some(iso(5)));
    assert_eq!(snapshot.slot(Slot::THIRD).current_state(now()), Some(iso(8)));

    let report = coordinator.refresh(now()).await;
    assert!(matches!(report.outcome, CycleOutcome::Fresh { departures: 0 }));
    let snapshot = coordinator.snapshot();
    assert_eq!(snapshot.slot(Slot::NEXT).current_state(now()), Some(iso(5)));
    assert!(snapshot.available(Slot::NEXT, now()));
}

#[tokio::test]
async fn expired_token_is_refreshed_before_fetch() {
    let (source, coordinator) = coordinator(MockSource::new(vec![Ok(Some(stop_times(&[3])))]));
    let expired = Credential::new("old", now().timestamp() - 1);
    let mut coordinator =
        coordinator.with_auth(TokenGuard::new(MockIssuer::ok("new"), Some(expired)));

    let report = coordinator.refresh(now()).await;

    assert!(report.token_refreshed);
    assert!(report.is_fresh());
    let guard = coordinator.token_guard().unwrap();
    assert_eq!(guard.issuer().calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        *source.tokens_seen.lock().unwrap(),
        vec![Some("new".to_string())]
    );
}

#[tokio::test]
async fn failed_token_refresh_skips_fetch() {
    let (source, coordinator) =
        coordinator(MockSource::credentialed(vec![Ok(Some(stop_times(&[3])))]));
    let expired = Credential::new("old", now().timestamp() - 1);
    let mut coordinator =
        coordinator.with_auth(TokenGuard::new(MockIssuer::failing(), Some(expired)));
    let rx = coordinator.subscribe();

    let report = coordinator.refresh(now()).await;

    assert!(matches!(
        report.outcome,
        CycleOutcome::AuthenticationFault(AuthError::Unreachable(_))
    ));
    assert_eq!(source.calls(), 0);
    assert!(rx.borrow().auth_blocked);
}

#[tokio::test(start_paused = true)]
async fn slow_token_request_times_out() {
    let (source, coordinator) =
        coordinator(MockSource::credentialed(vec![Ok(Some(stop_times(&[3])))]));
    let mut coordinator =
        coordinator.with_auth(TokenGuard::new(MockIssuer::slow(Duration::from_secs(30)), None));

    let report = coordinator.refresh(now()).await;

    let CycleOutcome::AuthenticationFault(AuthError::Unreachable(message)) = &report.outcome else {
        panic!("expected auth fault, got {:?}", report.outcome);
    };
    assert!(message.contains("timed out"));
    assert_eq!(source.calls(), 0);
    assert!(coordinator.snapshot().auth_blocked);
}

/// Motis answers on its own, RNV only with a token.
fn combined_with_failing_token(
    motis: Vec<Response>,
) -> (
    Arc<MockSource>,
    Arc<MockSource>,
    Coordinator<CombinedSource<Arc<MockSource>, Arc<MockSource>>, MockIssuer>,
) {
    let motis = Arc::new(MockSource::new(motis));
    let rnv = Arc::new(MockSource::credentialed(vec![Ok(Some(stop_times(&[6])))]));
    let expired = Credential::new("old", now().timestamp() - 1);
    let coordinator = Coordinator::new(
        Arc::new(CombinedSource::new(Arc::clone(&motis), Arc::clone(&rnv))),
        query(),
        Locale::default(),
        CoordinatorConfig::default(),
    )
    .with_auth(TokenGuard::new(MockIssuer::failing(), Some(expired)));
    (motis, rnv, coordinator)
}

#[tokio::test]
async fn failed_token_still_fetches_leg_without_credential() {
    let (motis, rnv, mut coordinator) =
        combined_with_failing_token(vec![Ok(Some(stop_times(&[4])))]);

    let report = coordinator.refresh(now()).await;

    assert!(report.is_fresh());
    assert_eq!(motis.calls(), 1);
    // the expired token is not sent
    assert_eq!(*rnv.tokens_seen.lock().unwrap(), vec![None]);
    let snapshot = coordinator.snapshot();
    assert_eq!(snapshot.slot(Slot::NEXT).current_state(now()), Some(iso(4)));
    assert!(!snapshot.auth_blocked);
    assert!(snapshot.available(Slot::NEXT, now()));
}

#[tokio::test]
async fn failed_token_with_no_other_answer_is_auth_fault() {
    let (motis, _, mut coordinator) = combined_with_failing_token(vec![Ok(None)]);

    let report = coordinator.refresh(now()).await;

    assert!(matches!(
        report.outcome,
        CycleOutcome::AuthenticationFault(AuthError::Unreachable(_))
    ));
    assert_eq!(motis.calls(), 1);
    assert!(coordinator.snapshot().auth_blocked);
}

#[tokio::test]
async fn valid_token_is_reused() {
    let (_, coordinator) = coordinator(MockSource::new(vec![Ok(Some(stop_times(&[3])))]));
    let valid = Credential::new("current", now().timestamp() + 60);
    let mut coordinator =
        coordinator.with_auth(TokenGuard::new(MockIssuer::ok("new"), Some(valid)));

    let report = coordinator.refresh(now()).await;

    assert!(!report.token_refreshed);
    let guard = coordinator.token_guard().unwrap();
    assert_eq!(guard.issuer().calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn rejected_token_is_dropped_and_station_blocked() {
    let (_, coordinator) = coordinator(MockSource::new(vec![
        Ok(Some(stop_times(&[3]))),
        Err(SourceError::Unauthorized { status: 401 }),
        Ok(Some(stop_times(&[4]))),
    ]));
    let valid = Credential::new("current", now().timestamp() + 3600);
    let mut coordinator =
        coordinator.with_auth(TokenGuard::new(MockIssuer::ok("new"), Some(valid)));
    let rx = coordinator.subscribe();

    coordinator.refresh(now()).await;

    let report = coordinator.refresh(now()).await;
    assert!(matches!(
        report.outcome,
        CycleOutcome::AuthenticationFault(AuthError::Rejected { status: 401 })
    ));
    assert!(coordinator.token_guard().unwrap().credential().is_none());
    assert!(!rx.borrow().available(Slot::NEXT, now()));
    // the last departure is still known
    assert_eq!(rx.borrow().slot(Slot::NEXT).current_state(now()), Some(iso(3)));

    let report = coordinator.refresh(now()).await;
    assert!(report.token_refreshed);
    assert!(report.is_fresh());
    assert!(rx.borrow().available(Slot::NEXT, now()));
}

#[tokio::test(start_paused = true)]
async fn slow_fetch_times_out() {
    let (source, mut coordinator) = coordinator(MockSource::slow(Duration::from_secs(30)));

    let report = coordinator.refresh(now()).await;

    assert!(matches!(
        report.outcome,
        CycleOutcome::TransientFailure(FetchFault::Timeout(d)) if d == Duration::from_secs(10)
    ));
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn combined_source_survives_one_failure() {
    let primary = MockSource::new(vec![
        Err(SourceError::Config("down".into())),
        Ok(None),
    ]);
    let secondary = MockSource::new(vec![Ok(Some(stop_times(&[4]))), Ok(None)]);
    let source = Arc::new(CombinedSource::new(primary, secondary));
    let mut coordinator = Coordinator::new(
        Arc::clone(&source),
        query(),
        Locale::default(),
        CoordinatorConfig::default(),
    );

    let report = coordinator.refresh(now()).await;
    assert!(report.is_fresh());
    assert_eq!(
        coordinator.snapshot().slot(Slot::NEXT).current_state(now()),
        Some(iso(4))
    );

    // both fail: transient failure, state kept
    let report = coordinator.refresh(now()).await;
    assert!(matches!(report.outcome, CycleOutcome::TransientFailure(_)));
    assert_eq!(
        coordinator.snapshot().slot(Slot::NEXT).current_state(now()),
        Some(iso(4))
    );
}

#[tokio::test]
async fn restored_state_is_published_before_first_cycle() {
    let (_, coordinator) = coordinator(MockSource::new(vec![]));
    let restored = RestoredSnapshot {
        state: Some(iso(-2)),
        attributes: None,
    };
    let coordinator = coordinator.with_restored(Slot::NEXT, restored);
    let rx = coordinator.subscribe();

    assert_eq!(rx.borrow().slot(Slot::NEXT).current_state(now()), Some(iso(-2)));
}

#[tokio::test(start_paused = true)]
async fn run_stops_when_all_receivers_are_dropped() {
    let (source, coordinator) = coordinator(MockSource::new(vec![]));
    let rx = coordinator.subscribe();
    let handle = tokio::spawn(coordinator.run());

    tokio::time::sleep(Duration::from_secs(125)).await;
    drop(rx);
    tokio::time::sleep(Duration::from_secs(61)).await;

    handle.await.unwrap();
    // ticks at 0s, 60s and 120s
    assert_eq!(source.calls(), 3);
}
