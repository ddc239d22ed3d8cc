use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use hubgraph_core::github::{Forkee, Payload, RepoRef};
use hubgraph_core::{
    Event, EventSource, FetchError, FetchOutcome, IntervalSource, Link, PollConfig, PollError,
    PollProgress, Poller, QuotaState, RateLimitTracker, RunOutcome, WaitReason,
};

/// An event source that replays a fixed script of page responses.
struct ScriptedSource {
    script: Mutex<VecDeque<Result<FetchOutcome, FetchError>>>,
    requested: Mutex<Vec<u32>>,
    /// `(limit, remaining, reset)` reported by the rate-limit endpoint.
    rate_limit: Option<(u32, u32, i64)>,
    /// `X-Poll-Interval` reported alongside every page, if any.
    page_hint: Option<u64>,
    /// Order of `commit_run` / `discard_run` calls.
    validators: Mutex<Vec<&'static str>>,
    tracker: RateLimitTracker,
}

impl ScriptedSource {
    fn new(script: Vec<Result<FetchOutcome, FetchError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requested: Mutex::new(Vec::new()),
            rate_limit: Some((60, 50, 0)),
            page_hint: None,
            validators: Mutex::new(Vec::new()),
            tracker: RateLimitTracker::new(),
        }
    }

    fn with_page_hint(mut self, secs: u64) -> Self {
        self.page_hint = Some(secs);
        self
    }

    fn validators(&self) -> Vec<&'static str> {
        self.validators.lock().clone()
    }

    fn offline_rate_limit(mut self) -> Self {
        self.rate_limit = None;
        self
    }

    fn push(&self, outcome: Result<FetchOutcome, FetchError>) {
        self.script.lock().push_back(outcome);
    }

    fn requested(&self) -> Vec<u32> {
        self.requested.lock().clone()
    }
}

#[async_trait]
impl EventSource for ScriptedSource {
    async fn fetch_page(&self, page: u32) -> Result<FetchOutcome, FetchError> {
        self.requested.lock().push(page);
        if let Some(hint) = self.page_hint {
            self.tracker.record_quota(60, 59, 0, hint);
        }
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::Network("script exhausted".into())))
    }

    async fn fetch_rate_limit(&self) -> Result<QuotaState, FetchError> {
        match self.rate_limit {
            Some((limit, remaining, reset)) => {
                self.tracker.record_window(limit, remaining, reset);
                Ok(self.tracker.current())
            }
            None => Err(FetchError::Timeout),
        }
    }

    fn tracker(&self) -> &RateLimitTracker {
        &self.tracker
    }

    fn commit_run(&self) {
        self.validators.lock().push("commit");
    }

    fn discard_run(&self) {
        self.validators.lock().push("discard");
    }
}

fn event(id: &str, kind: &str, repo: &str) -> Event {
    Event {
        id: id.to_string(),
        kind: kind.to_string(),
        repo: RepoRef {
            name: repo.to_string(),
        },
        payload: Payload::default(),
    }
}

fn fork(id: &str, repo: &str, forkee: &str) -> Event {
    let mut event = event(id, "ForkEvent", repo);
    event.payload.forkee = Some(Forkee {
        full_name: forkee.to_string(),
    });
    event
}

fn data(events: Vec<Event>) -> Result<FetchOutcome, FetchError> {
    Ok(FetchOutcome::Data(events))
}

fn config(pages: u32) -> PollConfig {
    PollConfig {
        pages,
        delay_secs: Some(120),
        rate_limit_margin_secs: 1,
        max_rate_limit_restarts: 3,
    }
}

#[tokio::test]
async fn test_two_page_run_publishes_example_graph() {
    let source = ScriptedSource::new(vec![
        data(vec![event("e1", "PushEvent", "acme/widget")]),
        data(vec![fork("e2", "acme/widget", "bob/widget")]),
    ]);
    let mut poller = Poller::new(source, &config(2));

    let outcome = poller.run_once().await.unwrap();
    assert_eq!(
        outcome,
        RunOutcome::Published {
            version: 1,
            nodes: 4,
            links: 3
        }
    );

    let publication = poller.reader().current().unwrap();
    let nodes: Vec<(&str, u32, &str)> = publication
        .graph()
        .nodes
        .iter()
        .map(|n| (n.id.as_str(), n.group, n.title.as_str()))
        .collect();
    assert_eq!(
        nodes,
        vec![
            ("acme/widget", 0, ""),
            ("e1", 12, "New commit pushed"),
            ("e2", 4, "Repo has been forked"),
            ("bob/widget", 0, ""),
        ]
    );
    assert_eq!(
        publication.graph().links,
        vec![
            Link::new("acme/widget", "e1", 1),
            Link::new("acme/widget", "e2", 1),
            Link::new("acme/widget", "bob/widget", 10),
        ]
    );
    assert_eq!(poller.source().requested(), vec![1, 2]);
}

#[tokio::test]
async fn test_dashboard_reflects_quota_at_publish_time() {
    let source = ScriptedSource::new(vec![data(vec![event("e1", "PushEvent", "a/b")])]);
    source.tracker().record_quota(60, 59, 0, 60);
    let mut poller = Poller::new(source, &config(1));

    poller.run_once().await.unwrap();

    // The post-run rate-limit refresh reports 60/50.
    let publication = poller.reader().current().unwrap();
    let dashboard = publication.dashboard();
    assert_eq!(dashboard.requests_used, 10);
    assert_eq!(dashboard.max_requests, 60);
    assert_eq!(dashboard.refresh_interval, 120);
    assert!(dashboard.last_update_time().is_some());

    let json: serde_json::Value = serde_json::from_str(publication.dashboard_json()).unwrap();
    assert_eq!(json["requestsUsed"], 10);
}

#[tokio::test]
async fn test_publishes_even_if_quota_refresh_fails() {
    let source = ScriptedSource::new(vec![data(vec![event("e1", "PushEvent", "a/b")])])
        .offline_rate_limit();
    source.tracker().record_quota(5000, 4990, 0, 0);
    let mut poller = Poller::new(source, &config(1));

    poller.run_once().await.unwrap();

    let publication = poller.reader().current().unwrap();
    assert_eq!(publication.dashboard().requests_used, 10);
    assert_eq!(publication.dashboard().max_requests, 5000);
}

#[tokio::test]
async fn test_unchanged_leaves_publication_untouched() {
    let source = ScriptedSource::new(vec![
        data(vec![event("e1", "PushEvent", "a/b")]),
        data(vec![event("e2", "PushEvent", "a/b")]),
    ]);
    let mut poller = Poller::new(source, &config(2));
    poller.run_once().await.unwrap();
    let before = poller.reader().current().unwrap();

    poller.source().push(data(vec![event("e3", "PushEvent", "c/d")]));
    poller.source().push(Ok(FetchOutcome::Unchanged));

    let outcome = poller.run_once().await.unwrap();
    assert_eq!(outcome, RunOutcome::Unchanged);

    let after = poller.reader().current().unwrap();
    assert_eq!(after.version(), before.version());
    assert_eq!(after.graph_json(), before.graph_json());
    assert_eq!(after.dashboard_json(), before.dashboard_json());
    assert!(after.graph().node("e3").is_none());
}

#[tokio::test]
async fn test_unchanged_stops_fetching_remaining_pages() {
    let source = ScriptedSource::new(vec![Ok(FetchOutcome::Unchanged)]);
    let mut poller = Poller::new(source, &config(3));

    assert_eq!(poller.run_once().await.unwrap(), RunOutcome::Unchanged);
    assert_eq!(poller.source().requested(), vec![1]);
    assert!(poller.reader().current().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_restarts_whole_run() {
    let reset_at = Utc::now().timestamp() + 2;
    let source = ScriptedSource::new(vec![
        data(vec![event("stale", "PushEvent", "old/repo")]),
        Ok(FetchOutcome::RateLimited { reset_at }),
        data(vec![event("e1", "PushEvent", "acme/widget")]),
        data(vec![event("e2", "WatchEvent", "acme/widget")]),
    ]);
    let mut poller = Poller::new(source, &config(2));

    let outcome = poller.run_once().await.unwrap();
    assert!(matches!(outcome, RunOutcome::Published { version: 1, .. }));
    assert_eq!(poller.source().requested(), vec![1, 2, 1, 2]);

    let publication = poller.reader().current().unwrap();
    let graph = publication.graph();
    assert!(graph.node("stale").is_none());
    assert!(graph.node("old/repo").is_none());
    assert!(graph.node("e1").is_some());
    assert!(graph.node("e2").is_some());
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_waits_until_reset() {
    let reset_at = Utc::now().timestamp() + 5;
    let source = ScriptedSource::new(vec![
        Ok(FetchOutcome::RateLimited { reset_at }),
        data(vec![event("e1", "PushEvent", "a/b")]),
    ]);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut poller = Poller::new(source, &config(1)).with_progress(tx);

    let started = tokio::time::Instant::now();
    poller.run_once().await.unwrap();

    // At least the reported window, plus the one-second margin, on the paused clock.
    assert!(started.elapsed() >= Duration::from_secs(5));

    let mut saw_rate_limited = false;
    let mut ticks = 0;
    while let Ok(progress) = rx.try_recv() {
        match progress {
            PollProgress::RateLimited { reset_at: r, wait_secs } => {
                assert_eq!(r, reset_at);
                assert!(wait_secs >= 5);
                saw_rate_limited = true;
            }
            PollProgress::Waiting { .. } => ticks += 1,
            _ => {}
        }
    }
    assert!(saw_rate_limited);
    assert!(ticks >= 5);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_restarts_are_bounded() {
    let reset_at = Utc::now().timestamp();
    let script = (0..5)
        .map(|_| Ok(FetchOutcome::RateLimited { reset_at }))
        .collect();
    let source = ScriptedSource::new(script);
    let mut poll_config = config(1);
    poll_config.max_rate_limit_restarts = 2;
    let mut poller = Poller::new(source, &poll_config);

    let err = poller.run_once().await.unwrap_err();
    assert!(matches!(err, PollError::RateLimitRetriesExhausted { restarts: 2 }));
    assert_eq!(poller.source().requested(), vec![1, 1, 1]);
    assert!(poller.reader().current().is_none());
}

#[tokio::test]
async fn test_transport_failure_abandons_run() {
    let source = ScriptedSource::new(vec![
        data(vec![event("e1", "PushEvent", "a/b")]),
        data(vec![]),
    ]);
    let mut poller = Poller::new(source, &config(2));
    poller.run_once().await.unwrap();

    poller.source().push(data(vec![event("e9", "PushEvent", "x/y")]));
    poller
        .source()
        .push(Err(FetchError::MalformedResponse("expected array".into())));

    let err = poller.run_once().await.unwrap_err();
    assert!(matches!(
        err,
        PollError::Fetch {
            page: 2,
            source: FetchError::MalformedResponse(_)
        }
    ));

    // The first publication is still served.
    assert_eq!(poller.source().requested(), vec![1, 2, 1, 2]);
    let current = poller.reader().current().unwrap();
    assert_eq!(current.version(), 1);
    assert!(current.graph().node("e9").is_none());
}

#[tokio::test]
async fn test_progress_reports_pages() {
    let source = ScriptedSource::new(vec![
        data(vec![event("e1", "PushEvent", "a/b"), event("e2", "PushEvent", "a/b")]),
        data(vec![event("e3", "PushEvent", "a/b")]),
    ]);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut poller = Poller::new(source, &config(2)).with_progress(tx);

    poller.run_once().await.unwrap();

    let mut updates = Vec::new();
    while let Ok(progress) = rx.try_recv() {
        updates.push(progress);
    }

    assert_eq!(updates[0], PollProgress::RunStarted { attempt: 1 });
    assert_eq!(
        updates[1],
        PollProgress::PageFetched {
            page: 1,
            pages: 2,
            events: 2
        }
    );
    assert_eq!(
        updates[2],
        PollProgress::PageFetched {
            page: 2,
            pages: 2,
            events: 1
        }
    );
    assert!(matches!(
        updates[3],
        PollProgress::Published {
            version: 1,
            nodes: 4,
            links: 3,
            ..
        }
    ));
}

#[tokio::test]
async fn test_prime_resolves_schedule_from_quota() {
    let source = ScriptedSource::new(vec![]);
    source.tracker().record_quota(60, 60, 0, 60);
    let mut poll_config = config(3);
    poll_config.delay_secs = None;
    let mut poller = Poller::new(source, &poll_config);

    let schedule = poller.prime().await;
    assert_eq!(schedule.interval(), Duration::from_secs(180));
    assert_eq!(poller.schedule().interval(), Duration::from_secs(180));
}

#[tokio::test(start_paused = true)]
async fn test_validators_follow_publication() {
    let reset_at = Utc::now().timestamp();
    let source = ScriptedSource::new(vec![
        data(vec![event("e1", "PushEvent", "a/b")]),
        Ok(FetchOutcome::RateLimited { reset_at }),
        data(vec![event("e1", "PushEvent", "a/b")]),
        data(vec![event("e2", "PushEvent", "a/b")]),
        Ok(FetchOutcome::Unchanged),
    ]);
    let mut poller = Poller::new(source, &config(2));

    poller.run_once().await.unwrap();
    // The aborted attempt is forgotten before the restart, the full run kept.
    assert_eq!(poller.source().validators(), vec!["discard", "commit"]);

    assert_eq!(poller.run_once().await.unwrap(), RunOutcome::Unchanged);
    assert_eq!(
        poller.source().validators(),
        vec!["discard", "commit", "discard"]
    );
}

#[tokio::test]
async fn test_failed_run_discards_validators() {
    let source = ScriptedSource::new(vec![
        data(vec![event("e1", "PushEvent", "a/b")]),
        Err(FetchError::Timeout),
    ]);
    let mut poller = Poller::new(source, &config(2));

    assert!(poller.run_once().await.is_err());
    assert_eq!(poller.source().validators(), vec!["discard"]);
}

#[tokio::test]
async fn test_schedule_follows_hint_from_pages() {
    let source = ScriptedSource::new(vec![
        data(vec![event("e1", "PushEvent", "a/b")]),
        data(vec![event("e2", "PushEvent", "c/d")]),
    ])
    .with_page_hint(7);
    let mut poll_config = config(2);
    poll_config.delay_secs = None;
    let mut poller = Poller::new(source, &poll_config);

    // The rate-limit endpoint carries no poll hint.
    let primed = poller.prime().await;
    assert_eq!(primed.source(), IntervalSource::Default);
    assert_eq!(primed.interval(), Duration::from_secs(120));

    poller.run_once().await.unwrap();
    assert_eq!(poller.schedule().source(), IntervalSource::ApiHint);
    assert_eq!(poller.schedule().interval(), Duration::from_secs(14));

    let publication = poller.reader().current().unwrap();
    assert_eq!(publication.dashboard().refresh_interval, 14);
}

#[tokio::test]
async fn test_fixed_delay_ignores_page_hint() {
    let source = ScriptedSource::new(vec![data(vec![event("e1", "PushEvent", "a/b")])])
        .with_page_hint(7);
    let mut poller = Poller::new(source, &config(1));

    poller.run_once().await.unwrap();
    assert_eq!(poller.schedule().source(), IntervalSource::Fixed);
    assert_eq!(poller.schedule().interval(), Duration::from_secs(120));
}

#[tokio::test(start_paused = true)]
async fn test_cycle_waits_from_publication() {
    let source = ScriptedSource::new(vec![
        data(vec![event("e1", "PushEvent", "a/b")]),
        Ok(FetchOutcome::Unchanged),
    ]);
    let mut poll_config = config(1);
    poll_config.delay_secs = Some(60);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut poller = Poller::new(source, &poll_config).with_progress(tx);

    let started = tokio::time::Instant::now();
    let first = poller.cycle().await;
    assert!(matches!(first.outcome, Ok(RunOutcome::Published { version: 1, .. })));

    let published_at = poller.reader().current().unwrap().published_at();
    assert_eq!(first.anchor, published_at);
    assert!(first.waited <= Duration::from_secs(60));
    assert!(first.waited >= Duration::from_secs(59));
    assert!(started.elapsed() >= first.waited);

    let ticks = std::iter::from_fn(|| rx.try_recv().ok())
        .filter(|p| {
            matches!(
                p,
                PollProgress::Waiting {
                    reason: WaitReason::NextRefresh,
                    ..
                }
            )
        })
        .count() as u64;
    assert_eq!(ticks, first.waited.as_secs());

    // Nothing new: the publication stays, and the cycle waits a full
    // interval from its own start instead of re-running immediately.
    let second = poller.cycle().await;
    assert!(matches!(second.outcome, Ok(RunOutcome::Unchanged)));
    assert!(second.anchor >= first.anchor);
    assert!(second.waited >= Duration::from_secs(59));
    assert_eq!(poller.reader().current().unwrap().version(), 1);
}

#[tokio::test]
async fn test_next_run_is_measured_from_anchor() {
    let source = ScriptedSource::new(vec![]);
    let mut poll_config = config(1);
    poll_config.delay_secs = Some(60);
    let poller = Poller::new(source, &poll_config);

    let anchor = Utc::now();
    let late = anchor + chrono::Duration::seconds(45);
    assert_eq!(poller.next_run_in(anchor, late), Duration::from_secs(15));

    let overdue = anchor + chrono::Duration::seconds(90);
    assert_eq!(poller.next_run_in(anchor, overdue), Duration::ZERO);
}
