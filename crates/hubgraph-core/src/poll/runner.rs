use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::config::PollConfig;
use crate::github::{EventSource, FetchOutcome};
use crate::graph::GraphBuilder;
use crate::publish::{Dashboard, PublicationReader, PublicationStore};

use super::{Cycle, PollError, PollProgress, RefreshSchedule, RunOutcome, WaitReason};

const TICK: Duration = Duration::from_secs(1);

/// Drives runs against an [`EventSource`] and publishes the results.
pub struct Poller<S: EventSource> {
    source: S,
    store: PublicationStore,
    pages: u32,
    delay: Option<Duration>,
    margin: Duration,
    max_restarts: u32,
    schedule: RefreshSchedule,
    progress: Option<mpsc::UnboundedSender<PollProgress>>,
}

impl<S: EventSource> Poller<S> {
    /// Creates a poller. The schedule is resolved from whatever quota the
    /// source's tracker holds; call [`prime`](Self::prime) to refresh it.
    pub fn new(source: S, config: &PollConfig) -> Self {
        let pages = config.pages.max(1);
        let delay = config.delay_secs.map(Duration::from_secs);
        let schedule = RefreshSchedule::resolve(delay, &source.tracker().current(), pages);

        Self {
            source,
            store: PublicationStore::new(),
            pages,
            delay,
            margin: Duration::from_secs(config.rate_limit_margin_secs),
            max_restarts: config.max_rate_limit_restarts,
            schedule,
            progress: None,
        }
    }

    /// Sends progress updates through `tx`.
    pub fn with_progress(mut self, tx: mpsc::UnboundedSender<PollProgress>) -> Self {
        self.progress = Some(tx);
        self
    }

    /// A read-only handle on the published documents.
    pub fn reader(&self) -> PublicationReader {
        self.store.reader()
    }

    pub fn store(&self) -> &PublicationStore {
        &self.store
    }

    pub fn schedule(&self) -> &RefreshSchedule {
        &self.schedule
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch the current quota and resolve the refresh schedule from it.
    ///
    /// A failed quota fetch is logged; the schedule then falls back to the
    /// fixed delay or the default interval.
    pub async fn prime(&mut self) -> RefreshSchedule {
        if let Err(e) = self.source.fetch_rate_limit().await {
            tracing::warn!(error = %e, "Could not fetch initial rate limits");
        }

        self.refresh_schedule();
        let quota = self.source.tracker().current();
        tracing::info!(
            interval_secs = self.schedule.interval().as_secs(),
            source = ?self.schedule.source(),
            limit = quota.limit,
            remaining = quota.remaining,
            "Refresh schedule resolved"
        );

        self.schedule
    }

    /// Perform one run: fetch every page, then publish.
    ///
    /// A rate limit restarts the whole run after the reset window, at most
    /// `max_rate_limit_restarts` times. Pages from an aborted attempt are
    /// discarded, and so are the cache validators they returned.
    pub async fn run_once(&mut self) -> Result<RunOutcome, PollError> {
        let result = self.fetch_and_publish().await;
        if !matches!(result, Ok(RunOutcome::Published { .. })) {
            self.source.discard_run();
        }
        result
    }

    async fn fetch_and_publish(&mut self) -> Result<RunOutcome, PollError> {
        let mut restarts = 0;

        'run: loop {
            self.emit(PollProgress::RunStarted {
                attempt: restarts + 1,
            });
            let mut builder = GraphBuilder::new();

            for page in 1..=self.pages {
                let outcome = self
                    .source
                    .fetch_page(page)
                    .await
                    .map_err(|source| PollError::Fetch { page, source })?;

                match outcome {
                    FetchOutcome::Data(events) => {
                        builder.add_events(&events);
                        self.emit(PollProgress::PageFetched {
                            page,
                            pages: self.pages,
                            events: events.len(),
                        });
                    }
                    FetchOutcome::Unchanged => {
                        tracing::info!(page, "No new data available");
                        self.emit(PollProgress::NoNewData);
                        return Ok(RunOutcome::Unchanged);
                    }
                    FetchOutcome::RateLimited { reset_at } => {
                        if restarts >= self.max_restarts {
                            return Err(PollError::RateLimitRetriesExhausted { restarts });
                        }
                        restarts += 1;

                        self.source.discard_run();
                        self.wait_for_reset(reset_at).await;
                        continue 'run;
                    }
                }
            }

            return self.publish(builder).await;
        }
    }

    /// Run forever: one run per refresh interval.
    ///
    /// Failed runs are logged and retried on the next cycle.
    pub async fn run_forever(mut self) {
        self.prime().await;

        loop {
            self.cycle().await;
        }
    }

    /// One loop iteration: a run, then the wait until the next one is due.
    ///
    /// The wait is measured from the publication this cycle made. A cycle
    /// that published nothing is measured from its own start.
    pub async fn cycle(&mut self) -> Cycle {
        let started_at = Utc::now();

        let outcome = self.run_once().await;
        match &outcome {
            Ok(RunOutcome::Published {
                version,
                nodes,
                links,
            }) => {
                tracing::info!(version, nodes, links, "Graph published");
            }
            Ok(RunOutcome::Unchanged) => {}
            Err(e) => {
                tracing::error!(error = %e, "Run failed; keeping previous publication");
                self.emit(PollProgress::RunFailed {
                    message: e.to_string(),
                });
            }
        }
        self.refresh_schedule();

        let anchor = self
            .store
            .last_update()
            .map_or(started_at, |published| published.max(started_at));
        let wait = self.next_run_in(anchor, Utc::now());
        self.wait_for_next_run(wait).await;

        Cycle {
            outcome,
            anchor,
            waited: wait,
        }
    }

    /// Time left until the run anchored at `anchor` is due again.
    pub fn next_run_in(&self, anchor: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
        let secs = self.schedule.seconds_until_next(anchor, now);
        Duration::from_secs(secs.max(0) as u64)
    }

    /// Re-resolve the schedule from the tracker, picking up any poll hint
    /// recorded by page fetches.
    fn refresh_schedule(&mut self) {
        let quota = self.source.tracker().current();
        let schedule = RefreshSchedule::resolve(self.delay, &quota, self.pages);
        if schedule != self.schedule {
            tracing::debug!(
                interval_secs = schedule.interval().as_secs(),
                source = ?schedule.source(),
                "Refresh schedule changed"
            );
        }
        self.schedule = schedule;
    }

    async fn publish(&mut self, builder: GraphBuilder) -> Result<RunOutcome, PollError> {
        if let Err(e) = self.source.fetch_rate_limit().await {
            tracing::warn!(error = %e, "Could not refresh rate limits; using response headers");
        }

        self.refresh_schedule();
        let quota = self.source.tracker().current();
        let graph = builder.build();
        let (nodes, links) = (graph.nodes.len(), graph.links.len());

        let now = Utc::now();
        let dashboard = Dashboard::new(&quota, self.schedule.interval(), now);
        let publication = self.store.publish(graph, dashboard, now)?;
        self.source.commit_run();

        self.emit(PollProgress::Published {
            version: publication.version(),
            nodes,
            links,
            quota,
            published_at: publication.published_at(),
        });

        Ok(RunOutcome::Published {
            version: publication.version(),
            nodes,
            links,
        })
    }

    /// Wait until `reset_at` plus the safety margin, one second at a time.
    async fn wait_for_reset(&self, reset_at: i64) {
        let until_reset = (reset_at - Utc::now().timestamp()).max(0) as u64;
        let wait_secs = until_reset + self.margin.as_secs();

        tracing::warn!(reset_at, wait_secs, "Rate limit reached; restarting run after reset");
        self.emit(PollProgress::RateLimited {
            reset_at,
            wait_secs,
        });

        let mut remaining = wait_secs;
        while remaining > 0 {
            self.emit(PollProgress::Waiting {
                reason: WaitReason::RateLimit,
                remaining_secs: remaining,
            });
            tokio::time::sleep(TICK).await;
            remaining -= 1;
        }
    }

    /// Count down `wait` in one-second ticks.
    async fn wait_for_next_run(&self, wait: Duration) {
        let deadline = Instant::now() + wait;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }

            self.emit(PollProgress::Waiting {
                reason: WaitReason::NextRefresh,
                remaining_secs: remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0),
            });
            tokio::time::sleep(remaining.min(TICK)).await;
        }
    }

    fn emit(&self, progress: PollProgress) {
        if let Some(ref tx) = self.progress {
            let _ = tx.send(progress);
        }
    }
}
