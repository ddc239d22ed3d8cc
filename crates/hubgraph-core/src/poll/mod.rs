//! The poll-transform-publish loop.
//!
//! A run fetches pages `1..=pages` in order and folds them into one graph.
//! A 304 on any page ends the run without publishing. A rate limit waits
//! out the reset window and restarts the run from page 1. Any other failure
//! abandons the run; the previous publication stays visible.

mod runner;
mod schedule;

pub use runner::Poller;
pub use schedule::{IntervalSource, RefreshSchedule};

use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::github::FetchError;
use crate::publish::PublishError;
use crate::quota::QuotaState;

/// How a run that did not fail ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// A new graph and dashboard were published.
    Published {
        version: u64,
        nodes: usize,
        links: usize,
    },
    /// Upstream had nothing new; nothing was published.
    Unchanged,
}

/// What one iteration of the loop did.
#[derive(Debug)]
pub struct Cycle {
    /// How the run ended.
    pub outcome: Result<RunOutcome, PollError>,
    /// The instant the wait was measured from.
    pub anchor: DateTime<Utc>,
    /// How long the loop waited before returning.
    pub waited: Duration,
}

/// Why a wait stage is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitReason {
    RateLimit,
    NextRefresh,
}

/// Progress updates emitted while the loop runs.
#[derive(Debug, Clone, PartialEq)]
pub enum PollProgress {
    /// A run (or a restart of one) began.
    RunStarted { attempt: u32 },
    /// One page was fetched and folded into the graph.
    PageFetched { page: u32, pages: u32, events: usize },
    /// Upstream reported no new data.
    NoNewData,
    /// The quota ran out; the run restarts after `wait_secs`.
    RateLimited { reset_at: i64, wait_secs: u64 },
    /// One-second tick of a wait stage.
    Waiting { reason: WaitReason, remaining_secs: u64 },
    /// A publication was made.
    Published {
        version: u64,
        nodes: usize,
        links: usize,
        quota: QuotaState,
        published_at: DateTime<Utc>,
    },
    /// The run was abandoned.
    RunFailed { message: String },
}

/// Errors that abandon a run.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("Failed to fetch page {page}: {source}")]
    Fetch {
        page: u32,
        #[source]
        source: FetchError,
    },

    #[error("Still rate limited after {restarts} restarts")]
    RateLimitRetriesExhausted { restarts: u32 },

    #[error("Publication failed: {0}")]
    Publish(#[from] PublishError),
}
