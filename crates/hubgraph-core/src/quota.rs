//! Rate limit tracking for the upstream API identity in use.
//!
//! The tracker is shared between the fetcher (writer) and the poll loop
//! (reader). Reads hand out a copy of the state, never a reference into it.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

/// The most recently observed API quota.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuotaState {
    /// Requests allowed per window.
    pub limit: u32,
    /// Requests left in the current window.
    pub remaining: u32,
    /// When the window resets, in seconds since the Unix epoch.
    pub reset_at: i64,
    /// Suggested seconds between polls (`X-Poll-Interval`), 0 if never seen.
    pub poll_interval: u64,
    /// Whether any quota information has been recorded yet.
    pub fetched: bool,
}

impl QuotaState {
    /// Requests consumed in the current window.
    pub fn used(&self) -> u32 {
        self.limit.saturating_sub(self.remaining)
    }

    /// The suggested poll interval, if the API has provided one.
    pub fn poll_interval_hint(&self) -> Option<Duration> {
        (self.fetched && self.poll_interval > 0).then(|| Duration::from_secs(self.poll_interval))
    }
}

/// Holds the latest [`QuotaState`] for one client identity.
///
/// Cloning the tracker shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct RateLimitTracker {
    state: Arc<RwLock<QuotaState>>,
}

impl RateLimitTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the held quota.
    pub fn record_quota(&self, limit: u32, remaining: u32, reset_at: i64, poll_interval: u64) {
        self.record(QuotaState {
            limit,
            remaining,
            reset_at,
            poll_interval,
            fetched: true,
        });
    }

    /// Overwrite the held quota with a complete state.
    pub fn record(&self, state: QuotaState) {
        *self.state.write() = QuotaState {
            fetched: true,
            ..state
        };
    }

    /// Update limit, remaining and reset while keeping the last poll hint.
    ///
    /// The rate-limit endpoint reports the window but not a poll interval.
    pub fn record_window(&self, limit: u32, remaining: u32, reset_at: i64) {
        let mut state = self.state.write();
        state.limit = limit;
        state.remaining = remaining;
        state.reset_at = reset_at;
        state.fetched = true;
    }

    /// A snapshot of the held quota.
    pub fn current(&self) -> QuotaState {
        *self.state.read()
    }
}
