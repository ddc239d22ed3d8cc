use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::DEFAULT_POLL_INTERVAL_PER_PAGE_SECS;
use crate::quota::QuotaState;

/// Where the refresh interval came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalSource {
    /// Operator-supplied fixed delay.
    Fixed,
    /// The API's `X-Poll-Interval` hint, scaled by page count.
    ApiHint,
    /// No hint observed; the built-in per-page interval.
    Default,
}

/// Time between the end of one publication and the next run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSchedule {
    interval: Duration,
    source: IntervalSource,
}

impl RefreshSchedule {
    /// Pick the refresh interval.
    ///
    /// A fixed delay always wins. Otherwise the API hint is multiplied by
    /// the page count, since every run spends one request per page.
    pub fn resolve(delay: Option<Duration>, quota: &QuotaState, pages: u32) -> Self {
        let pages = pages.max(1);

        if let Some(delay) = delay {
            return Self {
                interval: delay,
                source: IntervalSource::Fixed,
            };
        }

        match quota.poll_interval_hint() {
            Some(hint) => Self {
                interval: hint * pages,
                source: IntervalSource::ApiHint,
            },
            None => Self {
                interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_PER_PAGE_SECS) * pages,
                source: IntervalSource::Default,
            },
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn source(&self) -> IntervalSource {
        self.source
    }

    /// When the next run is due, given the time the last one was anchored at.
    pub fn next_due(&self, anchor: DateTime<Utc>) -> DateTime<Utc> {
        let secs = self.interval.as_secs().min(i32::MAX as u64) as i64;
        anchor + chrono::Duration::seconds(secs)
    }

    /// Whole seconds until the next run is due; zero or negative when overdue.
    pub fn seconds_until_next(&self, anchor: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
        (self.next_due(anchor) - now).num_seconds()
    }
}
