mod client;
mod error;
mod types;

pub use client::{parse_quota_headers, GitHubClient};
pub use error::FetchError;
pub use types::{Event, Forkee, Payload, RepoRef};

use async_trait::async_trait;

use crate::quota::{QuotaState, RateLimitTracker};

/// Result of fetching one page of events.
///
/// Transport and parse failures are reported as `Err(FetchError)` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The page was fetched and parsed.
    Data(Vec<Event>),
    /// Nothing new since the last poll of this page (HTTP 304).
    Unchanged,
    /// The quota is exhausted; do not retry before `reset_at` (epoch seconds).
    RateLimited { reset_at: i64 },
}

/// The credential used for upstream requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    token: Option<String>,
}

impl Identity {
    /// Unauthenticated access (60 req/hr on GitHub).
    pub fn anonymous() -> Self {
        Self { token: None }
    }

    /// Token-authenticated access. Empty tokens fall back to anonymous.
    pub fn with_token(token: impl Into<String>) -> Self {
        let token = token.into();
        Self {
            token: (!token.is_empty()).then_some(token),
        }
    }

    /// Build from an optional configured token.
    pub fn from_token(token: Option<String>) -> Self {
        token.map(Self::with_token).unwrap_or_default()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

/// A paginated source of upstream events.
///
/// [`GitHubClient`] is the production implementation; the poll loop only
/// depends on this trait.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Fetch one page (1-based) of events.
    ///
    /// Updates the source's [`RateLimitTracker`] from response metadata.
    async fn fetch_page(&self, page: u32) -> Result<FetchOutcome, FetchError>;

    /// Refresh the quota from the companion rate-limit endpoint.
    async fn fetch_rate_limit(&self) -> Result<QuotaState, FetchError>;

    /// The tracker this source records quota into.
    fn tracker(&self) -> &RateLimitTracker;

    /// Keep the cache validators seen during the run that was just published.
    ///
    /// Until this is called, pages fetched in the current run are requested
    /// unconditionally again, so an aborted run never turns into a 304.
    fn commit_run(&self) {}

    /// Forget the cache validators seen during an aborted or unchanged run.
    fn discard_run(&self) {}
}

#[async_trait]
impl<S: EventSource + ?Sized> EventSource for Box<S> {
    async fn fetch_page(&self, page: u32) -> Result<FetchOutcome, FetchError> {
        (**self).fetch_page(page).await
    }

    async fn fetch_rate_limit(&self) -> Result<QuotaState, FetchError> {
        (**self).fetch_rate_limit().await
    }

    fn tracker(&self) -> &RateLimitTracker {
        (**self).tracker()
    }

    fn commit_run(&self) {
        (**self).commit_run()
    }

    fn discard_run(&self) {
        (**self).discard_run()
    }
}
