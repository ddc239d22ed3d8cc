use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, ETAG, IF_NONE_MATCH};
use reqwest::{Client, RequestBuilder, StatusCode};

use crate::config::{GitHubConfig, EVENTS_PATH, RATE_LIMIT_PATH};
use crate::quota::{QuotaState, RateLimitTracker};

use super::types::{Event, RateLimitResponse};
use super::{EventSource, FetchError, FetchOutcome, Identity};

const HEADER_LIMIT: &str = "x-ratelimit-limit";
const HEADER_REMAINING: &str = "x-ratelimit-remaining";
const HEADER_RESET: &str = "x-ratelimit-reset";
const HEADER_POLL_INTERVAL: &str = "x-poll-interval";

const GITHUB_ACCEPT: &str = "application/vnd.github+json";

/// GitHub REST client for the public events stream.
///
/// Authenticated and anonymous identities share the same request, parsing
/// and quota extraction path; only the `Authorization` header differs.
pub struct GitHubClient {
    base_url: String,
    identity: Identity,
    client: Client,
    tracker: RateLimitTracker,
    /// ETag of each page as of the last published run, sent back as
    /// `If-None-Match`.
    etags: Mutex<HashMap<u32, String>>,
    /// ETags seen during the run in progress.
    pending_etags: Mutex<HashMap<u32, String>>,
}

impl GitHubClient {
    /// Creates a client recording quota into `tracker`.
    pub fn new(
        config: &GitHubConfig,
        identity: Identity,
        tracker: RateLimitTracker,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            identity,
            client,
            tracker,
            etags: Mutex::new(HashMap::new()),
            pending_etags: Mutex::new(HashMap::new()),
        })
    }

    /// Creates a client from configuration alone, with a fresh tracker.
    pub fn from_config(config: &GitHubConfig) -> Result<Self, FetchError> {
        Self::new(
            config,
            Identity::from_token(config.token.clone()),
            RateLimitTracker::new(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Builds the GET for one page of events, including any cached ETag.
    pub fn events_request(&self, page: u32) -> Result<reqwest::Request, FetchError> {
        let url = format!("{}{}", self.base_url, EVENTS_PATH);
        let mut req = self
            .client
            .get(&url)
            .query(&[("page", page)])
            .header(ACCEPT, GITHUB_ACCEPT);

        if let Some(etag) = self.etags.lock().get(&page) {
            req = req.header(IF_NONE_MATCH, etag.as_str());
        }

        self.authorize(req)
            .build()
            .map_err(|e| FetchError::InvalidUrl(e.to_string()))
    }

    fn rate_limit_request(&self) -> Result<reqwest::Request, FetchError> {
        let url = format!("{}{}", self.base_url, RATE_LIMIT_PATH);
        let req = self.client.get(&url).header(ACCEPT, GITHUB_ACCEPT);
        self.authorize(req)
            .build()
            .map_err(|e| FetchError::InvalidUrl(e.to_string()))
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match self.identity.token() {
            Some(token) => req.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => req,
        }
    }

    /// Reset time to report for a rate-limited response.
    fn reset_for(&self, quota: Option<QuotaState>) -> i64 {
        quota
            .map(|q| q.reset_at)
            .filter(|reset| *reset > 0)
            .unwrap_or_else(|| self.tracker.current().reset_at)
    }
}

#[async_trait]
impl EventSource for GitHubClient {
    async fn fetch_page(&self, page: u32) -> Result<FetchOutcome, FetchError> {
        let request = self.events_request(page)?;
        let response = self.client.execute(request).await?;

        let status = response.status();
        let quota = parse_quota_headers(response.headers())?;
        if let Some(quota) = quota {
            self.tracker.record(quota);
        }

        match status {
            StatusCode::NOT_MODIFIED => {
                tracing::debug!(page, "Page not modified");
                Ok(FetchOutcome::Unchanged)
            }
            StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
                let reset_at = self.reset_for(quota);
                tracing::warn!(page, reset_at, "Rate limited by upstream");
                Ok(FetchOutcome::RateLimited { reset_at })
            }
            status if status.is_success() => {
                if let Some(etag) = response.headers().get(ETAG).and_then(|v| v.to_str().ok()) {
                    self.pending_etags.lock().insert(page, etag.to_string());
                }

                let body = response.bytes().await?;
                let events: Vec<Event> = serde_json::from_slice(&body)?;
                tracing::debug!(page, count = events.len(), "Fetched events page");
                Ok(FetchOutcome::Data(events))
            }
            status => {
                let message = response.text().await.unwrap_or_default();
                Err(FetchError::UnexpectedStatus {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    async fn fetch_rate_limit(&self) -> Result<QuotaState, FetchError> {
        let request = self.rate_limit_request()?;
        let response = self.client.execute(request).await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(FetchError::UnexpectedStatus {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        let parsed: RateLimitResponse = serde_json::from_slice(&body)?;
        let core = parsed.resources.core;
        self.tracker.record_window(core.limit, core.remaining, core.reset);

        Ok(self.tracker.current())
    }

    fn tracker(&self) -> &RateLimitTracker {
        &self.tracker
    }

    fn commit_run(&self) {
        let pending = std::mem::take(&mut *self.pending_etags.lock());
        self.etags.lock().extend(pending);
    }

    fn discard_run(&self) {
        self.pending_etags.lock().clear();
    }
}

/// Extracts quota information from GitHub response headers.
///
/// Returns `None` when the response carries no rate-limit headers at all.
/// Otherwise missing values count as zero; values that are present but not
/// numeric are a malformed response.
pub fn parse_quota_headers(headers: &HeaderMap) -> Result<Option<QuotaState>, FetchError> {
    let any_present = [HEADER_LIMIT, HEADER_REMAINING, HEADER_RESET, HEADER_POLL_INTERVAL]
        .iter()
        .any(|name| headers.contains_key(*name));
    if !any_present {
        return Ok(None);
    }

    Ok(Some(QuotaState {
        limit: header_number(headers, HEADER_LIMIT)?,
        remaining: header_number(headers, HEADER_REMAINING)?,
        reset_at: header_number(headers, HEADER_RESET)?,
        poll_interval: header_number(headers, HEADER_POLL_INTERVAL)?,
        fetched: true,
    }))
}

fn header_number<T>(headers: &HeaderMap, name: &'static str) -> Result<T, FetchError>
where
    T: std::str::FromStr + Default,
{
    let Some(value) = headers.get(name) else {
        return Ok(T::default());
    };

    let text = value.to_str().map_err(|_| FetchError::InvalidHeader {
        name,
        value: String::from_utf8_lossy(value.as_bytes()).into_owned(),
    })?;

    text.trim().parse().map_err(|_| FetchError::InvalidHeader {
        name,
        value: text.to_string(),
    })
}
