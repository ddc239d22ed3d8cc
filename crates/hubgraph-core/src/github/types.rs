//! Wire types for the GitHub events and rate-limit endpoints.
//!
//! Only the fields the graph needs are modeled; serde ignores the rest.

use serde::Deserialize;

/// One entry of the public events stream.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Event {
    pub id: String,
    /// Event type tag, e.g. `PushEvent`. Open-ended.
    #[serde(rename = "type")]
    pub kind: String,
    pub repo: RepoRef,
    #[serde(default)]
    pub payload: Payload,
}

impl Event {
    /// Name (`owner/repo`) of the repository the event happened on.
    pub fn repo_name(&self) -> &str {
        &self.repo.name
    }

    /// Full name of the repository created by a fork, if any.
    pub fn forkee_name(&self) -> Option<&str> {
        self.payload.forkee.as_ref().map(|f| f.full_name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepoRef {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Payload {
    #[serde(default)]
    pub forkee: Option<Forkee>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Forkee {
    #[serde(default)]
    pub full_name: String,
}

/// Body of `GET /rate_limit`.
#[derive(Debug, Deserialize)]
pub(crate) struct RateLimitResponse {
    pub resources: RateLimitResources,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RateLimitResources {
    pub core: RateLimitWindow,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RateLimitWindow {
    pub limit: u32,
    pub remaining: u32,
    pub reset: i64,
}
