//! API response models for the query server.
//!
//! The graph and dashboard documents are served pre-rendered from the
//! publication; only the auxiliary responses are defined here.

use serde::Serialize;

/// Body returned while nothing has been published yet.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Response for `/api/status`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    /// Whether any run has been published.
    pub published: bool,
    /// Publication number, starting at 1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    /// RFC 2822 time of the latest publication.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    pub nodes: usize,
    pub links: usize,
}
