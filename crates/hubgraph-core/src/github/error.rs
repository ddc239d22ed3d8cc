use thiserror::Error;

/// Errors that end a fetch without a usable page.
///
/// Rate limiting and "not modified" are not errors; they are reported as
/// [`FetchOutcome`](super::FetchOutcome) variants.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Invalid header {name}: {value:?}")]
    InvalidHeader { name: &'static str, value: String },

    #[error("API returned error: {status} - {message}")]
    UnexpectedStatus { status: u16, message: String },

    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_decode() {
            FetchError::MalformedResponse(err.to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::MalformedResponse(err.to_string())
    }
}
