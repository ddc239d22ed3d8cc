//! Default values for HubGraph configuration.
//!
//! All hardcoded defaults are centralized here for easy maintenance.

// ============================================================================
// GitHub Defaults
// ============================================================================

/// Default GitHub REST API base URL.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Path of the public events stream, relative to the API base URL.
pub const EVENTS_PATH: &str = "/events";

/// Path of the companion rate-limit endpoint.
pub const RATE_LIMIT_PATH: &str = "/rate_limit";

/// User agent sent with every request (GitHub rejects requests without one).
pub const DEFAULT_USER_AGENT: &str = "hubgraph";

/// Timeout for a single API request, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Poll Defaults
// ============================================================================

/// Number of event pages read per run.
pub const DEFAULT_PAGES: u32 = 3;

/// Seconds per page between refreshes when the API gives no poll hint.
/// 60 s per page keeps unauthenticated clients under 60 req/hr.
pub const DEFAULT_POLL_INTERVAL_PER_PAGE_SECS: u64 = 60;

/// Extra seconds to wait past a rate-limit reset before restarting a run.
pub const DEFAULT_RATE_LIMIT_MARGIN_SECS: u64 = 3;

/// Maximum whole-run restarts caused by rate limiting within one run.
pub const DEFAULT_MAX_RATE_LIMIT_RESTARTS: u32 = 5;

// ============================================================================
// Server Defaults
// ============================================================================

/// Default port for the query server.
pub const DEFAULT_PORT: u16 = 3000;

/// Default bind address for the query server.
pub const DEFAULT_HOST: &str = "0.0.0.0";

// ============================================================================
// Graph Defaults
// ============================================================================

/// Link weight between a repository and one of its events.
pub const EVENT_LINK_WEIGHT: u32 = 1;

/// Link weight between a repository and a fork of it.
pub const FORK_LINK_WEIGHT: u32 = 10;

/// Group reserved for plain repository nodes.
pub const REPOSITORY_GROUP: u32 = 0;

/// Group for event types the classifier does not know.
pub const UNKNOWN_GROUP: u32 = 99;
