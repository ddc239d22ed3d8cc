//! In-memory publication of the latest graph and dashboard documents.
//!
//! Each publication is an immutable [`Publication`] swapped in behind an
//! `Arc`, so a reader always gets a graph and a dashboard from the same run.
//! The poll loop owns the [`PublicationStore`]; query layers get a
//! [`PublicationReader`], which cannot publish.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph::Graph;
use crate::quota::QuotaState;

/// Errors that can occur while publishing.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Failed to serialize {document} document: {source}")]
    Serialize {
        document: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Operational summary shown next to the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    /// Requests consumed in the current quota window.
    pub requests_used: u32,
    /// Quota ceiling.
    pub max_requests: u32,
    /// Seconds between refreshes.
    pub refresh_interval: u64,
    /// When the graph was last built, RFC 2822 with numeric zone.
    pub last_update: String,
}

impl Dashboard {
    /// Build the dashboard for a run that finished at `updated_at`.
    pub fn new(quota: &QuotaState, refresh_interval: Duration, updated_at: DateTime<Utc>) -> Self {
        Self {
            requests_used: quota.used(),
            max_requests: quota.limit,
            refresh_interval: refresh_interval.as_secs(),
            last_update: format_timestamp(updated_at),
        }
    }

    /// `last_update` parsed back into a timestamp.
    pub fn last_update_time(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.last_update)
    }
}

/// Format a timestamp the way `lastUpdate` is published.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc2822()
}

/// Parse a published `lastUpdate` value.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// One published graph/dashboard pair.
#[derive(Debug)]
pub struct Publication {
    version: u64,
    published_at: DateTime<Utc>,
    graph: Graph,
    dashboard: Dashboard,
    graph_json: String,
    dashboard_json: String,
}

impl Publication {
    fn new(
        version: u64,
        published_at: DateTime<Utc>,
        graph: Graph,
        dashboard: Dashboard,
    ) -> Result<Self, PublishError> {
        let graph_json = serde_json::to_string_pretty(&graph).map_err(|source| {
            PublishError::Serialize {
                document: "graph",
                source,
            }
        })?;
        let dashboard_json = serde_json::to_string_pretty(&dashboard).map_err(|source| {
            PublishError::Serialize {
                document: "dashboard",
                source,
            }
        })?;

        Ok(Self {
            version,
            published_at,
            graph,
            dashboard,
            graph_json,
            dashboard_json,
        })
    }

    /// Monotonic publication number, starting at 1.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn published_at(&self) -> DateTime<Utc> {
        self.published_at
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    /// Pretty-printed graph document.
    pub fn graph_json(&self) -> &str {
        &self.graph_json
    }

    /// Pretty-printed dashboard document.
    pub fn dashboard_json(&self) -> &str {
        &self.dashboard_json
    }
}

type Slot = Arc<RwLock<Option<Arc<Publication>>>>;

/// Owner of the published documents.
#[derive(Debug, Default)]
pub struct PublicationStore {
    slot: Slot,
}

impl PublicationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A read-only handle for query layers.
    pub fn reader(&self) -> PublicationReader {
        PublicationReader {
            slot: Arc::clone(&self.slot),
        }
    }

    /// Replace the current publication with a new graph/dashboard pair.
    ///
    /// Serialization happens before the swap; on error nothing changes.
    pub fn publish(
        &self,
        graph: Graph,
        dashboard: Dashboard,
        published_at: DateTime<Utc>,
    ) -> Result<Arc<Publication>, PublishError> {
        let version = self.current().map(|p| p.version + 1).unwrap_or(1);
        let publication = Arc::new(Publication::new(version, published_at, graph, dashboard)?);

        *self.slot.write() = Some(Arc::clone(&publication));
        Ok(publication)
    }

    /// The latest publication, if any run has completed.
    pub fn current(&self) -> Option<Arc<Publication>> {
        self.slot.read().clone()
    }

    /// When the latest publication was made.
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.current().map(|p| p.published_at)
    }
}

/// Read-only view of a [`PublicationStore`].
#[derive(Debug, Clone)]
pub struct PublicationReader {
    slot: Slot,
}

impl PublicationReader {
    /// The latest publication, if any run has completed.
    pub fn current(&self) -> Option<Arc<Publication>> {
        self.slot.read().clone()
    }
}
