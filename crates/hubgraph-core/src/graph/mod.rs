//! Repository/event graph produced from the events stream.
//!
//! The serialized shape is what a D3-style force graph consumes:
//! `{ "nodes": [{id, group, title}], "links": [{source, target, value}] }`.
//!
//! Links are not checked against nodes. A link may name an id that no node
//! carries, and consumers must tolerate that.

mod builder;
mod classify;

pub use builder::{build, GraphBuilder};
pub use classify::{classify, EventKind};

use serde::{Deserialize, Serialize};

/// A graph vertex: a repository or an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Repository full name or event id.
    pub id: String,
    /// 0 for repositories, the event category otherwise.
    pub group: u32,
    /// Human-readable label; empty for repositories.
    pub title: String,
}

impl Node {
    pub fn repository(name: impl Into<String>) -> Self {
        Self {
            id: name.into(),
            group: crate::config::REPOSITORY_GROUP,
            title: String::new(),
        }
    }

    pub fn is_repository(&self) -> bool {
        self.group == crate::config::REPOSITORY_GROUP
    }
}

/// A directed, weighted edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub source: String,
    pub target: String,
    /// Edge weight: 1 for events, higher for forks.
    pub value: u32,
}

impl Link {
    pub fn new(source: impl Into<String>, target: impl Into<String>, value: u32) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            value,
        }
    }
}

/// Nodes and links in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
}

impl Graph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.links.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }
}
