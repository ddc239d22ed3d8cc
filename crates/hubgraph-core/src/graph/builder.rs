//! Graph building from pages of events.

use std::collections::HashSet;

use crate::config::{EVENT_LINK_WEIGHT, FORK_LINK_WEIGHT};
use crate::github::Event;

use super::classify::EventKind;
use super::{Graph, Link, Node};

// =============================================================================
// Graph Builder
// =============================================================================

/// Accumulates pages of events into one graph.
///
/// Repository nodes are emitted once per builder, no matter how many pages
/// mention the repository. Event and forkee nodes are never deduplicated.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: Vec<Node>,
    links: Vec<Link>,
    seen_repos: HashSet<String>,
}

impl GraphBuilder {
    /// Create a new graph builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one page of events into the graph.
    pub fn add_events(&mut self, events: &[Event]) {
        self.load_repositories(events);
        self.load_events(events);
    }

    /// Finish and return the graph.
    pub fn build(self) -> Graph {
        Graph {
            nodes: self.nodes,
            links: self.links,
        }
    }

    /// One group-0 node per repository not yet seen, in first-seen order.
    fn load_repositories(&mut self, events: &[Event]) {
        for event in events {
            let name = event.repo_name();
            if self.seen_repos.insert(name.to_string()) {
                self.nodes.push(Node::repository(name));
            }
        }
    }

    /// One node and one link per event, plus the fork edge for forks.
    fn load_events(&mut self, events: &[Event]) {
        for event in events {
            let kind = EventKind::from_type(&event.kind);

            self.nodes.push(Node {
                id: event.id.clone(),
                group: kind.group(),
                title: kind.label().to_string(),
            });
            self.links
                .push(Link::new(event.repo_name(), event.id.clone(), EVENT_LINK_WEIGHT));

            if kind == EventKind::Fork {
                let forkee = event.forkee_name().unwrap_or_default();
                self.nodes.push(Node::repository(forkee));
                self.links
                    .push(Link::new(event.repo_name(), forkee, FORK_LINK_WEIGHT));
            }
        }
    }
}

/// Build a graph from a single batch of events.
pub fn build(events: &[Event]) -> Graph {
    let mut builder = GraphBuilder::new();
    builder.add_events(events);
    builder.build()
}
