//! Event type classification.
//!
//! Each known event type gets a stable group number (used by the front-end
//! to color nodes) and a short label.

use crate::config::UNKNOWN_GROUP;

/// Known GitHub event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CommitComment,
    Create,
    Delete,
    Fork,
    Gollum,
    IssueComment,
    Issues,
    Member,
    Public,
    PullRequest,
    PullRequestReviewComment,
    Push,
    Release,
    Watch,
    Unknown,
}

impl EventKind {
    pub const ALL: [EventKind; 14] = [
        EventKind::CommitComment,
        EventKind::Create,
        EventKind::Delete,
        EventKind::Fork,
        EventKind::Gollum,
        EventKind::IssueComment,
        EventKind::Issues,
        EventKind::Member,
        EventKind::Public,
        EventKind::PullRequest,
        EventKind::PullRequestReviewComment,
        EventKind::Push,
        EventKind::Release,
        EventKind::Watch,
    ];

    /// Parse an API `type` tag. Unrecognized tags map to `Unknown`.
    pub fn from_type(event_type: &str) -> Self {
        match event_type {
            "CommitCommentEvent" => EventKind::CommitComment,
            "CreateEvent" => EventKind::Create,
            "DeleteEvent" => EventKind::Delete,
            "ForkEvent" => EventKind::Fork,
            "GollumEvent" => EventKind::Gollum,
            "IssueCommentEvent" => EventKind::IssueComment,
            "IssuesEvent" => EventKind::Issues,
            "MemberEvent" => EventKind::Member,
            "PublicEvent" => EventKind::Public,
            "PullRequestEvent" => EventKind::PullRequest,
            "PullRequestReviewCommentEvent" => EventKind::PullRequestReviewComment,
            "PushEvent" => EventKind::Push,
            "ReleaseEvent" => EventKind::Release,
            "WatchEvent" => EventKind::Watch,
            _ => EventKind::Unknown,
        }
    }

    /// Group number used for the event's node.
    pub fn group(&self) -> u32 {
        match self {
            EventKind::CommitComment => 1,
            EventKind::Create => 2,
            EventKind::Delete => 3,
            EventKind::Fork => 4,
            EventKind::Gollum => 5,
            EventKind::IssueComment => 6,
            EventKind::Issues => 7,
            EventKind::Member => 8,
            EventKind::Public => 9,
            EventKind::PullRequest => 10,
            EventKind::PullRequestReviewComment => 11,
            EventKind::Push => 12,
            EventKind::Release => 13,
            EventKind::Watch => 14,
            EventKind::Unknown => UNKNOWN_GROUP,
        }
    }

    /// Label shown for the event's node.
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::CommitComment => "Comment to commit",
            EventKind::Create => "New repo created",
            EventKind::Delete => "Something has been deleted",
            EventKind::Fork => "Repo has been forked",
            EventKind::Gollum => "Wiki page edited",
            EventKind::IssueComment => "Issue has been commented",
            EventKind::Issues => "An issue has changed",
            EventKind::Member => "New collaborator added",
            EventKind::Public => "Repo made public!",
            EventKind::PullRequest => "New pull request",
            EventKind::PullRequestReviewComment => "PR's code has been commented",
            EventKind::Push => "New commit pushed",
            EventKind::Release => "New release created",
            EventKind::Watch => "Repo has been starred",
            EventKind::Unknown => "Unknown event",
        }
    }
}

/// Map an event type tag to its `(group, label)` pair.
pub fn classify(event_type: &str) -> (u32, &'static str) {
    let kind = EventKind::from_type(event_type);
    (kind.group(), kind.label())
}
