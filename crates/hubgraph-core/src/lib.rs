pub mod config;
pub mod github;
pub mod graph;
pub mod poll;
pub mod publish;
pub mod quota;

pub use config::{Config, ConfigError, GitHubConfig, PollConfig, ServerConfig};
pub use github::{Event, EventSource, FetchError, FetchOutcome, GitHubClient, Identity};
pub use graph::{classify, EventKind, Graph, GraphBuilder, Link, Node};
pub use poll::{
    Cycle, IntervalSource, PollError, PollProgress, Poller, RefreshSchedule, RunOutcome, WaitReason,
};
pub use publish::{Dashboard, Publication, PublicationReader, PublicationStore, PublishError};
pub use quota::{QuotaState, RateLimitTracker};
