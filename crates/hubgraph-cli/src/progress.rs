//! Live progress reporting for the poll loop.
//!
//! Two modes:
//! - Interactive (TTY): a single status spinner rewritten in place
//! - Logging (non-TTY): progress is left to the `tracing` output

use console::Term;
use hubgraph_core::publish::format_timestamp;
use hubgraph_core::{PollProgress, QuotaState, WaitReason};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// What the status line remembers between updates.
#[derive(Debug, Default)]
struct StatusState {
    last_update: Option<String>,
    quota: QuotaState,
}

/// Turns progress updates into status lines.
#[derive(Debug, Default)]
pub struct StatusLine {
    state: StatusState,
}

impl StatusLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `progress` and return the text to show, if any.
    pub fn describe(&mut self, progress: &PollProgress) -> Option<String> {
        match progress {
            PollProgress::RunStarted { attempt } if *attempt > 1 => {
                Some(format!("Restarting run (attempt {})...", attempt))
            }
            PollProgress::RunStarted { .. } => Some("Fetching events...".to_string()),
            PollProgress::PageFetched { page, pages, .. } => {
                Some(format!("Page {}/{} analyzed...", page, pages))
            }
            PollProgress::NoNewData => Some("No new data available.".to_string()),
            PollProgress::RateLimited { wait_secs, .. } => Some(format!(
                "Rate limit reached. Will reset in {} seconds.",
                wait_secs
            )),
            PollProgress::Waiting {
                reason: WaitReason::RateLimit,
                remaining_secs,
            } => Some(format!(
                "Rate limit reached. Will reset in {} seconds.",
                remaining_secs
            )),
            PollProgress::Waiting {
                reason: WaitReason::NextRefresh,
                remaining_secs,
            } => {
                let updated = self.state.last_update.as_deref().unwrap_or("never");
                Some(format!(
                    "Content updated at {} - Next refresh in: {}s (RL: {}/{} req/hr used)",
                    updated,
                    remaining_secs,
                    self.state.quota.used(),
                    self.state.quota.limit
                ))
            }
            PollProgress::Published {
                nodes,
                links,
                quota,
                published_at,
                ..
            } => {
                self.state.quota = *quota;
                self.state.last_update = Some(format_timestamp(*published_at));
                Some(format!("Graph published: {} nodes, {} links", nodes, links))
            }
            PollProgress::RunFailed { message } => Some(format!("Run failed: {}", message)),
        }
    }
}

/// Progress reporter that handles both interactive and logging modes.
pub enum ProgressReporter {
    /// Status spinner for TTY.
    Interactive { bar: ProgressBar, line: StatusLine },
    /// Structured logging already covers non-TTY output.
    Logging,
}

impl ProgressReporter {
    /// Create a new progress reporter, auto-detecting TTY mode.
    pub fn new() -> Self {
        if Term::stdout().is_term() {
            let bar = ProgressBar::new_spinner();
            bar.set_style(Self::spinner_style());
            Self::Interactive {
                bar,
                line: StatusLine::new(),
            }
        } else {
            Self::Logging
        }
    }

    /// Handle a progress event.
    pub fn handle(&mut self, progress: PollProgress) {
        let Self::Interactive { bar, line } = self else {
            return;
        };

        let failed = matches!(progress, PollProgress::RunFailed { .. });
        if let Some(message) = line.describe(&progress) {
            if failed {
                bar.println(message);
            } else {
                bar.set_message(message);
                bar.tick();
            }
        }
    }

    /// Consume progress updates until the sender is dropped.
    pub fn spawn(mut self, mut rx: mpsc::UnboundedReceiver<PollProgress>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(progress) = rx.recv().await {
                self.handle(progress);
            }
            if let Self::Interactive { bar, .. } = &self {
                bar.finish_and_clear();
            }
        })
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}
