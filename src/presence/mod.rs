//! Presence reconciler: turns a [`PollOutcome`] into the bot's presence
//! text and the voice channel name, and decides when a rename is allowed.

use async_trait::async_trait;

use crate::error::SurfaceError;
use crate::status::{PollOutcome, ServerStatus};

pub mod reconciler;

pub use reconciler::{
    reconcile, CycleReport, Reconciler, Reconciliation, ReconciliationState, RenameDecision,
    RenameOutcome, RenamePolicy,
};

pub const SERVER_OFFLINE_TEXT: &str = "Server offline";
pub const CONNECTION_ERROR_TEXT: &str = "Connection error";

pub const SERVER_OFFLINE_NAME: &str = "🔴 Server Offline";
pub const CONNECTION_ERROR_NAME: &str = "❌ Connection Error";
/// Applied once on shutdown.
pub const BOT_OFFLINE_NAME: &str = "🔴 Bot Offline";

/// Names listed inline before collapsing into "+k more".
const MAX_LISTED_NAMES: usize = 3;

// ── Collaborator Traits ─────────────────────────────────────────────

/// Where the presence text goes (the bot's "Watching ..." activity).
pub trait PresenceSink: Send + Sync {
    fn publish(&self, text: &str);
}

/// A renameable object used as a secondary status indicator.
#[async_trait]
pub trait DisplaySurface: Send + Sync {
    /// Name the surface currently carries.
    async fn current_name(&self) -> Result<String, SurfaceError>;

    async fn rename(&self, name: &str) -> Result<(), SurfaceError>;
}

// ── Derivation ──────────────────────────────────────────────────────

/// Which kind of rename candidate an outcome produces. Only `Players`
/// is subject to the cooldown by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    Players,
    Offline,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub name: String,
    pub kind: CandidateKind,
}

/// Presence text for an outcome. Published on every poll.
pub fn presence_text(outcome: &PollOutcome) -> String {
    match outcome {
        PollOutcome::Success(status) if status.online => players_text(status),
        PollOutcome::Success(_) => SERVER_OFFLINE_TEXT.to_string(),
        PollOutcome::Unreachable(_) => CONNECTION_ERROR_TEXT.to_string(),
    }
}

fn players_text(status: &ServerStatus) -> String {
    let counts = format!("{}/{}", status.player_count, status.max_players);
    if status.player_names.is_empty() {
        return format!("{counts} players");
    }

    let mut names = status
        .player_names
        .iter()
        .take(MAX_LISTED_NAMES)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    let hidden = status.player_names.len().saturating_sub(MAX_LISTED_NAMES);
    if hidden > 0 {
        names.push_str(&format!(" +{hidden} more"));
    }
    format!("{counts}: {names}")
}

/// Voice channel name an outcome should be reflected as.
pub fn candidate_name(outcome: &PollOutcome) -> Candidate {
    match outcome {
        PollOutcome::Success(status) if status.online => Candidate {
            name: format!("🎮 Players: {}/{}", status.player_count, status.max_players),
            kind: CandidateKind::Players,
        },
        PollOutcome::Success(_) => Candidate {
            name: SERVER_OFFLINE_NAME.to_string(),
            kind: CandidateKind::Offline,
        },
        PollOutcome::Unreachable(_) => Candidate {
            name: CONNECTION_ERROR_NAME.to_string(),
            kind: CandidateKind::Error,
        },
    }
}
