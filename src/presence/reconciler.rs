//! Rename gating and the state it runs on.
//!
//! [`reconcile`] is pure: given an outcome, the current state and a clock
//! reading, it says what to publish and whether a rename may happen.
//! [`Reconciler`] owns the state behind an async mutex and applies the
//! decision, so plan → rename → commit is one critical section even if two
//! polls ever overlap.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, error, info};

use super::{candidate_name, presence_text, Candidate, CandidateKind, DisplaySurface, PresenceSink};
use crate::config::CooldownScope;
use crate::error::SurfaceError;
use crate::status::PollOutcome;

/// What the reconciler remembers between polls. Reset only by a restart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationState {
    /// Last name successfully applied to the surface.
    pub last_display_name: Option<String>,
    /// When that rename succeeded. `None` means never.
    pub last_rename_at: Option<Instant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenamePolicy {
    pub cooldown: Duration,
    pub scope: CooldownScope,
}

impl RenamePolicy {
    fn gates(&self, kind: CandidateKind) -> bool {
        kind == CandidateKind::Players || self.scope == CooldownScope::All
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameDecision {
    /// No surface configured.
    Disabled,
    /// Candidate already applied.
    Unchanged,
    CoolingDown { remaining: Duration },
    Apply,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub presence_text: String,
    pub candidate: Candidate,
    pub decision: RenameDecision,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    NotAttempted,
    Renamed,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub reconciliation: Reconciliation,
    pub rename: RenameOutcome,
}

/// Decide presence text and rename eligibility. Never mutates `state`.
pub fn reconcile(
    outcome: &PollOutcome,
    state: &ReconciliationState,
    policy: &RenamePolicy,
    now: Instant,
) -> Reconciliation {
    let candidate = candidate_name(outcome);

    let decision = if state.last_display_name.as_deref() == Some(candidate.name.as_str()) {
        RenameDecision::Unchanged
    } else if policy.gates(candidate.kind) {
        match state.last_rename_at {
            Some(last) => {
                let elapsed = now.saturating_duration_since(last);
                if elapsed < policy.cooldown {
                    RenameDecision::CoolingDown { remaining: policy.cooldown - elapsed }
                } else {
                    RenameDecision::Apply
                }
            }
            None => RenameDecision::Apply,
        }
    } else {
        RenameDecision::Apply
    };

    Reconciliation {
        presence_text: presence_text(outcome),
        candidate,
        decision,
    }
}

pub struct Reconciler {
    surface: Option<Arc<dyn DisplaySurface>>,
    policy: RenamePolicy,
    state: Mutex<ReconciliationState>,
}

impl Reconciler {
    pub fn new(surface: Option<Arc<dyn DisplaySurface>>, policy: RenamePolicy) -> Self {
        Self {
            surface,
            policy,
            state: Mutex::new(ReconciliationState::default()),
        }
    }

    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    pub async fn state(&self) -> ReconciliationState {
        self.state.lock().await.clone()
    }

    /// Adopt the surface's current name as the last applied one, so a
    /// restart does not rename to the same value. The cooldown clock stays
    /// at "never".
    pub async fn seed_from_surface(&self) {
        let Some(surface) = &self.surface else { return };

        match surface.current_name().await {
            Ok(name) => {
                info!(name = %name, "Voice channel currently named");
                let mut state = self.state.lock().await;
                if state.last_display_name.is_none() {
                    state.last_display_name = Some(name);
                }
            }
            Err(e) => error!("❌ Voice channel lookup failed: {}", e),
        }
    }

    /// Publish the presence text, then rename the surface if the policy
    /// allows. Rename failures are logged and leave the state untouched.
    pub async fn run(
        &self,
        outcome: &PollOutcome,
        sink: &dyn PresenceSink,
        now: Instant,
    ) -> CycleReport {
        let mut state = self.state.lock().await;
        let mut reconciliation = reconcile(outcome, &state, &self.policy, now);

        sink.publish(&reconciliation.presence_text);

        let Some(surface) = &self.surface else {
            reconciliation.decision = RenameDecision::Disabled;
            return CycleReport { reconciliation, rename: RenameOutcome::NotAttempted };
        };

        let name = &reconciliation.candidate.name;
        let rename = match &reconciliation.decision {
            RenameDecision::Apply => match surface.rename(name).await {
                Ok(()) => {
                    state.last_display_name = Some(name.clone());
                    state.last_rename_at = Some(now);
                    info!(name = %name, "✅ Updated voice channel");
                    RenameOutcome::Renamed
                }
                Err(e) => {
                    error!(name = %name, "❌ Error updating voice channel: {}", e);
                    RenameOutcome::Failed(e.to_string())
                }
            },
            RenameDecision::CoolingDown { remaining } => {
                info!(
                    name = %name,
                    "🕒 Rate limited, next update in {} minutes",
                    remaining.as_secs().div_ceil(60)
                );
                RenameOutcome::NotAttempted
            }
            RenameDecision::Unchanged => {
                debug!(name = %name, "⏭️ Channel name already correct");
                RenameOutcome::NotAttempted
            }
            RenameDecision::Disabled => RenameOutcome::NotAttempted,
        };

        CycleReport { reconciliation, rename }
    }

    /// Rename regardless of cooldown or dedup. Used on shutdown.
    pub async fn force_rename(&self, name: &str) -> Result<(), SurfaceError> {
        let Some(surface) = &self.surface else { return Ok(()) };

        let mut state = self.state.lock().await;
        surface.rename(name).await?;
        state.last_display_name = Some(name.to_string());
        state.last_rename_at = Some(Instant::now());
        Ok(())
    }
}
