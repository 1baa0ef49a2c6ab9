//! Graded recovery after detection loss.
//!
//! A loss starts at the first frame that cannot be analyzed. When an
//! analyzable frame arrives again, the length of the gap decides how much
//! of the session state is still trustworthy:
//!
//! | gap                         | phase    | window        | last rep                         |
//! |-----------------------------|----------|---------------|----------------------------------|
//! | `< brief_ms`                | kept     | last 2        | at least `now - (cooldown - grace)` |
//! | `brief_ms ..< sustained_ms` | Neutral  | last 1        | `now`                            |
//! | `>= sustained_ms`           | Neutral  | cleared       | `now`                            |
//!
//! Learned thresholds and the rep count survive every loss.

use repsense_core::{RecoveryConfig, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::state::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LossSeverity {
    Brief,
    Medium,
    Sustained,
}

/// Recovery applied on the first analyzable frame after a loss
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryAction {
    pub severity: LossSeverity,
    pub gap_ms: i64,
}

#[derive(Debug, Clone)]
pub struct RecoveryPolicy {
    config: RecoveryConfig,
}

impl RecoveryPolicy {
    pub fn new(config: RecoveryConfig) -> Self {
        Self { config }
    }

    pub fn classify(&self, gap_ms: i64) -> LossSeverity {
        if gap_ms < self.config.brief_ms {
            LossSeverity::Brief
        } else if gap_ms < self.config.sustained_ms {
            LossSeverity::Medium
        } else {
            LossSeverity::Sustained
        }
    }

    /// Record a non-analyzable frame; only the first of a run starts the loss
    pub fn mark_lost(&self, state: &mut SessionState, now: Timestamp) {
        if state.loss_started.is_none() {
            state.loss_started = Some(now);
        }
        state.hold_since = None;
    }

    /// Recover on an analyzable frame. Returns `None` when nothing was lost.
    pub fn apply(&self, state: &mut SessionState, now: Timestamp, cooldown_ms: i64) -> Option<RecoveryAction> {
        let started = state.loss_started.take()?;
        let gap_ms = now.millis_since(started).max(0);
        let severity = self.classify(gap_ms);

        match severity {
            LossSeverity::Brief => {
                state.window.retain_last(self.config.brief_keep);
                let earliest = now.offset_millis(-(cooldown_ms - self.config.grace_ms).max(0));
                let last_rep = state.machine.last_rep().map_or(earliest, |t| t.max(earliest));
                state.machine.set_last_rep(last_rep);
            }
            LossSeverity::Medium => {
                state.machine.reset_phase();
                state.window.retain_last(self.config.medium_keep);
                state.machine.set_last_rep(now);
            }
            LossSeverity::Sustained => {
                state.machine.reset_phase();
                state.window.clear();
                state.velocity.clear();
                state.machine.set_last_rep(now);
            }
        }
        state.hold_since = None;

        info!(
            exercise = %state.exercise,
            ?severity,
            gap_ms,
            phase = ?state.machine.phase(),
            "Recovered from detection loss"
        );

        Some(RecoveryAction { severity, gap_ms })
    }
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self::new(RecoveryConfig::default())
    }
}
