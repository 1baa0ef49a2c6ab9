//! Repetition state machine shared by all rep-counted exercises.
//!
//! ```text
//!            angle < down                     angle > up, guards pass
//!  Neutral ────────────────▶ Down ──────────────────────────────▶ Up
//!                             ▲  │ angle > up, guard fails            │
//!                             │  └──────── stays Down ◀──┘            │
//!                             └────────────── angle < down ───────────┘
//! ```
//!
//! A `Down → Up` transition is a repetition only when all guards pass:
//!
//! - **cooldown**: more than `cooldown_ms` since the previous rep
//! - **stability**: the last `stability_samples` samples all lie within
//!   `stability_tolerance` of the current angle (coarse anti-jitter)
//! - **range**: the current angle exceeds the low point of the attempt by
//!   more than `min_range`. The low point is the lowest angle seen since
//!   `Down` was entered, or among the last `range_samples` samples if lower.
//!
//! A failed guard leaves the phase at `Down`, so a later frame of the same
//! attempt can still complete the rep without re-entering `Down`.

use repsense_core::{ExerciseProfile, Timestamp};
use serde::{Deserialize, Serialize};

use crate::thresholds::ThresholdPair;
use crate::window::PositionWindow;

/// Phase of the subject within a repetition cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Neutral,
    Down,
    Up,
}

/// Why a rep attempt was not counted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepRejection {
    Cooldown,
    Unstable,
    InsufficientRange,
}

/// Outcome of one state machine step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Phase unchanged
    None,
    /// Entered the down phase
    EnteredDown,
    /// Completed a repetition (new total)
    Rep(u32),
    /// Crossed the up threshold but a guard failed
    Rejected(RepRejection),
}

#[derive(Debug, Clone, Default)]
pub struct RepStateMachine {
    phase: Phase,
    reps: u32,
    last_rep: Option<Timestamp>,
    /// Lowest primary angle of the current down phase
    down_low: Option<f64>,
}

impl RepStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance on one measured primary angle.
    ///
    /// `window` must already contain the sample for `angle`.
    pub fn step(
        &mut self,
        angle: f64,
        thresholds: ThresholdPair,
        window: &PositionWindow,
        profile: &ExerciseProfile,
        now: Timestamp,
    ) -> Transition {
        if self.phase == Phase::Down {
            self.down_low = Some(self.down_low.map_or(angle, |low| low.min(angle)));
        }

        match self.phase {
            Phase::Neutral | Phase::Up if angle < thresholds.down => {
                self.phase = Phase::Down;
                self.down_low = Some(angle);
                Transition::EnteredDown
            }
            Phase::Down if angle > thresholds.up => match self.check_guards(angle, window, profile, now) {
                Ok(()) => {
                    self.phase = Phase::Up;
                    self.reps += 1;
                    self.last_rep = Some(now);
                    self.down_low = None;
                    Transition::Rep(self.reps)
                }
                Err(reason) => Transition::Rejected(reason),
            },
            _ => Transition::None,
        }
    }

    fn check_guards(
        &self,
        angle: f64,
        window: &PositionWindow,
        profile: &ExerciseProfile,
        now: Timestamp,
    ) -> Result<(), RepRejection> {
        if let Some(last) = self.last_rep {
            if now.millis_since(last) <= profile.cooldown_ms {
                return Err(RepRejection::Cooldown);
            }
        }

        if !window.is_stable_around(angle, profile.stability_samples, profile.stability_tolerance) {
            return Err(RepRejection::Unstable);
        }

        let low = window
            .min_recent(profile.range_samples)
            .into_iter()
            .chain(self.down_low)
            .fold(angle, f64::min);
        if angle - low <= profile.min_range {
            return Err(RepRejection::InsufficientRange);
        }

        Ok(())
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn reps(&self) -> u32 {
        self.reps
    }

    pub fn last_rep(&self) -> Option<Timestamp> {
        self.last_rep
    }

    pub fn set_last_rep(&mut self, timestamp: Timestamp) {
        self.last_rep = Some(timestamp);
    }

    /// Return to neutral without touching the rep counter
    pub fn reset_phase(&mut self) {
        self.phase = Phase::Neutral;
        self.down_low = None;
    }
}
