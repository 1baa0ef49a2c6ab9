//! Mutable per-session tracking state.
//!
//! Everything the analyzer and the recovery policy mutate between frames
//! lives in one [`SessionState`], owned by the engine and passed by `&mut`.

use repsense_core::{EngineConfig, ExerciseType, Timestamp};

use crate::state_machine::RepStateMachine;
use crate::thresholds::ThresholdLearner;
use crate::window::{PositionWindow, VelocityHistory};

#[derive(Debug, Clone)]
pub struct SessionState {
    pub exercise: ExerciseType,
    pub machine: RepStateMachine,
    pub window: PositionWindow,
    pub velocity: VelocityHistory,
    pub learner: ThresholdLearner,
    /// Timestamp of the first non-analyzable frame of the current loss
    pub loss_started: Option<Timestamp>,
    /// The rep pulse stays raised until this instant
    pub rep_flash_until: Option<Timestamp>,
    /// Start of the current aligned hold (non-rep exercises)
    pub hold_since: Option<Timestamp>,
}

impl SessionState {
    pub fn new(exercise: ExerciseType, config: &EngineConfig) -> Self {
        Self {
            exercise,
            machine: RepStateMachine::new(),
            window: PositionWindow::new(config.window_capacity),
            velocity: VelocityHistory::new(config.velocity_capacity),
            learner: ThresholdLearner::from_config(config),
            loss_started: None,
            rep_flash_until: None,
            hold_since: None,
        }
    }

    /// Whether the "rep detected" pulse is raised at `now`
    pub fn rep_pulse(&self, now: Timestamp) -> bool {
        self.rep_flash_until.map_or(false, |until| now < until)
    }

    pub fn is_lost(&self) -> bool {
        self.loss_started.is_some()
    }

    /// Fresh state for `exercise`; counters, windows and learned thresholds
    /// are all dropped
    pub fn reset(&mut self, exercise: ExerciseType, config: &EngineConfig) {
        *self = Self::new(exercise, config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rep_pulse_window() {
        let mut state = SessionState::new(ExerciseType::Squat, &EngineConfig::default());
        assert!(!state.rep_pulse(Timestamp::from_millis(0)));

        state.rep_flash_until = Some(Timestamp::from_millis(800));
        assert!(state.rep_pulse(Timestamp::from_millis(799)));
        assert!(!state.rep_pulse(Timestamp::from_millis(800)));
    }

    #[test]
    fn test_reset_switches_exercise() {
        let config = EngineConfig::default();
        let mut state = SessionState::new(ExerciseType::Squat, &config);
        state.loss_started = Some(Timestamp::from_millis(5));
        state.machine.set_last_rep(Timestamp::from_millis(5));

        state.reset(ExerciseType::Plank, &config);
        assert_eq!(state.exercise, ExerciseType::Plank);
        assert!(!state.is_lost());
        assert!(state.machine.last_rep().is_none());
        assert_eq!(state.window.capacity(), config.window_capacity);
    }
}
