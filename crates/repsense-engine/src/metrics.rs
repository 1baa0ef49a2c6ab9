//! Externally consumed per-frame metrics.

use serde::{Deserialize, Serialize};

use crate::state_machine::Phase;

/// Joint and alignment angles measured on the current frame (degrees)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CurrentAngles {
    pub knee: Option<f64>,
    pub elbow: Option<f64>,
    pub hip: Option<f64>,
    /// Shoulder-hip-ankle line, 180 when the body is straight
    pub body_line: Option<f64>,
    /// Torso inclination from vertical
    pub torso_lean: Option<f64>,
}

/// Snapshot of the session as of the latest frame.
///
/// Rebuilt in full every frame; nothing carries over from the previous
/// snapshot except what the session state itself holds (reps, phase).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FormMetrics {
    /// Form score [0, 100]
    pub form_quality: f64,
    pub reps: u32,
    pub is_exercising: bool,
    pub phase: Phase,
    pub current_angles: CurrentAngles,
}

impl FormMetrics {
    /// Metrics for a frame that was not analyzed
    pub fn idle(reps: u32, phase: Phase) -> Self {
        Self {
            form_quality: 0.0,
            reps,
            is_exercising: false,
            phase,
            current_angles: CurrentAngles::default(),
        }
    }
}

impl Default for FormMetrics {
    fn default() -> Self {
        Self::idle(0, Phase::Neutral)
    }
}
