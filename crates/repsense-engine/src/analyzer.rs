//! Per-frame analysis of an analyzable pose frame.
//!
//! One pass of [`analyze_frame`] runs the shared algorithm for every
//! exercise: measure, record the sample, feed the learner, gate on position,
//! advance the rep state machine and grade form. Quality gating and
//! occlusion recovery happen before this is called (see [`crate::engine`]).

use repsense_core::{EngineConfig, PoseFrame};
use tracing::debug;

use crate::exercise::ExerciseClassifier;
use crate::feedback::FeedbackItem;
use crate::metrics::FormMetrics;
use crate::state::SessionState;
use crate::state_machine::{Phase, Transition};
use crate::window::PositionSample;

/// Velocity samples required before tempo feedback is considered
const TEMPO_MIN_SAMPLES: usize = 3;

/// Score at or above which clean exercising frames are praised
const GREAT_FORM_SCORE: f64 = 90.0;

/// Result of analyzing one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameAnalysis {
    pub metrics: FormMetrics,
    pub feedback: Vec<FeedbackItem>,
    pub transition: Transition,
}

impl FrameAnalysis {
    pub fn counted_rep(&self) -> bool {
        matches!(self.transition, Transition::Rep(_))
    }
}

/// Analyze one frame that passed the quality gate
pub fn analyze_frame(
    classifier: &dyn ExerciseClassifier,
    frame: &PoseFrame,
    state: &mut SessionState,
    config: &EngineConfig,
) -> FrameAnalysis {
    let now = frame.timestamp;
    let exercise = state.exercise;
    let profile = config.profile(exercise);

    let m = classifier.measure(frame);

    state.window.push(PositionSample::new(m.primary_angle, m.secondary, now));
    if let Some(velocity) = state.window.angular_velocity() {
        state.velocity.push(velocity);
    }
    state.learner.update(m.primary_angle, exercise, now);
    let thresholds = state.learner.get(exercise);

    if !classifier.in_position(&m, profile) {
        state.hold_since = None;
        return FrameAnalysis {
            metrics: FormMetrics {
                form_quality: 0.0,
                reps: state.machine.reps(),
                is_exercising: false,
                phase: state.machine.phase(),
                current_angles: m.angles,
            },
            feedback: vec![FeedbackItem::warning(classifier.position_hint())],
            transition: Transition::None,
        };
    }

    let mut feedback = Vec::new();
    let mut transition = Transition::None;

    if classifier.counts_reps() {
        transition = state
            .machine
            .step(m.primary_angle, thresholds, &state.window, profile, now);

        match transition {
            Transition::EnteredDown => {
                debug!(exercise = %exercise, angle = m.primary_angle, "Entered down phase");
            }
            Transition::Rep(reps) => {
                state.rep_flash_until = Some(now.offset_millis(config.rep_flash_ms));
                debug!(exercise = %exercise, reps, angle = m.primary_angle, "Rep counted");
                feedback.push(FeedbackItem::success(format!("Rep {reps} complete!")));
            }
            Transition::Rejected(reason) => {
                debug!(exercise = %exercise, ?reason, angle = m.primary_angle, "Rep attempt rejected");
            }
            Transition::None => {}
        }
    }

    let phase = state.machine.phase();
    let form = classifier.assess_form(&m, phase, profile);
    let form_quality = form.score();
    feedback.extend(form.feedback);

    let engaged = classifier.is_engaged(&m, profile);
    let is_exercising = if classifier.counts_reps() {
        phase != Phase::Neutral || engaged
    } else if engaged {
        let since = *state.hold_since.get_or_insert(now);
        now.millis_since(since) >= profile.hold_settle_ms
    } else {
        state.hold_since = None;
        false
    };

    if state.velocity.len() >= TEMPO_MIN_SAMPLES
        && state.velocity.mean_speed() > profile.max_angular_velocity
    {
        feedback.push(FeedbackItem::warning("Slow down and control the movement"));
    }

    if is_exercising && form_quality >= GREAT_FORM_SCORE && feedback.is_empty() {
        feedback.push(FeedbackItem::success("Great form!"));
    }

    FrameAnalysis {
        metrics: FormMetrics {
            form_quality,
            reps: state.machine.reps(),
            is_exercising,
            phase,
            current_angles: m.angles,
        },
        feedback,
        transition,
    }
}
