//! Exercise classifiers.
//!
//! Squat, push-up and plank share one per-frame algorithm (see
//! [`crate::analyzer`]) and differ only in:
//!
//! - which joint angle is primary (knee, elbow, body line)
//! - which alignment measurements are taken and penalized
//! - whether the subject must be horizontal before transitions are attempted
//!
//! Each exercise implements [`ExerciseClassifier`]; the numeric limits come
//! from the exercise's [`ExerciseProfile`].

mod plank;
mod pushup;
mod squat;

pub use plank::PlankClassifier;
pub use pushup::PushUpClassifier;
pub use squat::SquatClassifier;

use nalgebra::Point2;
use repsense_core::{BodyLandmark, BodySide, ExerciseProfile, ExerciseType, PoseFrame};

use crate::feedback::FeedbackItem;
use crate::metrics::CurrentAngles;
use crate::state_machine::Phase;

/// Visibility above which a landmark is trusted as an anchor
const ANCHOR_VISIBILITY: f64 = 0.5;

/// Everything a classifier measures on one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurements {
    /// Side the measurements were taken on
    pub side: BodySide,
    /// Angle driving the state machine (degrees)
    pub primary_angle: f64,
    /// Main alignment measurement, stored alongside the primary angle
    pub secondary: f64,
    /// Inclination of the shoulder→feet line from horizontal (degrees)
    pub body_tilt: f64,
    /// Signed hip offset from the shoulder→feet line, positive when sagging
    pub hip_offset: f64,
    /// Horizontal elbow-to-shoulder distance (normalized)
    pub elbow_offset: f64,
    pub angles: CurrentAngles,
}

/// Form score and the corrections behind it
#[derive(Debug, Clone, PartialEq)]
pub struct FormAssessment {
    score: f64,
    pub feedback: Vec<FeedbackItem>,
}

impl FormAssessment {
    pub fn new() -> Self {
        Self {
            score: 100.0,
            feedback: Vec::new(),
        }
    }

    pub fn deduct(&mut self, points: f64) {
        self.score -= points.max(0.0);
    }

    pub fn flag(&mut self, points: f64, item: FeedbackItem) {
        self.deduct(points);
        self.feedback.push(item);
    }

    /// Score floored at 0
    pub fn score(&self) -> f64 {
        self.score.clamp(0.0, 100.0)
    }
}

impl Default for FormAssessment {
    fn default() -> Self {
        Self::new()
    }
}

/// Exercise-specific measurement and grading
pub trait ExerciseClassifier: Send + Sync {
    fn exercise(&self) -> ExerciseType;

    /// Measure angles and alignment. Callers only pass analyzable frames.
    fn measure(&self, frame: &PoseFrame) -> Measurements;

    /// Coarse check that the subject is in the starting posture
    fn in_position(&self, _measurements: &Measurements, _profile: &ExerciseProfile) -> bool {
        true
    }

    /// Guidance shown when [`in_position`](Self::in_position) fails
    fn position_hint(&self) -> &'static str {
        "Get into position"
    }

    /// Grade form for the current frame
    fn assess_form(&self, measurements: &Measurements, phase: Phase, profile: &ExerciseProfile) -> FormAssessment;

    /// Whether the primary angle alone signals activity before a clean transition
    fn is_engaged(&self, measurements: &Measurements, profile: &ExerciseProfile) -> bool {
        measurements.primary_angle < profile.engaged_angle
    }

    fn counts_reps(&self) -> bool {
        self.exercise().counts_reps()
    }
}

/// Classifier implementation for an exercise type
pub fn classifier_for(exercise: ExerciseType) -> Box<dyn ExerciseClassifier> {
    match exercise {
        ExerciseType::Squat => Box::new(SquatClassifier),
        ExerciseType::PushUp => Box::new(PushUpClassifier),
        ExerciseType::Plank => Box::new(PlankClassifier),
    }
}

/// Graded deduction for the primary angle against the profile's bands.
///
/// Returns the deduction and the distance from the perfect band; inside
/// the acceptable band the deduction grows per degree up to a cap.
pub fn angle_penalty(angle: f64, profile: &ExerciseProfile) -> (f64, f64) {
    let distance = profile.perfect.distance(angle);
    let penalty = if distance == 0.0 {
        0.0
    } else if profile.acceptable.contains(angle) {
        (distance * profile.penalties.per_degree).min(profile.penalties.acceptable_max)
    } else {
        profile.penalties.out_of_range
    };
    (penalty, distance)
}

pub(crate) fn point(frame: &PoseFrame, landmark: BodyLandmark) -> Point2<f64> {
    frame.point(landmark).unwrap_or_else(|| Point2::new(0.5, 0.5))
}

/// Lowest reliable point of the leg: the ankle when visible, else the knee
pub(crate) fn lower_body_anchor(frame: &PoseFrame, side: BodySide) -> Point2<f64> {
    if frame.visibility(side.ankle()) > ANCHOR_VISIBILITY {
        point(frame, side.ankle())
    } else {
        point(frame, side.knee())
    }
}
