//! Plank: a static hold graded on the shoulder-hip-knee line and elbow
//! placement. There are no repetitions; the hold counts as exercising once
//! the body has stayed aligned for `hold_settle_ms`.

use repsense_core::{
    geometry::{joint_angle, signed_offset_from_line, tilt_from_horizontal},
    ExerciseProfile, ExerciseType, PoseFrame,
};

use super::{angle_penalty, lower_body_anchor, point, ExerciseClassifier, FormAssessment, Measurements};
use crate::feedback::FeedbackItem;
use crate::metrics::CurrentAngles;
use crate::state_machine::Phase;

#[derive(Debug, Clone, Copy, Default)]
pub struct PlankClassifier;

impl PlankClassifier {
    /// Whether the body line is inside the acceptable band
    pub fn is_aligned(&self, m: &Measurements, profile: &ExerciseProfile) -> bool {
        profile.acceptable.contains(m.primary_angle)
    }
}

impl ExerciseClassifier for PlankClassifier {
    fn exercise(&self) -> ExerciseType {
        ExerciseType::Plank
    }

    fn measure(&self, frame: &PoseFrame) -> Measurements {
        let side = frame.dominant_side(|s| vec![s.shoulder(), s.elbow(), s.hip(), s.knee()]);

        let shoulder = point(frame, side.shoulder());
        let elbow = point(frame, side.elbow());
        let hip = point(frame, side.hip());
        let knee = point(frame, side.knee());
        let anchor = lower_body_anchor(frame, side);

        let body_line = joint_angle(shoulder, hip, knee);
        let hip_offset = signed_offset_from_line(hip, shoulder, anchor);

        Measurements {
            side,
            primary_angle: body_line,
            secondary: hip_offset,
            body_tilt: tilt_from_horizontal(shoulder, anchor),
            hip_offset,
            elbow_offset: (elbow.x - shoulder.x).abs(),
            angles: CurrentAngles {
                hip: Some(body_line),
                body_line: Some(body_line),
                elbow: Some(joint_angle(shoulder, elbow, point(frame, side.wrist()))),
                ..CurrentAngles::default()
            },
        }
    }

    fn in_position(&self, m: &Measurements, profile: &ExerciseProfile) -> bool {
        m.body_tilt <= profile.max_body_tilt
    }

    fn position_hint(&self) -> &'static str {
        "Get into plank position"
    }

    /// Graded every frame; the phase is irrelevant for a hold
    fn assess_form(&self, m: &Measurements, _phase: Phase, profile: &ExerciseProfile) -> FormAssessment {
        let mut form = FormAssessment::new();

        let (penalty, _) = angle_penalty(m.primary_angle, profile);
        if penalty > 0.0 {
            let message = if m.hip_offset > 0.0 {
                "Lift your hips - keep a straight line"
            } else {
                "Lower your hips - keep a straight line"
            };
            form.flag(penalty, FeedbackItem::warning(message));
        }

        if m.elbow_offset > profile.max_elbow_offset {
            form.flag(
                profile.penalties.alignment,
                FeedbackItem::warning("Stack your elbows under your shoulders"),
            );
        }

        form
    }

    fn is_engaged(&self, m: &Measurements, profile: &ExerciseProfile) -> bool {
        self.is_aligned(m, profile)
    }
}
