//! Squat: knee angle drives the cycle, torso lean is the alignment check.
//!
//! Evaluated while standing, so there is no position gate.

use repsense_core::{
    geometry::{joint_angle, tilt_from_horizontal, tilt_from_vertical},
    ExerciseProfile, ExerciseType, PoseFrame,
};

use super::{angle_penalty, lower_body_anchor, point, ExerciseClassifier, FormAssessment, Measurements};
use crate::feedback::FeedbackItem;
use crate::metrics::CurrentAngles;
use crate::state_machine::Phase;

#[derive(Debug, Clone, Copy, Default)]
pub struct SquatClassifier;

impl ExerciseClassifier for SquatClassifier {
    fn exercise(&self) -> ExerciseType {
        ExerciseType::Squat
    }

    fn measure(&self, frame: &PoseFrame) -> Measurements {
        let side = frame.dominant_side(|s| vec![s.shoulder(), s.hip(), s.knee(), s.ankle()]);

        let shoulder = point(frame, side.shoulder());
        let hip = point(frame, side.hip());
        let knee = point(frame, side.knee());
        let ankle = point(frame, side.ankle());

        let knee_angle = joint_angle(hip, knee, ankle);
        let hip_angle = joint_angle(shoulder, hip, knee);
        let torso_lean = tilt_from_vertical(hip, shoulder);

        Measurements {
            side,
            primary_angle: knee_angle,
            secondary: torso_lean,
            body_tilt: tilt_from_horizontal(shoulder, lower_body_anchor(frame, side)),
            hip_offset: 0.0,
            elbow_offset: 0.0,
            angles: CurrentAngles {
                knee: Some(knee_angle),
                hip: Some(hip_angle),
                torso_lean: Some(torso_lean),
                ..CurrentAngles::default()
            },
        }
    }

    fn assess_form(&self, m: &Measurements, phase: Phase, profile: &ExerciseProfile) -> FormAssessment {
        let mut form = FormAssessment::new();

        // Depth is only graded at the bottom of the movement
        if phase == Phase::Down {
            let (penalty, _) = angle_penalty(m.primary_angle, profile);
            if m.primary_angle > profile.perfect.max {
                form.flag(penalty, FeedbackItem::warning("Go a little deeper"));
            } else if m.primary_angle < profile.perfect.min {
                form.flag(penalty, FeedbackItem::warning("Control the bottom of the squat"));
            } else {
                form.feedback.push(FeedbackItem::success("Great depth!"));
            }
        }

        if m.secondary > profile.max_torso_lean {
            form.flag(
                profile.penalties.alignment,
                FeedbackItem::warning("Keep your chest up"),
            );
        }

        form
    }
}
