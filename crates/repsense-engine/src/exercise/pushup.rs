//! Push-up: elbow angle drives the cycle, the shoulder-hip-ankle line is the
//! alignment check. Transitions wait until the body is roughly horizontal.

use repsense_core::{
    geometry::{joint_angle, signed_offset_from_line, tilt_from_horizontal},
    ExerciseProfile, ExerciseType, PoseFrame,
};

use super::{angle_penalty, lower_body_anchor, point, ExerciseClassifier, FormAssessment, Measurements};
use crate::feedback::FeedbackItem;
use crate::metrics::CurrentAngles;
use crate::state_machine::Phase;

#[derive(Debug, Clone, Copy, Default)]
pub struct PushUpClassifier;

impl ExerciseClassifier for PushUpClassifier {
    fn exercise(&self) -> ExerciseType {
        ExerciseType::PushUp
    }

    fn measure(&self, frame: &PoseFrame) -> Measurements {
        let side = frame.dominant_side(|s| vec![s.shoulder(), s.elbow(), s.wrist(), s.hip()]);

        let shoulder = point(frame, side.shoulder());
        let elbow = point(frame, side.elbow());
        let wrist = point(frame, side.wrist());
        let hip = point(frame, side.hip());
        let anchor = lower_body_anchor(frame, side);

        let elbow_angle = joint_angle(shoulder, elbow, wrist);
        let body_line = joint_angle(shoulder, hip, anchor);

        Measurements {
            side,
            primary_angle: elbow_angle,
            secondary: body_line,
            body_tilt: tilt_from_horizontal(shoulder, anchor),
            hip_offset: signed_offset_from_line(hip, shoulder, anchor),
            elbow_offset: 0.0,
            angles: CurrentAngles {
                elbow: Some(elbow_angle),
                body_line: Some(body_line),
                ..CurrentAngles::default()
            },
        }
    }

    fn in_position(&self, m: &Measurements, profile: &ExerciseProfile) -> bool {
        m.body_tilt <= profile.max_body_tilt
    }

    fn position_hint(&self) -> &'static str {
        "Get into push-up position"
    }

    fn assess_form(&self, m: &Measurements, phase: Phase, profile: &ExerciseProfile) -> FormAssessment {
        let mut form = FormAssessment::new();

        if phase == Phase::Down {
            let (penalty, _) = angle_penalty(m.primary_angle, profile);
            if m.primary_angle > profile.perfect.max {
                form.flag(penalty, FeedbackItem::warning("Lower your chest closer to the floor"));
            } else if m.primary_angle < profile.perfect.min {
                form.flag(penalty, FeedbackItem::warning("Don't drop all the way down"));
            }
        }

        if m.secondary < profile.min_body_line {
            let message = if m.hip_offset > 0.0 {
                "Engage your core - hips are sagging"
            } else {
                "Lower your hips into a straight line"
            };
            form.flag(profile.penalties.alignment, FeedbackItem::warning(message));
        }

        form
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{pushup_frame, pushup_frame_with_hip_drop, standing_frame};

    #[test]
    fn test_measures_elbow_and_body_line() {
        let m = PushUpClassifier.measure(&pushup_frame(90.0, 0));
        assert!((m.primary_angle - 90.0).abs() < 1e-6);
        assert!((m.secondary - 180.0).abs() < 1e-6);
        assert!(m.body_tilt < 1e-6);
        assert_eq!(m.angles.elbow, Some(m.primary_angle));
    }

    #[test]
    fn test_standing_is_out_of_position() {
        let profile = ExerciseProfile::pushup();
        let standing = PushUpClassifier.measure(&standing_frame(0));
        assert!(!PushUpClassifier.in_position(&standing, &profile));

        let plank = PushUpClassifier.measure(&pushup_frame(170.0, 0));
        assert!(PushUpClassifier.in_position(&plank, &profile));
    }

    #[test]
    fn test_sagging_hips_flagged() {
        let profile = ExerciseProfile::pushup();
        let m = PushUpClassifier.measure(&pushup_frame_with_hip_drop(80.0, 0.06, 0));
        assert!(m.secondary < profile.min_body_line);
        assert!(m.hip_offset > 0.0);

        let form = PushUpClassifier.assess_form(&m, Phase::Down, &profile);
        assert_eq!(form.score(), 100.0 - profile.penalties.alignment);
        assert!(form.feedback[0].message.contains("sagging"));
    }

    #[test]
    fn test_piked_hips_flagged() {
        let profile = ExerciseProfile::pushup();
        let m = PushUpClassifier.measure(&pushup_frame_with_hip_drop(170.0, -0.06, 0));
        assert!(m.hip_offset < 0.0);

        let form = PushUpClassifier.assess_form(&m, Phase::Up, &profile);
        assert_eq!(form.feedback.len(), 1);
        assert!(form.feedback[0].message.contains("straight line"));
    }

    #[test]
    fn test_shallow_pushup_penalized() {
        let profile = ExerciseProfile::pushup();
        let m = PushUpClassifier.measure(&pushup_frame(105.0, 0));
        let form = PushUpClassifier.assess_form(&m, Phase::Down, &profile);
        assert!((form.score() - 90.0).abs() < 1e-6);
    }
}
