//! Synthetic side-view pose frames for tests.

use nalgebra::{Point2, Vector2};
use repsense_core::{BodyLandmark, BodySide, Landmark, PoseFrame, Timestamp};

pub const VISIBLE: f64 = 0.95;

/// Unit vector `base` rotated by `degrees` (image coordinates)
fn rotated(base: Vector2<f64>, degrees: f64) -> Vector2<f64> {
    let (sin, cos) = degrees.to_radians().sin_cos();
    Vector2::new(base.x * cos - base.y * sin, base.x * sin + base.y * cos)
}

struct Skeleton {
    shoulder: Point2<f64>,
    elbow: Point2<f64>,
    wrist: Point2<f64>,
    hip: Point2<f64>,
    knee: Point2<f64>,
    ankle: Point2<f64>,
}

impl Skeleton {
    fn into_frame(self, ms: i64) -> PoseFrame {
        let head = self.shoulder + Vector2::new(0.0, -0.08);
        let mut landmarks = vec![Landmark::new(head.x, head.y, VISIBLE); BodyLandmark::COUNT];

        for side in [BodySide::Left, BodySide::Right] {
            for (lm, p) in [
                (side.shoulder(), self.shoulder),
                (side.elbow(), self.elbow),
                (side.wrist(), self.wrist),
                (side.hip(), self.hip),
                (side.knee(), self.knee),
                (side.ankle(), self.ankle),
            ] {
                landmarks[lm.index()] = Landmark::new(p.x, p.y, VISIBLE);
            }
        }

        PoseFrame::new(landmarks, Timestamp::from_millis(ms)).unwrap()
    }
}

/// Standing side view with the given knee angle and an upright torso
pub fn squat_frame(knee_angle: f64, ms: i64) -> PoseFrame {
    squat_frame_with_lean(knee_angle, 0.0, ms)
}

/// Squat frame whose torso leans forward by `lean` degrees from vertical
pub fn squat_frame_with_lean(knee_angle: f64, lean: f64, ms: i64) -> PoseFrame {
    let ankle = Point2::new(0.5, 0.9);
    let knee = Point2::new(0.5, 0.7);
    let hip = knee + rotated(Vector2::new(0.0, 1.0), knee_angle) * 0.2;
    let shoulder = hip + rotated(Vector2::new(0.0, -1.0), lean) * 0.25;
    let elbow = shoulder + Vector2::new(0.05, 0.1);
    let wrist = elbow + Vector2::new(0.1, 0.0);

    Skeleton {
        shoulder,
        elbow,
        wrist,
        hip,
        knee,
        ankle,
    }
    .into_frame(ms)
}

/// Horizontal push-up with the given elbow angle and a straight body
pub fn pushup_frame(elbow_angle: f64, ms: i64) -> PoseFrame {
    pushup_frame_with_hip_drop(elbow_angle, 0.0, ms)
}

/// Push-up frame with the hips displaced downward by `drop` (normalized)
pub fn pushup_frame_with_hip_drop(elbow_angle: f64, drop: f64, ms: i64) -> PoseFrame {
    let shoulder = Point2::new(0.3, 0.5);
    let elbow = shoulder + Vector2::new(0.0, 0.12);
    let wrist = elbow + rotated(Vector2::new(0.0, -1.0), elbow_angle) * 0.12;

    Skeleton {
        shoulder,
        elbow,
        wrist,
        hip: Point2::new(0.55, 0.5 + drop),
        knee: Point2::new(0.7, 0.5),
        ankle: Point2::new(0.85, 0.5),
    }
    .into_frame(ms)
}

/// Forearm plank with the given shoulder-hip-knee angle
pub fn plank_frame(body_angle: f64, ms: i64) -> PoseFrame {
    let shoulder = Point2::new(0.3, 0.5);
    let hip = Point2::new(0.5, 0.5);
    let leg = rotated(Vector2::new(-1.0, 0.0), body_angle);
    let knee = hip + leg * 0.15;
    let ankle = knee + leg * 0.15;

    Skeleton {
        shoulder,
        elbow: shoulder + Vector2::new(0.0, 0.12),
        wrist: shoulder + Vector2::new(0.12, 0.12),
        hip,
        knee,
        ankle,
    }
    .into_frame(ms)
}

/// Upright standing pose, arms at the sides
pub fn standing_frame(ms: i64) -> PoseFrame {
    Skeleton {
        shoulder: Point2::new(0.5, 0.3),
        elbow: Point2::new(0.5, 0.42),
        wrist: Point2::new(0.5, 0.54),
        hip: Point2::new(0.5, 0.55),
        knee: Point2::new(0.5, 0.72),
        ankle: Point2::new(0.5, 0.9),
    }
    .into_frame(ms)
}

/// Frame with every landmark at low visibility
pub fn poor_frame(ms: i64) -> PoseFrame {
    PoseFrame::new(
        vec![Landmark::new(0.5, 0.5, 0.3); BodyLandmark::COUNT],
        Timestamp::from_millis(ms),
    )
    .unwrap()
}
