//! Geometric utilities for joint and body-alignment measurements.
//!
//! All inputs are normalized 2D frame coordinates (y grows downward).
//! Every function here is total: degenerate input (coincident points, NaN)
//! yields a defined value instead of propagating NaN into the state machine.

use nalgebra::{Point2, Vector2};

/// Interior angle at `b` formed by the segments `b→a` and `b→c`, in degrees.
///
/// Uses the difference of the two segment headings (`atan2`), folded into
/// `[0, 180]`. Symmetric in `a` and `c`.
pub fn joint_angle(a: Point2<f64>, b: Point2<f64>, c: Point2<f64>) -> f64 {
    let ba: Vector2<f64> = a - b;
    let bc: Vector2<f64> = c - b;

    let radians = bc.y.atan2(bc.x) - ba.y.atan2(ba.x);
    let mut angle = radians.abs().to_degrees();
    if angle > 180.0 {
        angle = 360.0 - angle;
    }

    if angle.is_finite() {
        angle.clamp(0.0, 180.0)
    } else {
        180.0
    }
}

/// Inclination of the segment `a→b` away from horizontal, in `[0, 90]` degrees
pub fn tilt_from_horizontal(a: Point2<f64>, b: Point2<f64>) -> f64 {
    let d: Vector2<f64> = b - a;
    if d.norm() < 1e-9 {
        return 90.0;
    }
    let tilt = d.y.abs().atan2(d.x.abs()).to_degrees();
    if tilt.is_finite() {
        tilt
    } else {
        90.0
    }
}

/// Inclination of the segment `a→b` away from vertical, in `[0, 90]` degrees
pub fn tilt_from_vertical(a: Point2<f64>, b: Point2<f64>) -> f64 {
    90.0 - tilt_from_horizontal(a, b)
}

pub fn midpoint(a: Point2<f64>, b: Point2<f64>) -> Point2<f64> {
    nalgebra::center(&a, &b)
}

/// Signed perpendicular distance of `p` from the line through `a` and `b`.
///
/// Positive when `p` lies below the line in image space (larger y), which for
/// a horizontal body means the hips are sagging toward the floor.
pub fn signed_offset_from_line(p: Point2<f64>, a: Point2<f64>, b: Point2<f64>) -> f64 {
    let ab: Vector2<f64> = b - a;
    let len = ab.norm();
    if len < 1e-9 {
        return 0.0;
    }

    let ap: Vector2<f64> = p - a;
    let cross = ab.x * ap.y - ab.y * ap.x;
    // Orient so that "below" is positive regardless of the segment direction
    let offset = if ab.x >= 0.0 { cross / len } else { -cross / len };
    if offset.is_finite() {
        offset
    } else {
        0.0
    }
}
