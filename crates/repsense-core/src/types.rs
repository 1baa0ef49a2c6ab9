//! Fundamental types for the RepSense system.

use chrono::{DateTime, Utc};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Session identifier for one exercise session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Timestamp wrapper with nanosecond precision.
///
/// Frame timestamps come from a monotonic clock owned by the caller; the
/// engine only ever compares them against each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp_nanos_opt().unwrap_or(0))
    }

    pub fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub fn from_millis(millis: i64) -> Self {
        Self(millis.saturating_mul(1_000_000))
    }

    pub fn as_nanos(&self) -> i64 {
        self.0
    }

    pub fn as_millis(&self) -> i64 {
        self.0 / 1_000_000
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1_000_000_000.0
    }

    /// Milliseconds elapsed since `earlier` (negative if `earlier` is later)
    pub fn millis_since(&self, earlier: Timestamp) -> i64 {
        self.0.saturating_sub(earlier.0) / 1_000_000
    }

    /// This timestamp shifted by a signed number of milliseconds
    pub fn offset_millis(&self, millis: i64) -> Self {
        Self(self.0.saturating_add(millis.saturating_mul(1_000_000)))
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(self.0)
    }
}

/// A single normalized 2D body keypoint.
///
/// `x` and `y` are in frame coordinates (`[0, 1]`, y grows downward),
/// `visibility` is the estimator's confidence that the point is in view.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    pub visibility: f64,
}

impl Landmark {
    /// Create a landmark, sanitizing non-finite input to an invisible point
    pub fn new(x: f64, y: f64, visibility: f64) -> Self {
        if !(x.is_finite() && y.is_finite() && visibility.is_finite()) {
            return Self::default();
        }
        Self {
            x,
            y,
            visibility: visibility.clamp(0.0, 1.0),
        }
    }

    pub fn is_visible(&self, threshold: f64) -> bool {
        self.visibility > threshold
    }

    pub fn to_point2(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }
}

/// 33-landmark BlazePose topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(usize)]
pub enum BodyLandmark {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl BodyLandmark {
    /// Minimum number of landmarks in a non-empty frame
    pub const COUNT: usize = 33;

    /// Landmarks whose visibility determines frame completeness
    pub const KEY_LANDMARKS: [BodyLandmark; 8] = [
        BodyLandmark::LeftShoulder,
        BodyLandmark::RightShoulder,
        BodyLandmark::LeftElbow,
        BodyLandmark::RightElbow,
        BodyLandmark::LeftHip,
        BodyLandmark::RightHip,
        BodyLandmark::LeftKnee,
        BodyLandmark::RightKnee,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Body side used for single-side joint measurements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodySide {
    Left,
    Right,
}

impl BodySide {
    pub fn shoulder(self) -> BodyLandmark {
        match self {
            BodySide::Left => BodyLandmark::LeftShoulder,
            BodySide::Right => BodyLandmark::RightShoulder,
        }
    }

    pub fn elbow(self) -> BodyLandmark {
        match self {
            BodySide::Left => BodyLandmark::LeftElbow,
            BodySide::Right => BodyLandmark::RightElbow,
        }
    }

    pub fn wrist(self) -> BodyLandmark {
        match self {
            BodySide::Left => BodyLandmark::LeftWrist,
            BodySide::Right => BodyLandmark::RightWrist,
        }
    }

    pub fn hip(self) -> BodyLandmark {
        match self {
            BodySide::Left => BodyLandmark::LeftHip,
            BodySide::Right => BodyLandmark::RightHip,
        }
    }

    pub fn knee(self) -> BodyLandmark {
        match self {
            BodySide::Left => BodyLandmark::LeftKnee,
            BodySide::Right => BodyLandmark::RightKnee,
        }
    }

    pub fn ankle(self) -> BodyLandmark {
        match self {
            BodySide::Left => BodyLandmark::LeftAnkle,
            BodySide::Right => BodyLandmark::RightAnkle,
        }
    }
}

/// All landmarks for one instant, as produced by the pose estimator.
///
/// An empty landmark list means no person was detected; otherwise the frame
/// carries at least [`BodyLandmark::COUNT`] landmarks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseFrame {
    pub timestamp: Timestamp,
    landmarks: Vec<Landmark>,
}

impl PoseFrame {
    pub fn new(landmarks: Vec<Landmark>, timestamp: Timestamp) -> Result<Self> {
        if !landmarks.is_empty() && landmarks.len() < BodyLandmark::COUNT {
            return Err(Error::InsufficientLandmarks {
                required: BodyLandmark::COUNT,
                available: landmarks.len(),
            });
        }

        let landmarks = landmarks
            .into_iter()
            .map(|lm| Landmark::new(lm.x, lm.y, lm.visibility))
            .collect();

        Ok(Self {
            timestamp,
            landmarks,
        })
    }

    /// Frame with no person detected
    pub fn empty(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            landmarks: Vec::new(),
        }
    }

    /// Build a frame from flat `[x, y, visibility]` triplets
    pub fn from_flat(data: &[f64], timestamp: Timestamp) -> Result<Self> {
        if data.len() % 3 != 0 {
            return Err(Error::InvalidInput(format!(
                "landmark data length {} is not a multiple of 3",
                data.len()
            )));
        }

        let landmarks = data
            .chunks_exact(3)
            .map(|c| Landmark::new(c[0], c[1], c[2]))
            .collect();

        Self::new(landmarks, timestamp)
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    pub fn landmarks(&self) -> &[Landmark] {
        &self.landmarks
    }

    pub fn get(&self, landmark: BodyLandmark) -> Option<&Landmark> {
        self.landmarks.get(landmark.index())
    }

    /// Visibility of a landmark, 0 when absent
    pub fn visibility(&self, landmark: BodyLandmark) -> f64 {
        self.get(landmark).map(|lm| lm.visibility).unwrap_or(0.0)
    }

    /// Position of a landmark in normalized frame coordinates
    pub fn point(&self, landmark: BodyLandmark) -> Option<Point2<f64>> {
        self.get(landmark).map(Landmark::to_point2)
    }

    /// Side whose listed landmarks have the higher summed visibility
    pub fn dominant_side<F>(&self, chain: F) -> BodySide
    where
        F: Fn(BodySide) -> Vec<BodyLandmark>,
    {
        let score = |side: BodySide| -> f64 { chain(side).into_iter().map(|lm| self.visibility(lm)).sum() };
        if score(BodySide::Right) > score(BodySide::Left) {
            BodySide::Right
        } else {
            BodySide::Left
        }
    }
}

/// Supported exercise types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseType {
    Squat,
    PushUp,
    Plank,
}

impl ExerciseType {
    pub const ALL: [ExerciseType; 3] = [ExerciseType::Squat, ExerciseType::PushUp, ExerciseType::Plank];

    pub fn name(&self) -> &'static str {
        match self {
            ExerciseType::Squat => "squat",
            ExerciseType::PushUp => "pushup",
            ExerciseType::Plank => "plank",
        }
    }

    /// Plank is held for time, everything else is counted in repetitions
    pub fn counts_reps(&self) -> bool {
        !matches!(self, ExerciseType::Plank)
    }
}

impl std::fmt::Display for ExerciseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for ExerciseType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "squat" => Ok(ExerciseType::Squat),
            "pushup" | "push-up" | "push_up" => Ok(ExerciseType::PushUp),
            "plank" => Ok(ExerciseType::Plank),
            other => Err(Error::InvalidInput(format!("unknown exercise type: {other}"))),
        }
    }
}
