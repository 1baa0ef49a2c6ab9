//! Landmark quality assessment.
//!
//! Every incoming frame is graded before any exercise analysis runs:
//!
//! - **completeness**: fraction of the key landmarks (shoulders, elbows, hips,
//!   knees) that are visible
//! - **confidence**: mean visibility of the landmarks that are visible at all
//!
//! Completeness selects the tracking diagnostic shown to the user, and the
//! combination of both decides whether downstream analysis may run.

use serde::{Deserialize, Serialize};

use crate::settings::QualityConfig;
use crate::types::{BodyLandmark, PoseFrame};

/// Degree to which a frame can be trusted for exercise analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionQuality {
    Poor,
    Good,
    Excellent,
}

impl DetectionQuality {
    /// Analysis only runs on good or excellent frames
    pub fn is_analyzable(&self) -> bool {
        matches!(self, DetectionQuality::Good | DetectionQuality::Excellent)
    }
}

/// Diagnostic explaining why detection quality is what it is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingStatus {
    Optimal,
    TooClose,
    Partial,
    Lost,
    Repositioning,
}

impl TrackingStatus {
    /// User-facing hint for this status, `None` when tracking is optimal
    pub fn guidance(&self) -> Option<&'static str> {
        match self {
            TrackingStatus::Optimal => None,
            TrackingStatus::TooClose => Some("Step back from the camera"),
            TrackingStatus::Partial => Some("Move back so your whole body is visible"),
            TrackingStatus::Lost => Some("No person detected - step into the frame"),
            TrackingStatus::Repositioning => Some("Hold still while tracking locks on"),
        }
    }
}

/// Result of assessing a single frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub detection_quality: DetectionQuality,
    pub tracking_status: TrackingStatus,
    /// Mean visibility of visible landmarks [0, 1]
    pub confidence: f64,
    /// Fraction of key landmarks visible [0, 1]
    pub completeness: f64,
}

impl QualityReport {
    /// Report for a frame with no person in it
    pub fn lost() -> Self {
        Self {
            detection_quality: DetectionQuality::Poor,
            tracking_status: TrackingStatus::Lost,
            confidence: 0.0,
            completeness: 0.0,
        }
    }

    pub fn is_analyzable(&self) -> bool {
        self.detection_quality.is_analyzable()
    }
}

/// Grades frames according to a [`QualityConfig`]
#[derive(Debug, Clone, Default)]
pub struct QualityAssessor {
    config: QualityConfig,
}

impl QualityAssessor {
    pub fn new(config: QualityConfig) -> Self {
        Self { config }
    }

    pub fn assess(&self, frame: &PoseFrame) -> QualityReport {
        if frame.is_empty() {
            return QualityReport::lost();
        }

        let threshold = self.config.visibility_threshold;

        let visible_keys = BodyLandmark::KEY_LANDMARKS
            .iter()
            .filter(|&&lm| frame.visibility(lm) > threshold)
            .count();
        let completeness = visible_keys as f64 / BodyLandmark::KEY_LANDMARKS.len() as f64;

        let (sum, count) = frame
            .landmarks()
            .iter()
            .filter(|lm| lm.is_visible(threshold))
            .fold((0.0, 0usize), |(sum, count), lm| (sum + lm.visibility, count + 1));
        let confidence = if count > 0 { sum / count as f64 } else { 0.0 };

        let tracking_status = if completeness < self.config.lost_completeness {
            TrackingStatus::Lost
        } else if completeness < self.config.partial_completeness {
            TrackingStatus::Partial
        } else if self.is_too_close(frame) {
            TrackingStatus::TooClose
        } else if confidence < self.config.repositioning_confidence {
            TrackingStatus::Repositioning
        } else {
            TrackingStatus::Optimal
        };

        let detection_quality = if confidence >= self.config.excellent_confidence
            && completeness >= self.config.excellent_completeness
            && tracking_status == TrackingStatus::Optimal
        {
            DetectionQuality::Excellent
        } else if confidence >= self.config.good_confidence
            && completeness >= self.config.good_completeness
        {
            DetectionQuality::Good
        } else {
            DetectionQuality::Poor
        };

        QualityReport {
            detection_quality,
            tracking_status,
            confidence,
            completeness,
        }
    }

    /// Subject fills the frame: key landmarks touch the border and the
    /// shoulders span more than the configured width.
    fn is_too_close(&self, frame: &PoseFrame) -> bool {
        let threshold = self.config.visibility_threshold;
        let margin = self.config.edge_margin;

        let touches_edge = BodyLandmark::KEY_LANDMARKS
            .iter()
            .filter_map(|&lm| frame.get(lm))
            .filter(|lm| lm.is_visible(threshold))
            .any(|lm| lm.x < margin || lm.x > 1.0 - margin || lm.y < margin || lm.y > 1.0 - margin);

        if !touches_edge {
            return false;
        }

        match (
            frame.get(BodyLandmark::LeftShoulder),
            frame.get(BodyLandmark::RightShoulder),
        ) {
            (Some(l), Some(r)) if l.is_visible(threshold) && r.is_visible(threshold) => {
                (l.to_point2() - r.to_point2()).norm() > self.config.too_close_shoulder_span
            }
            _ => false,
        }
    }

    pub fn config(&self) -> &QualityConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Landmark, Timestamp};

    fn frame_with(visibility: f64, key_visibility: f64) -> PoseFrame {
        let mut landmarks = vec![Landmark::new(0.5, 0.5, visibility); BodyLandmark::COUNT];
        for lm in BodyLandmark::KEY_LANDMARKS {
            landmarks[lm.index()].visibility = key_visibility;
        }
        PoseFrame::new(landmarks, Timestamp::from_millis(0)).unwrap()
    }

    #[test]
    fn test_empty_frame_is_lost() {
        let report = QualityAssessor::default().assess(&PoseFrame::empty(Timestamp::from_millis(0)));
        assert_eq!(report, QualityReport::lost());
    }

    #[test]
    fn test_excellent_frame() {
        let report = QualityAssessor::default().assess(&frame_with(0.95, 0.95));
        assert_eq!(report.tracking_status, TrackingStatus::Optimal);
        assert_eq!(report.detection_quality, DetectionQuality::Excellent);
        assert!((report.completeness - 1.0).abs() < 1e-9);
        assert!((report.confidence - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_invisible_landmarks_excluded_from_confidence() {
        // Non-key landmarks below threshold must not drag confidence down
        let report = QualityAssessor::default().assess(&frame_with(0.1, 0.9));
        assert!((report.confidence - 0.9).abs() < 1e-9);
        assert_eq!(report.detection_quality, DetectionQuality::Excellent);
    }

    #[test]
    fn test_partial_and_lost_status() {
        let mut frame = frame_with(0.9, 0.9);
        let assessor = QualityAssessor::default();

        // 6 of 8 key landmarks: completeness 0.75, not partial
        let mut landmarks = frame.landmarks().to_vec();
        landmarks[BodyLandmark::LeftKnee.index()].visibility = 0.2;
        landmarks[BodyLandmark::RightKnee.index()].visibility = 0.2;
        frame = PoseFrame::new(landmarks.clone(), Timestamp::from_millis(0)).unwrap();
        let report = assessor.assess(&frame);
        assert_eq!(report.tracking_status, TrackingStatus::Optimal);
        assert_eq!(report.detection_quality, DetectionQuality::Good);

        // 5 of 8: partial
        landmarks[BodyLandmark::LeftHip.index()].visibility = 0.2;
        let frame = PoseFrame::new(landmarks.clone(), Timestamp::from_millis(0)).unwrap();
        let report = assessor.assess(&frame);
        assert_eq!(report.tracking_status, TrackingStatus::Partial);
        assert_eq!(report.detection_quality, DetectionQuality::Poor);

        // 3 of 8: lost
        landmarks[BodyLandmark::RightHip.index()].visibility = 0.2;
        landmarks[BodyLandmark::LeftElbow.index()].visibility = 0.2;
        let frame = PoseFrame::new(landmarks, Timestamp::from_millis(0)).unwrap();
        let report = assessor.assess(&frame);
        assert_eq!(report.tracking_status, TrackingStatus::Lost);
        assert_eq!(report.detection_quality, DetectionQuality::Poor);
    }

    #[test]
    fn test_low_confidence_is_repositioning() {
        let report = QualityAssessor::default().assess(&frame_with(0.65, 0.65));
        assert_eq!(report.tracking_status, TrackingStatus::Repositioning);
        assert_eq!(report.detection_quality, DetectionQuality::Good);

        let report = QualityAssessor::default().assess(&frame_with(0.55, 0.55));
        assert_eq!(report.detection_quality, DetectionQuality::Poor);
    }

    #[test]
    fn test_too_close() {
        let mut landmarks = vec![Landmark::new(0.5, 0.5, 0.95); BodyLandmark::COUNT];
        landmarks[BodyLandmark::LeftShoulder.index()] = Landmark::new(0.99, 0.3, 0.95);
        landmarks[BodyLandmark::RightShoulder.index()] = Landmark::new(0.2, 0.3, 0.95);
        let frame = PoseFrame::new(landmarks, Timestamp::from_millis(0)).unwrap();

        let report = QualityAssessor::default().assess(&frame);
        assert_eq!(report.tracking_status, TrackingStatus::TooClose);
        assert_eq!(report.detection_quality, DetectionQuality::Good);
        assert!(report.tracking_status.guidance().is_some());
    }
}
