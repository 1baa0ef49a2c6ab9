//! Bounded rolling windows of recent position samples and angular velocity.
//!
//! Both windows are capped, so every query is O(capacity) regardless of how
//! long the session has been running.

use repsense_core::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One measured position of the subject
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    /// Primary joint angle of the exercise (degrees)
    pub primary_angle: f64,
    /// Main alignment measurement of the exercise
    pub secondary: f64,
    pub timestamp: Timestamp,
}

impl PositionSample {
    pub fn new(primary_angle: f64, secondary: f64, timestamp: Timestamp) -> Self {
        Self {
            primary_angle,
            secondary,
            timestamp,
        }
    }
}

/// Rolling window of position samples, oldest first
#[derive(Debug, Clone)]
pub struct PositionWindow {
    samples: VecDeque<PositionSample>,
    capacity: usize,
}

impl PositionWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: PositionSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Drop everything but the `n` most recent samples
    pub fn retain_last(&mut self, n: usize) {
        while self.samples.len() > n {
            self.samples.pop_front();
        }
    }

    pub fn latest(&self) -> Option<&PositionSample> {
        self.samples.back()
    }

    /// The `n` most recent samples, newest first
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &PositionSample> {
        self.samples.iter().rev().take(n)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PositionSample> {
        self.samples.iter()
    }

    /// Whether every one of the last `n` samples lies within `tolerance`
    /// degrees of `angle`
    pub fn is_stable_around(&self, angle: f64, n: usize, tolerance: f64) -> bool {
        self.recent(n)
            .all(|s| (s.primary_angle - angle).abs() <= tolerance)
    }

    /// Lowest primary angle among the last `n` samples
    pub fn min_recent(&self, n: usize) -> Option<f64> {
        self.recent(n)
            .map(|s| s.primary_angle)
            .fold(None, |min: Option<f64>, a| Some(min.map_or(a, |m| m.min(a))))
    }

    /// Angular velocity between the two most recent samples (deg/s)
    pub fn angular_velocity(&self) -> Option<f64> {
        let mut recent = self.recent(2);
        let newest = recent.next()?;
        let previous = recent.next()?;

        let dt = (newest.timestamp.as_nanos() - previous.timestamp.as_nanos()) as f64 / 1e9;
        if dt <= 0.0 {
            return None;
        }
        Some((newest.primary_angle - previous.primary_angle) / dt)
    }
}

/// Rolling history of angular velocities
#[derive(Debug, Clone)]
pub struct VelocityHistory {
    values: VecDeque<f64>,
    capacity: usize,
}

impl VelocityHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, velocity: f64) {
        if !velocity.is_finite() {
            return;
        }
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(velocity);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Mean absolute angular speed (deg/s), 0 when empty
    pub fn mean_speed(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().map(|v| v.abs()).sum::<f64>() / self.values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(angle: f64, ms: i64) -> PositionSample {
        PositionSample::new(angle, 0.0, Timestamp::from_millis(ms))
    }

    #[test]
    fn test_window_evicts_oldest() {
        let mut window = PositionWindow::new(3);
        for (i, angle) in [10.0, 20.0, 30.0, 40.0].into_iter().enumerate() {
            window.push(sample(angle, i as i64 * 100));
        }

        assert_eq!(window.len(), 3);
        let angles: Vec<f64> = window.iter().map(|s| s.primary_angle).collect();
        assert_eq!(angles, vec![20.0, 30.0, 40.0]);
    }

    #[test]
    fn test_retain_last() {
        let mut window = PositionWindow::new(10);
        for i in 0..6 {
            window.push(sample(i as f64, i * 10));
        }
        window.retain_last(2);
        assert_eq!(window.len(), 2);
        assert_eq!(window.latest().unwrap().primary_angle, 5.0);

        window.retain_last(5);
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn test_stability_and_range() {
        let mut window = PositionWindow::new(10);
        for angle in [80.0, 80.0, 80.0, 170.0, 170.0, 170.0] {
            window.push(sample(angle, 0));
        }

        assert!(window.is_stable_around(170.0, 3, 25.0));
        assert!(!window.is_stable_around(170.0, 4, 25.0));
        assert_eq!(window.min_recent(6), Some(80.0));
        assert_eq!(window.min_recent(3), Some(170.0));
        assert_eq!(PositionWindow::new(4).min_recent(3), None);
    }

    #[test]
    fn test_angular_velocity() {
        let mut window = PositionWindow::new(4);
        window.push(sample(100.0, 0));
        assert!(window.angular_velocity().is_none());

        window.push(sample(130.0, 100));
        assert!((window.angular_velocity().unwrap() - 300.0).abs() < 1e-9);

        // Duplicate timestamps yield no velocity rather than infinity
        window.push(sample(140.0, 100));
        assert!(window.angular_velocity().is_none());
    }

    #[test]
    fn test_velocity_history_mean_speed() {
        let mut history = VelocityHistory::new(3);
        assert_eq!(history.mean_speed(), 0.0);

        for v in [100.0, -200.0, 300.0, -400.0, f64::NAN] {
            history.push(v);
        }
        assert_eq!(history.len(), 3);
        assert!((history.mean_speed() - 300.0).abs() < 1e-9);
    }
}
