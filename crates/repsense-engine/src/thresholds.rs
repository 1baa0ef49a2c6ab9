//! Adaptive threshold learning.
//!
//! Fixed down/up angles fit some body types and flexibility ranges poorly.
//! The learner keeps a rolling history of the primary angle and, once enough
//! movement has been observed, derives personalized thresholds from its
//! 20th and 80th percentiles:
//!
//! ```text
//! down = max(default_down, p20 + margin)
//! up   = min(default_up,   p80 - margin)
//! ```
//!
//! Learned values are then held inside a hard band around the defaults
//! (`max_adjustment`) and rejected outright if they leave less than `min_gap`
//! degrees between down and up, so a noisy start can never produce
//! unreachable or trivially satisfied thresholds.

use repsense_core::{EngineConfig, ExerciseType, LearnerConfig, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Down/up angle boundaries used by the state machine (degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdPair {
    pub down: f64,
    pub up: f64,
}

impl ThresholdPair {
    pub fn new(down: f64, up: f64) -> Self {
        Self { down, up }
    }
}

/// Per-session threshold learner
#[derive(Debug, Clone)]
pub struct ThresholdLearner {
    config: LearnerConfig,
    defaults: HashMap<ExerciseType, ThresholdPair>,
    learned: HashMap<ExerciseType, ThresholdPair>,
    exercise: Option<ExerciseType>,
    history: VecDeque<f64>,
    learning_started: Option<Timestamp>,
}

impl ThresholdLearner {
    pub fn new(config: LearnerConfig, defaults: HashMap<ExerciseType, ThresholdPair>) -> Self {
        let capacity = config.history_capacity;
        Self {
            config,
            defaults,
            learned: HashMap::new(),
            exercise: None,
            history: VecDeque::with_capacity(capacity),
            learning_started: None,
        }
    }

    /// Learner seeded with every exercise profile's default thresholds
    pub fn from_config(config: &EngineConfig) -> Self {
        let defaults = ExerciseType::ALL
            .iter()
            .map(|&e| {
                let profile = config.profile(e);
                (e, ThresholdPair::new(profile.default_down, profile.default_up))
            })
            .collect();
        Self::new(config.learner.clone(), defaults)
    }

    /// Record an observed primary angle.
    ///
    /// Returns the newly learned pair when this sample caused the thresholds
    /// to be recomputed and accepted.
    pub fn update(&mut self, angle: f64, exercise: ExerciseType, now: Timestamp) -> Option<ThresholdPair> {
        if !angle.is_finite() {
            return None;
        }

        if self.exercise != Some(exercise) {
            self.restart(exercise, now);
        }
        let started = *self.learning_started.get_or_insert(now);

        if self.history.len() == self.config.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(angle);

        if self.history.len() < self.config.min_samples
            || now.millis_since(started) < self.config.learning_period_ms
        {
            return None;
        }

        let pair = self.compute(exercise)?;
        if self.learned.get(&exercise) == Some(&pair) {
            return None;
        }
        tracing::debug!(
            exercise = %exercise,
            down = pair.down,
            up = pair.up,
            samples = self.history.len(),
            "Learned adaptive thresholds"
        );
        self.learned.insert(exercise, pair);
        Some(pair)
    }

    fn compute(&self, exercise: ExerciseType) -> Option<ThresholdPair> {
        let default = self.default_for(exercise);

        let mut sorted: Vec<f64> = self.history.iter().copied().collect();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let low = percentile(&sorted, self.config.low_percentile)?;
        let high = percentile(&sorted, self.config.high_percentile)?;

        let margin = self.config.safety_margin;
        let down = default
            .down
            .max(low + margin)
            .min(default.down + self.config.max_adjustment);
        let up = default
            .up
            .min(high - margin)
            .max(default.up - self.config.max_adjustment);

        if up - down < self.config.min_gap {
            tracing::debug!(
                exercise = %exercise,
                down,
                up,
                "Rejected learned thresholds with insufficient gap"
            );
            return None;
        }

        Some(ThresholdPair::new(down, up))
    }

    /// Thresholds in effect for an exercise: learned, or the defaults
    pub fn get(&self, exercise: ExerciseType) -> ThresholdPair {
        self.learned
            .get(&exercise)
            .copied()
            .unwrap_or_else(|| self.default_for(exercise))
    }

    pub fn is_learned(&self, exercise: ExerciseType) -> bool {
        self.learned.contains_key(&exercise)
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    fn default_for(&self, exercise: ExerciseType) -> ThresholdPair {
        self.defaults
            .get(&exercise)
            .copied()
            .unwrap_or(ThresholdPair::new(90.0, 160.0))
    }

    fn restart(&mut self, exercise: ExerciseType, now: Timestamp) {
        self.exercise = Some(exercise);
        self.history.clear();
        self.learning_started = Some(now);
    }

    /// Forget history and learned thresholds
    pub fn reset(&mut self) {
        self.exercise = None;
        self.history.clear();
        self.learning_started = None;
        self.learned.clear();
    }
}

/// Nearest-rank percentile of an ascending slice
fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = ((sorted.len() - 1) as f64 * p.clamp(0.0, 1.0)).round() as usize;
    sorted.get(rank).copied()
}
