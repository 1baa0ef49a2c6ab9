//! Engine configuration.
//!
//! Every numeric constant the engine uses lives here: quality gates, the
//! threshold learner, the recovery windows and one [`ExerciseProfile`] table
//! per exercise. Tuning an exercise never requires touching control flow.
//!
//! Configuration is loaded with the `config` crate. Files and `REPSENSE__*`
//! environment variables are layered over the built-in defaults, so a file
//! only needs the keys it changes:
//!
//! ```toml
//! rep_flash_ms = 600
//!
//! [squat]
//! cooldown_ms = 800
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::ExerciseType;

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Frame quality gates
    pub quality: QualityConfig,

    /// Adaptive threshold learning
    pub learner: LearnerConfig,

    /// Detection-loss recovery windows
    pub recovery: RecoveryConfig,

    /// Capacity of the per-session position sample window
    pub window_capacity: usize,

    /// Capacity of the angular velocity history
    pub velocity_capacity: usize,

    /// How long the "rep detected" pulse stays raised (ms)
    pub rep_flash_ms: i64,

    pub squat: ExerciseProfile,
    pub pushup: ExerciseProfile,
    pub plank: ExerciseProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Landmarks at or below this visibility count as not visible
    pub visibility_threshold: f64,

    /// Completeness below this is reported as lost
    pub lost_completeness: f64,

    /// Completeness below this is reported as partial
    pub partial_completeness: f64,

    /// Confidence below this is reported as repositioning
    pub repositioning_confidence: f64,

    pub excellent_confidence: f64,
    pub excellent_completeness: f64,
    pub good_confidence: f64,
    pub good_completeness: f64,

    /// Distance from the frame border that counts as touching it
    pub edge_margin: f64,

    /// Shoulder span (normalized) above which an edge-touching subject is too close
    pub too_close_shoulder_span: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            visibility_threshold: 0.5,
            lost_completeness: 0.5,
            partial_completeness: 0.75,
            repositioning_confidence: 0.7,
            excellent_confidence: 0.8,
            excellent_completeness: 0.9,
            good_confidence: 0.6,
            good_completeness: 0.75,
            edge_margin: 0.02,
            too_close_shoulder_span: 0.45,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerConfig {
    /// Rolling history length per exercise
    pub history_capacity: usize,

    /// Samples required before thresholds are learned
    pub min_samples: usize,

    /// Learning time required before thresholds are learned (ms)
    pub learning_period_ms: i64,

    /// Percentile that anchors the learned down threshold
    pub low_percentile: f64,

    /// Percentile that anchors the learned up threshold
    pub high_percentile: f64,

    /// Margin added inside the observed range (degrees)
    pub safety_margin: f64,

    /// Furthest a learned threshold may move from its default (degrees)
    pub max_adjustment: f64,

    /// Smallest allowed gap between learned down and up thresholds (degrees)
    pub min_gap: f64,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            history_capacity: 50,
            min_samples: 20,
            learning_period_ms: 10_000,
            low_percentile: 0.2,
            high_percentile: 0.8,
            safety_margin: 10.0,
            max_adjustment: 25.0,
            min_gap: 30.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryConfig {
    /// Gaps shorter than this are brief occlusions (ms)
    pub brief_ms: i64,

    /// Gaps at least this long are sustained absences (ms)
    pub sustained_ms: i64,

    /// Samples kept after a brief occlusion
    pub brief_keep: usize,

    /// Samples kept after a medium occlusion
    pub medium_keep: usize,

    /// Remaining cooldown imposed after a brief occlusion (ms)
    pub grace_ms: i64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            brief_ms: 2_000,
            sustained_ms: 5_000,
            brief_keep: 2,
            medium_keep: 1,
            grace_ms: 500,
        }
    }
}

/// Closed angle interval in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleBand {
    pub min: f64,
    pub max: f64,
}

impl AngleBand {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, angle: f64) -> bool {
        angle >= self.min && angle <= self.max
    }

    /// Distance from the band, 0 inside it
    pub fn distance(&self, angle: f64) -> f64 {
        if angle < self.min {
            self.min - angle
        } else if angle > self.max {
            angle - self.max
        } else {
            0.0
        }
    }

    pub fn encloses(&self, inner: &AngleBand) -> bool {
        self.min <= inner.min && inner.max <= self.max
    }
}

/// Form score deductions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PenaltyWeights {
    /// Points per degree outside the perfect band but inside the acceptable one
    pub per_degree: f64,

    /// Cap on the graded deduction
    pub acceptable_max: f64,

    /// Deduction when the angle leaves the acceptable band
    pub out_of_range: f64,

    /// Deduction per alignment violation
    pub alignment: f64,
}

/// Tuning table for one exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseProfile {
    /// Primary angle must drop below this to enter the down phase
    pub default_down: f64,

    /// Primary angle must rise above this to complete a rep
    pub default_up: f64,

    /// Primary angle below this counts as exercising even from neutral
    pub engaged_angle: f64,

    /// Minimum time between two reps (ms)
    pub cooldown_ms: i64,

    /// Minimum rise from the recent low for a rep to count (degrees)
    pub min_range: f64,

    /// Recent samples that must agree with the current angle
    pub stability_samples: usize,

    /// Largest tolerated disagreement inside the stability window (degrees)
    pub stability_tolerance: f64,

    /// Recent samples searched for the movement low point
    pub range_samples: usize,

    /// Ideal primary angle band
    pub perfect: AngleBand,

    /// Tolerable primary angle band
    pub acceptable: AngleBand,

    pub penalties: PenaltyWeights,

    /// Torso lean from vertical beyond which form is penalized (degrees)
    pub max_torso_lean: f64,

    /// Shoulder-hip-ankle angle below which the body line is broken (degrees)
    pub min_body_line: f64,

    /// Horizontal elbow-to-shoulder distance beyond which elbows are misplaced
    pub max_elbow_offset: f64,

    /// Body tilt from horizontal above which the subject is not in position (degrees)
    pub max_body_tilt: f64,

    /// Mean angular speed above which tempo feedback is raised (deg/s)
    pub max_angular_velocity: f64,

    /// Aligned time required before a hold counts as exercising (ms)
    pub hold_settle_ms: i64,
}

impl ExerciseProfile {
    pub fn squat() -> Self {
        Self {
            default_down: 100.0,
            default_up: 160.0,
            engaged_angle: 140.0,
            cooldown_ms: 600,
            min_range: 40.0,
            stability_samples: 3,
            stability_tolerance: 25.0,
            range_samples: 6,
            perfect: AngleBand::new(70.0, 100.0),
            acceptable: AngleBand::new(55.0, 120.0),
            penalties: PenaltyWeights {
                per_degree: 1.0,
                acceptable_max: 15.0,
                out_of_range: 30.0,
                alignment: 20.0,
            },
            max_torso_lean: 45.0,
            min_body_line: 0.0,
            max_elbow_offset: 1.0,
            max_body_tilt: 90.0,
            max_angular_velocity: 400.0,
            hold_settle_ms: 0,
        }
    }

    pub fn pushup() -> Self {
        Self {
            default_down: 90.0,
            default_up: 150.0,
            engaged_angle: 130.0,
            cooldown_ms: 600,
            min_range: 40.0,
            stability_samples: 3,
            stability_tolerance: 25.0,
            range_samples: 6,
            perfect: AngleBand::new(60.0, 95.0),
            acceptable: AngleBand::new(45.0, 115.0),
            penalties: PenaltyWeights {
                per_degree: 1.0,
                acceptable_max: 15.0,
                out_of_range: 30.0,
                alignment: 25.0,
            },
            max_torso_lean: 90.0,
            min_body_line: 160.0,
            max_elbow_offset: 1.0,
            max_body_tilt: 35.0,
            max_angular_velocity: 400.0,
            hold_settle_ms: 0,
        }
    }

    pub fn plank() -> Self {
        Self {
            default_down: 150.0,
            default_up: 170.0,
            engaged_angle: 0.0,
            cooldown_ms: 0,
            min_range: 0.0,
            stability_samples: 3,
            stability_tolerance: 25.0,
            range_samples: 6,
            perfect: AngleBand::new(165.0, 180.0),
            acceptable: AngleBand::new(150.0, 180.0),
            penalties: PenaltyWeights {
                per_degree: 1.5,
                acceptable_max: 20.0,
                out_of_range: 40.0,
                alignment: 15.0,
            },
            max_torso_lean: 90.0,
            min_body_line: 0.0,
            max_elbow_offset: 0.08,
            max_body_tilt: 35.0,
            max_angular_velocity: 120.0,
            hold_settle_ms: 500,
        }
    }

    fn validate(&self, name: &str) -> Result<()> {
        let fail = |msg: &str| Err(Error::Config(format!("{name}: {msg}")));

        if self.default_down >= self.default_up {
            return fail("default_down must be below default_up");
        }
        if self.perfect.min > self.perfect.max || self.acceptable.min > self.acceptable.max {
            return fail("angle band min exceeds max");
        }
        if !self.acceptable.encloses(&self.perfect) {
            return fail("acceptable band must enclose the perfect band");
        }
        if self.stability_samples == 0 || self.range_samples == 0 {
            return fail("stability_samples and range_samples must be positive");
        }
        if self.cooldown_ms < 0 || self.hold_settle_ms < 0 {
            return fail("durations must not be negative");
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            quality: QualityConfig::default(),
            learner: LearnerConfig::default(),
            recovery: RecoveryConfig::default(),
            window_capacity: 10,
            velocity_capacity: 10,
            rep_flash_ms: 800,
            squat: ExerciseProfile::squat(),
            pushup: ExerciseProfile::pushup(),
            plank: ExerciseProfile::plank(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a file layered over the defaults
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&EngineConfig::default())?)
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("REPSENSE").separator("__"))
            .build()?;

        let loaded: EngineConfig = settings.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Load from environment variables layered over the defaults
    pub fn from_env() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&EngineConfig::default())?)
            .add_source(config::Environment::with_prefix("REPSENSE").separator("__"))
            .build()?;

        let loaded: EngineConfig = settings.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Load from `path`, falling back to the defaults when the file is
    /// missing or invalid
    pub fn load_or_default(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path, error = %e, "Falling back to default engine configuration");
                Self::default()
            }
        }
    }

    pub fn profile(&self, exercise: ExerciseType) -> &ExerciseProfile {
        match exercise {
            ExerciseType::Squat => &self.squat,
            ExerciseType::PushUp => &self.pushup,
            ExerciseType::Plank => &self.plank,
        }
    }

    /// Reject tables the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        for exercise in ExerciseType::ALL {
            self.profile(exercise).validate(exercise.name())?;
        }

        let largest_lookback = ExerciseType::ALL
            .iter()
            .map(|&e| {
                let p = self.profile(e);
                p.stability_samples.max(p.range_samples)
            })
            .max()
            .unwrap_or(0);
        if self.window_capacity < largest_lookback {
            return Err(Error::Config(format!(
                "window_capacity {} is smaller than the largest sample lookback {}",
                self.window_capacity, largest_lookback
            )));
        }

        if self.velocity_capacity == 0 {
            return Err(Error::Config("velocity_capacity must be positive".into()));
        }

        let learner = &self.learner;
        if learner.history_capacity == 0 || learner.min_samples > learner.history_capacity {
            return Err(Error::Config(
                "learner min_samples must fit inside a non-empty history".into(),
            ));
        }
        if !(0.0..=1.0).contains(&learner.low_percentile)
            || !(0.0..=1.0).contains(&learner.high_percentile)
            || learner.low_percentile >= learner.high_percentile
        {
            return Err(Error::Config("learner percentiles must satisfy 0 <= low < high <= 1".into()));
        }

        let recovery = &self.recovery;
        if recovery.brief_ms <= 0 || recovery.brief_ms > recovery.sustained_ms {
            return Err(Error::Config("recovery windows must satisfy 0 < brief <= sustained".into()));
        }

        Ok(())
    }
}
