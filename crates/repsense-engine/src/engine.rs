//! Frame-driven workout engine.
//!
//! [`WorkoutEngine`] is the single per-frame entry point. It owns the quality
//! assessor, the recovery policy, the selected exercise classifier, the
//! session state and the session aggregator, and wires them together for
//! each incoming [`PoseFrame`]. It never blocks and never fails per frame.

use parking_lot::Mutex;
use repsense_core::{
    EngineConfig, ExerciseType, PoseFrame, QualityAssessor, QualityReport, Result, Timestamp,
    TrackingStatus,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::analyzer::analyze_frame;
use crate::exercise::{classifier_for, ExerciseClassifier};
use crate::feedback::FeedbackItem;
use crate::metrics::FormMetrics;
use crate::recovery::{RecoveryAction, RecoveryPolicy};
use crate::session::{SessionAggregator, SessionSummary};
use crate::state::SessionState;
use crate::state_machine::Phase;
use crate::thresholds::ThresholdPair;

const FALLBACK_GUIDANCE: &str = "Make sure your whole body is clearly visible";

/// Everything produced for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameOutput {
    pub timestamp: Timestamp,
    pub quality: QualityReport,
    pub metrics: FormMetrics,
    pub feedback: Vec<FeedbackItem>,
    /// Raised for a short period after each counted rep
    pub rep_pulse: bool,
    /// Set on the first analyzable frame after a detection loss
    pub recovery: Option<RecoveryAction>,
}

pub struct WorkoutEngine {
    config: EngineConfig,
    assessor: QualityAssessor,
    recovery: RecoveryPolicy,
    classifier: Box<dyn ExerciseClassifier>,
    state: SessionState,
    session: SessionAggregator,
    active: bool,
    metrics: FormMetrics,
    feedback: Vec<FeedbackItem>,
    rep_pulse: bool,
}

impl WorkoutEngine {
    /// Validate `config` and start an active session for `exercise`
    pub fn new(config: EngineConfig, exercise: ExerciseType) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, exercise))
    }

    pub fn with_defaults(exercise: ExerciseType) -> Self {
        Self::build(EngineConfig::default(), exercise)
    }

    fn build(config: EngineConfig, exercise: ExerciseType) -> Self {
        let session = SessionAggregator::new(exercise);
        info!(session_id = ?session.id(), exercise = %exercise, "Workout session started");

        Self {
            assessor: QualityAssessor::new(config.quality.clone()),
            recovery: RecoveryPolicy::new(config.recovery.clone()),
            classifier: classifier_for(exercise),
            state: SessionState::new(exercise, &config),
            session,
            active: true,
            metrics: FormMetrics::default(),
            feedback: Vec::new(),
            rep_pulse: false,
            config,
        }
    }

    /// Begin a fresh active session, discarding all previous state
    pub fn start(&mut self, exercise: ExerciseType) {
        self.reset(exercise);
        self.active = true;
        info!(session_id = ?self.session.id(), exercise = %exercise, "Workout session started");
    }

    /// Switch exercise. All session state, including learned thresholds, is
    /// dropped; selecting the current exercise again is a no-op.
    pub fn set_exercise(&mut self, exercise: ExerciseType) {
        if exercise == self.state.exercise {
            return;
        }
        info!(
            from = %self.state.exercise,
            to = %exercise,
            reps = self.state.machine.reps(),
            "Switching exercise"
        );
        self.reset(exercise);
    }

    /// Pause or resume analysis. Deactivating resets the session state.
    pub fn set_active(&mut self, active: bool) {
        if self.active == active {
            return;
        }
        if !active {
            info!(exercise = %self.state.exercise, reps = self.state.machine.reps(), "Workout paused");
            self.reset(self.state.exercise);
        }
        self.active = active;
    }

    fn reset(&mut self, exercise: ExerciseType) {
        self.classifier = classifier_for(exercise);
        self.state.reset(exercise, &self.config);
        self.session = SessionAggregator::new(exercise);
        self.metrics = FormMetrics::default();
        self.feedback.clear();
        self.rep_pulse = false;
    }

    /// Analyze one frame
    pub fn process_frame(&mut self, frame: &PoseFrame) -> FrameOutput {
        let now = frame.timestamp;
        let quality = self.assessor.assess(frame);

        if !self.active {
            return FrameOutput {
                timestamp: now,
                quality,
                metrics: FormMetrics::default(),
                feedback: Vec::new(),
                rep_pulse: false,
                recovery: None,
            };
        }

        let mut recovery = None;
        let (metrics, feedback) = if quality.is_analyzable() {
            let cooldown_ms = self.config.profile(self.state.exercise).cooldown_ms;
            recovery = self.recovery.apply(&mut self.state, now, cooldown_ms);

            let analysis = analyze_frame(self.classifier.as_ref(), frame, &mut self.state, &self.config);

            let mut feedback = Vec::with_capacity(analysis.feedback.len() + 1);
            if let Some(hint) = quality.tracking_status.guidance() {
                feedback.push(FeedbackItem::warning(hint));
            }
            feedback.extend(analysis.feedback);
            (analysis.metrics, feedback)
        } else {
            if !self.state.is_lost() {
                debug!(
                    status = ?quality.tracking_status,
                    completeness = quality.completeness,
                    confidence = quality.confidence,
                    "Detection lost"
                );
            }
            self.recovery.mark_lost(&mut self.state, now);

            let hint = quality.tracking_status.guidance().unwrap_or(FALLBACK_GUIDANCE);
            let item = if quality.tracking_status == TrackingStatus::Lost {
                FeedbackItem::error(hint)
            } else {
                FeedbackItem::warning(hint)
            };
            (
                FormMetrics::idle(self.state.machine.reps(), self.state.machine.phase()),
                vec![item],
            )
        };

        self.session.record(now, &metrics, quality.is_analyzable());
        self.rep_pulse = self.state.rep_pulse(now);
        self.metrics = metrics;
        self.feedback = feedback;

        FrameOutput {
            timestamp: now,
            quality,
            metrics,
            feedback: self.feedback.clone(),
            rep_pulse: self.rep_pulse,
            recovery,
        }
    }

    /// Metrics of the latest frame
    pub fn metrics(&self) -> &FormMetrics {
        &self.metrics
    }

    /// Feedback of the latest frame
    pub fn feedback(&self) -> &[FeedbackItem] {
        &self.feedback
    }

    pub fn rep_pulse(&self) -> bool {
        self.rep_pulse
    }

    pub fn phase(&self) -> Phase {
        self.state.machine.phase()
    }

    pub fn reps(&self) -> u32 {
        self.state.machine.reps()
    }

    pub fn exercise(&self) -> ExerciseType {
        self.state.exercise
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Thresholds currently driving the state machine
    pub fn thresholds(&self) -> ThresholdPair {
        self.state.learner.get(self.state.exercise)
    }

    pub fn window_len(&self) -> usize {
        self.state.window.len()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionAggregator {
        &self.session
    }

    pub fn summary(&self) -> SessionSummary {
        self.session.summary()
    }

    /// Finish the current session and deactivate.
    ///
    /// Returns `None` when no session was active.
    pub fn end_session(&mut self) -> Option<SessionSummary> {
        if !self.active {
            return None;
        }
        let summary = self.session.summary();
        info!(
            session_id = ?summary.session_id,
            exercise = %summary.exercise,
            reps = summary.reps,
            active_ms = summary.active_ms,
            "Workout session ended"
        );
        self.reset(self.state.exercise);
        self.active = false;
        Some(summary)
    }
}

/// Engine shared between frame producers.
///
/// Every call takes the lock for its full duration, so frames are analyzed
/// one at a time and the engine is never re-entered.
#[derive(Clone)]
pub struct SharedEngine {
    inner: Arc<Mutex<WorkoutEngine>>,
}

impl SharedEngine {
    pub fn new(engine: WorkoutEngine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    pub fn process_frame(&self, frame: &PoseFrame) -> FrameOutput {
        self.inner.lock().process_frame(frame)
    }

    pub fn set_exercise(&self, exercise: ExerciseType) {
        self.inner.lock().set_exercise(exercise);
    }

    pub fn set_active(&self, active: bool) {
        self.inner.lock().set_active(active);
    }

    pub fn metrics(&self) -> FormMetrics {
        *self.inner.lock().metrics()
    }

    pub fn feedback(&self) -> Vec<FeedbackItem> {
        self.inner.lock().feedback().to_vec()
    }

    pub fn rep_pulse(&self) -> bool {
        self.inner.lock().rep_pulse()
    }

    pub fn summary(&self) -> SessionSummary {
        self.inner.lock().summary()
    }

    pub fn end_session(&self) -> Option<SessionSummary> {
        self.inner.lock().end_session()
    }

    /// Run `f` with exclusive access to the engine
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut WorkoutEngine) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::Severity;
    use crate::recovery::LossSeverity;
    use crate::testing::{plank_frame, poor_frame, pushup_frame, squat_frame};
    use repsense_core::DetectionQuality;

    fn feed(engine: &mut WorkoutEngine, angle: f64, start_ms: i64, frames: i64) -> Vec<FrameOutput> {
        (0..frames)
            .map(|i| engine.process_frame(&squat_frame(angle, start_ms + i * 20)))
            .collect()
    }

    fn empty(ms: i64) -> PoseFrame {
        PoseFrame::empty(Timestamp::from_millis(ms))
    }

    /// Squat engine that has just entered the down phase
    fn squat_in_down() -> WorkoutEngine {
        let mut engine = WorkoutEngine::with_defaults(ExerciseType::Squat);
        feed(&mut engine, 170.0, 0, 5);
        feed(&mut engine, 80.0, 400, 5);
        assert_eq!(engine.phase(), Phase::Down);
        engine
    }

    /// Continuous cosine motion from the top position at 30 fps, then one
    /// second held at the top
    fn tempo(
        engine: &mut WorkoutEngine,
        frame: fn(f64, i64) -> PoseFrame,
        (mid, amplitude): (f64, f64),
        period_ms: i64,
        cycles: i64,
    ) -> Vec<FrameOutput> {
        let end = period_ms * cycles;
        let moving = (0..end).step_by(33).map(|ms| {
            let phase = ms as f64 / period_ms as f64 * std::f64::consts::TAU;
            (mid + amplitude * phase.cos(), ms)
        });
        let held = (0..30).map(|i| (mid + amplitude, end + i * 33));

        moving
            .chain(held)
            .map(|(angle, ms)| engine.process_frame(&frame(angle, ms)))
            .collect()
    }

    /// Three empty frames starting at 500 ms, then one frame at `resume_ms`
    fn occlude(engine: &mut WorkoutEngine, resume_ms: i64) -> FrameOutput {
        for ms in [500, 533, 566] {
            let out = engine.process_frame(&empty(ms));
            assert!(!out.metrics.is_exercising);
            assert_eq!(out.metrics.form_quality, 0.0);
        }
        engine.process_frame(&squat_frame(130.0, resume_ms))
    }

    #[test]
    fn test_squat_scenario() {
        let mut engine = WorkoutEngine::with_defaults(ExerciseType::Squat);

        let standing = feed(&mut engine, 170.0, 0, 5);
        assert!(standing.iter().all(|o| !o.metrics.is_exercising));

        let down = feed(&mut engine, 80.0, 400, 5);
        assert!(down.iter().all(|o| o.metrics.is_exercising));
        assert!(down.iter().all(|o| o.quality.detection_quality == DetectionQuality::Excellent));

        let up = feed(&mut engine, 170.0, 800, 5);
        assert_eq!(engine.reps(), 1);
        assert!(up.iter().any(|o| o.rep_pulse));
        assert!(engine.rep_pulse());
        assert_eq!(engine.metrics().reps, 1);
        assert_eq!(engine.summary().reps, 1);
    }

    #[test]
    fn test_continuous_tempo_counts_every_rep() {
        let cases: [(ExerciseType, fn(f64, i64) -> PoseFrame, (f64, f64)); 2] = [
            (ExerciseType::Squat, squat_frame, (125.0, 45.0)),
            (ExerciseType::PushUp, pushup_frame, (120.0, 45.0)),
        ];

        for (exercise, frame, motion) in cases {
            for period_ms in [1_500, 2_000, 3_000] {
                let mut engine = WorkoutEngine::with_defaults(exercise);
                let outputs = tempo(&mut engine, frame, motion, period_ms, 3);

                assert_eq!(engine.reps(), 3, "{exercise} at {period_ms} ms per rep");
                assert_eq!(engine.summary().reps, 3);
                assert_eq!(engine.phase(), Phase::Up);
                assert!(outputs.iter().all(|o| o.quality.is_analyzable()));
            }
        }
    }

    #[test]
    fn test_continuous_tempo_rep_spacing() {
        let mut engine = WorkoutEngine::with_defaults(ExerciseType::Squat);
        let cooldown_ms = engine.config().profile(ExerciseType::Squat).cooldown_ms;
        let outputs = tempo(&mut engine, squat_frame, (125.0, 45.0), 1_500, 5);

        let mut previous = 0;
        let mut rep_times = Vec::new();
        for out in &outputs {
            let reps = out.metrics.reps;
            assert!(reps >= previous);
            assert!(reps - previous <= 1);
            if reps > previous {
                assert!(out.rep_pulse);
                rep_times.push(out.timestamp);
            }
            previous = reps;
        }

        assert_eq!(rep_times.len(), 5);
        for pair in rep_times.windows(2) {
            assert!(pair[1].millis_since(pair[0]) > cooldown_ms);
        }
    }

    #[test]
    fn test_brief_occlusion_preserves_phase() {
        let mut engine = squat_in_down();
        let out = occlude(&mut engine, 2_000);

        let action = out.recovery.unwrap();
        assert_eq!(action.severity, LossSeverity::Brief);
        assert_eq!(action.gap_ms, 1_500);
        assert_eq!(engine.phase(), Phase::Down);
        // Two samples survive, plus the resuming frame
        assert_eq!(engine.window_len(), 3);

        // The rep completes once the remaining cooldown has passed
        feed(&mut engine, 170.0, 2_600, 5);
        assert_eq!(engine.reps(), 1);
    }

    #[test]
    fn test_medium_occlusion_returns_to_neutral() {
        let mut engine = squat_in_down();
        let out = occlude(&mut engine, 3_500);

        assert_eq!(out.recovery.unwrap().severity, LossSeverity::Medium);
        assert_eq!(engine.phase(), Phase::Neutral);
        assert_eq!(engine.window_len(), 2);
    }

    #[test]
    fn test_sustained_absence_resets() {
        let mut engine = squat_in_down();
        let out = occlude(&mut engine, 6_500);

        assert_eq!(out.recovery.unwrap().severity, LossSeverity::Sustained);
        assert_eq!(engine.phase(), Phase::Neutral);
        // Cleared, then the resuming frame
        assert_eq!(engine.window_len(), 1);
    }

    #[test]
    fn test_poor_quality_is_gated() {
        let mut engine = squat_in_down();
        let out = engine.process_frame(&poor_frame(600));

        assert_eq!(out.quality.detection_quality, DetectionQuality::Poor);
        assert!(!out.metrics.is_exercising);
        assert_eq!(out.metrics.form_quality, 0.0);
        assert_eq!(out.feedback[0].severity, Severity::Error);
        // Non-analyzable frames never reach the window
        assert_eq!(engine.window_len(), 10);

        let summary = engine.summary();
        assert_eq!(summary.frames_processed, 11);
        assert_eq!(summary.frames_analyzed, 10);
    }

    #[test]
    fn test_switching_exercise_clears_state() {
        let mut engine = WorkoutEngine::with_defaults(ExerciseType::Squat);
        feed(&mut engine, 170.0, 0, 5);
        feed(&mut engine, 80.0, 400, 5);
        feed(&mut engine, 170.0, 800, 5);
        assert_eq!(engine.reps(), 1);

        engine.set_exercise(ExerciseType::Squat);
        assert_eq!(engine.reps(), 1);

        engine.set_exercise(ExerciseType::Plank);
        assert_eq!(engine.exercise(), ExerciseType::Plank);
        assert_eq!(engine.reps(), 0);
        assert_eq!(engine.window_len(), 0);
        assert_eq!(engine.phase(), Phase::Neutral);
        assert_eq!(engine.thresholds(), ThresholdPair::new(150.0, 170.0));

        let out = engine.process_frame(&plank_frame(175.0, 2_000));
        assert_eq!(out.metrics.current_angles.body_line.map(f64::round), Some(175.0));
    }

    #[test]
    fn test_inactive_engine_is_idle() {
        let mut engine = squat_in_down();
        engine.set_active(false);
        assert_eq!(engine.phase(), Phase::Neutral);

        let out = engine.process_frame(&squat_frame(80.0, 1_000));
        assert_eq!(out.metrics, FormMetrics::default());
        assert!(out.feedback.is_empty());
        assert_eq!(engine.window_len(), 0);

        engine.set_active(true);
        engine.process_frame(&squat_frame(80.0, 1_100));
        assert_eq!(engine.phase(), Phase::Down);
    }

    #[test]
    fn test_end_session_summary() {
        let mut engine = WorkoutEngine::with_defaults(ExerciseType::Squat);
        feed(&mut engine, 170.0, 0, 5);
        feed(&mut engine, 80.0, 400, 5);
        feed(&mut engine, 170.0, 800, 5);

        let summary = engine.end_session().unwrap();
        assert_eq!(summary.reps, 1);
        assert_eq!(summary.frames_processed, 15);
        assert!(summary.active_ms > 0);
        assert!(!engine.is_active());
        assert!(engine.end_session().is_none());

        engine.start(ExerciseType::PushUp);
        assert!(engine.is_active());
        assert_eq!(engine.summary().frames_processed, 0);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = EngineConfig::default();
        config.window_capacity = 2;
        assert!(WorkoutEngine::new(config, ExerciseType::Squat).is_err());
    }

    #[test]
    fn test_shared_engine_serializes_producers() {
        let shared = SharedEngine::new(WorkoutEngine::with_defaults(ExerciseType::Squat));

        std::thread::scope(|scope| {
            for producer in 0..4 {
                let shared = shared.clone();
                scope.spawn(move || {
                    for i in 0..25 {
                        shared.process_frame(&squat_frame(170.0, producer * 10_000 + i * 33));
                    }
                });
            }
        });

        assert_eq!(shared.summary().frames_processed, 100);
        assert!(!shared.metrics().is_exercising);
        assert_eq!(shared.with_engine(|engine| engine.reps()), 0);
    }
}
