//! Session aggregation: running totals over every processed frame.

use chrono::{DateTime, Utc};
use repsense_core::{ExerciseType, Result, SessionId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::metrics::FormMetrics;

/// Longest inter-frame gap credited to active or hold time (ms)
const MAX_CREDITED_GAP_MS: i64 = 1_000;

/// Serializable end-of-session report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub exercise: ExerciseType,
    pub started_at: DateTime<Utc>,
    /// Span between the first and last processed frame
    pub duration_ms: i64,
    pub frames_processed: u64,
    pub frames_analyzed: u64,
    pub reps: u32,
    /// Time spent exercising
    pub active_ms: i64,
    /// Total aligned hold time (plank only)
    pub hold_ms: Option<i64>,
    /// Longest continuous hold (plank only)
    pub longest_hold_ms: Option<i64>,
    /// Mean form score over exercising frames
    pub average_form: Option<f64>,
}

impl SessionSummary {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone)]
pub struct SessionAggregator {
    id: SessionId,
    exercise: ExerciseType,
    started_at: DateTime<Utc>,
    first_frame: Option<Timestamp>,
    last_frame: Option<Timestamp>,
    frames_processed: u64,
    frames_analyzed: u64,
    reps: u32,
    active_ms: i64,
    hold_ms: i64,
    current_hold_ms: i64,
    longest_hold_ms: i64,
    form_total: f64,
    form_frames: u64,
}

impl SessionAggregator {
    pub fn new(exercise: ExerciseType) -> Self {
        Self {
            id: SessionId::new(),
            exercise,
            started_at: Utc::now(),
            first_frame: None,
            last_frame: None,
            frames_processed: 0,
            frames_analyzed: 0,
            reps: 0,
            active_ms: 0,
            hold_ms: 0,
            current_hold_ms: 0,
            longest_hold_ms: 0,
            form_total: 0.0,
            form_frames: 0,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn exercise(&self) -> ExerciseType {
        self.exercise
    }

    /// Account for one processed frame
    pub fn record(&mut self, timestamp: Timestamp, metrics: &FormMetrics, analyzed: bool) {
        let elapsed = self
            .last_frame
            .map(|last| timestamp.millis_since(last).clamp(0, MAX_CREDITED_GAP_MS))
            .unwrap_or(0);

        self.first_frame.get_or_insert(timestamp);
        self.last_frame = Some(timestamp);
        self.frames_processed += 1;
        if analyzed {
            self.frames_analyzed += 1;
        }
        self.reps = self.reps.max(metrics.reps);

        if metrics.is_exercising {
            self.active_ms += elapsed;
            self.form_total += metrics.form_quality;
            self.form_frames += 1;
        }

        if !self.exercise.counts_reps() {
            if metrics.is_exercising {
                self.hold_ms += elapsed;
                self.current_hold_ms += elapsed;
                self.longest_hold_ms = self.longest_hold_ms.max(self.current_hold_ms);
            } else {
                self.current_hold_ms = 0;
            }
        }
    }

    pub fn summary(&self) -> SessionSummary {
        let duration_ms = match (self.first_frame, self.last_frame) {
            (Some(first), Some(last)) => last.millis_since(first),
            _ => 0,
        };
        let is_hold = !self.exercise.counts_reps();

        SessionSummary {
            session_id: self.id,
            exercise: self.exercise,
            started_at: self.started_at,
            duration_ms,
            frames_processed: self.frames_processed,
            frames_analyzed: self.frames_analyzed,
            reps: self.reps,
            active_ms: self.active_ms,
            hold_ms: is_hold.then_some(self.hold_ms),
            longest_hold_ms: is_hold.then_some(self.longest_hold_ms),
            average_form: (self.form_frames > 0).then(|| self.form_total / self.form_frames as f64),
        }
    }
}
