//! # RepSense-Engine
//!
//! Frame-driven exercise analysis: turns a stream of pose frames into
//! repetition counts, a form score and corrective feedback.
//!
//! ## Per-frame pipeline
//!
//! 1. **Quality gate**: frames that are empty or poorly detected are never
//!    analyzed; they only start (or extend) a detection gap
//! 2. **Recovery**: when detection returns, the gap length decides how much
//!    session state survives (brief / medium / sustained)
//! 3. **Classification**: the selected exercise measures its joint angles and
//!    alignment, checks the subject is in position and grades form
//! 4. **State machine**: a shared neutral → down → up cycle with cooldown,
//!    stability and movement-range guards counts repetitions
//! 5. **Threshold learning**: the primary angle feeds a rolling history that
//!    personalizes the down/up thresholds
//! 6. **Aggregation**: reps, active time and form are accumulated per session
//!
//! The engine is synchronous and owns no clock: every timing decision is
//! made from the frame timestamps supplied by the caller.

pub mod analyzer;
pub mod engine;
pub mod exercise;
pub mod feedback;
pub mod metrics;
pub mod recovery;
pub mod session;
pub mod state;
pub mod state_machine;
pub mod thresholds;
pub mod window;

#[cfg(test)]
mod testing;

pub use analyzer::*;
pub use engine::*;
pub use exercise::*;
pub use feedback::*;
pub use metrics::*;
pub use recovery::*;
pub use session::*;
pub use state::*;
pub use state_machine::*;
pub use thresholds::*;
pub use window::*;
