//! # RepSense-Core
//!
//! Core types and utilities for the RepSense exercise tracking engine.
//!
//! The engine consumes per-frame skeletal landmark estimates produced by an
//! external pose estimator (MediaPipe BlazePose topology, 33 landmarks) and
//! turns them into repetition counts, a form score and corrective feedback.
//! This crate holds everything the analysis layer builds on:
//!
//! - **types**: landmarks, pose frames, timestamps and exercise identifiers
//! - **geometry**: joint angles and body-alignment measurements
//! - **quality**: per-frame detection quality and tracking diagnostics
//! - **settings**: tunable thresholds, one profile table per exercise

pub mod error;
pub mod geometry;
pub mod quality;
pub mod settings;
pub mod types;

pub use error::{Error, Result};
pub use geometry::*;
pub use quality::*;
pub use settings::*;
pub use types::*;
