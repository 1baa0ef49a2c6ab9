//! User-facing feedback items.
//!
//! Feedback is regenerated from scratch for every frame and only reflects
//! the current frame's assessment.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Warning,
    Error,
}

impl Severity {
    /// Default icon identifier for the UI layer
    pub fn icon(&self) -> &'static str {
        match self {
            Severity::Success => "check-circle",
            Severity::Warning => "alert-triangle",
            Severity::Error => "x-circle",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackItem {
    pub severity: Severity,
    pub message: String,
    pub icon: String,
}

impl FeedbackItem {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            icon: severity.icon().to_string(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Severity::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }
}
