use serde::{Deserialize, Serialize};
use std::fmt;

/// Stage of an analysis in which an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Loading,
    Discovery,
    Extraction,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Loading => "loading",
            Phase::Discovery => "discovery",
            Phase::Extraction => "extraction",
        };
        f.write_str(s)
    }
}

#[derive(thiserror::Error, Debug, Clone)]
pub enum DriverError {
    // ============================================================
    // Navigation Errors
    // ============================================================
    #[error("{message}")]
    Load { phase: Phase, message: String },

    #[error("Navigation failed: {0}")]
    Navigation(String),

    // ============================================================
    // Execution Errors
    // ============================================================
    #[error("Script execution error: {0}")]
    Script(String),

    #[error("Timeout: {operation}")]
    Timeout { operation: String },

    #[error("Listener extraction failed: {0}")]
    Extraction(String),

    // ============================================================
    // System Errors
    // ============================================================
    #[error("Browser launch failed: {0}")]
    Launch(String),

    #[error("Not ready")]
    NotReady,

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Other: {0}")]
    Other(String),
}

impl From<std::io::Error> for DriverError {
    fn from(err: std::io::Error) -> Self {
        DriverError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for DriverError {
    fn from(err: serde_json::Error) -> Self {
        DriverError::Serialization(err.to_string())
    }
}

impl DriverError {
    /// Build a loading-phase error, the shape used for navigation failures.
    pub fn load(message: impl Into<String>) -> Self {
        DriverError::Load {
            phase: Phase::Loading,
            message: message.into(),
        }
    }

    /// The analysis phase this error is reported under when it aborts a run.
    pub fn phase(&self) -> Phase {
        match self {
            DriverError::Load { phase, .. } => *phase,
            DriverError::Navigation(_) => Phase::Loading,
            DriverError::Extraction(_) => Phase::Extraction,
            _ => Phase::Discovery,
        }
    }
}
