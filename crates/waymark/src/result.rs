//! Result and error types for Waymark.

use crate::driver::DriverError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for Waymark operations
pub type WaymarkResult<T> = Result<T, WaymarkError>;

/// Why a single locator candidate did not produce a usable element.
///
/// Recorded per candidate by the resolver and the action executor, and
/// carried (in candidate order) by the aggregate errors below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateFailure {
    /// Position of the candidate in its logical element
    pub index: usize,
    /// Human-readable description of the candidate (strategy + selector)
    pub candidate: String,
    /// Failure reason
    pub reason: String,
}

impl CandidateFailure {
    /// Create a new candidate failure
    #[must_use]
    pub fn new(index: usize, candidate: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            index,
            candidate: candidate.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for CandidateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}: {}", self.index + 1, self.candidate, self.reason)
    }
}

fn join_failures(failures: &[CandidateFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors that can occur in Waymark
#[derive(Debug, Error)]
pub enum WaymarkError {
    /// A single wait exceeded its bound
    #[error("Timed out after {ms}ms waiting for {description}")]
    Timeout {
        /// What was being waited for
        description: String,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Every locator strategy for a logical element failed
    #[error("All {} candidates for '{element}' exhausted: {}", failures.len(), join_failures(failures))]
    AllCandidatesExhausted {
        /// Logical element name
        element: String,
        /// One entry per candidate, in candidate order
        failures: Vec<CandidateFailure>,
    },

    /// An element resolved but neither the native nor the script path worked
    #[error("Action on '{element}' failed: {}", join_failures(reasons))]
    ActionFailed {
        /// Logical element name
        element: String,
        /// Per-candidate interaction failures
        reasons: Vec<CandidateFailure>,
    },

    /// Operator signal not received in time
    #[error("No operator signal for '{description}' within {seconds}s")]
    InterventionTimeout {
        /// Obstacle description
        description: String,
        /// Wait bound in seconds
        seconds: u64,
    },

    /// Post-condition URL mismatch
    #[error("Not on expected page: expected {expected}, actual {actual}")]
    NotOnExpectedPage {
        /// Expected URL pattern
        expected: String,
        /// Actual URL
        actual: String,
    },

    /// A logical element was declared without candidates
    #[error("Logical element '{element}' has no locator candidates")]
    EmptyCandidates {
        /// Logical element name
        element: String,
    },

    /// An element handle outlived the page it was resolved on
    #[error("Element handle for '{element}' is stale (page changed since it was resolved)")]
    StaleElement {
        /// Logical element name
        element: String,
    },

    /// Browser driver error
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Intervention listener could not be started
    #[error("Intervention gate error: {message}")]
    Intervention {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl WaymarkError {
    /// Create a timeout error
    #[must_use]
    pub fn timeout(description: impl Into<String>, ms: u64) -> Self {
        Self::Timeout {
            description: description.into(),
            ms,
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Per-candidate failures carried by this error, if any
    #[must_use]
    pub fn candidate_failures(&self) -> &[CandidateFailure] {
        match self {
            Self::AllCandidatesExhausted { failures, .. } => failures,
            Self::ActionFailed { reasons, .. } => reasons,
            _ => &[],
        }
    }

    /// Whether this is a timeout of any kind
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::InterventionTimeout { .. })
    }
}
