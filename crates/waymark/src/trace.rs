//! Interaction trace.
//!
//! An ordered record of every strategy tried, every fallback taken and every
//! intervention request made during a run. The same events are emitted
//! through `tracing`; the trace is the structured copy that survives the run
//! and can be written to JSON for post-mortem inspection.

use crate::locator::LocatorCandidate;
use crate::result::WaymarkResult;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::{Instant, SystemTime};
use uuid::Uuid;

/// What happened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceKind {
    /// A standalone lookup resolved on this candidate (actions record
    /// [`TraceKind::ActionSucceeded`] instead)
    Resolved,
    /// A candidate failed inside a cascade
    CandidateFailed {
        /// Failure reason
        reason: String,
    },
    /// Scroll-into-view script ran
    Scrolled,
    /// Native click dispatched
    NativeClick,
    /// Native click did not register
    NativeClickFailed {
        /// Failure reason
        reason: String,
    },
    /// Script-injected click dispatched
    ScriptClick,
    /// Script-injected click did not register
    ScriptClickFailed {
        /// Failure reason
        reason: String,
    },
    /// Text typed into the element
    Typed {
        /// Number of characters typed
        chars: usize,
    },
    /// Action finished on this candidate
    ActionSucceeded {
        /// `native` or `script`
        method: String,
    },
    /// Action failed on every candidate
    ActionFailed {
        /// Summary
        reason: String,
    },
    /// Document replaced by an explicit navigation
    Navigated {
        /// Target URL
        url: String,
    },
    /// Flow suspended for an operator
    InterventionRequested {
        /// Obstacle description
        description: String,
        /// Wait bound in seconds
        max_wait_secs: u64,
    },
    /// Operator signalled in time
    InterventionSignaled,
    /// Operator did not signal in time
    InterventionTimedOut,
    /// Gate disabled; request answered immediately
    InterventionSkipped,
}

impl TraceKind {
    /// Whether this entry records a failure
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::CandidateFailed { .. }
                | Self::NativeClickFailed { .. }
                | Self::ScriptClickFailed { .. }
                | Self::ActionFailed { .. }
                | Self::InterventionTimedOut
        )
    }

    /// Whether this entry records a success
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(
            self,
            Self::Resolved | Self::ActionSucceeded { .. } | Self::InterventionSignaled
        )
    }
}

/// One trace record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Milliseconds since the trace started
    pub timestamp_ms: u64,
    /// Logical element (or obstacle) name
    pub element: String,
    /// Candidate index, when the event concerns one candidate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_index: Option<usize>,
    /// Candidate description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate: Option<String>,
    /// Event
    #[serde(flatten)]
    pub kind: TraceKind,
}

/// Ordered interaction trace for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionTrace {
    /// Unique run id
    pub run_id: String,
    /// Scenario or session label
    pub label: String,
    /// Wall-clock start
    pub started_at: SystemTime,
    #[serde(skip, default = "Instant::now")]
    clock: Instant,
    entries: Vec<TraceEntry>,
}

impl Default for InteractionTrace {
    fn default() -> Self {
        Self::new("session")
    }
}

impl InteractionTrace {
    /// Start a new trace
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            label: label.into(),
            started_at: SystemTime::now(),
            clock: Instant::now(),
            entries: Vec::new(),
        }
    }

    /// Append an entry not tied to a candidate
    pub fn record(&mut self, element: &str, kind: TraceKind) {
        self.push(element, None, kind);
    }

    /// Append an entry for one candidate
    pub fn record_candidate(
        &mut self,
        element: &str,
        index: usize,
        candidate: &LocatorCandidate,
        kind: TraceKind,
    ) {
        self.push(element, Some((index, candidate.to_string())), kind);
    }

    fn push(&mut self, element: &str, candidate: Option<(usize, String)>, kind: TraceKind) {
        let (candidate_index, candidate) = match candidate {
            Some((index, text)) => (Some(index), Some(text)),
            None => (None, None),
        };
        self.entries.push(TraceEntry {
            timestamp_ms: self.clock.elapsed().as_millis() as u64,
            element: element.to_string(),
            candidate_index,
            candidate,
            kind,
        });
    }

    /// All entries in order
    #[must_use]
    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Failure entries in order
    #[must_use]
    pub fn failures(&self) -> Vec<&TraceEntry> {
        self.entries.iter().filter(|e| e.kind.is_failure()).collect()
    }

    /// Success entries in order
    #[must_use]
    pub fn successes(&self) -> Vec<&TraceEntry> {
        self.entries.iter().filter(|e| e.kind.is_success()).collect()
    }

    /// Entries for one logical element
    #[must_use]
    pub fn entries_for(&self, element: &str) -> Vec<&TraceEntry> {
        self.entries.iter().filter(|e| e.element == element).collect()
    }

    /// Save trace to a JSON file
    pub fn save_json(&self, path: &Path) -> WaymarkResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, json)?;
        Ok(())
    }

    /// Load trace from a JSON file
    pub fn load_json(path: &Path) -> WaymarkResult<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}
