//! Interaction configuration shared by the wait engine, the resolver, the
//! action executor and the intervention gate.

use crate::result::{WaymarkError, WaymarkResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default bound for ordinary waits (10 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Default polling interval (100ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Default per-candidate bound inside a cascade (2 seconds)
pub const DEFAULT_CANDIDATE_TIMEOUT_MS: u64 = 2_000;

/// Default animation-settle allowance after scrolling (500ms)
pub const DEFAULT_SCROLL_SETTLE_MS: u64 = 500;

/// Default bound for the operator signal (60 seconds)
pub const DEFAULT_INTERVENTION_TIMEOUT_SECS: u64 = 60;

/// Configuration recognised by the interaction core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Wait bound for ordinary conditions
    pub default_timeout_ms: u64,
    /// Polling granularity for every wait
    pub poll_interval_ms: u64,
    /// Wait bound for each candidate inside a cascade
    pub candidate_timeout_ms: u64,
    /// Fixed pause after scroll-into-view so smooth scrolling and CSS
    /// transitions finish before the pointer event is dispatched
    pub scroll_settle_ms: u64,
    /// Whether the intervention gate waits for an operator or fails fast
    pub allow_manual_intervention: bool,
    /// Bound for the operator signal wait
    pub intervention_timeout_secs: u64,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            candidate_timeout_ms: DEFAULT_CANDIDATE_TIMEOUT_MS,
            scroll_settle_ms: DEFAULT_SCROLL_SETTLE_MS,
            allow_manual_intervention: false,
            intervention_timeout_secs: DEFAULT_INTERVENTION_TIMEOUT_SECS,
        }
    }
}

impl InteractionConfig {
    /// Create a config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default wait timeout
    #[must_use]
    pub const fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the polling interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set the per-candidate timeout
    #[must_use]
    pub const fn with_candidate_timeout(mut self, timeout: Duration) -> Self {
        self.candidate_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the scroll settle delay
    #[must_use]
    pub const fn with_scroll_settle(mut self, settle: Duration) -> Self {
        self.scroll_settle_ms = settle.as_millis() as u64;
        self
    }

    /// Enable or disable the manual intervention gate
    #[must_use]
    pub const fn with_manual_intervention(mut self, allow: bool) -> Self {
        self.allow_manual_intervention = allow;
        self
    }

    /// Set the operator signal bound
    #[must_use]
    pub const fn with_intervention_timeout(mut self, timeout: Duration) -> Self {
        self.intervention_timeout_secs = timeout.as_secs();
        self
    }

    /// Settings tuned for unit tests: short bounds, fast polling, no settle
    #[must_use]
    pub const fn fast() -> Self {
        Self {
            default_timeout_ms: 200,
            poll_interval_ms: 5,
            candidate_timeout_ms: 40,
            scroll_settle_ms: 0,
            allow_manual_intervention: false,
            intervention_timeout_secs: 1,
        }
    }

    /// Default wait timeout as a `Duration`
    #[must_use]
    pub const fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    /// Polling interval as a `Duration`
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Per-candidate timeout as a `Duration`
    #[must_use]
    pub const fn candidate_timeout(&self) -> Duration {
        Duration::from_millis(self.candidate_timeout_ms)
    }

    /// Scroll settle delay as a `Duration`
    #[must_use]
    pub const fn scroll_settle(&self) -> Duration {
        Duration::from_millis(self.scroll_settle_ms)
    }

    /// Operator signal bound as a `Duration`
    #[must_use]
    pub const fn intervention_timeout(&self) -> Duration {
        Duration::from_secs(self.intervention_timeout_secs)
    }

    /// Check internal consistency
    ///
    /// # Errors
    ///
    /// Returns [`WaymarkError::Config`] when a bound is zero or the poll
    /// interval exceeds a timeout it is supposed to subdivide.
    pub fn validate(&self) -> WaymarkResult<()> {
        if self.poll_interval_ms == 0 {
            return Err(WaymarkError::config("poll_interval_ms must be greater than zero"));
        }
        if self.default_timeout_ms == 0 || self.candidate_timeout_ms == 0 {
            return Err(WaymarkError::config("wait timeouts must be greater than zero"));
        }
        if self.poll_interval_ms > self.candidate_timeout_ms {
            return Err(WaymarkError::config(format!(
                "poll_interval_ms ({}) exceeds candidate_timeout_ms ({})",
                self.poll_interval_ms, self.candidate_timeout_ms
            )));
        }
        if self.candidate_timeout_ms > self.default_timeout_ms {
            return Err(WaymarkError::config(format!(
                "candidate_timeout_ms ({}) exceeds default_timeout_ms ({})",
                self.candidate_timeout_ms, self.default_timeout_ms
            )));
        }
        if self.allow_manual_intervention && self.intervention_timeout_secs == 0 {
            return Err(WaymarkError::config(
                "intervention_timeout_secs must be greater than zero when manual intervention is allowed",
            ));
        }
        Ok(())
    }

    /// Parse a YAML document
    pub fn from_yaml_str(yaml: &str) -> WaymarkResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON document
    pub fn from_json_str(json: &str) -> WaymarkResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file; `.json` files are parsed as JSON, everything else
    /// as YAML
    pub fn load(path: impl AsRef<Path>) -> WaymarkResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_yaml_str(&content),
        }
    }

    /// Render as YAML
    pub fn to_yaml(&self) -> WaymarkResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }
}
