//! Explicit waits.
//!
//! Every wait in the crate goes through [`Waiter::await_condition`]: probe
//! the live page, return the moment the probe is ready, otherwise sleep one
//! poll interval (never past the deadline) and probe again. There are no
//! fixed sleeps standing in for readiness anywhere else.

use crate::config::InteractionConfig;
use crate::driver::{BrowserDriver, DriverError};
use crate::locator::LocatorCandidate;
use crate::result::{WaymarkError, WaymarkResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Bounds for a single wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Maximum time to wait in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self::from_config(&InteractionConfig::default())
    }
}

impl WaitOptions {
    /// Create options with crate defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ordinary wait bounds from a config
    #[must_use]
    pub const fn from_config(config: &InteractionConfig) -> Self {
        Self {
            timeout_ms: config.default_timeout_ms,
            poll_interval_ms: config.poll_interval_ms,
        }
    }

    /// Per-candidate bounds from a config
    #[must_use]
    pub const fn per_candidate(config: &InteractionConfig) -> Self {
        Self {
            timeout_ms: config.candidate_timeout_ms,
            poll_interval_ms: config.poll_interval_ms,
        }
    }

    /// Set timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// =============================================================================
// PROBES
// =============================================================================

/// Result of one probe of the live page
#[derive(Debug)]
pub enum Probe<T> {
    /// Condition satisfied; the wait returns this value
    Ready(T),
    /// Not yet; the reason is logged and the wait continues
    Pending(String),
    /// Can never succeed; the wait stops with this error
    Abort(WaymarkError),
}

/// The wait engine
#[derive(Debug, Clone, Copy, Default)]
pub struct Waiter;

impl Waiter {
    /// Poll `probe` until it is ready, aborts, or `options.timeout` elapses.
    ///
    /// The probe always runs at least once. Sleeps are one poll interval,
    /// clipped to the remaining budget, so a condition that never holds
    /// fails within one interval of the deadline.
    ///
    /// # Errors
    ///
    /// [`WaymarkError::Timeout`] when the deadline passes, or the error a
    /// probe aborted with.
    pub fn await_condition<T, F>(
        description: &str,
        options: &WaitOptions,
        mut probe: F,
    ) -> WaymarkResult<T>
    where
        F: FnMut() -> Probe<T>,
    {
        let start = Instant::now();
        let deadline = start + options.timeout();
        let poll = options.poll_interval();
        let mut polls = 0_u32;

        loop {
            polls += 1;
            match probe() {
                Probe::Ready(value) => {
                    debug!(
                        condition = description,
                        polls,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "condition satisfied"
                    );
                    return Ok(value);
                }
                Probe::Abort(err) => {
                    debug!(condition = description, error = %err, "wait aborted");
                    return Err(err);
                }
                Probe::Pending(reason) => {
                    debug!(condition = description, polls, %reason, "not yet");
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(WaymarkError::timeout(description, options.timeout_ms));
            }
            std::thread::sleep(poll.min(deadline - now));
        }
    }
}

// =============================================================================
// CONDITIONS
// =============================================================================

/// Element-level readiness
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementCondition {
    /// Attached to the document
    Present,
    /// Attached and rendered
    Visible,
    /// Visible and enabled
    Clickable,
    /// Visible text equals the value (after trimming)
    TextEquals(String),
    /// Visible text contains the value
    TextContains(String),
}

impl ElementCondition {
    /// Evaluate against a located element.
    ///
    /// `Ok(None)` means satisfied; `Ok(Some(reason))` means not yet.
    pub fn check<D: BrowserDriver>(
        &self,
        driver: &D,
        element: &D::Element,
    ) -> Result<Option<String>, DriverError> {
        if matches!(self, Self::Present) {
            return Ok(None);
        }
        if !driver.is_displayed(element)? {
            return Ok(Some("present but not displayed".to_string()));
        }
        match self {
            Self::Present | Self::Visible => Ok(None),
            Self::Clickable => Ok((!driver.is_enabled(element)?).then(|| "disabled".to_string())),
            Self::TextEquals(expected) => {
                let text = driver.text(element)?;
                Ok((text.trim() != expected.trim()).then(|| format!("text is {text:?}")))
            }
            Self::TextContains(expected) => {
                let text = driver.text(element)?;
                Ok((!text.contains(expected.as_str())).then(|| format!("text is {text:?}")))
            }
        }
    }
}

impl fmt::Display for ElementCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present => f.write_str("present"),
            Self::Visible => f.write_str("visible"),
            Self::Clickable => f.write_str("clickable"),
            Self::TextEquals(text) => write!(f, "text equals {text:?}"),
            Self::TextContains(text) => write!(f, "text contains {text:?}"),
        }
    }
}

/// URL pattern for page-level conditions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum UrlPattern {
    /// Exact URL match
    Exact(String),
    /// Prefix match
    Prefix(String),
    /// Contains substring
    Contains(String),
    /// Regex match
    Regex(String),
    /// Glob pattern (e.g., "https://*/sign_in/*")
    Glob(String),
    /// Match any URL
    Any,
}

impl UrlPattern {
    /// Check if a URL matches this pattern
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Exact(pattern) => url == pattern,
            Self::Prefix(pattern) => url.starts_with(pattern.as_str()),
            Self::Contains(pattern) => url.contains(pattern.as_str()),
            Self::Regex(pattern) => regex::Regex::new(pattern)
                .map(|re| re.is_match(url))
                .unwrap_or(false),
            Self::Glob(pattern) => glob_matches(pattern, url),
            Self::Any => true,
        }
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(p) => write!(f, "url == {p}"),
            Self::Prefix(p) => write!(f, "url starts with {p}"),
            Self::Contains(p) => write!(f, "url contains {p}"),
            Self::Regex(p) => write!(f, "url matches /{p}/"),
            Self::Glob(p) => write!(f, "url matches {p}"),
            Self::Any => f.write_str("any url"),
        }
    }
}

fn glob_matches(pattern: &str, url: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    let mut pos = 0;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        match url[pos..].find(part) {
            Some(found) if i == 0 && found != 0 => return false,
            Some(found) => pos += found + part.len(),
            None => return false,
        }
    }
    pattern.ends_with('*') || pos == url.len()
}

/// Page-level readiness
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCondition {
    /// Current URL matches the pattern
    UrlMatches(UrlPattern),
}

impl PageCondition {
    /// URL-contains shorthand
    #[must_use]
    pub fn url_contains(fragment: impl Into<String>) -> Self {
        Self::UrlMatches(UrlPattern::Contains(fragment.into()))
    }

    /// Probe the page once
    pub fn probe<D: BrowserDriver>(&self, driver: &D) -> Probe<String> {
        match self {
            Self::UrlMatches(pattern) => match driver.current_url() {
                Ok(url) if pattern.matches(&url) => Probe::Ready(url),
                Ok(url) => Probe::Pending(format!("url is {url}")),
                Err(err) => Probe::Pending(err.to_string()),
            },
        }
    }
}

impl fmt::Display for PageCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UrlMatches(pattern) => pattern.fmt(f),
        }
    }
}

// =============================================================================
// CONVENIENCE FUNCTIONS
// =============================================================================

/// Why one lookup of a candidate did not yield a usable element
#[derive(Debug)]
pub enum ElementMiss {
    /// Nothing matched
    NotFound,
    /// Matched, but `condition` does not hold yet
    ConditionNotMet(String),
    /// The driver failed
    Driver(DriverError),
}

impl ElementMiss {
    /// The poll step this miss amounts to: malformed selectors and other
    /// permanent driver errors abort, everything else keeps waiting
    pub fn into_probe<T>(self) -> Probe<T> {
        match self {
            Self::Driver(err) if err.is_permanent() => Probe::Abort(err.into()),
            miss => Probe::Pending(miss.to_string()),
        }
    }
}

impl fmt::Display for ElementMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => f.write_str("not found"),
            Self::ConditionNotMet(why) => f.write_str(why),
            Self::Driver(err) => err.fmt(f),
        }
    }
}

/// Look `candidate` up once and check `condition` on the match
pub fn inspect_element<D: BrowserDriver>(
    driver: &D,
    candidate: &LocatorCandidate,
    condition: &ElementCondition,
) -> Result<D::Element, ElementMiss> {
    let element = driver
        .find_element(candidate)
        .map_err(ElementMiss::Driver)?
        .ok_or(ElementMiss::NotFound)?;
    match condition.check(driver, &element) {
        Ok(None) => Ok(element),
        Ok(Some(reason)) => Err(ElementMiss::ConditionNotMet(reason)),
        Err(err) => Err(ElementMiss::Driver(err)),
    }
}

/// Probe one candidate once: locate it, then check `condition`.
///
/// Malformed selectors abort; every other driver error is transient.
pub fn probe_element<D: BrowserDriver>(
    driver: &D,
    candidate: &LocatorCandidate,
    condition: &ElementCondition,
) -> Probe<D::Element> {
    match inspect_element(driver, candidate, condition) {
        Ok(element) => Probe::Ready(element),
        Err(miss) => miss.into_probe(),
    }
}

/// Wait until `candidate` locates an element satisfying `condition`
pub fn wait_for_element<D: BrowserDriver>(
    driver: &D,
    candidate: &LocatorCandidate,
    condition: &ElementCondition,
    options: &WaitOptions,
) -> WaymarkResult<D::Element> {
    let description = format!("{candidate} to be {condition}");
    Waiter::await_condition(&description, options, || {
        probe_element(driver, candidate, condition)
    })
}

/// Wait until the current URL matches `pattern`; returns the URL
pub fn wait_for_url<D: BrowserDriver>(
    driver: &D,
    pattern: &UrlPattern,
    options: &WaitOptions,
) -> WaymarkResult<String> {
    let condition = PageCondition::UrlMatches(pattern.clone());
    Waiter::await_condition(&condition.to_string(), options, || condition.probe(driver))
}

// =============================================================================
// TESTS
// =============================================================================
