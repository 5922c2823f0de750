//! Cascading locator resolution.
//!
//! Tries a logical element's candidates strictly in declared order, each
//! under its own short wait, and returns the first one that satisfies the
//! requested condition. Candidates after the winner are never queried.
//! Resolution only reads the page: lookups, visibility and text.

use crate::config::InteractionConfig;
use crate::driver::{BrowserDriver, DriverError, ElementHandle};
use crate::locator::{LocatorCandidate, LogicalElement};
use crate::result::{CandidateFailure, WaymarkError, WaymarkResult};
use crate::wait::{inspect_element, ElementCondition, ElementMiss, Probe, WaitOptions, Waiter};
use std::fmt;
use tracing::{info, warn};

/// Why one candidate did not resolve
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Nothing matched within the candidate's wait
    NotFound,
    /// Matched, but the condition never held
    ConditionNotMet(String),
    /// Selector rejected by the browser
    InvalidSelector(String),
    /// Driver kept failing
    Driver(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => f.write_str("not found"),
            Self::ConditionNotMet(why) => write!(f, "condition not met ({why})"),
            Self::InvalidSelector(why) => write!(f, "invalid selector ({why})"),
            Self::Driver(why) => write!(f, "driver error ({why})"),
        }
    }
}

impl From<&ElementMiss> for FailureReason {
    fn from(miss: &ElementMiss) -> Self {
        match miss {
            ElementMiss::NotFound => Self::NotFound,
            ElementMiss::ConditionNotMet(why) => Self::ConditionNotMet(why.clone()),
            ElementMiss::Driver(err) => Self::Driver(err.to_string()),
        }
    }
}

/// A successful resolution
#[derive(Debug, Clone)]
pub struct Resolution<E> {
    /// Live element handle
    pub handle: ElementHandle<E>,
    /// Index of the winning candidate
    pub index: usize,
    /// Candidates that failed before the winner, in order
    pub attempts: Vec<CandidateFailure>,
}

/// Resolves logical elements against a driver
#[derive(Debug)]
pub struct Resolver<'a, D> {
    driver: &'a D,
    options: WaitOptions,
}

impl<'a, D: BrowserDriver> Resolver<'a, D> {
    /// Resolver using the per-candidate bounds from `config`
    #[must_use]
    pub const fn new(driver: &'a D, config: &InteractionConfig) -> Self {
        Self {
            driver,
            options: WaitOptions::per_candidate(config),
        }
    }

    /// Override the per-candidate wait
    #[must_use]
    pub const fn with_options(mut self, options: WaitOptions) -> Self {
        self.options = options;
        self
    }

    /// Resolve `element`, trying every candidate from the first.
    ///
    /// # Errors
    ///
    /// [`WaymarkError::AllCandidatesExhausted`] with one failure per
    /// candidate, in candidate order.
    pub fn resolve(
        &self,
        element: &LogicalElement,
        condition: &ElementCondition,
    ) -> WaymarkResult<Resolution<D::Element>> {
        self.resolve_from(element, 0, condition)
    }

    /// Continue a cascade at candidate `start`.
    ///
    /// Failures only cover the candidates actually tried; a `start` past
    /// the end yields an exhausted error with no failures.
    pub fn resolve_from(
        &self,
        element: &LogicalElement,
        start: usize,
        condition: &ElementCondition,
    ) -> WaymarkResult<Resolution<D::Element>> {
        let mut attempts = Vec::new();

        for (index, candidate) in element.candidates().iter().enumerate().skip(start) {
            let outcome = self
                .try_candidate(candidate, condition)
                .and_then(|found| match self.driver.page_generation() {
                    Ok(generation) => Ok((found, generation)),
                    Err(err) => Err(FailureReason::Driver(err.to_string())),
                });

            match outcome {
                Ok((found, generation)) => {
                    info!(
                        element = element.name(),
                        candidate = %candidate,
                        index,
                        "locator resolved"
                    );
                    return Ok(Resolution {
                        handle: ElementHandle::new(found, generation, element.name(), index),
                        index,
                        attempts,
                    });
                }
                Err(reason) => {
                    warn!(
                        element = element.name(),
                        candidate = %candidate,
                        index,
                        %reason,
                        "locator candidate failed, trying next"
                    );
                    attempts.push(CandidateFailure::new(
                        index,
                        candidate.to_string(),
                        reason.to_string(),
                    ));
                }
            }
        }

        Err(WaymarkError::AllCandidatesExhausted {
            element: element.name().to_string(),
            failures: attempts,
        })
    }

    fn try_candidate(
        &self,
        candidate: &LocatorCandidate,
        condition: &ElementCondition,
    ) -> Result<D::Element, FailureReason> {
        let mut last = FailureReason::NotFound;
        let description = format!("{candidate} to be {condition}");

        let outcome = Waiter::await_condition(&description, &self.options, || {
            match inspect_element(self.driver, candidate, condition) {
                Ok(found) => Probe::Ready(found),
                Err(miss) => {
                    last = FailureReason::from(&miss);
                    miss.into_probe()
                }
            }
        });

        match outcome {
            Ok(found) => Ok(found),
            Err(WaymarkError::Driver(DriverError::InvalidSelector { message, .. })) => {
                Err(FailureReason::InvalidSelector(message))
            }
            Err(_) => Err(last),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mock::{MockDriver, MockElement};
    use std::time::{Duration, Instant};

    fn quick() -> InteractionConfig {
        InteractionConfig::fast()
            .with_candidate_timeout(Duration::from_millis(20))
            .with_poll_interval(Duration::from_millis(5))
    }

    fn agree_checkbox() -> LogicalElement {
        LogicalElement::new("agree checkbox", LocatorCandidate::css(".broken-selector"))
            .or(LocatorCandidate::css("input[type='checkbox']"))
    }

    mod cascade_tests {
        use super::*;

        #[test]
        fn test_first_candidate_wins_without_touching_others() {
            let driver = MockDriver::new("https://site/")
                .with_element(MockElement::new(LocatorCandidate::css(".broken-selector")))
                .with_element(MockElement::new(LocatorCandidate::css("input[type='checkbox']")));
            let config = quick();
            let resolution = Resolver::new(&driver, &config)
                .resolve(&agree_checkbox(), &ElementCondition::Visible)
                .unwrap();
            assert_eq!(resolution.index, 0);
            assert!(resolution.attempts.is_empty());
            assert!(!driver.was_looked_up("input[type='checkbox']"));
        }

        #[test]
        fn test_fallback_records_one_failure() {
            let driver = MockDriver::new("https://site/")
                .with_element(MockElement::new(LocatorCandidate::css("input[type='checkbox']")));
            let config = quick();
            let resolution = Resolver::new(&driver, &config)
                .resolve(&agree_checkbox(), &ElementCondition::Visible)
                .unwrap();
            assert_eq!(resolution.index, 1);
            assert_eq!(resolution.handle.candidate_index(), 1);
            assert_eq!(resolution.attempts.len(), 1);
            assert_eq!(resolution.attempts[0].reason, "not found");
        }

        #[test]
        fn test_exhausted_lists_reasons_in_order() {
            let driver = MockDriver::new("https://site/")
                .with_element(MockElement::new(LocatorCandidate::css("#hidden")).hidden());
            driver.mark_invalid("div[");
            let element = LogicalElement::new("email error", LocatorCandidate::css("#missing"))
                .or(LocatorCandidate::css("#hidden"))
                .or(LocatorCandidate::css("div["));
            let config = quick();
            let err = Resolver::new(&driver, &config)
                .resolve(&element, &ElementCondition::Visible)
                .unwrap_err();

            let failures = err.candidate_failures();
            assert_eq!(failures.len(), 3);
            let indices: Vec<_> = failures.iter().map(|f| f.index).collect();
            assert_eq!(indices, vec![0, 1, 2]);
            assert_eq!(failures[0].reason, "not found");
            assert!(failures[1].reason.starts_with("condition not met"));
            assert!(failures[2].reason.starts_with("invalid selector"));
        }

        #[test]
        fn test_total_time_bounded_by_candidate_timeouts() {
            let driver = MockDriver::new("https://site/");
            let element = LogicalElement::new("ghost", LocatorCandidate::css("#a"))
                .or(LocatorCandidate::css("#b"))
                .or(LocatorCandidate::css("#c"));
            let config = quick();
            let start = Instant::now();
            let _ = Resolver::new(&driver, &config).resolve(&element, &ElementCondition::Present);
            // three candidates at 20ms each, plus scheduling slack
            assert!(start.elapsed() < Duration::from_millis(3 * 20 + 150));
        }

        #[test]
        fn test_delayed_first_candidate_still_wins() {
            let driver = MockDriver::new("https://site/")
                .with_element(
                    MockElement::new(LocatorCandidate::css(".broken-selector"))
                        .appears_after(Duration::from_millis(10)),
                )
                .with_element(MockElement::new(LocatorCandidate::css("input[type='checkbox']")));
            let config = quick().with_candidate_timeout(Duration::from_millis(100));
            let resolution = Resolver::new(&driver, &config)
                .resolve(&agree_checkbox(), &ElementCondition::Visible)
                .unwrap();
            assert_eq!(resolution.index, 0);
        }

        #[test]
        fn test_resolve_from_skips_earlier_candidates() {
            let driver = MockDriver::new("https://site/")
                .with_element(MockElement::new(LocatorCandidate::css(".broken-selector")))
                .with_element(MockElement::new(LocatorCandidate::css("input[type='checkbox']")));
            let config = quick();
            let resolution = Resolver::new(&driver, &config)
                .resolve_from(&agree_checkbox(), 1, &ElementCondition::Visible)
                .unwrap();
            assert_eq!(resolution.index, 1);
            assert!(!driver.was_looked_up(".broken-selector"));
        }

        #[test]
        fn test_resolve_from_past_end() {
            let driver = MockDriver::new("https://site/");
            let config = quick();
            let err = Resolver::new(&driver, &config)
                .resolve_from(&agree_checkbox(), 2, &ElementCondition::Visible)
                .unwrap_err();
            assert!(err.candidate_failures().is_empty());
        }

        #[test]
        fn test_resolution_is_read_only() {
            let driver = MockDriver::new("https://site/")
                .with_element(MockElement::new(LocatorCandidate::css("input[type='checkbox']")));
            let config = quick();
            Resolver::new(&driver, &config)
                .resolve(&agree_checkbox(), &ElementCondition::Clickable)
                .unwrap();
            assert!(driver.history().iter().all(|call| call.starts_with("find ")));
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(24))]

            #[test]
            fn prop_first_success_stops_cascade(total in 1usize..6, winner_seed in 0usize..6) {
                let winner = winner_seed % total;
                let driver = MockDriver::new("https://site/");
                let mut candidates = Vec::new();
                for i in 0..total {
                    let candidate = LocatorCandidate::css(format!("#c{i}"));
                    if i >= winner {
                        driver.add_element(MockElement::new(candidate.clone()));
                    }
                    candidates.push(candidate);
                }
                let element = LogicalElement::from_candidates("generated", candidates).unwrap();
                let config = InteractionConfig::fast()
                    .with_candidate_timeout(Duration::from_millis(4))
                    .with_poll_interval(Duration::from_millis(2));

                let resolution = Resolver::new(&driver, &config)
                    .resolve(&element, &ElementCondition::Visible)
                    .unwrap();

                prop_assert_eq!(resolution.index, winner);
                prop_assert_eq!(resolution.attempts.len(), winner);
                for later in (winner + 1)..total {
                    let selector = format!("#c{later}");
                    prop_assert!(!driver.was_looked_up(&selector));
                }
            }

            #[test]
            fn prop_exhaustion_reports_every_candidate(total in 1usize..5) {
                let driver = MockDriver::new("https://site/");
                let candidates = (0..total)
                    .map(|i| LocatorCandidate::xpath(format!("//missing[{i}]")))
                    .collect();
                let element = LogicalElement::from_candidates("missing", candidates).unwrap();
                let config = InteractionConfig::fast()
                    .with_candidate_timeout(Duration::from_millis(4))
                    .with_poll_interval(Duration::from_millis(2));

                let err = Resolver::new(&driver, &config)
                    .resolve(&element, &ElementCondition::Present)
                    .unwrap_err();
                let failures = err.candidate_failures();
                prop_assert_eq!(failures.len(), total);
                for (position, failure) in failures.iter().enumerate() {
                    prop_assert_eq!(failure.index, position);
                }
            }
        }
    }
}
