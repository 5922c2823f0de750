//! Action execution with click fallback.
//!
//! For each candidate the resolver produces, an action runs:
//!
//! 1. scroll the element to the viewport centre and wait `scroll_settle`
//! 2. native click (or native typing)
//! 3. if the native click is rejected as not interactable, or an expected
//!    page condition does not follow it, a script-injected click on the
//!    same handle
//!
//! If both paths fail the cascade moves to the next candidate. Every step
//! lands in the [`InteractionTrace`] and in `tracing`.

use crate::config::InteractionConfig;
use crate::driver::{BrowserDriver, DriverError, ElementHandle};
use crate::locator::LogicalElement;
use crate::resolver::Resolver;
use crate::result::{CandidateFailure, WaymarkError, WaymarkResult};
use crate::trace::{InteractionTrace, TraceKind};
use crate::wait::{ElementCondition, PageCondition, WaitOptions, Waiter};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

/// Smooth-scroll the element to the vertical centre of the viewport
pub const SCROLL_INTO_VIEW_SCRIPT: &str =
    "this.scrollIntoView({behavior: 'smooth', block: 'center'});";

/// Dispatch a click from inside the page, bypassing hit-testing
pub const SCRIPT_CLICK: &str = "this.click();";

// =============================================================================
// OUTCOME
// =============================================================================

/// Which path performed the action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionMethod {
    /// Native pointer or keyboard event
    Native,
    /// Script-injected click
    Script,
}

impl fmt::Display for ActionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => f.write_str("native"),
            Self::Script => f.write_str("script"),
        }
    }
}

/// Why an action failed overall
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No candidate resolved
    NotFound,
    /// Elements resolved but rejected the interaction
    NotInteractable,
    /// Interaction dispatched but the expected page state never followed
    TimedOut,
}

/// Result of an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Action performed
    Succeeded {
        /// Candidate that received the action
        candidate_index: usize,
        /// Path that performed it
        method: ActionMethod,
    },
    /// Every candidate failed
    Failed {
        /// Dominant failure
        kind: FailureKind,
        /// Logical element name
        element: String,
        /// Per-candidate failures in candidate order
        reasons: Vec<CandidateFailure>,
    },
}

impl ActionOutcome {
    /// Whether the action was performed
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    /// Convert to a `Result`, keeping the method on success
    ///
    /// # Errors
    ///
    /// [`WaymarkError::AllCandidatesExhausted`] when nothing resolved,
    /// [`WaymarkError::ActionFailed`] otherwise.
    pub fn into_result(self) -> WaymarkResult<ActionMethod> {
        match self {
            Self::Succeeded { method, .. } => Ok(method),
            Self::Failed {
                kind: FailureKind::NotFound,
                element,
                reasons,
            } => Err(WaymarkError::AllCandidatesExhausted {
                element,
                failures: reasons,
            }),
            Self::Failed {
                element, reasons, ..
            } => Err(WaymarkError::ActionFailed { element, reasons }),
        }
    }
}

// =============================================================================
// EXECUTOR
// =============================================================================

enum Interaction<'t> {
    Click,
    ClickExpecting(&'t PageCondition),
    Type(&'t str),
}

type StepFailure = (FailureKind, String);

/// Runs actions against logical elements
#[derive(Debug)]
pub struct ActionExecutor<'a, D> {
    driver: &'a D,
    config: &'a InteractionConfig,
    trace: &'a mut InteractionTrace,
}

impl<'a, D: BrowserDriver> ActionExecutor<'a, D> {
    /// Create an executor recording into `trace`
    pub fn new(driver: &'a D, config: &'a InteractionConfig, trace: &'a mut InteractionTrace) -> Self {
        Self {
            driver,
            config,
            trace,
        }
    }

    /// Click the element, falling back to a script click
    pub fn perform_click(&mut self, element: &LogicalElement) -> ActionOutcome {
        self.perform(element, &Interaction::Click)
    }

    /// Click the element and require `expected` to hold afterwards
    pub fn perform_click_expecting(
        &mut self,
        element: &LogicalElement,
        expected: &PageCondition,
    ) -> ActionOutcome {
        self.perform(element, &Interaction::ClickExpecting(expected))
    }

    /// Type `text` into the element
    pub fn perform_type(&mut self, element: &LogicalElement, text: &str) -> ActionOutcome {
        self.perform(element, &Interaction::Type(text))
    }

    fn perform(&mut self, element: &LogicalElement, interaction: &Interaction<'_>) -> ActionOutcome {
        let name = element.name();
        let resolver = Resolver::new(self.driver, self.config);
        let mut reasons: Vec<CandidateFailure> = Vec::new();
        let mut kind = FailureKind::NotFound;
        let mut start = 0;

        while start < element.len() {
            let resolution = match resolver.resolve_from(element, start, &ElementCondition::Visible) {
                Ok(resolution) => resolution,
                Err(err) => {
                    for failure in err.candidate_failures() {
                        self.record_failure(element, failure);
                        reasons.push(failure.clone());
                    }
                    break;
                }
            };
            for failure in &resolution.attempts {
                self.record_failure(element, failure);
                reasons.push(failure.clone());
            }

            // the action outcome below is this element's one success entry
            let index = resolution.index;
            let candidate = &element.candidates()[index];

            match self.interact(element, &resolution.handle, interaction) {
                Ok(method) => {
                    info!(element = name, candidate = %candidate, %method, "action performed");
                    self.trace.record_candidate(
                        name,
                        index,
                        candidate,
                        TraceKind::ActionSucceeded {
                            method: method.to_string(),
                        },
                    );
                    return ActionOutcome::Succeeded {
                        candidate_index: index,
                        method,
                    };
                }
                Err((failure_kind, reason)) => {
                    warn!(element = name, candidate = %candidate, %reason, "action failed on candidate, trying next");
                    let failure = CandidateFailure::new(index, candidate.to_string(), reason);
                    self.record_failure(element, &failure);
                    reasons.push(failure);
                    kind = failure_kind;
                }
            }
            start = index + 1;
        }

        warn!(element = name, attempts = reasons.len(), ?kind, "action exhausted all candidates");
        self.trace.record(
            name,
            TraceKind::ActionFailed {
                reason: format!("{kind:?} after {} candidate failures", reasons.len()),
            },
        );
        ActionOutcome::Failed {
            kind,
            element: name.to_string(),
            reasons,
        }
    }

    fn interact(
        &mut self,
        element: &LogicalElement,
        handle: &ElementHandle<D::Element>,
        interaction: &Interaction<'_>,
    ) -> Result<ActionMethod, StepFailure> {
        let live = handle
            .live(self.driver)
            .map_err(|err| (FailureKind::NotInteractable, err.to_string()))?;
        self.scroll_into_view(element, handle, live);

        match interaction {
            Interaction::Type(text) => {
                self.driver
                    .send_keys(live, text)
                    .map_err(|err| (FailureKind::NotInteractable, err.to_string()))?;
                self.trace.record_candidate(
                    element.name(),
                    handle.candidate_index(),
                    &element.candidates()[handle.candidate_index()],
                    TraceKind::Typed {
                        chars: text.chars().count(),
                    },
                );
                Ok(ActionMethod::Native)
            }
            Interaction::Click => self.click_with_fallback(element, handle, None),
            Interaction::ClickExpecting(expected) => {
                self.click_with_fallback(element, handle, Some(expected))
            }
        }
    }

    fn scroll_into_view(
        &mut self,
        element: &LogicalElement,
        handle: &ElementHandle<D::Element>,
        live: &D::Element,
    ) {
        match self.driver.execute_script(SCROLL_INTO_VIEW_SCRIPT, live) {
            Ok(()) => self.trace_step(element, handle, TraceKind::Scrolled),
            // best effort; the click path reports the real problem
            Err(err) => warn!(element = element.name(), error = %err, "scroll into view failed"),
        }
        let settle = self.config.scroll_settle();
        if !settle.is_zero() {
            std::thread::sleep(settle);
        }
    }

    fn click_with_fallback(
        &mut self,
        element: &LogicalElement,
        handle: &ElementHandle<D::Element>,
        expected: Option<&PageCondition>,
    ) -> Result<ActionMethod, StepFailure> {
        let live = handle.raw();
        let native_failure = match self.driver.click(live) {
            Ok(()) => {
                self.trace_step(element, handle, TraceKind::NativeClick);
                match expected {
                    None => return Ok(ActionMethod::Native),
                    Some(condition) => {
                        let options = WaitOptions::per_candidate(self.config);
                        if self.await_page(condition, &options).is_ok() {
                            return Ok(ActionMethod::Native);
                        }
                        format!("click did not lead to {condition}")
                    }
                }
            }
            Err(err @ DriverError::NotInteractable { .. }) => err.to_string(),
            Err(err) => {
                self.trace_step(
                    element,
                    handle,
                    TraceKind::NativeClickFailed {
                        reason: err.to_string(),
                    },
                );
                return Err((FailureKind::NotInteractable, err.to_string()));
            }
        };

        self.trace_step(
            element,
            handle,
            TraceKind::NativeClickFailed {
                reason: native_failure.clone(),
            },
        );
        warn!(
            element = element.name(),
            reason = %native_failure,
            "native click did not register, falling back to script click"
        );

        let live = handle
            .live(self.driver)
            .map_err(|err| (FailureKind::NotInteractable, format!("{native_failure}; {err}")))?;
        if let Err(err) = self.driver.execute_script(SCRIPT_CLICK, live) {
            self.trace_step(
                element,
                handle,
                TraceKind::ScriptClickFailed {
                    reason: err.to_string(),
                },
            );
            return Err((
                FailureKind::NotInteractable,
                format!("native: {native_failure}; script: {err}"),
            ));
        }
        self.trace_step(element, handle, TraceKind::ScriptClick);

        match expected {
            None => Ok(ActionMethod::Script),
            Some(condition) => {
                let options = WaitOptions::from_config(self.config);
                match self.await_page(condition, &options) {
                    Ok(()) => Ok(ActionMethod::Script),
                    Err(err) => {
                        self.trace_step(
                            element,
                            handle,
                            TraceKind::ScriptClickFailed {
                                reason: err.to_string(),
                            },
                        );
                        Err((
                            FailureKind::TimedOut,
                            format!("native and script click did not lead to {condition}"),
                        ))
                    }
                }
            }
        }
    }

    fn await_page(&self, condition: &PageCondition, options: &WaitOptions) -> WaymarkResult<()> {
        Waiter::await_condition(&condition.to_string(), options, || condition.probe(self.driver))
            .map(|_| ())
    }

    fn trace_step(&mut self, element: &LogicalElement, handle: &ElementHandle<D::Element>, kind: TraceKind) {
        let index = handle.candidate_index();
        self.trace
            .record_candidate(element.name(), index, &element.candidates()[index], kind);
    }

    fn record_failure(&mut self, element: &LogicalElement, failure: &CandidateFailure) {
        self.trace.record_candidate(
            element.name(),
            failure.index,
            &element.candidates()[failure.index],
            TraceKind::CandidateFailed {
                reason: failure.reason.clone(),
            },
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::locator::LocatorCandidate;
    use crate::mock::{ClickBehavior, MockDriver, MockElement};
    use std::time::{Duration, Instant};

    fn submit() -> LogicalElement {
        LogicalElement::new("submit button", LocatorCandidate::css("button[type='submit']"))
            .or(LocatorCandidate::xpath("//button[@type='submit']"))
    }

    fn run<F>(driver: &MockDriver, config: &InteractionConfig, f: F) -> (ActionOutcome, InteractionTrace)
    where
        F: FnOnce(&mut ActionExecutor<'_, MockDriver>) -> ActionOutcome,
    {
        let mut trace = InteractionTrace::new("test");
        let outcome = {
            let mut executor = ActionExecutor::new(driver, config, &mut trace);
            f(&mut executor)
        };
        (outcome, trace)
    }

    mod click_tests {
        use super::*;

        #[test]
        fn test_native_click_after_scroll() {
            let driver = MockDriver::new("https://site/")
                .with_element(MockElement::new(LocatorCandidate::css("button[type='submit']")));
            let config = InteractionConfig::fast();
            let (outcome, trace) = run(&driver, &config, |e| e.perform_click(&submit()));

            assert_eq!(
                outcome,
                ActionOutcome::Succeeded {
                    candidate_index: 0,
                    method: ActionMethod::Native
                }
            );
            assert_eq!(
                driver.history(),
                vec!["find css `button[type='submit']`", "scroll #0", "click #0"]
            );
            assert!(!driver.was_called("script-click"));
            assert!(trace.failures().is_empty());
        }

        #[test]
        fn test_broken_first_selector_one_failure_then_one_success() {
            let agree = LogicalElement::new("agree checkbox", LocatorCandidate::css(".broken-selector"))
                .or(LocatorCandidate::css("input[type='checkbox']"));
            let driver = MockDriver::new("https://site/sign_up/")
                .with_element(MockElement::new(LocatorCandidate::css("input[type='checkbox']")));
            let config = InteractionConfig::fast();
            let (outcome, trace) = run(&driver, &config, |e| e.perform_click(&agree));

            assert_eq!(
                outcome,
                ActionOutcome::Succeeded {
                    candidate_index: 1,
                    method: ActionMethod::Native
                }
            );
            assert_eq!(trace.failures().len(), 1);
            assert_eq!(trace.successes().len(), 1);
            let verdicts: Vec<_> = trace
                .entries()
                .iter()
                .filter(|e| e.kind.is_failure() || e.kind.is_success())
                .map(|e| (e.candidate_index, e.kind.is_success()))
                .collect();
            assert_eq!(verdicts, vec![(Some(0), false), (Some(1), true)]);
            assert!(matches!(
                trace.entries()[0].kind,
                TraceKind::CandidateFailed { .. }
            ));
            assert!(matches!(
                trace.entries().last().map(|e| &e.kind),
                Some(TraceKind::ActionSucceeded { .. })
            ));
        }

        #[test]
        fn test_settle_delay_between_scroll_and_click() {
            let driver = MockDriver::new("https://site/")
                .with_element(MockElement::new(LocatorCandidate::css("button[type='submit']")));
            let config = InteractionConfig::fast().with_scroll_settle(Duration::from_millis(30));
            let start = Instant::now();
            let (outcome, _) = run(&driver, &config, |e| e.perform_click(&submit()));
            assert!(outcome.is_success());
            assert!(start.elapsed() >= Duration::from_millis(30));
        }

        #[test]
        fn test_occluded_click_falls_back_to_script() {
            let driver = MockDriver::new("https://site/").with_element(
                MockElement::new(LocatorCandidate::css("button[type='submit']"))
                    .with_click(ClickBehavior::NotInteractable),
            );
            let config = InteractionConfig::fast();
            let (outcome, trace) = run(&driver, &config, |e| e.perform_click(&submit()));

            assert_eq!(
                outcome,
                ActionOutcome::Succeeded {
                    candidate_index: 0,
                    method: ActionMethod::Script
                }
            );
            assert_eq!(driver.registered_clicks("button[type='submit']"), 1);
            let kinds: Vec<_> = trace.entries().iter().map(|e| e.kind.clone()).collect();
            assert!(kinds.contains(&TraceKind::ScriptClick));
        }

        #[test]
        fn test_both_paths_fail_moves_to_next_candidate() {
            let driver = MockDriver::new("https://site/")
                .with_element(
                    MockElement::new(LocatorCandidate::css("button[type='submit']"))
                        .with_click(ClickBehavior::NotInteractable)
                        .script_click_fails(),
                )
                .with_element(MockElement::new(LocatorCandidate::xpath("//button[@type='submit']")));
            let config = InteractionConfig::fast();
            let (outcome, trace) = run(&driver, &config, |e| e.perform_click(&submit()));

            assert_eq!(
                outcome,
                ActionOutcome::Succeeded {
                    candidate_index: 1,
                    method: ActionMethod::Native
                }
            );
            let candidate_failures: Vec<_> = trace
                .entries()
                .iter()
                .filter(|e| matches!(e.kind, TraceKind::CandidateFailed { .. }))
                .collect();
            assert_eq!(candidate_failures.len(), 1);
            assert_eq!(candidate_failures[0].candidate_index, Some(0));
        }

        #[test]
        fn test_nothing_resolves_is_not_found() {
            let driver = MockDriver::new("https://site/");
            let config = InteractionConfig::fast();
            let (outcome, _) = run(&driver, &config, |e| e.perform_click(&submit()));

            match &outcome {
                ActionOutcome::Failed { kind, reasons, .. } => {
                    assert_eq!(*kind, FailureKind::NotFound);
                    assert_eq!(reasons.len(), 2);
                }
                ActionOutcome::Succeeded { .. } => panic!("expected failure"),
            }
            let err = outcome.into_result().unwrap_err();
            assert!(matches!(err, WaymarkError::AllCandidatesExhausted { .. }));
        }

        #[test]
        fn test_uninteractable_everywhere_is_action_failed() {
            let driver = MockDriver::new("https://site/").with_element(
                MockElement::new(LocatorCandidate::css("button[type='submit']"))
                    .with_click(ClickBehavior::NotInteractable)
                    .script_click_fails(),
            );
            let config = InteractionConfig::fast();
            let (outcome, trace) = run(&driver, &config, |e| e.perform_click(&submit()));

            match &outcome {
                ActionOutcome::Failed { kind, reasons, .. } => {
                    assert_eq!(*kind, FailureKind::NotInteractable);
                    let indices: Vec<_> = reasons.iter().map(|r| r.index).collect();
                    assert_eq!(indices, vec![0, 1]);
                    assert!(reasons[0].reason.contains("script"));
                }
                ActionOutcome::Succeeded { .. } => panic!("expected failure"),
            }
            assert!(matches!(
                outcome.into_result(),
                Err(WaymarkError::ActionFailed { .. })
            ));
            assert!(trace
                .entries()
                .iter()
                .any(|e| matches!(e.kind, TraceKind::ActionFailed { .. })));
        }
    }

    mod expecting_tests {
        use super::*;

        fn get_started() -> LogicalElement {
            LogicalElement::new("get started link", LocatorCandidate::css("a.signup"))
                .or(LocatorCandidate::link_text("Get Started"))
        }

        #[test]
        fn test_native_click_navigates() {
            let driver = MockDriver::new("https://site/").with_element(
                MockElement::new(LocatorCandidate::css("a.signup")).navigates_to("https://site/sign_up/"),
            );
            let config = InteractionConfig::fast();
            let expected = PageCondition::url_contains("/sign_up");
            let (outcome, _) = run(&driver, &config, |e| {
                e.perform_click_expecting(&get_started(), &expected)
            });
            assert_eq!(
                outcome,
                ActionOutcome::Succeeded {
                    candidate_index: 0,
                    method: ActionMethod::Native
                }
            );
        }

        #[test]
        fn test_swallowed_click_retried_with_script() {
            let driver = MockDriver::new("https://site/").with_element(
                MockElement::new(LocatorCandidate::css("a.signup"))
                    .with_click(ClickBehavior::Ignored)
                    .navigates_to("https://site/sign_up/"),
            );
            let config = InteractionConfig::fast();
            let expected = PageCondition::url_contains("/sign_up");
            let (outcome, _) = run(&driver, &config, |e| {
                e.perform_click_expecting(&get_started(), &expected)
            });
            assert_eq!(
                outcome,
                ActionOutcome::Succeeded {
                    candidate_index: 0,
                    method: ActionMethod::Script
                }
            );
            assert_eq!(driver.current_url().unwrap(), "https://site/sign_up/");
        }

        #[test]
        fn test_slow_navigation_within_candidate_timeout() {
            let driver = MockDriver::new("https://site/").with_element(
                MockElement::new(LocatorCandidate::css("a.signup"))
                    .navigates_to("https://site/sign_up/")
                    .with_navigation_delay(Duration::from_millis(15)),
            );
            let config = InteractionConfig::fast();
            let expected = PageCondition::url_contains("/sign_up");
            let (outcome, _) = run(&driver, &config, |e| {
                e.perform_click_expecting(&get_started(), &expected)
            });
            assert!(outcome.is_success());
            assert!(!driver.was_called("script-click"));
        }

        #[test]
        fn test_condition_never_met_is_timed_out() {
            let driver = MockDriver::new("https://site/").with_element(
                MockElement::new(LocatorCandidate::css("a.signup")).with_click(ClickBehavior::Ignored),
            );
            let config = InteractionConfig::fast();
            let expected = PageCondition::url_contains("/sign_up");
            let (outcome, _) = run(&driver, &config, |e| {
                e.perform_click_expecting(&get_started(), &expected)
            });
            match outcome {
                ActionOutcome::Failed { kind, .. } => assert_eq!(kind, FailureKind::TimedOut),
                ActionOutcome::Succeeded { .. } => panic!("expected failure"),
            }
        }
    }

    mod type_tests {
        use super::*;

        #[test]
        fn test_type_into_fallback_candidate() {
            let email = LogicalElement::new("email field", LocatorCandidate::css("#email"))
                .or(LocatorCandidate::css("input[type='email']"));
            let driver = MockDriver::new("https://site/")
                .with_element(MockElement::new(LocatorCandidate::css("input[type='email']")));
            let config = InteractionConfig::fast();
            let (outcome, trace) = run(&driver, &config, |e| e.perform_type(&email, "qa@test.com"));

            assert_eq!(
                outcome,
                ActionOutcome::Succeeded {
                    candidate_index: 1,
                    method: ActionMethod::Native
                }
            );
            assert_eq!(driver.typed_text("input[type='email']").unwrap(), "qa@test.com");
            assert!(trace
                .entries()
                .iter()
                .any(|e| e.kind == TraceKind::Typed { chars: 11 }));
        }

        #[test]
        fn test_type_into_disabled_field_fails() {
            let email = LogicalElement::new("email field", LocatorCandidate::css("#email"));
            let driver = MockDriver::new("https://site/")
                .with_element(MockElement::new(LocatorCandidate::css("#email")).disabled());
            let config = InteractionConfig::fast();
            let (outcome, _) = run(&driver, &config, |e| e.perform_type(&email, "x"));
            assert!(matches!(
                outcome,
                ActionOutcome::Failed {
                    kind: FailureKind::NotInteractable,
                    ..
                }
            ));
        }
    }
}
