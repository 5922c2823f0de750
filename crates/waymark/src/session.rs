//! Session facade.
//!
//! A [`Session`] owns one browser driver together with the interaction
//! config, the intervention gate and the trace, and is the only surface page
//! objects use. Everything a page does goes through the resolver, the
//! executor or the gate.

use crate::action::{ActionExecutor, ActionMethod, ActionOutcome, SCROLL_INTO_VIEW_SCRIPT};
use crate::config::InteractionConfig;
use crate::driver::BrowserDriver;
use crate::intervention::{InterventionGate, InterventionOutcome, InterventionRequest};
use crate::locator::LogicalElement;
use crate::resolver::{Resolution, Resolver};
use crate::result::{WaymarkError, WaymarkResult};
use crate::trace::{InteractionTrace, TraceKind};
use crate::wait::{wait_for_url, ElementCondition, PageCondition, UrlPattern, WaitOptions};
use std::time::Duration;
use tracing::{debug, info};

/// One browser, one flow
#[derive(Debug)]
pub struct Session<D> {
    driver: D,
    config: InteractionConfig,
    gate: InterventionGate,
    trace: InteractionTrace,
}

impl<D: BrowserDriver> Session<D> {
    /// Session with a console intervention gate
    #[must_use]
    pub fn new(driver: D, config: InteractionConfig) -> Self {
        let gate = InterventionGate::console(&config);
        Self {
            driver,
            config,
            gate,
            trace: InteractionTrace::default(),
        }
    }

    /// Replace the intervention gate
    #[must_use]
    pub fn with_gate(mut self, gate: InterventionGate) -> Self {
        self.gate = gate;
        self
    }

    /// Label the trace (scenario name)
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.trace = InteractionTrace::new(label);
        self
    }

    /// Interaction config
    #[must_use]
    pub const fn config(&self) -> &InteractionConfig {
        &self.config
    }

    /// Underlying driver
    #[must_use]
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// Underlying driver, mutably
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Intervention gate
    #[must_use]
    pub const fn gate(&self) -> &InterventionGate {
        &self.gate
    }

    /// Interaction trace so far
    #[must_use]
    pub const fn trace(&self) -> &InteractionTrace {
        &self.trace
    }

    /// Take the trace, leaving a fresh one with the same label
    pub fn take_trace(&mut self) -> InteractionTrace {
        let fresh = InteractionTrace::new(self.trace.label.clone());
        std::mem::replace(&mut self.trace, fresh)
    }

    /// Give the driver back
    pub fn into_driver(self) -> D {
        self.driver
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Resolve `element` until `condition` holds, recording the cascade
    pub fn resolve(
        &mut self,
        element: &LogicalElement,
        condition: &ElementCondition,
    ) -> WaymarkResult<Resolution<D::Element>> {
        let result = Resolver::new(&self.driver, &self.config).resolve(element, condition);
        let failures = match &result {
            Ok(resolution) => resolution.attempts.as_slice(),
            Err(err) => err.candidate_failures(),
        };
        for failure in failures {
            self.trace.record_candidate(
                element.name(),
                failure.index,
                &element.candidates()[failure.index],
                TraceKind::CandidateFailed {
                    reason: failure.reason.clone(),
                },
            );
        }
        if let Ok(resolution) = &result {
            self.trace.record_candidate(
                element.name(),
                resolution.index,
                &element.candidates()[resolution.index],
                TraceKind::Resolved,
            );
        }
        result
    }

    /// Whether any candidate currently shows the element, without waiting.
    ///
    /// Never fails: lookup errors count as "not displayed".
    pub fn is_displayed(&self, element: &LogicalElement) -> bool {
        let options = WaitOptions::per_candidate(&self.config).with_timeout(0);
        let displayed = Resolver::new(&self.driver, &self.config)
            .with_options(options)
            .resolve(element, &ElementCondition::Visible)
            .is_ok();
        debug!(element = element.name(), displayed, "display check");
        displayed
    }

    /// Whether the element becomes visible within the cascade's waits
    pub fn wait_until_displayed(&self, element: &LogicalElement) -> bool {
        Resolver::new(&self.driver, &self.config)
            .resolve(element, &ElementCondition::Visible)
            .is_ok()
    }

    /// Visible text of the element
    pub fn get_text(&mut self, element: &LogicalElement) -> WaymarkResult<String> {
        let resolution = self.resolve(element, &ElementCondition::Visible)?;
        let live = resolution.handle.live(&self.driver)?;
        Ok(self.driver.text(live)?.trim().to_string())
    }

    // =========================================================================
    // Actions
    // =========================================================================

    /// Click with scroll, settle and script fallback
    pub fn perform_click(&mut self, element: &LogicalElement) -> ActionOutcome {
        ActionExecutor::new(&self.driver, &self.config, &mut self.trace).perform_click(element)
    }

    /// Click and require `expected` afterwards
    pub fn perform_click_expecting(
        &mut self,
        element: &LogicalElement,
        expected: &PageCondition,
    ) -> ActionOutcome {
        ActionExecutor::new(&self.driver, &self.config, &mut self.trace)
            .perform_click_expecting(element, expected)
    }

    /// Type text
    pub fn perform_type(&mut self, element: &LogicalElement, text: &str) -> ActionOutcome {
        ActionExecutor::new(&self.driver, &self.config, &mut self.trace).perform_type(element, text)
    }

    /// Bring the element into the viewport and let the page settle
    pub fn scroll_to(&mut self, element: &LogicalElement) -> WaymarkResult<()> {
        let resolution = self.resolve(element, &ElementCondition::Visible)?;
        let live = resolution.handle.live(&self.driver)?;
        self.driver.execute_script(SCROLL_INTO_VIEW_SCRIPT, live)?;
        self.trace.record_candidate(
            element.name(),
            resolution.index,
            &element.candidates()[resolution.index],
            TraceKind::Scrolled,
        );
        std::thread::sleep(self.config.scroll_settle());
        Ok(())
    }

    /// [`Self::perform_click`] as a `Result`
    pub fn click(&mut self, element: &LogicalElement) -> WaymarkResult<ActionMethod> {
        self.perform_click(element).into_result()
    }

    /// [`Self::perform_type`] as a `Result`
    pub fn type_text(&mut self, element: &LogicalElement, text: &str) -> WaymarkResult<()> {
        self.perform_type(element, text).into_result().map(|_| ())
    }

    // =========================================================================
    // Pages
    // =========================================================================

    /// Load `url`
    pub fn navigate(&mut self, url: &str) -> WaymarkResult<()> {
        info!(url, "navigating");
        self.driver.navigate(url)?;
        self.trace
            .record("page", TraceKind::Navigated { url: url.to_string() });
        Ok(())
    }

    /// Current URL
    pub fn current_url(&self) -> WaymarkResult<String> {
        Ok(self.driver.current_url()?)
    }

    /// Wait (default timeout) for the URL to match `pattern`
    ///
    /// # Errors
    ///
    /// [`WaymarkError::NotOnExpectedPage`] with the URL actually shown.
    pub fn expect_url(&self, pattern: &UrlPattern) -> WaymarkResult<String> {
        let options = WaitOptions::from_config(&self.config);
        match wait_for_url(&self.driver, pattern, &options) {
            Ok(url) => Ok(url),
            Err(err) if err.is_timeout() => Err(WaymarkError::NotOnExpectedPage {
                expected: pattern.to_string(),
                actual: self.driver.current_url()?,
            }),
            Err(err) => Err(err),
        }
    }

    // =========================================================================
    // Intervention
    // =========================================================================

    /// Ask an operator for help, bounded by the configured wait
    pub fn request_intervention(&mut self, description: &str) -> bool {
        let max_wait = self.gate.default_wait();
        self.request_intervention_for(description, max_wait)
    }

    /// Ask an operator for help with an explicit bound
    pub fn request_intervention_for(&mut self, description: &str, max_wait: Duration) -> bool {
        self.trace.record(
            description,
            TraceKind::InterventionRequested {
                description: description.to_string(),
                max_wait_secs: max_wait.as_secs(),
            },
        );
        let request = InterventionRequest::new(description, max_wait);
        let outcome = self
            .gate
            .outcome(&request)
            .unwrap_or(InterventionOutcome::SourceClosed);
        let kind = match outcome {
            InterventionOutcome::Signaled => TraceKind::InterventionSignaled,
            InterventionOutcome::Disabled => TraceKind::InterventionSkipped,
            InterventionOutcome::TimedOut | InterventionOutcome::SourceClosed => {
                TraceKind::InterventionTimedOut
            }
        };
        self.trace.record(description, kind);
        outcome.is_signaled()
    }
}
