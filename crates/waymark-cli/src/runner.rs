//! Scenario runner: one fresh browser and session per scenario

use crate::error::{CliError, CliResult};
use crate::output::ProgressReporter;
use crate::scenarios::{run_scenario, Scenario, ScenarioContext, ScenarioStatus};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{error, info};
use waymark::{BrowserDriver, InteractionConfig, Session};

/// Where browsers come from
pub trait DriverFactory {
    /// Driver type produced
    type Driver: BrowserDriver;

    /// Start a browser for `scenario`
    ///
    /// # Errors
    ///
    /// Whatever prevents the browser from starting.
    fn launch(&mut self, scenario: Scenario) -> CliResult<Self::Driver>;

    /// Shut the browser down once the scenario is over
    ///
    /// # Errors
    ///
    /// Whatever prevents a clean shutdown.
    fn release(&mut self, driver: Self::Driver) -> CliResult<()> {
        drop(driver);
        Ok(())
    }
}

/// Verdict for one scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Every check held
    Passed,
    /// A check failed or the flow broke
    Failed,
    /// Not run
    Skipped,
}

/// Result of a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    /// Scenario
    pub scenario: Scenario,
    /// Verdict
    pub verdict: Verdict,
    /// Failure message, skip reason or pass note
    pub detail: Option<String>,
    /// Wall time
    pub duration: Duration,
    /// Recovered or fatal interaction failures recorded in the trace
    pub trace_failures: usize,
}

impl ScenarioResult {
    /// Create a passing result
    #[must_use]
    pub const fn pass(scenario: Scenario, duration: Duration) -> Self {
        Self {
            scenario,
            verdict: Verdict::Passed,
            detail: None,
            duration,
            trace_failures: 0,
        }
    }

    /// Create a failing result
    #[must_use]
    pub fn fail(scenario: Scenario, error: impl Into<String>, duration: Duration) -> Self {
        Self {
            scenario,
            verdict: Verdict::Failed,
            detail: Some(error.into()),
            duration,
            trace_failures: 0,
        }
    }

    /// Create a skipped result
    #[must_use]
    pub fn skip(scenario: Scenario, reason: impl Into<String>) -> Self {
        Self {
            scenario,
            verdict: Verdict::Skipped,
            detail: Some(reason.into()),
            duration: Duration::ZERO,
            trace_failures: 0,
        }
    }

    /// Attach a detail line
    #[must_use]
    pub fn with_detail(mut self, detail: Option<String>) -> Self {
        self.detail = detail;
        self
    }

    /// Set the trace failure count
    #[must_use]
    pub const fn with_trace_failures(mut self, count: usize) -> Self {
        self.trace_failures = count;
        self
    }

    fn from_status(scenario: Scenario, status: CliResult<ScenarioStatus>, duration: Duration) -> Self {
        match status {
            Ok(ScenarioStatus::Passed { note }) => Self::pass(scenario, duration).with_detail(note),
            Ok(ScenarioStatus::Skipped { reason }) => Self::skip(scenario, reason),
            Err(e) => Self::fail(scenario, e.to_string(), duration),
        }
    }
}

/// Collection of scenario results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Individual results
    pub results: Vec<ScenarioResult>,
    /// Total duration
    pub duration: Duration,
}

impl RunSummary {
    /// Create new empty results
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a result
    pub fn add(&mut self, result: ScenarioResult) {
        self.results.push(result);
    }

    fn count(&self, verdict: Verdict) -> usize {
        self.results.iter().filter(|r| r.verdict == verdict).count()
    }

    /// Get passed count
    #[must_use]
    pub fn passed(&self) -> usize {
        self.count(Verdict::Passed)
    }

    /// Get failed count
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(Verdict::Failed)
    }

    /// Get skipped count
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(Verdict::Skipped)
    }

    /// Get total count
    #[must_use]
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Check if nothing failed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }

    /// Get failed results
    #[must_use]
    pub fn failures(&self) -> Vec<&ScenarioResult> {
        self.results
            .iter()
            .filter(|r| r.verdict == Verdict::Failed)
            .collect()
    }
}

/// Runs scenarios one after another
#[derive(Debug)]
pub struct ScenarioRunner {
    config: InteractionConfig,
    trace_out: Option<PathBuf>,
    reporter: ProgressReporter,
}

impl ScenarioRunner {
    /// Create a runner using `config` for every session
    #[must_use]
    pub fn new(config: InteractionConfig, reporter: ProgressReporter) -> Self {
        Self {
            config,
            trace_out: None,
            reporter,
        }
    }

    /// Write each scenario's trace to `<dir>/<scenario>.json`
    #[must_use]
    pub fn with_trace_out(mut self, dir: Option<PathBuf>) -> Self {
        self.trace_out = dir;
        self
    }

    /// Get the reporter
    #[must_use]
    pub const fn reporter(&self) -> &ProgressReporter {
        &self.reporter
    }

    /// Run `scenarios` in order, each in a browser from `factory`
    ///
    /// A scenario that fails does not stop the ones after it.
    pub fn run<F: DriverFactory>(
        &mut self,
        scenarios: &[Scenario],
        ctx: &ScenarioContext,
        factory: &mut F,
    ) -> RunSummary {
        let start = Instant::now();
        let mut summary = RunSummary::new();

        self.reporter
            .header(&format!("Running {} scenario(s) against {}", scenarios.len(), ctx.site.base_url));
        self.reporter.start_progress(scenarios.len() as u64, "starting");

        for &scenario in scenarios {
            self.reporter.set_message(scenario.name());
            let result = self.run_one(scenario, ctx, factory);
            self.report(&result);
            summary.add(result);
            self.reporter.increment(1);
        }

        self.reporter.finish();
        summary.duration = start.elapsed();
        self.reporter.summary(
            summary.passed(),
            summary.failed(),
            summary.skipped(),
            summary.duration,
        );
        summary
    }

    fn run_one<F: DriverFactory>(
        &self,
        scenario: Scenario,
        ctx: &ScenarioContext,
        factory: &mut F,
    ) -> ScenarioResult {
        let start = Instant::now();
        let driver = match factory.launch(scenario) {
            Ok(driver) => driver,
            Err(e) => {
                error!(%scenario, error = %e, "browser did not start");
                return ScenarioResult::fail(scenario, e.to_string(), start.elapsed());
            }
        };

        let mut session = Session::new(driver, self.config.clone()).with_label(scenario.name());
        let status = run_scenario(scenario, &mut session, ctx);
        let trace = session.take_trace();
        if let Err(e) = factory.release(session.into_driver()) {
            error!(%scenario, error = %e, "browser did not shut down cleanly");
        }

        let result = ScenarioResult::from_status(scenario, status, start.elapsed())
            .with_trace_failures(trace.failures().len());
        info!(
            %scenario,
            verdict = ?result.verdict,
            trace_entries = trace.len(),
            trace_failures = result.trace_failures,
            "scenario finished"
        );

        if let Some(dir) = &self.trace_out {
            let path = dir.join(format!("{}.json", scenario.name()));
            if let Err(e) = trace.save_json(&path) {
                error!(path = %path.display(), error = %e, "could not write trace");
            }
        }
        result
    }

    fn report(&self, result: &ScenarioResult) {
        let name = result.scenario.name();
        let secs = result.duration.as_secs_f64();
        match (result.verdict, &result.detail) {
            (Verdict::Passed, Some(note)) => {
                self.reporter.success(&format!("{name} ({secs:.2}s)"));
                self.reporter.info(note);
            }
            (Verdict::Passed, None) => self.reporter.success(&format!("{name} ({secs:.2}s)")),
            (Verdict::Failed, detail) => self.reporter.failure(&format!(
                "{name} ({secs:.2}s): {}",
                detail.as_deref().unwrap_or("failed")
            )),
            (Verdict::Skipped, detail) => self
                .reporter
                .skipped(&format!("{name}: {}", detail.as_deref().unwrap_or("skipped"))),
        }
        if result.trace_failures > 0 && result.verdict == Verdict::Passed {
            self.reporter.warning(&format!(
                "{name}: recovered from {} locator/action failure(s)",
                result.trace_failures
            ));
        }
    }
}

/// Chromium for every scenario
#[cfg(feature = "browser")]
#[derive(Debug, Clone)]
pub struct ChromiumFactory {
    config: waymark::cdp::BrowserConfig,
}

#[cfg(feature = "browser")]
impl ChromiumFactory {
    /// Factory launching chromium with `config`
    #[must_use]
    pub const fn new(config: waymark::cdp::BrowserConfig) -> Self {
        Self { config }
    }
}

#[cfg(feature = "browser")]
impl DriverFactory for ChromiumFactory {
    type Driver = waymark::cdp::CdpDriver;

    fn launch(&mut self, _scenario: Scenario) -> CliResult<Self::Driver> {
        Ok(waymark::cdp::CdpDriver::launch(&self.config)?)
    }

    fn release(&mut self, driver: Self::Driver) -> CliResult<()> {
        driver.close().map_err(CliError::from)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use waymark::pages::{Office, Site};
    use waymark::{LocatorCandidate, MockDriver, MockElement, TraceEntry};

    /// Serves a contacts site; `broken` scenarios get no browser
    struct MockFactory {
        launched: Vec<Scenario>,
        released: usize,
        broken: Vec<Scenario>,
    }

    impl MockFactory {
        fn new() -> Self {
            Self {
                launched: Vec::new(),
                released: 0,
                broken: Vec::new(),
            }
        }
    }

    impl DriverFactory for MockFactory {
        type Driver = MockDriver;

        fn launch(&mut self, scenario: Scenario) -> CliResult<MockDriver> {
            if self.broken.contains(&scenario) {
                return Err(CliError::config("no chromium"));
            }
            self.launched.push(scenario);
            let driver = MockDriver::new("about:blank").with_element(
                MockElement::new(LocatorCandidate::link_text("Contact us"))
                    .on_page("://site")
                    .navigates_to("https://site/contacts/"),
            );
            for office in [Office::poland(), Office::estonia()] {
                let on_contacts = |element: waymark::LogicalElement| {
                    MockElement::new(element.candidates()[0].clone()).on_page("/contacts")
                };
                driver.add_element(on_contacts(office.header()));
                for line in office.lines() {
                    driver.add_element(on_contacts(line));
                }
                driver.add_element(
                    on_contacts(office.registration()).with_text(office.registration_number.clone()),
                );
                driver.add_element(on_contacts(office.phone()).with_text(office.phone_display.clone()));
            }
            Ok(driver)
        }

        fn release(&mut self, _driver: MockDriver) -> CliResult<()> {
            self.released += 1;
            Ok(())
        }
    }

    fn runner() -> ScenarioRunner {
        ScenarioRunner::new(InteractionConfig::fast(), ProgressReporter::new(false, true))
    }

    fn ctx() -> ScenarioContext {
        ScenarioContext::new(Site::new("https://site"))
    }

    mod result_tests {
        use super::*;

        #[test]
        fn test_pass_result() {
            let result = ScenarioResult::pass(Scenario::Contacts, Duration::from_millis(100));
            assert_eq!(result.verdict, Verdict::Passed);
            assert!(result.detail.is_none());
        }

        #[test]
        fn test_fail_result() {
            let result = ScenarioResult::fail(Scenario::FailedLogin, "no banner", Duration::ZERO);
            assert_eq!(result.verdict, Verdict::Failed);
            assert_eq!(result.detail.as_deref(), Some("no banner"));
        }

        #[test]
        fn test_from_status() {
            let skipped = ScenarioResult::from_status(
                Scenario::SuccessfulLogin,
                Ok(ScenarioStatus::Skipped { reason: "no credentials".into() }),
                Duration::from_secs(1),
            );
            assert_eq!(skipped.verdict, Verdict::Skipped);
            assert_eq!(skipped.duration, Duration::ZERO);

            let failed = ScenarioResult::from_status(
                Scenario::Contacts,
                Err(CliError::scenario_failed("Poland phone mismatched")),
                Duration::from_secs(1),
            );
            assert_eq!(failed.detail.as_deref(), Some("Scenario failed: Poland phone mismatched"));
        }

        #[test]
        fn test_serialize() {
            let result = ScenarioResult::pass(Scenario::FailedLogin, Duration::from_secs(1));
            let json = serde_json::to_string(&result).unwrap();
            assert!(json.contains("\"failed-login\""));
            assert!(json.contains("\"passed\""));
        }
    }

    mod summary_tests {
        use super::*;

        #[test]
        fn test_counts() {
            let mut summary = RunSummary::new();
            summary.add(ScenarioResult::pass(Scenario::Contacts, Duration::ZERO));
            summary.add(ScenarioResult::fail(Scenario::Registration, "x", Duration::ZERO));
            summary.add(ScenarioResult::skip(Scenario::SuccessfulLogin, "no credentials"));
            assert_eq!(summary.total(), 3);
            assert_eq!(summary.passed(), 1);
            assert_eq!(summary.failed(), 1);
            assert_eq!(summary.skipped(), 1);
            assert!(!summary.all_passed());
            assert_eq!(summary.failures()[0].scenario, Scenario::Registration);
        }

        #[test]
        fn test_skips_do_not_fail_the_run() {
            let mut summary = RunSummary::new();
            summary.add(ScenarioResult::skip(Scenario::SuccessfulLogin, "no credentials"));
            assert!(summary.all_passed());
        }
    }

    mod runner_tests {
        use super::*;

        #[test]
        fn test_contacts_passes_with_fallback_recorded() {
            let mut factory = MockFactory::new();
            let summary = runner().run(&[Scenario::Contacts], &ctx(), &mut factory);
            assert!(summary.all_passed(), "{:?}", summary.results);
            // exact css misses, link text hits
            assert_eq!(summary.results[0].trace_failures, 1);
            assert_eq!(factory.released, 1);
        }

        #[test]
        fn test_each_scenario_gets_its_own_browser() {
            let mut factory = MockFactory::new();
            let summary = runner().run(
                &[Scenario::Contacts, Scenario::SuccessfulLogin, Scenario::Contacts],
                &ctx(),
                &mut factory,
            );
            assert_eq!(factory.launched.len(), 3);
            assert_eq!(summary.passed(), 2);
            assert_eq!(summary.skipped(), 1);
        }

        #[test]
        fn test_launch_failure_fails_only_that_scenario() {
            let mut factory = MockFactory::new();
            factory.broken.push(Scenario::FailedLogin);
            let summary = runner().run(&[Scenario::FailedLogin, Scenario::Contacts], &ctx(), &mut factory);
            assert_eq!(summary.failed(), 1);
            assert_eq!(summary.passed(), 1);
            assert!(summary.failures()[0]
                .detail
                .as_deref()
                .unwrap()
                .contains("no chromium"));
        }

        #[test]
        fn test_traces_written_per_scenario() {
            let dir = tempfile::tempdir().unwrap();
            let mut factory = MockFactory::new();
            let mut runner = runner().with_trace_out(Some(dir.path().join("traces")));
            runner.run(&[Scenario::Contacts], &ctx(), &mut factory);

            let path = dir.path().join("traces").join("contacts.json");
            let trace = waymark::InteractionTrace::load_json(&path).unwrap();
            assert_eq!(trace.label, "contacts");
            let failures: Vec<&TraceEntry> = trace.failures();
            assert_eq!(failures.len(), 1);
        }
    }
}
