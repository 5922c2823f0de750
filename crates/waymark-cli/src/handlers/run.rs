//! Run command handler

use crate::commands::RunArgs;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::handlers::config::load_interaction_config;
use crate::output::ProgressReporter;
use crate::runner::{RunSummary, ScenarioRunner};
use crate::scenarios::ScenarioContext;
use tracing::info;
use waymark::pages::Site;
use waymark::InteractionConfig;

/// Interaction config from `--config`, with `--allow-manual-intervention`
/// layered on top
pub fn interaction_config(args: &RunArgs) -> CliResult<InteractionConfig> {
    let mut config = load_interaction_config(args.config.as_deref())?;
    if args.allow_manual_intervention {
        config = config.with_manual_intervention(true);
    }
    config.validate()?;
    Ok(config)
}

/// Chromium settings from the browser flags
#[cfg(feature = "browser")]
#[must_use]
pub fn browser_config(args: &RunArgs) -> waymark::cdp::BrowserConfig {
    let mut config = waymark::cdp::BrowserConfig::default().with_headless(!args.headed);
    if args.no_sandbox {
        config = config.with_no_sandbox();
    }
    if let Some(path) = &args.chromium_path {
        config = config.with_chromium_path(path.clone());
    }
    config
}

fn context(args: &RunArgs) -> CliResult<ScenarioContext> {
    if !args.base_url.starts_with("http://") && !args.base_url.starts_with("https://") {
        return Err(CliError::invalid_argument(format!(
            "--base-url must be an http(s) URL, got {}",
            args.base_url
        )));
    }
    Ok(ScenarioContext::new(Site::new(&args.base_url))
        .with_credentials(args.email.clone(), args.password.clone()))
}

/// Execute the run command
pub fn execute_run(config: &CliConfig, args: &RunArgs) -> CliResult<RunSummary> {
    let interaction = interaction_config(args)?;
    let ctx = context(args)?;
    let scenarios = args.scenario.scenarios();
    info!(
        scenarios = scenarios.len(),
        manual_intervention = interaction.allow_manual_intervention,
        "starting run"
    );

    let reporter = ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet());
    let mut runner = ScenarioRunner::new(interaction, reporter).with_trace_out(args.trace_out.clone());
    run_in_browser(&mut runner, &scenarios, &ctx, args)
}

#[cfg(feature = "browser")]
fn run_in_browser(
    runner: &mut ScenarioRunner,
    scenarios: &[crate::scenarios::Scenario],
    ctx: &ScenarioContext,
    args: &RunArgs,
) -> CliResult<RunSummary> {
    let mut factory = crate::runner::ChromiumFactory::new(browser_config(args));
    Ok(runner.run(scenarios, ctx, &mut factory))
}

#[cfg(not(feature = "browser"))]
fn run_in_browser(
    _runner: &mut ScenarioRunner,
    _scenarios: &[crate::scenarios::Scenario],
    _ctx: &ScenarioContext,
    _args: &RunArgs,
) -> CliResult<RunSummary> {
    Err(CliError::config(
        "browser support not compiled in. Rebuild with --features browser",
    ))
}
