//! Config command handler

use crate::commands::{ConfigArgs, ConfigCommand};
use crate::error::{CliError, CliResult};
use std::path::Path;
use waymark::InteractionConfig;

/// Load `path` (validated), or the defaults when no file is given
pub fn load_interaction_config(path: Option<&Path>) -> CliResult<InteractionConfig> {
    let Some(path) = path else {
        return Ok(InteractionConfig::default());
    };
    if !path.exists() {
        return Err(CliError::config(format!(
            "config file not found: {}",
            path.display()
        )));
    }
    InteractionConfig::load(path)
        .map_err(|e| CliError::config(format!("{}: {e}", path.display())))
}

/// Render the effective configuration as YAML
pub fn render_config(path: Option<&Path>) -> CliResult<String> {
    Ok(load_interaction_config(path)?.to_yaml()?)
}

/// Execute the config command
pub fn execute_config(args: &ConfigArgs) -> CliResult<()> {
    match &args.command {
        ConfigCommand::Show { config } => {
            print!("{}", render_config(config.as_deref())?);
        }
        ConfigCommand::Validate { path } => {
            load_interaction_config(Some(path))?;
            println!("{}: ok", path.display());
        }
    }
    Ok(())
}
