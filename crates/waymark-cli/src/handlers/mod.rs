//! Command handlers - extracted from main.rs for testability
//!
//! Each handler module contains:
//! - The execution logic for a CLI command
//! - Pure helper functions
//! - Tests

pub mod config;
pub mod run;

pub use config::{execute_config, load_interaction_config};
#[cfg(feature = "browser")]
pub use run::browser_config;
pub use run::{execute_run, interaction_config};
