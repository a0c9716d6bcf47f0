//! Command implementations.

mod info;
mod run;
mod validate;

pub use info::run_info;
pub use run::run_session;
pub use validate::run_validate;

use std::path::Path;

use anyhow::{Context, Result};
use config_loader::{ConfigLoader, ConfigOverrides};
use contracts::{ContractError, MediaSyncConfig};

use crate::error::CliError;

/// Load a configuration file with `overrides` applied before validation
///
/// Fails early with a clear message if the file is missing; a validation
/// failure of the overridden result surfaces as [`CliError::ConfigValidation`].
fn load_config(path: &Path, overrides: &ConfigOverrides) -> Result<MediaSyncConfig> {
    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()).into());
    }

    match ConfigLoader::load_with_overrides(path, overrides) {
        Err(e @ ContractError::ConfigValidation { .. }) if !overrides.is_empty() => {
            Err(CliError::config_validation(e.to_string()).into())
        }
        result => {
            result.with_context(|| format!("Failed to load config from {}", path.display()))
        }
    }
}
