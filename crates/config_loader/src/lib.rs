//! # Config Loader
//!
//! Loads a sync session description: the `[engine]` settings handed to
//! `SyncEngine::with_config`, the initial `[correlation]` and the
//! `[simulation]` scenario the CLI drives.
//!
//! Files are TOML or JSON by extension. [`ConfigOverrides`] layer command-line
//! or environment values over the file before validation, so an override can
//! fix an invalid file value and an invalid override is rejected.
//!
//! # Example
//!
//! ```no_run
//! use config_loader::{ConfigLoader, ConfigOverrides};
//! use std::path::Path;
//!
//! let overrides = ConfigOverrides {
//!     tolerance_ms: Some(20.0),
//!     ..Default::default()
//! };
//! let config = ConfigLoader::load_with_overrides(Path::new("media-sync.toml"), &overrides).unwrap();
//! println!("tolerance: {} ms", config.engine.tolerance_ms);
//! ```

mod overrides;
mod parser;
mod validator;

pub use contracts::MediaSyncConfig;
pub use overrides::ConfigOverrides;
pub use parser::{render, ConfigFormat};

use contracts::ContractError;
use std::path::Path;
use tracing::{debug, info};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate a file; format comes from the extension
    pub fn load_from_path(path: &Path) -> Result<MediaSyncConfig, ContractError> {
        Self::load_with_overrides(path, &ConfigOverrides::default())
    }

    /// Load a file, apply `overrides`, then validate the result
    ///
    /// # Errors
    /// - File read failure or unsupported extension
    /// - Parse failure
    /// - Validation failure of the overridden configuration
    pub fn load_with_overrides(
        path: &Path,
        overrides: &ConfigOverrides,
    ) -> Result<MediaSyncConfig, ContractError> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        let mut config = parser::parse(&content, format)?;

        let applied = overrides.apply(&mut config);
        if !applied.is_empty() {
            info!(path = %path.display(), fields = ?applied, "Config overrides applied");
        }

        validator::validate(&config)?;
        debug!(
            path = %path.display(),
            tolerance_ms = config.engine.tolerance_ms,
            poll_interval_ms = config.engine.poll_interval_ms,
            events = config.simulation.events.len(),
            "Config loaded"
        );
        Ok(config)
    }

    /// Parse and validate in-memory content
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<MediaSyncConfig, ContractError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }

    /// Validate an already-built configuration
    pub fn validate(config: &MediaSyncConfig) -> Result<(), ContractError> {
        validator::validate(config)
    }
}
