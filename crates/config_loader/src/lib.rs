//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality
//! - Produce a `ConditionerConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("conditioner.toml")).unwrap();
//! println!("strategy: {}", config.sync.strategy.as_str());
//! ```

mod parser;
mod validator;

pub use contracts::ConditionerConfig;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Entry points for turning a file or string into a validated
/// [`ConditionerConfig`].
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load, parse and validate a `.toml` or `.json` file.
    ///
    /// Parse errors name the offending file.
    pub fn load_from_path(path: &Path) -> Result<ConditionerConfig, ContractError> {
        let format = ConfigFormat::from_path(path).ok_or_else(|| {
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            ContractError::config_parse(format!(
                "unsupported config format '.{ext}' for {} (expected .toml or .json)",
                path.display()
            ))
        })?;
        let content = std::fs::read_to_string(path)?;
        parser::parse(&content, format)
            .map_err(|e| match e {
                ContractError::ConfigParse { message, source } => ContractError::ConfigParse {
                    message: format!("{}: {message}", path.display()),
                    source,
                },
                other => other,
            })
            .and_then(|config| {
                validator::validate(&config)?;
                Ok(config)
            })
    }

    /// Parse and validate configuration text.
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<ConditionerConfig, ContractError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }

    /// Validate a configuration assembled in code (CLI overrides, tests).
    pub fn validate(config: &ConditionerConfig) -> Result<(), ContractError> {
        validator::validate(config)
    }

    pub fn to_toml(config: &ConditionerConfig) -> Result<String, ContractError> {
        toml::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    pub fn to_json(config: &ConditionerConfig) -> Result<String, ContractError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}
