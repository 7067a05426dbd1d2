//! Error types for CLI operations.

use contracts::ContractError;
use ingestion::IngestionError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Loading, validating or applying the configuration failed
    #[error("Configuration error: {0}")]
    Config(#[from] ContractError),

    /// The synthetic rig rejected its parameters or could not start
    #[error("Stereo rig error: {0}")]
    Rig(#[from] IngestionError),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
