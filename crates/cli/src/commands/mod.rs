//! Command implementations.

mod info;
mod run;
mod validate;

use std::path::Path;

use contracts::ConditionerConfig;

use crate::error::{CliError, Result};

pub use info::run_info;
pub use run::run_pipeline;
pub use validate::run_validate;

/// Load and validate a configuration file.
pub(crate) fn load_config(path: &Path) -> Result<ConditionerConfig> {
    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()));
    }
    Ok(config_loader::ConfigLoader::load_from_path(path)?)
}
