//! Estimator parameter policy.

use std::collections::BTreeMap;

use contracts::REG_STRATEGY_KEY;
use tracing::warn;

/// Stereo odometry only supports visual registration (`Reg/Strategy = 0`).
///
/// Any other value is overridden with a warning; a missing key is inserted.
/// Returns `true` when an explicit value was overridden.
pub fn enforce_estimator_parameters(parameters: &mut BTreeMap<String, String>) -> bool {
    let overridden = match parameters.get(REG_STRATEGY_KEY) {
        Some(value) if value != "0" => {
            warn!(
                key = REG_STRATEGY_KEY,
                value = %value,
                "stereo odometry works only with \"Reg/Strategy\"=0, ignoring configured value"
            );
            true
        }
        _ => false,
    };
    parameters.insert(REG_STRATEGY_KEY.to_string(), "0".to_string());
    overridden
}
