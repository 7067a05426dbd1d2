//! Configuration validation
//!
//! Rules:
//! - field ranges declared on the config types (`validator` derive)
//! - transform edges: non-empty names, no self edges, one parent per frame,
//!   finite values
//! - estimator parameter keys non-empty

use std::collections::HashSet;

use contracts::{ConditionerConfig, ContractError};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// Validate a parsed configuration.
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &ConditionerConfig) -> Result<(), ContractError> {
    config.validate().map_err(|e| first_error("", &e))?;
    validate_transforms(config)?;
    validate_estimator_keys(config)?;
    Ok(())
}

/// Flatten the first (in key order) validation failure into a field path.
fn first_error(prefix: &str, errors: &ValidationErrors) -> ContractError {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (name, kind) in fields {
        let path = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}.{name}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                if let Some(error) = list.first() {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("failed '{}' check", error.code));
                    return ContractError::config_validation(path, message);
                }
            }
            ValidationErrorsKind::Struct(inner) => return first_error(&path, inner),
            ValidationErrorsKind::List(items) => {
                if let Some((index, inner)) = items.iter().next() {
                    return first_error(&format!("{path}[{index}]"), inner);
                }
            }
        }
    }
    ContractError::config_validation(prefix, "invalid value")
}

fn validate_transforms(config: &ConditionerConfig) -> Result<(), ContractError> {
    let mut children = HashSet::new();
    for (idx, edge) in config.transforms.iter().enumerate() {
        if edge.parent.is_empty() || edge.child.is_empty() {
            return Err(ContractError::config_validation(
                format!("transforms[{idx}]"),
                "parent and child frame names cannot be empty",
            ));
        }
        if edge.parent == edge.child {
            return Err(ContractError::config_validation(
                format!("transforms[{idx}]"),
                format!("frame '{}' cannot be its own parent", edge.child),
            ));
        }
        if !children.insert(edge.child.as_str()) {
            return Err(ContractError::config_validation(
                format!("transforms[{idx}].child"),
                format!("duplicate child frame '{}'", edge.child),
            ));
        }
        let finite = edge
            .translation
            .iter()
            .chain(edge.rotation_rpy.iter())
            .all(|v| v.is_finite());
        if !finite {
            return Err(ContractError::config_validation(
                format!("transforms[{idx}]"),
                "translation and rotation must be finite",
            ));
        }
    }
    Ok(())
}

fn validate_estimator_keys(config: &ConditionerConfig) -> Result<(), ContractError> {
    if config.estimator.keys().any(|k| k.trim().is_empty()) {
        return Err(ContractError::config_validation(
            "estimator",
            "parameter names cannot be empty",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::StaticTransformConfig;

    fn edge(parent: &str, child: &str) -> StaticTransformConfig {
        StaticTransformConfig {
            parent: parent.into(),
            child: child.into(),
            translation: [0.0, 0.0, 1.0],
            rotation_rpy: [0.0; 3],
        }
    }

    #[test]
    fn test_default_config_valid() {
        assert!(validate(&ConditionerConfig::default()).is_ok());
    }

    #[test]
    fn test_range_error_has_field_path() {
        let mut config = ConditionerConfig::default();
        config.sync.queue_size = 0;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("sync.queue_size"), "{err}");
    }

    #[test]
    fn test_empty_base_frame_rejected() {
        let mut config = ConditionerConfig::default();
        config.frames.base_frame_id.clear();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("base_frame_id cannot be empty"), "{err}");
    }

    #[test]
    fn test_non_positive_interval_rejected() {
        let mut config = ConditionerConfig::default();
        config.sync.max_interval_sec = 0.0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_duplicate_child_rejected() {
        let mut config = ConditionerConfig::default();
        config.transforms = vec![edge("base_link", "left"), edge("odom", "left")];
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_self_edge_rejected() {
        let mut config = ConditionerConfig::default();
        config.transforms = vec![edge("left", "left")];
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_non_finite_transform_rejected() {
        let mut config = ConditionerConfig::default();
        let mut bad = edge("base_link", "left");
        bad.translation[0] = f64::NAN;
        config.transforms = vec![bad];
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_empty_estimator_key_rejected() {
        let mut config = ConditionerConfig::default();
        config.estimator.insert(" ".into(), "1".into());
        assert!(validate(&config).is_err());
    }
}
