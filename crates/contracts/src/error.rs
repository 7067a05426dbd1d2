//! Layered error definitions
//!
//! `FrameError` covers the per-frame path (every variant means "drop this
//! frame and wait for the next"); `ContractError` covers everything else.

use thiserror::Error;

use crate::FrameId;

/// Reasons a correlated tuple is dropped before reaching the estimator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameError {
    /// Encoding tag outside the accepted set
    #[error("unsupported encoding '{encoding}' (expected mono8, 8UC1, mono16, bgr8, rgb8, bgra8 or rgba8)")]
    UnsupportedEncoding { encoding: String },

    /// Buffer inconsistent with its declared geometry
    #[error("malformed image {width}x{height} step={step}: {message}")]
    MalformedImage {
        width: u32,
        height: u32,
        step: u32,
        message: String,
    },

    /// Non-rectified input but no rig transform between the cameras
    #[error("no calibration transform between '{target}' and '{source_frame}'")]
    MissingCalibrationTransform {
        target: FrameId,
        source_frame: FrameId,
    },

    /// Rig transform lookup answered identity
    #[error("identity calibration transform between '{target}' and '{source_frame}'")]
    DegenerateCalibrationTransform {
        target: FrameId,
        source_frame: FrameId,
    },

    /// Rectified input with a non-positive baseline
    #[error("stereo baseline {baseline} must be positive (baseline = -Tx/fx)")]
    InvalidBaseline { baseline: f64 },

    /// One or both images carry no pixels
    #[error("input images empty (left={left_empty}, right={right_empty})")]
    EmptyImage { left_empty: bool, right_empty: bool },

    /// Body frame -> sensor frame unavailable
    #[error("no transform from '{base_frame}' to '{sensor_frame}'")]
    MissingBodyTransform {
        base_frame: FrameId,
        sensor_frame: FrameId,
    },
}

impl FrameError {
    /// Short, stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            FrameError::UnsupportedEncoding { .. } => "unsupported_encoding",
            FrameError::MalformedImage { .. } => "malformed_image",
            FrameError::MissingCalibrationTransform { .. } => "missing_calibration_transform",
            FrameError::DegenerateCalibrationTransform { .. } => {
                "degenerate_calibration_transform"
            }
            FrameError::InvalidBaseline { .. } => "invalid_baseline",
            FrameError::EmptyImage { .. } => "empty_image",
            FrameError::MissingBodyTransform { .. } => "missing_body_transform",
        }
    }

    pub fn unsupported_encoding(encoding: impl Into<String>) -> Self {
        Self::UnsupportedEncoding {
            encoding: encoding.into(),
        }
    }

    pub fn malformed(width: u32, height: u32, step: u32, message: impl Into<String>) -> Self {
        Self::MalformedImage {
            width,
            height,
            step,
            message: message.into(),
        }
    }
}

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Frame Errors =====
    #[error("frame dropped: {0}")]
    Frame(#[from] FrameError),

    // ===== Estimator Errors =====
    #[error("estimator error: {message}")]
    Estimator { message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn estimator(message: impl Into<String>) -> Self {
        Self::Estimator {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_error_wraps_into_contract_error() {
        let err: ContractError = FrameError::InvalidBaseline { baseline: -0.1 }.into();
        assert!(err.to_string().contains("must be positive"));
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(
            FrameError::unsupported_encoding("yuv422").kind(),
            "unsupported_encoding"
        );
        assert_eq!(
            FrameError::EmptyImage {
                left_empty: true,
                right_empty: false
            }
            .kind(),
            "empty_image"
        );
    }
}
