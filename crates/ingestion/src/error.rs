//! Ingestion error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestionError {
    /// Rig parameters that cannot produce a usable stream
    #[error("invalid mock rig config: {field}: {message}")]
    InvalidConfig { field: &'static str, message: String },

    /// Every receiver is gone
    #[error("channel closed for rig {rig}")]
    ChannelClosed { rig: String },

    #[error("rig {rig} is already running")]
    AlreadyRunning { rig: String },
}

impl IngestionError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestionError>;
