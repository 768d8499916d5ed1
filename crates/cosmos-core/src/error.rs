use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading [`CosmosSettings`](crate::CosmosSettings).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Settings file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Missing required setting: {0}")]
    MissingKey(String),

    #[error("Invalid setting {key}: {reason}")]
    Invalid { key: String, reason: String },

    #[error("Failed to read settings: {0}")]
    Source(#[from] config::ConfigError),
}

impl ConfigError {
    /// True for the "configuration missing" family: absent file or absent key.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::FileNotFound(_) | Self::MissingKey(_))
    }

    pub(crate) fn invalid(key: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}
