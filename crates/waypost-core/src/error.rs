//! Error types for the Waypost core.

/// Core error type for Waypost startup and configuration.
#[derive(Debug, thiserror::Error)]
pub enum WaypostError {
    /// An environment variable held a value that could not be interpreted.
    #[error("invalid value for {key}: {value}")]
    InvalidSetting {
        /// The environment variable name.
        key: String,
        /// The raw value that was rejected.
        value: String,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal error with context.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Convenience result type for Waypost core operations.
pub type WaypostResult<T> = Result<T, WaypostError>;
