use std::path::PathBuf;

use thiserror::Error;

/// Container Factory error types
#[derive(Error, Debug)]
pub enum FactoryError {
    /// Missing or invalid configuration (registry path, base directory, tag)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Build-instruction discovery failed
    #[error("Discovery error: {path}: {message}")]
    DiscoveryError { path: PathBuf, message: String },

    /// Dynamic build-instruction rewrite failed
    #[error("Rewrite error: {path}: {message}")]
    RewriteError { path: PathBuf, message: String },

    /// External build subprocess failed
    #[error("Build failed: {image} - {message}")]
    BuildFailed { image: String, message: String },

    /// Push to the remote registry failed after all attempts
    #[error("Push failed: {image} after {attempts} attempts - {message}")]
    PushFailed {
        image: String,
        attempts: u32,
        message: String,
    },

    /// Named deployment has no matching definition file
    #[error("Deployment does not exist: {0}")]
    DeploymentNotFound(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl FactoryError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            FactoryError::ConfigError(_) => 100,
            FactoryError::DeploymentNotFound(_) => 101,
            _ => 1,
        }
    }
}

impl From<serde_json::Error> for FactoryError {
    fn from(err: serde_json::Error) -> Self {
        FactoryError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for FactoryError {
    fn from(err: serde_yaml::Error) -> Self {
        FactoryError::SerializationError(err.to_string())
    }
}

/// Result type alias for Container Factory operations
pub type Result<T> = std::result::Result<T, FactoryError>;
