//! Error handling module for installkit
//!
//! Provides centralized error handling with proper error types using thiserror.
//! Task bodies use these types internally and convert them into an
//! [`Outcome`](crate::task::Outcome) at the task boundary; only
//! [`InstallKitError::InstallationFailed`] crosses a [`Sequence`](crate::sequence::Sequence).

use thiserror::Error;

/// Main error type for installkit
#[derive(Error, Debug)]
pub enum InstallKitError {
    /// IO errors (file operations, process spawning)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A resource was read before any task set it
    #[error("Resource not found: {key}")]
    ResourceNotFound { key: String },

    /// A resource exists but holds a value of another type
    #[error("Resource `{key}` does not hold a value of type {expected}")]
    ResourceTypeMismatch { key: String, expected: &'static str },

    /// A file a task had to act on does not exist
    #[error("File not found: {}", path.display())]
    FileNotFound { path: std::path::PathBuf },

    /// A task in a sequence reported failure
    #[error("Installation of {task} failed. Error: {message}")]
    InstallationFailed { task: String, message: String },

    /// A shell command exited with a non-zero status
    #[error(
        "Command `{command}` returned non-zero exit status {}: {stderr}",
        exit_code.map_or_else(|| "(signal)".to_string(), |c| c.to_string())
    )]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    /// Malformed `HIVE\subkey\...\value` path
    #[error("Invalid registry path `{path}`: {reason}")]
    InvalidRegistryPath { path: String, reason: String },

    /// The registry key or value does not exist
    #[error("Registry value not found: {path}")]
    RegistryValueNotFound { path: String },

    /// Other configuration store failures
    #[error("Registry error: {0}")]
    Registry(String),

    /// Validation errors (plan contents, task parameters)
    #[error("Validation error: {0}")]
    Validation(String),

    /// State errors (invalid sequence transitions)
    #[error("State error: {0}")]
    State(String),

    /// General errors (catch-all for edge cases)
    #[error("{0}")]
    General(String),
}

/// Result type alias for installkit operations
pub type Result<T> = std::result::Result<T, InstallKitError>;

// Convenient error constructors
impl InstallKitError {
    /// Create a resource-not-found error
    pub fn resource_not_found(key: impl Into<String>) -> Self {
        Self::ResourceNotFound { key: key.into() }
    }

    /// Create a file-not-found error
    pub fn file_not_found(path: impl Into<std::path::PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create an installation failure for the named task
    pub fn installation_failed(task: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InstallationFailed {
            task: task.into(),
            message: message.into(),
        }
    }

    /// Create an invalid registry path error
    pub fn invalid_registry_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRegistryPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a registry error
    pub fn registry(msg: impl Into<String>) -> Self {
        Self::Registry(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a state error
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Create a general error
    pub fn general(msg: impl Into<String>) -> Self {
        Self::General(msg.into())
    }

    /// Returns true if this is a missing-resource error
    pub fn is_resource_not_found(&self) -> bool {
        matches!(self, Self::ResourceNotFound { .. })
    }
}
