//! Execution layer error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while talking to the sensor, actuator or remote API.
#[derive(Debug, Clone, Error)]
pub enum ExecError {
    /// Temperature source missing or unreadable
    #[error("Sensor not found at {path}: {reason}")]
    SensorNotFound { path: PathBuf, reason: String },

    /// Actuator sink could not be written; heater state is unknown
    #[error("Unknown heater state, write to {path} failed: {reason}")]
    ActuatorWrite { path: PathBuf, reason: String },

    /// HTTP request failed to be delivered or was not successful
    #[error("Transport error: {0}")]
    Transport(String),

    /// HTTP request exceeded its time bound
    #[error("Timeout: {0}")]
    Timeout(String),
}

impl ExecError {
    /// Whether this error came from the network side.
    pub fn is_transport(&self) -> bool {
        matches!(self, ExecError::Transport(_) | ExecError::Timeout(_))
    }
}

/// Result type for execution operations.
pub type ExecResult<T> = Result<T, ExecError>;
