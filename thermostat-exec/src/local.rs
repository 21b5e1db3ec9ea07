//! File-backed sensor and actuator.
//!
//! The sensor subsystem keeps the latest reading in a text file and the
//! heater driver polls a second text file for `ON`/`OFF`. Both paths are
//! fixed by configuration.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use thermostat_domain::{ActuatorCommand, Measurement};

use crate::error::ExecError;
use crate::ports::{ActuatorPort, SensorPort};

// =============================================================================
// File Sensor
// =============================================================================

/// Reads the temperature file verbatim. Invalid UTF-8 is replaced, not rejected.
#[derive(Debug, Clone)]
pub struct FileSensor {
    path: PathBuf,
}

impl FileSensor {
    /// Create a sensor reading from `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the temperature source.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SensorPort for FileSensor {
    fn is_present(&self) -> bool {
        self.path.exists()
    }

    async fn read(&self) -> Result<Measurement, ExecError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| ExecError::SensorNotFound {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        let text = String::from_utf8_lossy(&bytes).into_owned();

        debug!(path = %self.path.display(), bytes = text.len(), "Read temperature");
        Ok(Measurement::new(text))
    }
}

// =============================================================================
// File Actuator
// =============================================================================

/// Overwrites the heater status file with `ON` or `OFF`.
#[derive(Debug, Clone)]
pub struct FileActuator {
    path: PathBuf,
}

impl FileActuator {
    /// Create an actuator writing to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the actuator sink.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ActuatorPort for FileActuator {
    fn is_present(&self) -> bool {
        self.path.exists()
    }

    async fn write(&self, command: ActuatorCommand) -> Result<(), ExecError> {
        // Truncating write: the file holds exactly the last command.
        tokio::fs::write(&self.path, command.as_str())
            .await
            .map_err(|e| ExecError::ActuatorWrite {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        debug!(path = %self.path.display(), %command, "Wrote heater state");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
