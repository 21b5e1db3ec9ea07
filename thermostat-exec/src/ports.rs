//! Execution layer port definitions.
//!
//! Ports define the interfaces for the things the control loop drives.
//! Adapters implement these ports for specific backends (files, HTTP, stub).

use async_trait::async_trait;

use thermostat_domain::{ActuatorCommand, DesiredState, Measurement};

use crate::error::ExecError;

// =============================================================================
// Sensor Port
// =============================================================================

/// Port for reading the current temperature.
///
/// Implementations:
/// - `FileSensor` - Reads the file written by the sensor subsystem
/// - `StubSensor` - For testing (configurable reading)
#[async_trait]
pub trait SensorPort: Send + Sync {
    /// Whether the temperature source exists right now.
    ///
    /// Checked once at startup; a missing source there is fatal.
    fn is_present(&self) -> bool;

    /// Read the whole current reading, untouched.
    ///
    /// Returns `ExecError::SensorNotFound` if the source is absent or
    /// cannot be opened.
    async fn read(&self) -> Result<Measurement, ExecError>;
}

// =============================================================================
// Actuator Port
// =============================================================================

/// Port for commanding the heater.
///
/// Implementations:
/// - `FileActuator` - Overwrites the status file read by the heater driver
/// - `StubActuator` - For testing (records commands)
#[async_trait]
pub trait ActuatorPort: Send + Sync {
    /// Whether the actuator sink exists right now.
    fn is_present(&self) -> bool;

    /// Replace the actuator state with `command`.
    ///
    /// Returns `ExecError::ActuatorWrite` if the sink cannot be written.
    async fn write(&self, command: ActuatorCommand) -> Result<(), ExecError>;
}

// =============================================================================
// Thermostat API Port
// =============================================================================

/// Port for the remote thermostat service.
///
/// Implementations:
/// - `RemoteThermostatApi` - HTTP (thermostat-connectors)
/// - `StubThermostatApi` - For testing (scripted responses)
///
/// Neither operation retries; retry policy belongs to the caller.
#[async_trait]
pub trait ThermostatApiPort: Send + Sync {
    /// Submit one measurement to the measurement endpoint.
    async fn publish(&self, measurement: &Measurement) -> Result<(), ExecError>;

    /// Ask the status endpoint whether the heater should run.
    ///
    /// A transport failure is returned as an error; no state is made up.
    async fn fetch_desired_state(&self) -> Result<DesiredState, ExecError>;
}
