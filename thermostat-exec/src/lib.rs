//! Thermostat Execution Layer
//!
//! Ports for everything the control loop touches, plus the adapters that
//! live on this machine.
//!
//! # Architecture
//!
//! ```text
//! SensorPort → ThermostatApiPort (publish, fetch) → ActuatorPort
//! ```
//!
//! # Components
//!
//! - **Ports**: Traits for the sensor, the actuator and the remote API
//! - **Local**: File-backed sensor and actuator
//! - **Stub**: Recording implementations for tests and dry runs
//!
//! # Example
//!
//! ```rust,ignore
//! use thermostat_exec::{ActuatorPort, FileActuator, FileSensor, SensorPort};
//!
//! let sensor = FileSensor::new("/tmp/temp");
//! let actuator = FileActuator::new("/tmp/status");
//!
//! let reading = sensor.read().await?;
//! actuator.write(ActuatorCommand::On).await?;
//! ```

#![warn(clippy::all)]

pub mod error;
pub mod local;
pub mod ports;
pub mod stub;

// Re-exports for convenience
pub use error::{ExecError, ExecResult};
pub use local::{FileActuator, FileSensor};
pub use ports::{ActuatorPort, SensorPort, ThermostatApiPort};
pub use stub::{StubActuator, StubSensor, StubThermostatApi};
