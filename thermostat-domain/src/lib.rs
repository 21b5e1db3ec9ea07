//! Thermostat Domain Layer
//!
//! Pure domain values with zero I/O dependencies: what the sensor reports,
//! what the remote service wants, and what the heater is told.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Public modules
pub mod value_objects;

// Re-export commonly used types
pub use value_objects::{ActuatorCommand, DesiredState, DomainError, HttpMethod, Measurement};
