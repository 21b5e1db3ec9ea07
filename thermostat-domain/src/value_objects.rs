//! Value Objects for the Thermostat Domain
//!
//! Immutable domain primitives. None of them parse or reinterpret the
//! text they carry beyond what their constructor documents.

use std::fmt;
use std::str::FromStr;

/// Domain errors for value object validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// HTTP verb outside GET/POST/PUT/DELETE
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),
}

// =============================================================================
// Measurement
// =============================================================================

/// Raw temperature reading as produced by the sensor subsystem.
///
/// # Invariants
/// - Text is kept byte-for-byte; no trimming, no parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measurement(String);

impl Measurement {
    /// Wrap sensor text verbatim
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Borrow the raw text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Take the raw text back
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Whether the sensor produced an empty reading
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// DesiredState
// =============================================================================

/// Whether the remote service wants the heater running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DesiredState(bool);

impl DesiredState {
    /// Literal the status endpoint returns when heating is requested
    pub const HEAT_ON_BODY: &'static str = "true";

    /// Derive the desired state from a raw status response body.
    ///
    /// Only the exact, case-sensitive, untrimmed body `true` turns the
    /// heater on. Everything else, including an empty body, means off.
    pub fn from_status_body(body: &str) -> Self {
        Self(body == Self::HEAT_ON_BODY)
    }

    /// Heater should be on
    pub fn is_heating(&self) -> bool {
        self.0
    }
}

impl From<bool> for DesiredState {
    fn from(heating: bool) -> Self {
        Self(heating)
    }
}

// =============================================================================
// ActuatorCommand
// =============================================================================

/// Command written to the heater actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCommand {
    /// Heater on
    On,
    /// Heater off
    Off,
}

impl ActuatorCommand {
    /// Exact text written to the actuator sink
    pub fn as_str(&self) -> &'static str {
        match self {
            ActuatorCommand::On => "ON",
            ActuatorCommand::Off => "OFF",
        }
    }
}

impl From<DesiredState> for ActuatorCommand {
    fn from(state: DesiredState) -> Self {
        if state.is_heating() {
            ActuatorCommand::On
        } else {
            ActuatorCommand::Off
        }
    }
}

impl fmt::Display for ActuatorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// HttpMethod
// =============================================================================

/// HTTP verbs the agent is allowed to issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// Read, never carries a body
    Get,
    /// Create
    Post,
    /// Replace
    Put,
    /// Remove
    Delete,
}

impl HttpMethod {
    /// Upper-case wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Mutating verbs carry a body and follow redirects
    pub fn is_mutating(&self) -> bool {
        !matches!(self, HttpMethod::Get)
    }
}

impl FromStr for HttpMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            _ => Err(DomainError::InvalidMethod(s.to_string())),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measurement_keeps_text_verbatim() {
        let m = Measurement::new(" 72.5\n");
        assert_eq!(m.as_str(), " 72.5\n");
        assert_eq!(m.to_string(), " 72.5\n");
        assert_eq!(m.into_inner(), " 72.5\n");
    }

    #[test]
    fn test_desired_state_exact_true_only() {
        assert!(DesiredState::from_status_body("true").is_heating());

        for body in ["True", "TRUE", "true ", " true", "true\n", "", "false", "{\"on\":true}", "1"] {
            assert!(
                !DesiredState::from_status_body(body).is_heating(),
                "body {:?} must not turn the heater on",
                body
            );
        }
    }

    #[test]
    fn test_actuator_command_from_desired_state() {
        assert_eq!(ActuatorCommand::from(DesiredState::from(true)), ActuatorCommand::On);
        assert_eq!(ActuatorCommand::from(DesiredState::from(false)), ActuatorCommand::Off);
        assert_eq!(ActuatorCommand::On.as_str(), "ON");
        assert_eq!(ActuatorCommand::Off.to_string(), "OFF");
    }

    #[test]
    fn test_http_method_parse() {
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert_eq!("Delete".parse::<HttpMethod>().unwrap(), HttpMethod::Delete);
        assert_eq!(
            "PATCH".parse::<HttpMethod>(),
            Err(DomainError::InvalidMethod("PATCH".to_string()))
        );
    }

    #[test]
    fn test_http_method_mutating() {
        assert!(!HttpMethod::Get.is_mutating());
        assert!(HttpMethod::Post.is_mutating());
        assert!(HttpMethod::Put.is_mutating());
        assert!(HttpMethod::Delete.is_mutating());
    }
}
