//! Daemon error types and process exit statuses.

use std::fmt;
use std::process::ExitCode;

use thermostat_connectors::HttpError;
use thermostat_exec::ExecError;
use thiserror::Error;

/// Daemon-level errors.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Sensor/actuator error
    #[error("Execution error: {0}")]
    Exec(#[from] ExecError),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    /// Temperature source or heater sink absent at startup
    #[error("Required local interface missing: {0}")]
    LocalInterfaceMissing(String),

    /// Ad-hoc request arguments rejected before any network call
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Runtime or signal handler could not be set up
    #[error("Process setup failed: {0}")]
    ProcessSetup(String),

    /// Control loop task ended abnormally
    #[error("Control loop aborted: {0}")]
    LoopAborted(String),
}

impl DaemonError {
    /// Exit status the process reports for this error.
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            DaemonError::Exec(e) if e.is_transport() => ExitStatus::TransportFailure,
            DaemonError::Exec(_) => ExitStatus::UnexpectedCondition,
            DaemonError::Http(HttpError::ClientInit(_)) => ExitStatus::InitFailure,
            DaemonError::Http(_) => ExitStatus::TransportFailure,
            DaemonError::LocalInterfaceMissing(_) => ExitStatus::LocalInterfaceMissing,
            DaemonError::Validation(_) => ExitStatus::RequestError,
            DaemonError::Config(_) => ExitStatus::InitFailure,
            DaemonError::ProcessSetup(_) => ExitStatus::ProcessSetupFailure,
            DaemonError::LoopAborted(_) => ExitStatus::UnexpectedCondition,
        }
    }
}

/// Result type for daemon operations.
pub type DaemonResult<T> = Result<T, DaemonError>;

// =============================================================================
// Exit Status
// =============================================================================

/// Every way the process can end, with a fixed exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Everything went fine
    Success,
    /// Runtime or signal handlers could not be installed
    ProcessSetupFailure,
    /// Stopped on SIGTERM after the in-flight cycle finished
    TerminationRequested,
    /// Stopped on a signal nobody asked for, or the loop died
    UnexpectedCondition,
    /// Ad-hoc arguments malformed or insufficient
    RequestError,
    /// Temperature source or heater sink missing at startup
    LocalInterfaceMissing,
    /// HTTP client or configuration could not be initialized
    InitFailure,
    /// Ad-hoc request could not be delivered
    TransportFailure,
}

impl ExitStatus {
    /// Numeric process exit code.
    pub fn code(&self) -> u8 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::ProcessSetupFailure => 1,
            ExitStatus::TerminationRequested => 2,
            ExitStatus::UnexpectedCondition => 3,
            ExitStatus::RequestError => 4,
            ExitStatus::LocalInterfaceMissing => 5,
            ExitStatus::InitFailure => 6,
            ExitStatus::TransportFailure => 7,
        }
    }

    /// Human-readable line logged on exit.
    pub fn message(&self) -> &'static str {
        match self {
            ExitStatus::Success => "Everything is just fine.",
            ExitStatus::ProcessSetupFailure => "Unable to set up the daemon process.",
            ExitStatus::TerminationRequested => "Received a termination signal; exiting.",
            ExitStatus::UnexpectedCondition => "An unexpected condition has come up, exiting.",
            ExitStatus::RequestError => "Requested resource is unavailable or the request is malformed.",
            ExitStatus::LocalInterfaceMissing => "File not found/opened.",
            ExitStatus::InitFailure => "Unable to initialize object.",
            ExitStatus::TransportFailure => "Request could not be delivered.",
        }
    }

    /// Whether this status ends the process successfully.
    pub fn is_success(&self) -> bool {
        matches!(self, ExitStatus::Success)
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status.code())
    }
}

// =============================================================================
// Tests
// =============================================================================
