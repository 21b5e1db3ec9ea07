//! Daemon configuration.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use thermostat_connectors::ThermostatEndpoints;

use crate::error::{DaemonError, DaemonResult};

// =============================================================================
// Configuration
// =============================================================================

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Local sensor/actuator files
    pub local: LocalConfig,

    /// Remote service configuration
    pub remote: RemoteConfig,

    /// Pause between control cycles
    pub poll_interval: Duration,

    /// Log output format
    pub log_format: LogFormat,
}

/// Local file interfaces.
#[derive(Debug, Clone)]
pub struct LocalConfig {
    /// File written by the sensor subsystem
    pub temperature_path: PathBuf,
    /// File read by the heater driver
    pub status_path: PathBuf,
}

/// Remote service configuration.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Measurement submission endpoint
    pub measurement_url: String,
    /// Desired-state endpoint
    pub status_url: String,
    /// Per-request bound
    pub request_timeout: Duration,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines
    Pretty,
    /// One JSON object per line
    Json,
}

const DEFAULT_TEMPERATURE_PATH: &str = "/tmp/temp";
const DEFAULT_STATUS_PATH: &str = "/tmp/status";
const DEFAULT_MEASUREMENT_URL: &str = "http://localhost:8000/measurements";
const DEFAULT_STATUS_URL: &str = "http://localhost:8000/status";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 3;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 2;

/// Load a `.env` file into the environment if present (errors ignored).
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

/// Key lookup backed by the process environment.
pub fn env_lookup(key: &str) -> Option<String> {
    env::var(key).ok()
}

impl LogFormat {
    /// Read `THERMOSTAT_LOG_FORMAT`, defaulting to pretty.
    pub fn from_lookup<F>(lookup: &F) -> DaemonResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup("THERMOSTAT_LOG_FORMAT")
            .unwrap_or_else(|| "pretty".to_string())
            .to_lowercase()
            .as_str()
        {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(DaemonError::Config(format!(
                "Invalid THERMOSTAT_LOG_FORMAT: {}. Expected: pretty, json",
                other
            ))),
        }
    }
}

impl Config {
    /// Load configuration from environment variables (after [`load_dotenv`]).
    pub fn from_env() -> DaemonResult<Self> {
        Self::from_lookup(env_lookup)
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> DaemonResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let local = LocalConfig {
            temperature_path: lookup("THERMOSTAT_TEMPERATURE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPERATURE_PATH)),
            status_path: lookup("THERMOSTAT_STATUS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATUS_PATH)),
        };

        let poll_interval = Self::load_secs(
            &lookup,
            "THERMOSTAT_POLL_INTERVAL_SECS",
            DEFAULT_POLL_INTERVAL_SECS,
        )?;
        let request_timeout = Self::request_timeout_from_lookup(&lookup)?;

        let remote = RemoteConfig {
            measurement_url: Self::load_url(&lookup, "THERMOSTAT_MEASUREMENT_URL", DEFAULT_MEASUREMENT_URL)?,
            status_url: Self::load_url(&lookup, "THERMOSTAT_STATUS_URL", DEFAULT_STATUS_URL)?,
            request_timeout,
        };

        let log_format = LogFormat::from_lookup(&lookup)?;

        Ok(Self {
            local,
            remote,
            poll_interval,
            log_format,
        })
    }

    /// Create test configuration.
    pub fn test() -> Self {
        Self {
            local: LocalConfig {
                temperature_path: PathBuf::from("/nonexistent/temp"),
                status_path: PathBuf::from("/nonexistent/status"),
            },
            remote: RemoteConfig {
                measurement_url: "http://127.0.0.1:0/measurements".to_string(),
                status_url: "http://127.0.0.1:0/status".to_string(),
                request_timeout: Duration::from_millis(200),
            },
            poll_interval: Duration::from_millis(50),
            log_format: LogFormat::Pretty,
        }
    }

    /// Read only `THERMOSTAT_REQUEST_TIMEOUT_SECS`.
    ///
    /// Ad-hoc mode needs nothing else, so other invalid settings cannot
    /// block it.
    pub fn request_timeout_from_lookup<F>(lookup: &F) -> DaemonResult<Duration>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::load_secs(lookup, "THERMOSTAT_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)
    }

    /// Endpoints handed to the remote API adapter.
    pub fn endpoints(&self) -> ThermostatEndpoints {
        ThermostatEndpoints {
            measurement_url: self.remote.measurement_url.clone(),
            status_url: self.remote.status_url.clone(),
        }
    }

    /// Log settings that are accepted but likely wrong.
    ///
    /// A request that can outlast the poll interval stalls the loop.
    pub fn warn_on_slow_requests(&self) {
        if self.remote.request_timeout >= self.poll_interval {
            warn!(
                timeout_secs = self.remote.request_timeout.as_secs(),
                interval_secs = self.poll_interval.as_secs(),
                "Request timeout is not shorter than the poll interval"
            );
        }
    }

    fn load_secs<F>(lookup: &F, key: &str, default: u64) -> DaemonResult<Duration>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secs = match lookup(key) {
            Some(val) => val
                .trim()
                .parse::<u64>()
                .map_err(|_| DaemonError::Config(format!("Invalid {} value: {}", key, val)))?,
            None => default,
        };

        if secs == 0 {
            return Err(DaemonError::Config(format!("{} must be greater than zero", key)));
        }
        Ok(Duration::from_secs(secs))
    }

    fn load_url<F>(lookup: &F, key: &str, default: &str) -> DaemonResult<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup(key).unwrap_or_else(|| default.to_string());
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(DaemonError::Config(format!("Invalid {}: {}", key, url)));
        }
        Ok(url)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            local: LocalConfig {
                temperature_path: PathBuf::from(DEFAULT_TEMPERATURE_PATH),
                status_path: PathBuf::from(DEFAULT_STATUS_PATH),
            },
            remote: RemoteConfig {
                measurement_url: DEFAULT_MEASUREMENT_URL.to_string(),
                status_url: DEFAULT_STATUS_URL.to_string(),
                request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            },
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            log_format: LogFormat::Pretty,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
