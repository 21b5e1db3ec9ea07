//! Thermostat Agent
//!
//! Runs the thermostat control loop, or performs one HTTP request against
//! the remote service when given arguments.
//!
//! # Usage
//!
//! ```bash
//! # Control loop (daemon mode)
//! thermostatd
//!
//! # One-shot requests
//! thermostatd --url http://localhost:8000/status --get
//! thermostatd --url http://localhost:8000/programs --post '{"temp":21}'
//! ```
//!
//! # Environment Variables
//!
//! - `THERMOSTAT_TEMPERATURE_PATH`: Temperature source (default: /tmp/temp)
//! - `THERMOSTAT_STATUS_PATH`: Heater status sink (default: /tmp/status)
//! - `THERMOSTAT_MEASUREMENT_URL`: Measurement endpoint
//! - `THERMOSTAT_STATUS_URL`: Desired-state endpoint
//! - `THERMOSTAT_POLL_INTERVAL_SECS`: Pause between cycles (default: 3)
//! - `THERMOSTAT_REQUEST_TIMEOUT_SECS`: Per-request bound (default: 2)
//! - `THERMOSTAT_LOG_FORMAT`: pretty or json (default: pretty)

use std::process::ExitCode;
use std::sync::Arc;

use thermostat_connectors::RemoteThermostatApi;
use thermostat_exec::{FileActuator, FileSensor};
use thermostatd::config::{env_lookup, load_dotenv};
use thermostatd::lifecycle::listen_for_signals;
use thermostatd::{
    run_adhoc, Config, ControlLoop, DaemonError, ExitStatus, LifecycleManager, LogFormat, RunMode,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter used when `RUST_LOG` is unset or invalid.
const DEFAULT_LOG_DIRECTIVES: &str =
    "thermostatd=info,thermostat_connectors=info,thermostat_exec=info";

fn main() -> ExitCode {
    load_dotenv();
    let mode = RunMode::from_args(std::env::args_os());

    // Initialize tracing
    let log_format = LogFormat::from_lookup(&env_lookup);
    if let Err(e) = init_tracing(log_format.as_ref().copied().unwrap_or(LogFormat::Pretty)) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitStatus::ProcessSetupFailure.into();
    }
    if let Err(e) = &log_format {
        warn!(error = %e, "Falling back to pretty log output");
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            let e = DaemonError::ProcessSetup(format!("Failed to start runtime: {}", e));
            return finish(e.exit_status(), Some(&e));
        }
    };

    let status = runtime.block_on(async move {
        match mode {
            RunMode::AdHoc(args) => {
                info!("Using CLI");
                run_adhoc(args, env_lookup).await
            }
            RunMode::Daemon => {
                info!("Using daemon");
                match Config::from_env() {
                    Ok(config) => run_daemon(config).await,
                    Err(e) => {
                        error!(error = %e, "Invalid configuration");
                        e.exit_status()
                    }
                }
            }
        }
    });

    finish(status, None)
}

async fn run_daemon(config: Config) -> ExitStatus {
    config.warn_on_slow_requests();

    let sensor = FileSensor::new(&config.local.temperature_path);
    let actuator = FileActuator::new(&config.local.status_path);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        temperature_path = %sensor.path().display(),
        status_path = %actuator.path().display(),
        interval_secs = config.poll_interval.as_secs(),
        "Thermostat agent"
    );

    let api = match RemoteThermostatApi::new(config.endpoints(), config.remote.request_timeout) {
        Ok(api) => api,
        Err(e) => {
            let e = DaemonError::from(e);
            error!(error = %e, "Failed to create remote API client");
            return e.exit_status();
        }
    };

    let signals = match listen_for_signals() {
        Ok(signals) => signals,
        Err(e) => {
            error!(error = %e, "Failed to install signal handlers");
            return e.exit_status();
        }
    };

    let control = ControlLoop::new(
        Arc::new(sensor),
        Arc::new(actuator),
        Arc::new(api),
        config.poll_interval,
    );

    LifecycleManager::new(control).run(signals).await
}

fn finish(status: ExitStatus, cause: Option<&DaemonError>) -> ExitCode {
    if let Some(e) = cause {
        error!(error = %e, "Startup failed");
    }

    if status.is_success() {
        info!(code = status.code(), "{}", status);
    } else {
        error!(code = status.code(), "{}", status);
    }
    status.into()
}

fn init_tracing(format: LogFormat) -> Result<(), String> {
    let filter = log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref());
    let registry = tracing_subscriber::registry().with(filter);

    let result = match format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };
    result.map_err(|e| e.to_string())
}

/// `RUST_LOG` wins when set and valid; otherwise the crate defaults apply.
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .and_then(|spec| EnvFilter::try_new(spec).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_DIRECTIVES))
}
