//! Ad-hoc mode: one HTTP request from the command line, then exit.
//!
//! ```bash
//! thermostatd --url http://cloud/status --get
//! thermostatd --url http://cloud/programs --post '{"at":"07:00","temp":21}'
//! thermostatd -u http://cloud/programs/3 -d '{"id":3}'
//! ```
//!
//! Arguments are validated before anything touches the network. The
//! control loop, sensor and actuator are never involved.

use std::ffi::OsString;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use tracing::{error, info, warn};

use thermostat_connectors::{
    HttpClient, HttpResponse, HttpTransport, ReqwestTransport, DEFAULT_REQUEST_TIMEOUT,
};
use thermostat_domain::HttpMethod;

use crate::config::Config;
use crate::error::{DaemonError, DaemonResult, ExitStatus};

// =============================================================================
// Arguments
// =============================================================================

/// Command-line arguments for a single request.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "thermostatd")]
#[command(version, about = "Thermostat agent: run without arguments for the control loop, or issue one request", long_about = None)]
pub struct AdHocArgs {
    /// Target URL
    #[arg(short = 'u', long)]
    pub url: Option<String>,

    /// Send a GET request
    #[arg(short = 'g', long)]
    pub get: bool,

    /// Send a POST request with BODY
    #[arg(short = 'o', long)]
    pub post: bool,

    /// Send a PUT request with BODY
    #[arg(short = 'p', long)]
    pub put: bool,

    /// Send a DELETE request with BODY
    #[arg(short = 'd', long)]
    pub delete: bool,

    /// Request body; quote it if it contains spaces
    #[arg(value_name = "BODY")]
    pub body: Option<String>,
}

/// A validated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdHocRequest {
    pub method: HttpMethod,
    pub url: String,
    pub body: Option<String>,
}

impl AdHocArgs {
    /// Check the arguments describe exactly one complete request.
    pub fn validate(self) -> DaemonResult<AdHocRequest> {
        let url = match self.url {
            Some(url) if !url.trim().is_empty() => url,
            _ => return Err(DaemonError::Validation("Invalid URL provided".to_string())),
        };

        let selected: Vec<HttpMethod> = [
            (self.get, HttpMethod::Get),
            (self.post, HttpMethod::Post),
            (self.put, HttpMethod::Put),
            (self.delete, HttpMethod::Delete),
        ]
        .into_iter()
        .filter_map(|(flag, method)| flag.then_some(method))
        .collect();

        let method = match selected.as_slice() {
            [method] => *method,
            [] => return Err(DaemonError::Validation("HTTP request type missing".to_string())),
            _ => {
                return Err(DaemonError::Validation(
                    "Choose exactly one of --get, --post, --put, --delete".to_string(),
                ))
            }
        };

        let body = if method.is_mutating() {
            match self.body {
                Some(body) => Some(body),
                None => {
                    return Err(DaemonError::Validation(format!(
                        "{} requires a body argument",
                        method
                    )))
                }
            }
        } else {
            if self.body.is_some() {
                warn!("Ignoring body argument for GET request");
            }
            None
        };

        Ok(AdHocRequest { method, url, body })
    }
}

/// Parse and validate the full argument list (program name first).
///
/// Returns `Ok(None)` when help or version output was requested and printed.
pub fn request_from_args(args: Vec<OsString>) -> DaemonResult<Option<AdHocRequest>> {
    match AdHocArgs::try_parse_from(args) {
        Ok(parsed) => parsed.validate().map(Some),
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            if let Err(io) = e.print() {
                warn!(error = %io, "Failed to print help output");
            }
            Ok(None)
        }
        Err(e) => {
            let message = e.to_string();
            let first_line = message.lines().next().unwrap_or_default().to_string();
            Err(DaemonError::Validation(first_line))
        }
    }
}

// =============================================================================
// Runner
// =============================================================================

/// Performs exactly one request.
pub struct AdHocRunner<T: HttpTransport = ReqwestTransport> {
    client: HttpClient<T>,
}

impl<T: HttpTransport> AdHocRunner<T> {
    /// Create a runner over `client`.
    pub fn new(client: HttpClient<T>) -> Self {
        Self { client }
    }

    /// Send the request and return the response.
    pub async fn run(&self, request: &AdHocRequest) -> DaemonResult<HttpResponse> {
        info!(method = %request.method, url = %request.url, "Performing ad-hoc request");

        let response = self
            .client
            .request(request.method, &request.url, request.body.as_deref())
            .await?;

        info!(status = response.status, bytes = response.body.len(), "Ad-hoc request completed");
        Ok(response)
    }
}

/// Whole ad-hoc invocation: parse, validate, send, print.
///
/// Arguments are validated before `lookup` is consulted, and only the
/// request timeout is read from it. An invalid timeout falls back to the
/// default.
pub async fn run_adhoc<F>(args: Vec<OsString>, lookup: F) -> ExitStatus
where
    F: Fn(&str) -> Option<String>,
{
    let request = match request_from_args(args) {
        Ok(Some(request)) => request,
        Ok(None) => return ExitStatus::Success,
        Err(e) => {
            error!(error = %e, "Rejected ad-hoc request");
            eprintln!("{}", e);
            eprintln!("{}", AdHocArgs::command().render_usage());
            return e.exit_status();
        }
    };

    let request_timeout = match Config::request_timeout_from_lookup(&lookup) {
        Ok(timeout) => timeout,
        Err(e) => {
            warn!(
                error = %e,
                default_secs = DEFAULT_REQUEST_TIMEOUT.as_secs(),
                "Using default request timeout"
            );
            DEFAULT_REQUEST_TIMEOUT
        }
    };

    let client = match HttpClient::new(request_timeout) {
        Ok(client) => client,
        Err(e) => {
            let e = DaemonError::from(e);
            error!(error = %e, "Failed to create HTTP client");
            return e.exit_status();
        }
    };

    match AdHocRunner::new(client).run(&request).await {
        Ok(response) => {
            if !response.body.is_empty() {
                println!("{}", response.body);
            }
            ExitStatus::Success
        }
        Err(e) => {
            error!(error = %e, method = %request.method, url = %request.url, "Ad-hoc request failed");
            eprintln!("{}", e);
            e.exit_status()
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
