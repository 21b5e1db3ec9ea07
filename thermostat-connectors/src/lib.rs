//! Thermostat Remote Connectors
//!
//! HTTP plumbing and the adapter for the remote thermostat service.
//! Normalizes HTTP outcomes to domain types and execution errors.

#![warn(clippy::all)]

// Public modules
pub mod http_client;
pub mod thermostat_api;

// Re-exports
pub use http_client::{
    HttpClient, HttpError, HttpRequest, HttpResponse, HttpTransport, RedirectPolicy,
    ReqwestTransport, ResponseBuffer, DEFAULT_REQUEST_TIMEOUT,
};
pub use thermostat_api::{RemoteThermostatApi, ThermostatEndpoints};
