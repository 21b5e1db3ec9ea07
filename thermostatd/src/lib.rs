//! Thermostat Agent Library
//!
//! Bridges a local temperature sensor and heater to a remote thermostat
//! service.
//!
//! # Architecture
//!
//! ```text
//! Lifecycle Manager (signals, shutdown token)
//!         ↓
//! Control Loop ──→ Sensor ──→ Remote API (publish, fetch) ──→ Actuator
//!
//! Ad-hoc Runner ──→ HTTP Client  (one request, no loop)
//! ```
//!
//! # Components
//!
//! - **Control Loop**: Timed read → publish → fetch → actuate cycle
//! - **Lifecycle**: Run mode selection, signal handling, graceful stop
//! - **Ad-hoc**: One-shot GET/POST/PUT/DELETE from the command line
//! - **Config**: Environment-based configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use thermostatd::{Config, ControlLoop, LifecycleManager};
//!
//! thermostatd::config::load_dotenv();
//! let config = Config::from_env()?;
//! let control = ControlLoop::new(sensor, actuator, api, config.poll_interval);
//! let status = LifecycleManager::new(control)
//!     .run(thermostatd::lifecycle::listen_for_signals()?)
//!     .await;
//! ```

#![warn(clippy::all)]

pub mod adhoc;
pub mod config;
pub mod control_loop;
pub mod error;
pub mod lifecycle;

// Re-exports for convenience
pub use adhoc::{run_adhoc, AdHocArgs, AdHocRequest, AdHocRunner};
pub use config::{Config, LocalConfig, LogFormat, RemoteConfig};
pub use control_loop::{ControlLoop, CycleReport, LoopState, LoopSummary};
pub use error::{DaemonError, DaemonResult, ExitStatus};
pub use lifecycle::{LifecycleManager, RunMode, ShutdownReason, SignalEvent};
