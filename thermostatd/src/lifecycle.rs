//! Lifecycle: mode selection, signals and graceful stop.
//!
//! # Lifecycle
//!
//! 1. Pick the run mode from the invocation shape
//! 2. Verify the local sensor/actuator interfaces
//! 3. Spawn the single control loop
//! 4. Translate signals into a shutdown reason
//!    - SIGHUP: ignored
//!    - SIGTERM: stop at the next cycle boundary, exit "terminated"
//!    - anything else: stop at the next cycle boundary, exit "unexpected"
//! 5. Wait for the in-flight cycle to finish and report the exit status
//!
//! Signal handling never exits the process itself; it only cancels the
//! shared token the control loop polls.

use std::ffi::OsString;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use thermostat_exec::{ActuatorPort, SensorPort, ThermostatApiPort};

use crate::control_loop::ControlLoop;
use crate::error::{DaemonError, DaemonResult, ExitStatus};

// =============================================================================
// Run Mode
// =============================================================================

/// How the process was invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// No arguments: run the control loop until told to stop
    Daemon,
    /// Arguments present: perform one request and exit
    AdHoc(Vec<OsString>),
}

impl RunMode {
    /// Choose the mode from the full argument list (program name first).
    pub fn from_args<I>(args: I) -> Self
    where
        I: IntoIterator<Item = OsString>,
    {
        let args: Vec<OsString> = args.into_iter().collect();
        if args.len() > 1 {
            RunMode::AdHoc(args)
        } else {
            RunMode::Daemon
        }
    }
}

// =============================================================================
// Signals
// =============================================================================

/// A signal delivered to the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalEvent {
    /// SIGHUP
    Reload,
    /// SIGTERM
    Terminate,
    /// Any other handled signal
    Other(&'static str),
}

/// Why the control loop was asked to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGTERM
    Terminate,
    /// A signal with no defined meaning
    UnexpectedSignal(&'static str),
}

impl ShutdownReason {
    /// Exit status once the loop has stopped.
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            ShutdownReason::Terminate => ExitStatus::TerminationRequested,
            ShutdownReason::UnexpectedSignal(_) => ExitStatus::UnexpectedCondition,
        }
    }
}

/// Install handlers and forward delivered signals into a channel.
#[cfg(unix)]
pub fn listen_for_signals() -> DaemonResult<mpsc::Receiver<SignalEvent>> {
    use tokio::signal::unix::{signal, SignalKind};

    let install = |kind: SignalKind, name: &str| {
        signal(kind).map_err(|e| {
            DaemonError::ProcessSetup(format!("Failed to install {} handler: {}", name, e))
        })
    };

    let mut hangup = install(SignalKind::hangup(), "SIGHUP")?;
    let mut terminate = install(SignalKind::terminate(), "SIGTERM")?;
    let mut interrupt = install(SignalKind::interrupt(), "SIGINT")?;
    let mut quit = install(SignalKind::quit(), "SIGQUIT")?;
    let mut user1 = install(SignalKind::user_defined1(), "SIGUSR1")?;
    let mut user2 = install(SignalKind::user_defined2(), "SIGUSR2")?;

    let (tx, rx) = mpsc::channel(8);
    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                Some(()) = hangup.recv() => SignalEvent::Reload,
                Some(()) = terminate.recv() => SignalEvent::Terminate,
                Some(()) = interrupt.recv() => SignalEvent::Other("SIGINT"),
                Some(()) = quit.recv() => SignalEvent::Other("SIGQUIT"),
                Some(()) = user1.recv() => SignalEvent::Other("SIGUSR1"),
                Some(()) = user2.recv() => SignalEvent::Other("SIGUSR2"),
                else => break,
            };
            if tx.send(event).await.is_err() {
                break;
            }
        }
    });

    Ok(rx)
}

/// Install handlers and forward delivered signals into a channel.
#[cfg(not(unix))]
pub fn listen_for_signals() -> DaemonResult<mpsc::Receiver<SignalEvent>> {
    let (tx, rx) = mpsc::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = tx.send(SignalEvent::Terminate).await;
        }
    });
    Ok(rx)
}

/// Consume signals until one asks for a stop, then cancel `shutdown`.
///
/// Returns `None` if the signal source closes without a stop request.
pub async fn supervise_signals(
    mut signals: mpsc::Receiver<SignalEvent>,
    shutdown: CancellationToken,
) -> Option<ShutdownReason> {
    while let Some(event) = signals.recv().await {
        let reason = match event {
            SignalEvent::Reload => {
                info!("Received SIGHUP, nothing to reload");
                continue;
            }
            SignalEvent::Terminate => {
                info!("Received termination signal, stopping after current cycle");
                ShutdownReason::Terminate
            }
            SignalEvent::Other(name) => {
                error!(signal = name, "Received unexpected signal, stopping after current cycle");
                ShutdownReason::UnexpectedSignal(name)
            }
        };

        shutdown.cancel();
        return Some(reason);
    }

    None
}

// =============================================================================
// Lifecycle Manager
// =============================================================================

/// Owns the one control loop of the process and its shutdown token.
pub struct LifecycleManager<S, A, R>
where
    S: SensorPort + 'static,
    A: ActuatorPort + 'static,
    R: ThermostatApiPort + 'static,
{
    control_loop: ControlLoop<S, A, R>,
    shutdown: CancellationToken,
}

impl<S, A, R> LifecycleManager<S, A, R>
where
    S: SensorPort + 'static,
    A: ActuatorPort + 'static,
    R: ThermostatApiPort + 'static,
{
    /// Take ownership of the control loop.
    pub fn new(control_loop: ControlLoop<S, A, R>) -> Self {
        Self {
            control_loop,
            shutdown: CancellationToken::new(),
        }
    }

    /// Token the control loop polls. Cancelling it stops the loop cleanly.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run the control loop until a stop signal, and report how it ended.
    pub async fn run(self, signals: mpsc::Receiver<SignalEvent>) -> ExitStatus {
        if let Err(e) = self.control_loop.verify_interfaces() {
            error!(error = %e, "Control loop not started");
            return e.exit_status();
        }

        let shutdown = self.shutdown;
        let mut loop_task = tokio::spawn(self.control_loop.run(shutdown.clone()));

        let reason = tokio::select! {
            reason = supervise_signals(signals, shutdown.clone()) => reason,
            joined = &mut loop_task => {
                // Stopped without a signal: someone cancelled the token directly.
                return match joined {
                    Ok(summary) => {
                        info!(cycles = summary.cycles, "Control loop finished");
                        ExitStatus::Success
                    }
                    Err(e) => {
                        let e = DaemonError::LoopAborted(e.to_string());
                        error!(error = %e, "Control loop task failed");
                        e.exit_status()
                    }
                };
            }
        };

        if reason.is_none() {
            warn!("Signal source closed, control loop keeps running until cancelled");
        }

        match loop_task.await {
            Ok(summary) => {
                info!(cycles = summary.cycles, state = %summary.final_state, "Control loop finished");
            }
            Err(e) => {
                let e = DaemonError::LoopAborted(e.to_string());
                error!(error = %e, "Control loop task failed");
                return e.exit_status();
            }
        }

        reason.map_or(ExitStatus::Success, |r| r.exit_status())
    }
}

// =============================================================================
// Tests
// =============================================================================
