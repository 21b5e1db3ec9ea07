//! Control loop: read → publish → fetch → actuate → sleep.
//!
//! # Cycle
//!
//! ```text
//! SensorPort::read ──ok──→ ThermostatApiPort::publish
//!        │                         │ (result logged, never gates)
//!        └──err: skip publish──────┤
//!                                  ↓
//!                 ThermostatApiPort::fetch_desired_state
//!                    │ ok(true/false)          │ err
//!                    ↓                         ↓
//!           ActuatorPort::write(ON/OFF)   no command, heater unchanged
//! ```
//!
//! Every step failure is logged and the cycle carries on. The only fatal
//! condition is a missing sensor or actuator before the first cycle.
//!
//! # Cancellation
//!
//! The shutdown token is checked between cycles and raced against the
//! sleep. A cycle that has started always runs to completion.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use thermostat_domain::ActuatorCommand;
use thermostat_exec::{ActuatorPort, SensorPort, ThermostatApiPort};

use crate::error::{DaemonError, DaemonResult};

// =============================================================================
// State
// =============================================================================

/// Control loop lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Cycling
    Running,
    /// Stop observed, finishing up
    Stopping,
    /// Done
    Stopped,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopState::Running => write!(f, "running"),
            LoopState::Stopping => write!(f, "stopping"),
            LoopState::Stopped => write!(f, "stopped"),
        }
    }
}

/// What happened in one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Sensor text was read
    pub measurement_read: bool,
    /// Measurement reached the remote service
    pub published: bool,
    /// Command derived from the desired state, if it was fetched
    pub command: Option<ActuatorCommand>,
    /// Command was written to the actuator
    pub actuated: bool,
}

/// Result of a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSummary {
    /// Cycles run to completion
    pub cycles: u64,
    /// Final state, always `Stopped`
    pub final_state: LoopState,
}

// =============================================================================
// Control Loop
// =============================================================================

/// Drives sensor, remote API and actuator on a fixed interval.
pub struct ControlLoop<S, A, R>
where
    S: SensorPort + 'static,
    A: ActuatorPort + 'static,
    R: ThermostatApiPort + 'static,
{
    sensor: Arc<S>,
    actuator: Arc<A>,
    api: Arc<R>,
    poll_interval: Duration,
    state: LoopState,
}

impl<S, A, R> ControlLoop<S, A, R>
where
    S: SensorPort + 'static,
    A: ActuatorPort + 'static,
    R: ThermostatApiPort + 'static,
{
    /// Create a control loop over the given ports.
    pub fn new(sensor: Arc<S>, actuator: Arc<A>, api: Arc<R>, poll_interval: Duration) -> Self {
        Self {
            sensor,
            actuator,
            api,
            poll_interval,
            state: LoopState::Running,
        }
    }

    /// Current state.
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Check that the sensor source and actuator sink both exist.
    ///
    /// Must pass before the first cycle; the loop never starts otherwise.
    pub fn verify_interfaces(&self) -> DaemonResult<()> {
        let sensor_ok = self.sensor.is_present();
        let actuator_ok = self.actuator.is_present();

        if sensor_ok && actuator_ok {
            info!("Thermocouple succeeded");
            return Ok(());
        }

        error!(sensor_present = sensor_ok, actuator_present = actuator_ok, "Thermocouple failed");
        let missing = match (sensor_ok, actuator_ok) {
            (false, false) => "temperature source and heater status sink",
            (false, true) => "temperature source",
            _ => "heater status sink",
        };
        Err(DaemonError::LocalInterfaceMissing(missing.to_string()))
    }

    /// Run one full cycle. Never fails; every problem is logged and reported.
    pub async fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport {
            measurement_read: false,
            published: false,
            command: None,
            actuated: false,
        };

        // 1. Read + publish
        match self.sensor.read().await {
            Ok(measurement) => {
                report.measurement_read = true;
                match self.api.publish(&measurement).await {
                    Ok(()) => {
                        report.published = true;
                        debug!(%measurement, "Measurement published");
                    }
                    Err(e) => warn!(error = %e, "Failed to publish measurement"),
                }
            }
            Err(e) => error!(error = %e, "Failed to read temperature, skipping publish"),
        }

        // 2. Fetch desired state
        let command = match self.api.fetch_desired_state().await {
            Ok(state) => ActuatorCommand::from(state),
            Err(e) => {
                warn!(error = %e, "Failed to fetch desired state, heater left unchanged");
                return report;
            }
        };
        report.command = Some(command);

        // 3. Actuate
        match self.actuator.write(command).await {
            Ok(()) => {
                report.actuated = true;
                debug!(%command, "Heater state applied");
            }
            Err(e) => error!(error = %e, %command, "Encountered an unknown heater state"),
        }

        report
    }

    /// Run cycles until `shutdown` is cancelled.
    ///
    /// Consumes the loop, so a process can only ever run it once per
    /// instance.
    pub async fn run(mut self, shutdown: CancellationToken) -> LoopSummary {
        info!(
            interval_ms = self.poll_interval.as_millis() as u64,
            state = %self.state,
            "Control loop started"
        );

        let mut cycles: u64 = 0;
        while !shutdown.is_cancelled() {
            let report = self.run_cycle().await;
            cycles += 1;
            info!(
                cycle = cycles,
                read = report.measurement_read,
                published = report.published,
                command = ?report.command.map(|c| c.as_str()),
                actuated = report.actuated,
                "Cycle completed"
            );

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        self.transition(LoopState::Stopping);
        self.transition(LoopState::Stopped);
        info!(cycles, "Control loop stopped");

        LoopSummary {
            cycles,
            final_state: self.state,
        }
    }

    fn transition(&mut self, next: LoopState) {
        debug!(from = %self.state, to = %next, "Control loop state change");
        self.state = next;
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use thermostat_exec::{ExecError, StubActuator, StubSensor, StubThermostatApi};

    type StubLoop = ControlLoop<StubSensor, StubActuator, StubThermostatApi>;

    fn stub_loop(
        reading: &str,
        heating: bool,
    ) -> (StubLoop, Arc<StubSensor>, Arc<StubActuator>, Arc<StubThermostatApi>) {
        let sensor = Arc::new(StubSensor::new(reading));
        let actuator = Arc::new(StubActuator::new());
        let api = Arc::new(StubThermostatApi::new(heating));
        let control = ControlLoop::new(
            sensor.clone(),
            actuator.clone(),
            api.clone(),
            Duration::from_secs(3),
        );
        (control, sensor, actuator, api)
    }

    #[tokio::test]
    async fn test_cycle_heat_on() {
        let (control, _sensor, actuator, api) = stub_loop("72.5", true);

        let report = control.run_cycle().await;

        assert_eq!(api.published(), vec!["72.5".to_string()]);
        assert_eq!(api.fetch_count(), 1);
        assert_eq!(actuator.commands(), vec![ActuatorCommand::On]);
        assert_eq!(
            report,
            CycleReport {
                measurement_read: true,
                published: true,
                command: Some(ActuatorCommand::On),
                actuated: true,
            }
        );
    }

    #[tokio::test]
    async fn test_cycle_heat_off() {
        let (control, _sensor, actuator, _api) = stub_loop("60.0", false);

        control.run_cycle().await;

        assert_eq!(actuator.commands(), vec![ActuatorCommand::Off]);
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_actuator_alone() {
        let (control, _sensor, actuator, api) = stub_loop("72.5", true);
        api.push_fetch(Err(ExecError::Transport("connection refused".to_string())));

        let report = control.run_cycle().await;

        assert!(report.published);
        assert_eq!(report.command, None);
        assert!(actuator.commands().is_empty());
    }

    #[tokio::test]
    async fn test_publish_failure_does_not_gate_fetch() {
        let (control, _sensor, actuator, api) = stub_loop("72.5", true);
        api.set_fail_next_publish(true);

        let report = control.run_cycle().await;

        assert!(!report.published);
        assert_eq!(api.fetch_count(), 1);
        assert_eq!(actuator.commands(), vec![ActuatorCommand::On]);
    }

    #[tokio::test]
    async fn test_sensor_failure_skips_publish_only() {
        let (control, sensor, actuator, api) = stub_loop("72.5", false);
        sensor.set_fail_next(true);

        let report = control.run_cycle().await;

        assert!(!report.measurement_read);
        assert!(api.published().is_empty());
        assert_eq!(api.fetch_count(), 1);
        assert_eq!(actuator.commands(), vec![ActuatorCommand::Off]);
    }

    #[tokio::test]
    async fn test_actuator_failure_is_not_fatal() {
        let (control, _sensor, actuator, _api) = stub_loop("72.5", true);
        actuator.set_fail_next(true);

        let first = control.run_cycle().await;
        let second = control.run_cycle().await;

        assert_eq!(first.command, Some(ActuatorCommand::On));
        assert!(!first.actuated);
        assert!(second.actuated);
        assert_eq!(actuator.commands(), vec![ActuatorCommand::On]);
    }

    #[tokio::test]
    async fn test_command_follows_latest_fetch() {
        let (control, _sensor, actuator, api) = stub_loop("72.5", false);
        api.push_fetch(Ok(true));
        api.push_fetch(Err(ExecError::Timeout("2s".to_string())));
        api.push_fetch(Ok(false));

        for _ in 0..3 {
            control.run_cycle().await;
        }

        assert_eq!(actuator.commands(), vec![ActuatorCommand::On, ActuatorCommand::Off]);
    }

    #[tokio::test]
    async fn test_each_cycle_sees_fresh_reading_and_state() {
        let (control, sensor, actuator, api) = stub_loop("68.0", false);

        control.run_cycle().await;
        sensor.set_reading("71.25");
        api.set_heating(true);
        control.run_cycle().await;

        assert_eq!(api.published(), vec!["68.0".to_string(), "71.25".to_string()]);
        assert_eq!(actuator.commands(), vec![ActuatorCommand::Off, ActuatorCommand::On]);
    }

    #[test]
    fn test_verify_interfaces() {
        let (control, _, _, _) = stub_loop("72.5", true);
        assert!(control.verify_interfaces().is_ok());

        let missing_sensor = ControlLoop::new(
            Arc::new(StubSensor::missing()),
            Arc::new(StubActuator::new()),
            Arc::new(StubThermostatApi::new(true)),
            Duration::from_secs(3),
        );
        assert!(matches!(
            missing_sensor.verify_interfaces(),
            Err(DaemonError::LocalInterfaceMissing(_))
        ));

        let missing_actuator = ControlLoop::new(
            Arc::new(StubSensor::new("1")),
            Arc::new(StubActuator::missing()),
            Arc::new(StubThermostatApi::new(true)),
            Duration::from_secs(3),
        );
        assert!(missing_actuator.verify_interfaces().is_err());
    }

    #[tokio::test]
    async fn test_cancelled_before_start_runs_no_cycle() {
        let (control, sensor, _, _) = stub_loop("72.5", true);
        let token = CancellationToken::new();
        token.cancel();

        let summary = control.run(token).await;

        assert_eq!(summary.cycles, 0);
        assert_eq!(summary.final_state, LoopState::Stopped);
        assert_eq!(sensor.read_count(), 0);
    }

    #[tokio::test]
    async fn test_stop_during_sleep_ends_before_next_cycle() {
        let (control, sensor, actuator, api) = stub_loop("72.5", true);
        let token = CancellationToken::new();
        let handle = tokio::spawn(control.run(token.clone()));

        // Wait until the first cycle has fetched, then let it reach the sleep.
        api.fetch_started().await;
        while actuator.commands().is_empty() {
            tokio::task::yield_now().await;
        }
        token.cancel();

        let summary = handle.await.unwrap();
        assert_eq!(summary.cycles, 1);
        assert_eq!(summary.final_state, LoopState::Stopped);
        assert_eq!(sensor.read_count(), 1);
    }

    #[tokio::test]
    async fn test_stop_mid_cycle_lets_cycle_finish() {
        let (control, _sensor, actuator, api) = stub_loop("72.5", true);
        api.hold_fetches();
        let token = CancellationToken::new();
        let handle = tokio::spawn(control.run(token.clone()));

        api.fetch_started().await;
        token.cancel();
        api.release_fetch();

        let summary = handle.await.unwrap();
        assert_eq!(summary.cycles, 1);
        assert_eq!(actuator.commands(), vec![ActuatorCommand::On]);
        assert_eq!(api.fetch_count(), 1);
    }
}
