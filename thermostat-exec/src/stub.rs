//! Stub implementations for testing.
//!
//! These implementations simulate the sensor, heater and remote service
//! without touching files or the network, and record every call.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::{Notify, Semaphore};

use thermostat_domain::{ActuatorCommand, DesiredState, Measurement};

use crate::error::ExecError;
use crate::ports::{ActuatorPort, SensorPort, ThermostatApiPort};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Stub Sensor
// =============================================================================

/// Stub sensor returning a configurable reading.
pub struct StubSensor {
    /// Current reading
    reading: Mutex<String>,
    /// Whether the source exists
    present: AtomicBool,
    /// Whether to fail the next read
    fail_next: AtomicBool,
    /// Number of read attempts
    reads: AtomicUsize,
}

impl StubSensor {
    /// Create a present sensor reporting `reading`.
    pub fn new(reading: impl Into<String>) -> Self {
        Self {
            reading: Mutex::new(reading.into()),
            present: AtomicBool::new(true),
            fail_next: AtomicBool::new(false),
            reads: AtomicUsize::new(0),
        }
    }

    /// Create a sensor whose source does not exist.
    pub fn missing() -> Self {
        let sensor = Self::new("");
        sensor.present.store(false, Ordering::SeqCst);
        sensor
    }

    /// Change the reported reading.
    pub fn set_reading(&self, reading: impl Into<String>) {
        *lock(&self.reading) = reading.into();
    }

    /// Configure the next read to fail.
    pub fn set_fail_next(&self, fail: bool) {
        self.fail_next.store(fail, Ordering::SeqCst);
    }

    /// Number of read attempts so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SensorPort for StubSensor {
    fn is_present(&self) -> bool {
        self.present.load(Ordering::SeqCst)
    }

    async fn read(&self) -> Result<Measurement, ExecError> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        if !self.is_present() || self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(ExecError::SensorNotFound {
                path: PathBuf::from("stub://sensor"),
                reason: "Simulated sensor failure".to_string(),
            });
        }

        Ok(Measurement::new(lock(&self.reading).clone()))
    }
}

// =============================================================================
// Stub Actuator
// =============================================================================

/// Stub actuator recording every successful command.
pub struct StubActuator {
    /// Commands written, oldest first
    commands: Mutex<Vec<ActuatorCommand>>,
    /// Whether the sink exists
    present: AtomicBool,
    /// Whether to fail the next write
    fail_next: AtomicBool,
}

impl StubActuator {
    /// Create a present actuator.
    pub fn new() -> Self {
        Self {
            commands: Mutex::new(Vec::new()),
            present: AtomicBool::new(true),
            fail_next: AtomicBool::new(false),
        }
    }

    /// Create an actuator whose sink does not exist.
    pub fn missing() -> Self {
        let actuator = Self::new();
        actuator.present.store(false, Ordering::SeqCst);
        actuator
    }

    /// Configure the next write to fail.
    pub fn set_fail_next(&self, fail: bool) {
        self.fail_next.store(fail, Ordering::SeqCst);
    }

    /// All commands written so far.
    pub fn commands(&self) -> Vec<ActuatorCommand> {
        lock(&self.commands).clone()
    }

    /// Last command written, i.e. the current heater state.
    pub fn last_command(&self) -> Option<ActuatorCommand> {
        lock(&self.commands).last().copied()
    }
}

impl Default for StubActuator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActuatorPort for StubActuator {
    fn is_present(&self) -> bool {
        self.present.load(Ordering::SeqCst)
    }

    async fn write(&self, command: ActuatorCommand) -> Result<(), ExecError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(ExecError::ActuatorWrite {
                path: PathBuf::from("stub://actuator"),
                reason: "Simulated write failure".to_string(),
            });
        }

        lock(&self.commands).push(command);
        Ok(())
    }
}

// =============================================================================
// Stub Thermostat API
// =============================================================================

/// Stub remote service.
///
/// Desired states are served from a script queue first, then from a
/// default. Fetches can be held open to simulate a slow request.
pub struct StubThermostatApi {
    /// Bodies of every publish call
    published: Mutex<Vec<String>>,
    /// Scripted fetch results, consumed front to back
    script: Mutex<VecDeque<Result<bool, ExecError>>>,
    /// Result once the script is exhausted
    default_heating: AtomicBool,
    /// Whether to fail the next publish
    fail_next_publish: AtomicBool,
    /// Number of fetch attempts
    fetches: AtomicUsize,
    /// Gate for held fetches (None = never held)
    gate: Mutex<Option<std::sync::Arc<Semaphore>>>,
    /// Signalled whenever a fetch starts
    fetch_started: Notify,
}

impl StubThermostatApi {
    /// Create a stub that answers `heating` to every fetch.
    pub fn new(heating: bool) -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            script: Mutex::new(VecDeque::new()),
            default_heating: AtomicBool::new(heating),
            fail_next_publish: AtomicBool::new(false),
            fetches: AtomicUsize::new(0),
            gate: Mutex::new(None),
            fetch_started: Notify::new(),
        }
    }

    /// Change the answer served once the script is exhausted.
    pub fn set_heating(&self, heating: bool) {
        self.default_heating.store(heating, Ordering::SeqCst);
    }

    /// Queue one fetch result.
    pub fn push_fetch(&self, result: Result<bool, ExecError>) {
        lock(&self.script).push_back(result);
    }

    /// Configure the next publish to fail.
    pub fn set_fail_next_publish(&self, fail: bool) {
        self.fail_next_publish.store(fail, Ordering::SeqCst);
    }

    /// Hold every fetch open until `release_fetch` is called.
    pub fn hold_fetches(&self) {
        *lock(&self.gate) = Some(std::sync::Arc::new(Semaphore::new(0)));
    }

    /// Let one held fetch complete.
    pub fn release_fetch(&self) {
        if let Some(gate) = lock(&self.gate).as_ref() {
            gate.add_permits(1);
        }
    }

    /// Wait until a fetch has started.
    pub async fn fetch_started(&self) {
        self.fetch_started.notified().await;
    }

    /// Bodies of every publish call.
    pub fn published(&self) -> Vec<String> {
        lock(&self.published).clone()
    }

    /// Number of fetch attempts so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ThermostatApiPort for StubThermostatApi {
    async fn publish(&self, measurement: &Measurement) -> Result<(), ExecError> {
        lock(&self.published).push(measurement.as_str().to_string());

        if self.fail_next_publish.swap(false, Ordering::SeqCst) {
            return Err(ExecError::Transport("Simulated publish failure".to_string()));
        }
        Ok(())
    }

    async fn fetch_desired_state(&self) -> Result<DesiredState, ExecError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.fetch_started.notify_one();

        let gate = lock(&self.gate).clone();
        if let Some(gate) = gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|e| ExecError::Transport(format!("Fetch gate closed: {}", e)))?;
            permit.forget();
        }

        let scripted = lock(&self.script).pop_front();
        match scripted {
            Some(result) => result.map(DesiredState::from),
            None => Ok(DesiredState::from(self.default_heating.load(Ordering::SeqCst))),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
