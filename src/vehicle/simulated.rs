//! Simulated vehicles for running missions without hardware.
//!
//! A simulated vehicle's altitude follows the commanded setpoint with a
//! first-order response, optionally perturbed by Gaussian noise. The sensor
//! produces one sample per `sample_period_ms`, stamped in integer milliseconds
//! since the vehicle was created.

use async_trait::async_trait;
use rand::prelude::*;
use rand_distr::{Distribution, Normal};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

use super::{ActuatorError, AltitudeSensor, Actuator, SampleEvent, SensorError, Vehicle};
use crate::types::AltitudeSample;

// ============================================================================
// Settings
// ============================================================================

#[derive(Debug, Clone)]
pub struct SimulationSettings {
    /// Interval between sensor samples (ms)
    pub sample_period_ms: u64,
    /// First-order response time constant (ms); 0 snaps to the setpoint
    pub response_time_ms: u64,
    /// Standard deviation of altitude noise (m); 0 disables noise
    pub noise_std: f64,
    /// Altitude before the first command (m)
    pub initial_altitude: f64,
    /// RNG seed; each vehicle offsets it by its index
    pub seed: Option<u64>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            sample_period_ms: crate::config::defaults::SENSOR_SAMPLE_PERIOD_MS,
            response_time_ms: crate::config::defaults::SIM_RESPONSE_TIME_MS,
            noise_std: 0.0,
            initial_altitude: 0.0,
            seed: None,
        }
    }
}

// ============================================================================
// Shared Vehicle State
// ============================================================================

#[derive(Debug)]
struct VehicleState {
    setpoint: f64,
    altitude: f64,
    last_update: Instant,
    armed: bool,
    response_time_ms: u64,
}

impl VehicleState {
    /// Integrate the first-order response up to `now`.
    fn advance(&mut self, now: Instant) {
        let dt = now.saturating_duration_since(self.last_update);
        self.last_update = now;
        if self.response_time_ms == 0 {
            self.altitude = self.setpoint;
            return;
        }
        #[allow(clippy::cast_precision_loss)]
        let tau = self.response_time_ms as f64 / 1000.0;
        let alpha = 1.0 - (-dt.as_secs_f64() / tau).exp();
        self.altitude += (self.setpoint - self.altitude) * alpha;
    }
}

type SharedState = Arc<Mutex<VehicleState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, VehicleState> {
    state.lock().unwrap_or_else(|e| {
        tracing::warn!("Vehicle state mutex poisoned, recovering");
        e.into_inner()
    })
}

// ============================================================================
// Vehicle Builder
// ============================================================================

/// Builds a simulated sensor/actuator pair sharing one vehicle state.
#[derive(Debug, Clone)]
pub struct SimulatedVehicle {
    index: usize,
    settings: SimulationSettings,
    stall_after: Option<Duration>,
    fail_after_holds: Option<usize>,
}

impl SimulatedVehicle {
    pub fn new(index: usize, settings: SimulationSettings) -> Self {
        Self {
            index,
            settings,
            stall_after: None,
            fail_after_holds: None,
        }
    }

    /// Sensor stops producing samples once this much time has passed.
    pub fn with_sensor_stall_after(mut self, after: Duration) -> Self {
        self.stall_after = Some(after);
        self
    }

    /// Actuator rejects every `hold` after the first `n`.
    pub fn with_actuator_failure_after(mut self, n: usize) -> Self {
        self.fail_after_holds = Some(n);
        self
    }

    pub fn build(self) -> Vehicle {
        let (sensor, actuator) = self.into_parts();
        Vehicle::new(sensor, actuator)
    }

    pub fn into_parts(self) -> (SimulatedSensor, SimulatedActuator) {
        let now = Instant::now();
        let state = Arc::new(Mutex::new(VehicleState {
            setpoint: self.settings.initial_altitude,
            altitude: self.settings.initial_altitude,
            last_update: now,
            armed: true,
            response_time_ms: self.settings.response_time_ms,
        }));

        let rng = match self.settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(self.index as u64)),
            None => StdRng::from_entropy(),
        };
        let noise = if self.settings.noise_std > 0.0 {
            Normal::new(0.0, self.settings.noise_std).ok()
        } else {
            None
        };

        let sensor = SimulatedSensor {
            state: Arc::clone(&state),
            name: format!("sim-{}", self.index),
            start: now,
            period_ms: self.settings.sample_period_ms.max(1),
            next_due_ms: 0,
            stall_after: self.stall_after,
            rng,
            noise,
        };
        let actuator = SimulatedActuator {
            state,
            holds: 0,
            fail_after_holds: self.fail_after_holds,
        };
        (sensor, actuator)
    }
}

// ============================================================================
// Sensor
// ============================================================================

pub struct SimulatedSensor {
    state: SharedState,
    name: String,
    start: Instant,
    period_ms: u64,
    next_due_ms: u64,
    stall_after: Option<Duration>,
    rng: StdRng,
    noise: Option<Normal<f64>>,
}

impl SimulatedSensor {
    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

#[async_trait]
impl AltitudeSensor for SimulatedSensor {
    async fn next_sample(&mut self) -> Result<SampleEvent, SensorError> {
        let now_ms = self.elapsed_ms();
        if let Some(stall) = self.stall_after {
            if self.start.elapsed() >= stall {
                // A stalled link never yields; the caller's timeout decides.
                std::future::pending::<()>().await;
            }
        }

        // Samples land on period boundaries. After a blocking hold the stream
        // resumes at the latest boundary rather than replaying a backlog.
        let timestamp_ms = if now_ms < self.next_due_ms {
            tokio::time::sleep(Duration::from_millis(self.next_due_ms - now_ms)).await;
            self.next_due_ms
        } else {
            now_ms - now_ms % self.period_ms
        };
        self.next_due_ms = timestamp_ms + self.period_ms;

        let altitude = {
            let mut state = lock(&self.state);
            state.advance(Instant::now());
            state.altitude
        };
        let noise = self.noise.map_or(0.0, |n| n.sample(&mut self.rng));

        Ok(SampleEvent::Sample(AltitudeSample::new(
            timestamp_ms,
            altitude + noise,
        )))
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Actuator
// ============================================================================

pub struct SimulatedActuator {
    state: SharedState,
    holds: usize,
    fail_after_holds: Option<usize>,
}

#[async_trait]
impl Actuator for SimulatedActuator {
    async fn hold(&mut self, altitude: f64, duration: Duration) -> Result<(), ActuatorError> {
        if let Some(limit) = self.fail_after_holds {
            if self.holds >= limit {
                return Err(ActuatorError::LinkLost(format!(
                    "no acknowledgement after {limit} setpoints"
                )));
            }
        }
        self.holds += 1;
        {
            let mut state = lock(&self.state);
            if !state.armed {
                return Err(ActuatorError::CommandFailed("vehicle is disarmed".to_string()));
            }
            state.advance(Instant::now());
            state.setpoint = altitude;
        }
        tokio::time::sleep(duration).await;
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), ActuatorError> {
        let mut state = lock(&self.state);
        state.advance(Instant::now());
        state.armed = false;
        state.setpoint = 0.0;
        Ok(())
    }
}
