//! Vehicle collaborator interfaces.
//!
//! The consensus core never talks to hardware directly. Each agent owns one
//! [`Vehicle`]: a pull-based altitude sensor stream and a blocking actuator.
//! Radio transport, state estimation and motor control live behind these
//! traits; [`simulated`] provides an in-process stand-in.

pub mod simulated;

pub use simulated::{SimulatedActuator, SimulatedSensor, SimulatedVehicle, SimulationSettings};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::types::AltitudeSample;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum SensorError {
    #[error("Sensor link lost: {0}")]
    LinkLost(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ActuatorError {
    #[error("Setpoint rejected: {0}")]
    CommandFailed(String),

    #[error("Actuator link lost: {0}")]
    LinkLost(String),
}

// ============================================================================
// Sensor
// ============================================================================

/// Events produced by a sensor stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleEvent {
    Sample(AltitudeSample),
    /// Stream closed; no further samples will arrive
    Eof,
}

/// Lazy, unbounded stream of timestamped altitude samples for one agent.
#[async_trait]
pub trait AltitudeSensor: Send + 'static {
    /// Wait for the next sample.
    async fn next_sample(&mut self) -> Result<SampleEvent, SensorError>;

    /// Human-readable name for logging.
    fn source_name(&self) -> &str;
}

// ============================================================================
// Actuator
// ============================================================================

/// Position controller for one agent.
#[async_trait]
pub trait Actuator: Send + 'static {
    /// Hold `altitude` for `duration`, returning when the hold period ends.
    async fn hold(&mut self, altitude: f64, duration: Duration) -> Result<(), ActuatorError>;

    /// Stop and disarm.
    async fn stop(&mut self) -> Result<(), ActuatorError>;
}

/// Sensor and actuator for one agent.
pub struct Vehicle {
    pub sensor: Box<dyn AltitudeSensor>,
    pub actuator: Box<dyn Actuator>,
}

impl Vehicle {
    pub fn new(sensor: impl AltitudeSensor, actuator: impl Actuator) -> Self {
        Self {
            sensor: Box::new(sensor),
            actuator: Box::new(actuator),
        }
    }
}

impl std::fmt::Debug for Vehicle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vehicle")
            .field("sensor", &self.sensor.source_name())
            .finish_non_exhaustive()
    }
}
