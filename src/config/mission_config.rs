//! Mission Configuration - agents, schedule, barrier and output settings
//!
//! Each struct implements `Default` with the standard mission values, so a
//! missing config file flies the five-vehicle hover-and-converge mission.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use super::defaults;
use crate::coordination::{BarrierSettings, SentinelPolicy};
use crate::types::AgentSpec;
use crate::vehicle::SimulationSettings;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one mission.
///
/// Load with `MissionConfig::load()` which searches:
/// 1. `$SWARM_CONFIG` env var
/// 2. `./mission_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionConfig {
    /// Mission identification and duration
    #[serde(default)]
    pub mission: MissionInfo,

    /// Tick schedule and phase hold lengths
    #[serde(default)]
    pub timing: TimingConfig,

    /// Barrier polling and sentinel handling
    #[serde(default)]
    pub barrier: BarrierConfig,

    /// Sensor stream pacing and stall detection
    #[serde(default)]
    pub sensor: SensorConfig,

    /// Mission log and report output
    #[serde(default)]
    pub output: OutputConfig,

    /// Simulated vehicle behaviour
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// One entry per agent, indices `0..N`
    #[serde(default = "default_agents")]
    pub agents: Vec<AgentSpec>,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            mission: MissionInfo::default(),
            timing: TimingConfig::default(),
            barrier: BarrierConfig::default(),
            sensor: SensorConfig::default(),
            output: OutputConfig::default(),
            simulation: SimulationConfig::default(),
            agents: default_agents(),
        }
    }
}

fn default_agents() -> Vec<AgentSpec> {
    defaults::INITIAL_TARGETS
        .iter()
        .enumerate()
        .map(|(index, &target)| AgentSpec::new(index, defaults::BASE_ALTITUDE, target))
        .collect()
}

impl MissionConfig {
    /// Load configuration using the standard search order:
    /// 1. `$SWARM_CONFIG` environment variable
    /// 2. `./mission_config.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        // 1. Check env var
        if let Ok(path) = std::env::var("SWARM_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), mission = %config.mission.name, "Loaded mission config from SWARM_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from SWARM_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "SWARM_CONFIG points to non-existent file, falling back");
            }
        }

        // 2. Check ./mission_config.toml
        let local = PathBuf::from("mission_config.toml");
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(mission = %config.mission.name, "Loaded mission config from ./mission_config.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./mission_config.toml, using defaults");
                }
            }
        }

        // 3. Defaults
        info!("No mission_config.toml found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::InvalidToml(e) => ConfigError::Parse(path.to_path_buf(), e),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    ///
    /// Unknown keys are logged as warnings; they never fail the load.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }
        let config: Self = toml::from_str(contents).map_err(ConfigError::InvalidToml)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Save config to a file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Mission config saved");
        Ok(())
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Agents ordered by index.
    pub fn agents_by_index(&self) -> Vec<AgentSpec> {
        let mut agents = self.agents.clone();
        agents.sort_by_key(|a| a.index);
        agents
    }

    /// Validate agents and timing for internal consistency.
    ///
    /// Rules:
    /// - at least one agent; indices unique and contiguous from 0
    /// - designated computer is one of the agents
    /// - every period, hold and timeout is > 0
    /// - altitudes are finite and non-negative
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        // Agents
        let n = self.agents.len();
        if n == 0 {
            errors.push("agents: at least one agent is required".to_string());
        }
        let mut seen = HashSet::new();
        for agent in &self.agents {
            if !seen.insert(agent.index) {
                errors.push(format!("agents: duplicate index {}", agent.index));
            }
            if agent.index >= n {
                errors.push(format!(
                    "agents: index {} out of range, indices must be contiguous 0..{}",
                    agent.index, n
                ));
            }
            Self::check_altitude(agent.base_altitude, agent.index, "base_altitude", &mut errors);
            Self::check_altitude(agent.initial_target, agent.index, "initial_target", &mut errors);
            if let Some(liftoff) = agent.liftoff_altitude {
                Self::check_altitude(liftoff, agent.index, "liftoff_altitude", &mut errors);
            }
        }
        if n > 0 && self.mission.designated_computer_index >= n {
            errors.push(format!(
                "mission.designated_computer_index ({}) must name one of the {} agents",
                self.mission.designated_computer_index, n
            ));
        }

        // Mission duration
        let d = self.mission.duration_secs;
        if !d.is_finite() || d <= 0.0 {
            errors.push(format!("mission.duration_secs must be a positive number, got {d}"));
        }

        // Timing: all periods are divisors or hold lengths
        let t = &self.timing;
        for (value, name) in [
            (t.time_unit_ms, "timing.time_unit_ms"),
            (t.consensus_period, "timing.consensus_period"),
            (t.sample_hold_duration, "timing.sample_hold_duration"),
        ] {
            if value == 0 {
                errors.push(format!("{name} must be > 0"));
            }
        }

        // Barrier / sensor
        if self.barrier.timeout_ms == 0 {
            errors.push("barrier.timeout_ms must be > 0".to_string());
        }
        if self.barrier.poll_interval_ms == 0 {
            errors.push("barrier.poll_interval_ms must be > 0".to_string());
        } else if self.barrier.poll_interval_ms >= self.barrier.timeout_ms {
            errors.push(format!(
                "barrier.poll_interval_ms ({}) must be less than barrier.timeout_ms ({})",
                self.barrier.poll_interval_ms, self.barrier.timeout_ms
            ));
        }
        if self.sensor.timeout_ms == 0 {
            errors.push("sensor.timeout_ms must be > 0".to_string());
        }
        if self.sensor.sample_period_ms == 0 {
            errors.push("sensor.sample_period_ms must be > 0".to_string());
        }

        // Simulation
        let noise = self.simulation.noise_std;
        if !noise.is_finite() || noise < 0.0 {
            errors.push(format!("simulation.noise_std must be >= 0, got {noise}"));
        }

        // Range validation (warnings are logged, errors abort)
        let (range_errors, range_warnings) = super::validation::validate_ranges(self);
        errors.extend(range_errors);
        for w in &range_warnings {
            warn!("{}", w);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_altitude(value: f64, index: usize, name: &str, errors: &mut Vec<String>) {
        // NaN/Inf comparisons silently pass; catch them explicitly
        if !value.is_finite() {
            errors.push(format!("agents[{index}].{name} must be finite, got {value}"));
        } else if value < 0.0 {
            errors.push(format!("agents[{index}].{name} ({value:.3}) cannot be negative"));
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, std::io::Error),

    #[error("Config parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, toml::de::Error),

    #[error("Config parse error: {0}")]
    InvalidToml(toml::de::Error),

    #[error("Config serialization error: {0}")]
    Serialize(toml::ser::Error),

    #[error("Config validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}

// ============================================================================
// Mission Info
// ============================================================================

/// Identification and overall length of the mission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionInfo {
    /// Mission name (appears in logs and the report)
    #[serde(default = "default_mission_name")]
    pub name: String,

    /// Wall-clock duration of the converging phase (seconds)
    #[serde(default = "default_duration_secs")]
    pub duration_secs: f64,

    /// Agent that computes consensus each round
    #[serde(default = "default_designated_computer")]
    pub designated_computer_index: usize,
}

fn default_mission_name() -> String {
    "altitude-consensus".to_string()
}
fn default_duration_secs() -> f64 {
    defaults::MISSION_DURATION_SECS
}
fn default_designated_computer() -> usize {
    defaults::DESIGNATED_COMPUTER_INDEX
}

impl Default for MissionInfo {
    fn default() -> Self {
        Self {
            name: default_mission_name(),
            duration_secs: default_duration_secs(),
            designated_computer_index: default_designated_computer(),
        }
    }
}

impl MissionInfo {
    pub fn duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.duration_secs).unwrap_or(Duration::ZERO)
    }
}

// ============================================================================
// Timing
// ============================================================================

/// Schedule in whole time units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Length of one time unit (ms)
    #[serde(default = "default_time_unit_ms")]
    pub time_unit_ms: u64,

    /// Consensus runs every N time units
    #[serde(default = "default_consensus_period")]
    pub consensus_period: u64,

    /// Each converging setpoint is held for N time units
    #[serde(default = "default_sample_hold")]
    pub sample_hold_duration: u64,

    /// Liftoff hold at the low altitude (time units)
    #[serde(default = "default_liftoff_hold")]
    pub liftoff_hold: u64,

    /// Climb hold at the initial target (time units)
    #[serde(default = "default_climb_hold")]
    pub climb_hold: u64,

    /// Hold at base altitude before disarming (time units)
    #[serde(default = "default_landing_hold")]
    pub landing_hold: u64,
}

fn default_time_unit_ms() -> u64 { defaults::TIME_UNIT_MS }
fn default_consensus_period() -> u64 { defaults::CONSENSUS_PERIOD_UNITS }
fn default_sample_hold() -> u64 { defaults::SAMPLE_HOLD_UNITS }
fn default_liftoff_hold() -> u64 { defaults::LIFTOFF_HOLD_UNITS }
fn default_climb_hold() -> u64 { defaults::CLIMB_HOLD_UNITS }
fn default_landing_hold() -> u64 { defaults::LANDING_HOLD_UNITS }

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            time_unit_ms: default_time_unit_ms(),
            consensus_period: default_consensus_period(),
            sample_hold_duration: default_sample_hold(),
            liftoff_hold: default_liftoff_hold(),
            climb_hold: default_climb_hold(),
            landing_hold: default_landing_hold(),
        }
    }
}

impl TimingConfig {
    /// Wall-clock length of `units` time units.
    pub fn units(&self, units: u64) -> Duration {
        Duration::from_millis(self.time_unit_ms.saturating_mul(units))
    }

    pub fn sample_hold(&self) -> Duration {
        self.units(self.sample_hold_duration)
    }
}

// ============================================================================
// Barrier
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarrierConfig {
    /// Longest wait at either barrier before the round is abandoned (ms)
    #[serde(default = "default_barrier_timeout_ms")]
    pub timeout_ms: u64,

    /// Sleep between barrier checks (ms)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Whether a published 0.0 counts as "unset"
    #[serde(default)]
    pub sentinel: SentinelPolicy,
}

fn default_barrier_timeout_ms() -> u64 { defaults::BARRIER_TIMEOUT_MS }
fn default_poll_interval_ms() -> u64 { defaults::BARRIER_POLL_INTERVAL_MS }

impl Default for BarrierConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_barrier_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            sentinel: SentinelPolicy::default(),
        }
    }
}

impl BarrierConfig {
    pub fn settings(&self) -> BarrierSettings {
        BarrierSettings {
            timeout: Duration::from_millis(self.timeout_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

// ============================================================================
// Sensor
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Longest wait for one sample before the agent lands (ms)
    #[serde(default = "default_sensor_timeout_ms")]
    pub timeout_ms: u64,

    /// Sample period of the altitude stream (ms)
    #[serde(default = "default_sample_period_ms")]
    pub sample_period_ms: u64,
}

fn default_sensor_timeout_ms() -> u64 { defaults::SENSOR_TIMEOUT_MS }
fn default_sample_period_ms() -> u64 { defaults::SENSOR_SAMPLE_PERIOD_MS }

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_sensor_timeout_ms(),
            sample_period_ms: default_sample_period_ms(),
        }
    }
}

impl SensorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// ============================================================================
// Output
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for mission logs and the report
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    /// Agent `i` writes `<file_prefix><i>.csv`
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    /// Write `mission_report.json` next to the logs
    #[serde(default = "default_write_report")]
    pub write_report: bool,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(defaults::OUTPUT_DIR)
}
fn default_file_prefix() -> String {
    defaults::LOG_FILE_PREFIX.to_string()
}
fn default_write_report() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            file_prefix: default_file_prefix(),
            write_report: default_write_report(),
        }
    }
}

impl OutputConfig {
    pub fn report_path(&self) -> PathBuf {
        self.dir.join(defaults::REPORT_FILE_NAME)
    }
}

// ============================================================================
// Simulation
// ============================================================================

/// Behaviour of simulated vehicles used by the `swarm-consensus` binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// First-order response time constant (ms); 0 snaps to the setpoint
    #[serde(default = "default_response_time_ms")]
    pub response_time_ms: u64,

    /// Gaussian altitude noise standard deviation (m)
    #[serde(default)]
    pub noise_std: f64,

    /// Altitude before the first command (m)
    #[serde(default)]
    pub initial_altitude: f64,

    /// RNG seed for reproducible noise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_response_time_ms() -> u64 { defaults::SIM_RESPONSE_TIME_MS }

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            response_time_ms: default_response_time_ms(),
            noise_std: 0.0,
            initial_altitude: 0.0,
            seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn settings(&self, sample_period_ms: u64) -> SimulationSettings {
        SimulationSettings {
            sample_period_ms,
            response_time_ms: self.response_time_ms,
            noise_std: self.noise_std,
            initial_altitude: self.initial_altitude,
            seed: self.seed,
        }
    }
}
