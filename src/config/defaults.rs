//! System-wide default constants.
//!
//! Every default matches the standard five-vehicle mission. Grouped by
//! subsystem for easy discovery.

// ============================================================================
// Schedule
// ============================================================================

/// Length of one schedule time unit (ms).
pub const TIME_UNIT_MS: u64 = 1_000;

/// Consensus runs every this many time units.
pub const CONSENSUS_PERIOD_UNITS: u64 = 3;

/// Each setpoint is held for this many time units.
pub const SAMPLE_HOLD_UNITS: u64 = 1;

/// Hold at the low liftoff altitude (time units).
pub const LIFTOFF_HOLD_UNITS: u64 = 2;

/// Hold at the initial target after liftoff (time units).
pub const CLIMB_HOLD_UNITS: u64 = 5;

/// Hold at base altitude before disarming (time units).
pub const LANDING_HOLD_UNITS: u64 = 2;

/// Wall-clock length of the converging phase (seconds).
pub const MISSION_DURATION_SECS: f64 = 45.0;

/// Agent that computes consensus for every round.
pub const DESIGNATED_COMPUTER_INDEX: usize = 0;

// ============================================================================
// Barrier
// ============================================================================

/// Longest wait at either barrier before abandoning the round (ms).
pub const BARRIER_TIMEOUT_MS: u64 = 10_000;

/// Sleep between barrier checks (ms).
pub const BARRIER_POLL_INTERVAL_MS: u64 = 1;

// ============================================================================
// Sensor
// ============================================================================

/// Altitude log period of the sensor stream (ms). 50 ms = 20 Hz.
pub const SENSOR_SAMPLE_PERIOD_MS: u64 = 50;

/// Longest wait for one sensor sample before the agent lands (ms).
pub const SENSOR_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// Agents
// ============================================================================

/// Liftoff / landing altitude for every default agent (m).
pub const BASE_ALTITUDE: f64 = 0.15;

/// Initial hold altitudes of the default five agents (m).
pub const INITIAL_TARGETS: [f64; 5] = [1.0, 0.4, 0.6, 0.3, 0.8];

// ============================================================================
// Output
// ============================================================================

/// Directory for mission logs and the mission report.
pub const OUTPUT_DIR: &str = "./data";

/// Mission log file name prefix; agent `i` writes `<prefix><i>.csv`.
pub const LOG_FILE_PREFIX: &str = "testing";

/// Mission report file name inside the output directory.
pub const REPORT_FILE_NAME: &str = "mission_report.json";

// ============================================================================
// Simulation
// ============================================================================

/// First-order response time constant of simulated vehicles (ms).
pub const SIM_RESPONSE_TIME_MS: u64 = 300;
