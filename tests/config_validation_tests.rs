//! Config Validation Tests
//!
//! Exercises typo detection, semantic validation and range checks of the
//! mission configuration independently from the agent loops.

use std::io::Write;

use swarm_consensus::config::validation::{
    known_config_keys, suggest_correction, validate_ranges, validate_unknown_keys,
};
use swarm_consensus::config::{ConfigError, MissionConfig};
use swarm_consensus::coordination::SentinelPolicy;

fn validation_errors(config: &MissionConfig) -> Vec<String> {
    match config.validate() {
        Err(ConfigError::Validation(errors)) => errors,
        Err(other) => panic!("unexpected error: {other}"),
        Ok(()) => Vec::new(),
    }
}

// ============================================================================
// Typo Detection
// ============================================================================

#[test]
fn typo_in_timing_section_warns_with_suggestion() {
    let toml_str = r#"
[timing]
time_unit = 1000
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1, "Expected exactly 1 warning");
    assert!(warnings[0].field.contains("time_unit"));
    assert_eq!(
        warnings[0].suggestion.as_deref(),
        Some("timing.time_unit_ms")
    );
}

#[test]
fn typo_in_mission_section_warns() {
    let toml_str = r#"
[mission]
naem = "Hover-Test"
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1);
    // "naem" is distance 2 from "name" → should suggest
    assert_eq!(warnings[0].suggestion.as_deref(), Some("mission.name"));
}

#[test]
fn valid_config_produces_zero_warnings() {
    let toml_str = r#"
[mission]
name = "five-up"
duration_secs = 45.0
designated_computer_index = 0

[timing]
time_unit_ms = 1000
consensus_period = 3
sample_hold_duration = 1
liftoff_hold = 2
climb_hold = 5
landing_hold = 2

[barrier]
timeout_ms = 10000
poll_interval_ms = 1
sentinel = "zero_is_unset"

[sensor]
timeout_ms = 5000
sample_period_ms = 50

[output]
dir = "./data"
file_prefix = "testing"
write_report = true

[simulation]
response_time_ms = 300
noise_std = 0.005
initial_altitude = 0.0
seed = 42

[[agents]]
index = 0
base_altitude = 0.15
initial_target = 1.0

[[agents]]
index = 1
base_altitude = 0.15
initial_target = 0.4
liftoff_altitude = 0.2
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert!(warnings.is_empty(), "Expected 0 warnings, got: {:?}", warnings);
}

#[test]
fn unknown_section_warns() {
    let toml_str = r#"
[radio]
channel = 80
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert!(warnings.iter().any(|w| w.field == "radio"));
    assert!(warnings.iter().any(|w| w.field == "radio.channel"));
}

#[test]
fn multiple_typos_all_warned() {
    let toml_str = r#"
[barrier]
timout_ms = 5000
pol_interval_ms = 2

[[agents]]
index = 0
base_altitud = 0.15
initial_target = 0.5
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 3, "{:?}", warnings);
    assert!(warnings.iter().all(|w| w.suggestion.is_some()));
}

#[test]
fn empty_toml_produces_zero_warnings() {
    assert!(validate_unknown_keys("").is_empty());
}

#[test]
fn known_keys_set_is_complete() {
    let known = known_config_keys();
    // Every field of the default config serializes to a known key
    let toml_str = MissionConfig::default().to_toml().unwrap();
    let value: toml::Value = toml_str.parse().unwrap();
    for key in swarm_consensus::config::validation::walk_toml_keys(&value, "") {
        assert!(known.contains(key.as_str()), "serialized key '{key}' not known");
    }
}

#[test]
fn suggest_correction_returns_none_for_garbage() {
    let known = known_config_keys();
    assert!(suggest_correction("qqqqqqqqqqqqqqqqqqqqqq", &known).is_none());
}

// ============================================================================
// Semantic Validation
// ============================================================================

#[test]
fn all_defaults_pass_validation() {
    let config = MissionConfig::default();
    assert!(config.validate().is_ok());
    let (errors, warnings) = validate_ranges(&config);
    assert!(errors.is_empty(), "{errors:?}");
    assert!(warnings.is_empty(), "{warnings:?}");
}

#[test]
fn no_agents_is_error() {
    let mut config = MissionConfig::default();
    config.agents.clear();
    let errors = validation_errors(&config);
    assert!(errors.iter().any(|e| e.contains("at least one agent")));
}

#[test]
fn non_contiguous_indices_are_error() {
    let mut config = MissionConfig::default();
    config.agents.remove(2);
    let errors = validation_errors(&config);
    assert!(errors.iter().any(|e| e.contains("index 4 out of range")), "{errors:?}");
}

#[test]
fn negative_altitude_is_error() {
    let mut config = MissionConfig::default();
    config.agents[3].base_altitude = -0.1;
    let errors = validation_errors(&config);
    assert!(errors.iter().any(|e| e.contains("agents[3].base_altitude")));
}

#[test]
fn nan_target_is_error() {
    let mut config = MissionConfig::default();
    config.agents[0].initial_target = f64::NAN;
    let errors = validation_errors(&config);
    assert!(errors.iter().any(|e| e.contains("must be finite")));
}

#[test]
fn non_positive_duration_is_error() {
    let mut config = MissionConfig::default();
    config.mission.duration_secs = 0.0;
    assert!(!validation_errors(&config).is_empty());
}

#[test]
fn poll_interval_must_be_below_timeout() {
    let mut config = MissionConfig::default();
    config.barrier.poll_interval_ms = config.barrier.timeout_ms;
    let errors = validation_errors(&config);
    assert!(errors.iter().any(|e| e.contains("poll_interval_ms")));
}

#[test]
fn agents_out_of_order_are_accepted_and_sorted() {
    let mut config = MissionConfig::default();
    config.agents.reverse();
    assert!(config.validate().is_ok());
    let indices: Vec<usize> = config.agents_by_index().iter().map(|a| a.index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3, 4]);
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn config_roundtrip_preserves_values() {
    let mut original = MissionConfig::default();
    original.mission.name = "Roundtrip-Test".to_string();
    original.timing.time_unit_ms = 250;
    original.barrier.sentinel = SentinelPolicy::Explicit;
    original.simulation.seed = Some(99);
    original.agents[1].liftoff_altitude = Some(0.25);

    let toml_str = original.to_toml().expect("Serialization should work");
    let roundtripped =
        MissionConfig::from_toml_str(&toml_str).expect("Deserialization should work");

    assert_eq!(roundtripped.mission.name, "Roundtrip-Test");
    assert_eq!(roundtripped.timing.time_unit_ms, 250);
    assert_eq!(roundtripped.barrier.sentinel, SentinelPolicy::Explicit);
    assert_eq!(roundtripped.simulation.seed, Some(99));
    assert_eq!(roundtripped.agents, original.agents);
}

#[test]
fn load_from_file_reports_validation_failure() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[mission]
designated_computer_index = 7
"#
    )
    .unwrap();

    let err = MissionConfig::load_from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Validation(_)), "{err}");
    assert!(err.to_string().contains("designated_computer_index"));
}

#[test]
fn load_from_file_reports_parse_error_with_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "[timing]\ntime_unit_ms = \"fast\"\n").unwrap();

    let err = MissionConfig::load_from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(..)), "{err}");
}

#[test]
fn save_then_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mission_config.toml");
    let mut config = MissionConfig::default();
    config.output.file_prefix = "hover".to_string();
    config.save_to_file(&path).unwrap();

    let loaded = MissionConfig::load_from_file(&path).unwrap();
    assert_eq!(loaded.output.file_prefix, "hover");
    assert_eq!(loaded.agent_count(), 5);
}

#[test]
fn missing_file_is_io_error() {
    let err = MissionConfig::load_from_file(std::path::Path::new("/nonexistent/mission.toml"))
        .unwrap_err();
    assert!(matches!(err, ConfigError::Io(..)));
}
