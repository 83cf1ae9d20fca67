//! Config validation: unknown-key detection with Levenshtein suggestions
//! and physical range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, ", did you mean '{s}'?")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for MissionConfig.
///
/// This is maintained manually to match the struct hierarchy in mission_config.rs.
/// Any new field added to MissionConfig must be added here too. Entries of
/// `[[agents]]` share one key set, so `agents.index` covers every agent.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [mission]
        "mission",
        "mission.name",
        "mission.duration_secs",
        "mission.designated_computer_index",
        // [timing]
        "timing",
        "timing.time_unit_ms",
        "timing.consensus_period",
        "timing.sample_hold_duration",
        "timing.liftoff_hold",
        "timing.climb_hold",
        "timing.landing_hold",
        // [barrier]
        "barrier",
        "barrier.timeout_ms",
        "barrier.poll_interval_ms",
        "barrier.sentinel",
        // [sensor]
        "sensor",
        "sensor.timeout_ms",
        "sensor.sample_period_ms",
        // [output]
        "output",
        "output.dir",
        "output.file_prefix",
        "output.write_report",
        // [simulation]
        "simulation",
        "simulation.response_time_ms",
        "simulation.noise_std",
        "simulation.initial_altitude",
        "simulation.seed",
        // [[agents]]
        "agents",
        "agents.index",
        "agents.base_altitude",
        "agents.initial_target",
        "agents.liftoff_altitude",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`, and `a = [{ b = 1 }, { b = 2 }]` yields `["a", "a.b"]`.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            } else if let Some(items) = v.as_array() {
                // Array of tables: every element reports under the same path
                for item in items.iter().filter(|i| i.is_table()) {
                    for key in walk_toml_keys(item, &path) {
                        if !keys.contains(&key) {
                            keys.push(key);
                        }
                    }
                }
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a_len = a.len();
    let b_len = b.len();
    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1)
                .min(curr[j] + 1)
                .min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;
    for &k in known {
        let dist = levenshtein(unknown, k);
        if dist <= 3 {
            if let Some((_, best_dist)) = best {
                if dist < best_dist {
                    best = Some((k, dist));
                }
            } else {
                best = Some((k, dist));
            }
        }
    }
    best.map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys; it only warns. Existing configs
/// always continue to work.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    let found = walk_toml_keys(&value, "");
    let mut warnings = Vec::new();

    for key in &found {
        if !known.contains(key.as_str()) {
            let suggestion = suggest_correction(key, &known);
            let message = format!("Unknown config key '{key}'");
            warnings.push(ValidationWarning {
                field: key.clone(),
                message,
                suggestion,
            });
        }
    }

    warnings
}

// ============================================================================
// Range Validation
// ============================================================================

/// Altitudes above this are unusual for an indoor swarm (m).
const ALTITUDE_WARNING_M: f64 = 3.0;

/// Validate cross-field ranges on a parsed MissionConfig.
///
/// Returns (errors, warnings): errors are settings the agent loop cannot
/// run with; warnings are suspicious but not fatal.
pub fn validate_ranges(config: &super::MissionConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    // Every read would time out before the next sample arrives
    if config.sensor.timeout_ms <= config.sensor.sample_period_ms {
        errors.push(format!(
            "sensor.timeout_ms ({}) must exceed sensor.sample_period_ms ({})",
            config.sensor.timeout_ms, config.sensor.sample_period_ms
        ));
    }

    // Fewer than one sample per time unit skips ticks
    if config.sensor.sample_period_ms > config.timing.time_unit_ms {
        warnings.push(ValidationWarning {
            field: "sensor.sample_period_ms".to_string(),
            message: format!(
                "sensor.sample_period_ms = {} is longer than timing.time_unit_ms = {}; ticks will be skipped",
                config.sensor.sample_period_ms, config.timing.time_unit_ms
            ),
            suggestion: None,
        });
    }

    // Peers sample at different instants; a barrier shorter than one unit
    // abandons rounds that would have completed
    if config.barrier.timeout_ms < config.timing.time_unit_ms {
        warnings.push(ValidationWarning {
            field: "barrier.timeout_ms".to_string(),
            message: format!(
                "barrier.timeout_ms = {} is shorter than one time unit ({} ms)",
                config.barrier.timeout_ms, config.timing.time_unit_ms
            ),
            suggestion: None,
        });
    }

    let round_secs = config.timing.units(config.timing.consensus_period).as_secs_f64();
    if config.mission.duration_secs.is_finite() && config.mission.duration_secs < round_secs {
        warnings.push(ValidationWarning {
            field: "mission.duration_secs".to_string(),
            message: format!(
                "mission.duration_secs = {:.1} is shorter than one consensus period ({:.1} s); no round will run",
                config.mission.duration_secs, round_secs
            ),
            suggestion: None,
        });
    }

    for agent in &config.agents {
        let highest = agent
            .initial_target
            .max(agent.base_altitude)
            .max(agent.liftoff_altitude());
        if highest > ALTITUDE_WARNING_M {
            warnings.push(ValidationWarning {
                field: format!("agents[{}]", agent.index),
                message: format!(
                    "agent {} climbs to {:.2} m, above the typical {:.1} m ceiling",
                    agent.index, highest, ALTITUDE_WARNING_M
                ),
                suggestion: None,
            });
        }
        if agent.initial_target < agent.base_altitude {
            warnings.push(ValidationWarning {
                field: format!("agents[{}].initial_target", agent.index),
                message: format!(
                    "agent {} initial_target {:.2} is below its base_altitude {:.2}",
                    agent.index, agent.initial_target, agent.base_altitude
                ),
                suggestion: None,
            });
        }
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_identical() {
        assert_eq!(levenshtein("hello", "hello"), 0);
    }

    #[test]
    fn test_levenshtein_one_edit() {
        assert_eq!(levenshtein("efficency", "efficiency"), 1);
    }

    #[test]
    fn test_levenshtein_empty() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_flat() {
        let toml: toml::Value = r#"
            a = 1
            b = "hello"
        "#
        .parse()
        .unwrap();
        let keys = walk_toml_keys(&toml, "");
        assert!(keys.contains(&"a".to_string()));
        assert!(keys.contains(&"b".to_string()));
    }

    #[test]
    fn test_walk_toml_keys_nested() {
        let toml: toml::Value = r#"
            [mission]
            name = "demo"
            [timing]
            time_unit_ms = 100
        "#
        .parse()
        .unwrap();
        let keys = walk_toml_keys(&toml, "");
        assert!(keys.contains(&"mission".to_string()));
        assert!(keys.contains(&"mission.name".to_string()));
        assert!(keys.contains(&"timing.time_unit_ms".to_string()));
    }

    #[test]
    fn test_walk_toml_keys_array_of_tables() {
        let toml: toml::Value = r#"
            [[agents]]
            index = 0
            base_altitude = 0.15
            [[agents]]
            index = 1
            initial_target = 0.4
        "#
        .parse()
        .unwrap();
        let keys = walk_toml_keys(&toml, "");
        assert_eq!(
            keys.iter().filter(|k| k.as_str() == "agents.index").count(),
            1
        );
        assert!(keys.contains(&"agents.base_altitude".to_string()));
        assert!(keys.contains(&"agents.initial_target".to_string()));
    }

    #[test]
    fn test_typo_key_produces_warning_with_suggestion() {
        let toml_str = r#"
[timing]
consensus_perod = 3
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].field.contains("consensus_perod"));
        assert_eq!(
            warnings[0].suggestion.as_deref(),
            Some("timing.consensus_period")
        );
    }

    #[test]
    fn test_typo_in_agent_entry_is_reported() {
        let toml_str = r#"
[[agents]]
index = 0
base_altitude = 0.15
inital_target = 0.4
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert_eq!(warnings.len(), 1);
        assert_eq!(
            warnings[0].suggestion.as_deref(),
            Some("agents.initial_target")
        );
    }

    #[test]
    fn test_all_valid_keys_produce_zero_warnings() {
        let toml_str = r#"
[mission]
name = "Test-1"
duration_secs = 12.0

[barrier]
sentinel = "explicit"

[[agents]]
index = 0
base_altitude = 0.15
initial_target = 0.4
liftoff_altitude = 0.2
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert!(
            warnings.is_empty(),
            "Expected 0 warnings, got: {:?}",
            warnings
        );
    }

    #[test]
    fn test_unknown_section_produces_warning() {
        let toml_str = r#"
[telemetry]
some_field = 42
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert!(
            !warnings.is_empty(),
            "Expected warnings for unknown section"
        );
        assert!(warnings.iter().any(|w| w.field.contains("telemetry")));
    }

    #[test]
    fn test_suggest_correction_finds_close_match() {
        let known = known_config_keys();
        let suggestion = suggest_correction("barrier.timeout", &known);
        assert_eq!(suggestion.as_deref(), Some("barrier.timeout_ms"));
    }

    #[test]
    fn test_suggest_correction_no_match_for_garbage() {
        let known = known_config_keys();
        let suggestion = suggest_correction("completely_unrelated_garbage_key_xyz", &known);
        assert!(suggestion.is_none());
    }

    #[test]
    fn test_known_keys_covers_all_sections() {
        let known = known_config_keys();
        for section in ["mission", "timing", "barrier", "sensor", "output", "simulation", "agents"] {
            assert!(known.contains(section), "missing section {section}");
        }
        assert!(known.contains("mission.designated_computer_index"));
        assert!(known.contains("agents.liftoff_altitude"));
    }

    #[test]
    fn test_ranges_defaults_clean() {
        let config = crate::config::MissionConfig::default();
        let (errors, warnings) = validate_ranges(&config);
        assert!(errors.is_empty(), "Defaults should produce no errors: {:?}", errors);
        assert!(warnings.is_empty(), "Defaults should produce no warnings: {:?}", warnings);
    }

    #[test]
    fn test_sensor_timeout_shorter_than_period_is_error() {
        let mut config = crate::config::MissionConfig::default();
        config.sensor.timeout_ms = 20;
        let (errors, _) = validate_ranges(&config);
        assert!(errors.iter().any(|e| e.contains("sensor.timeout_ms")));
    }

    #[test]
    fn test_short_mission_warns() {
        let mut config = crate::config::MissionConfig::default();
        config.mission.duration_secs = 2.0;
        let (errors, warnings) = validate_ranges(&config);
        assert!(errors.is_empty());
        assert!(warnings.iter().any(|w| w.field == "mission.duration_secs"));
    }

    #[test]
    fn test_high_altitude_warns() {
        let mut config = crate::config::MissionConfig::default();
        config.agents[2].initial_target = 12.0;
        let (_, warnings) = validate_ranges(&config);
        assert!(warnings.iter().any(|w| w.field == "agents[2]"));
    }
}
