//! Harness configuration from environment.

use std::env;

use safepath_core::PlannerConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct CliConfig {
    pub cell_size: f64,
    pub avoidance_radius: f64,
    pub max_iterations: usize,
    pub smoothing_passes: usize,
    pub use_jps: bool,
    /// Guidance ticks per second in `walk_route`
    pub tick_hz: f64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            cell_size: 0.5,
            avoidance_radius: 1.0,
            max_iterations: 20_000,
            smoothing_passes: 3,
            use_jps: false,
            tick_hz: 10.0,
        }
    }
}

impl CliConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; missing or malformed values keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            cell_size: lookup("SAFEPATH_CELL_SIZE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.cell_size),
            avoidance_radius: lookup("SAFEPATH_AVOIDANCE_RADIUS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.avoidance_radius),
            max_iterations: lookup("SAFEPATH_MAX_ITERATIONS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_iterations),
            smoothing_passes: lookup("SAFEPATH_SMOOTHING_PASSES")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.smoothing_passes),
            use_jps: lookup("SAFEPATH_USE_JPS")
                .map(|s| parse_flag(&s))
                .unwrap_or(defaults.use_jps),
            tick_hz: lookup("SAFEPATH_TICK_HZ")
                .and_then(|s| s.parse().ok())
                .filter(|hz: &f64| *hz > 0.0)
                .unwrap_or(defaults.tick_hz),
        }
    }

    pub fn planner_config(&self) -> PlannerConfig {
        PlannerConfig {
            cell_size: self.cell_size,
            obstacle_avoidance_radius: self.avoidance_radius,
            max_pathfinding_iterations: self.max_iterations,
            smoothing_passes: self.smoothing_passes,
            use_jump_point_search: self.use_jps,
            ..Default::default()
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = CliConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = CliConfig::from_lookup(lookup_from(&[
            ("SAFEPATH_CELL_SIZE", "0.25"),
            ("SAFEPATH_MAX_ITERATIONS", "500"),
            ("SAFEPATH_USE_JPS", "true"),
            ("SAFEPATH_TICK_HZ", "4"),
        ]));
        assert_eq!(config.cell_size, 0.25);
        assert_eq!(config.max_iterations, 500);
        assert!(config.use_jps);
        assert_eq!(config.tick_hz, 4.0);

        let planner = config.planner_config();
        assert_eq!(planner.cell_size, 0.25);
        assert!(planner.use_jump_point_search);
        assert_eq!(planner.significant_turn_deg, 15.0);
    }

    #[test]
    fn malformed_values_are_ignored() {
        let config = CliConfig::from_lookup(lookup_from(&[
            ("SAFEPATH_CELL_SIZE", "half a meter"),
            ("SAFEPATH_TICK_HZ", "0"),
            ("SAFEPATH_USE_JPS", "nope"),
        ]));
        assert_eq!(config.cell_size, 0.5);
        assert_eq!(config.tick_hz, 10.0);
        assert!(!config.use_jps);
    }
}
