//! Runtime configuration.
//!
//! Values come from the `simulation_config` key/value table with environment
//! overrides applied by the binary. Unparseable values fall back to defaults.

use std::collections::HashMap;

/// Tunable knobs shared by the services.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Engine and command center tick length (ms).
    pub tick_ms: u64,
    /// Baseline for the radar sweep-rate interval formula (ms).
    pub radar_update_interval_ms: u64,
    /// Per-target engagement attempt cap.
    pub max_retries: u32,
    /// No order is issued below this success probability.
    pub engagement_probability_floor: f64,
    /// Radar track expiry after this long without updates (s).
    pub track_idle_ttl_s: f64,
    /// Threat assessment expiry past predicted impact (s).
    pub threat_expiry_s: f64,
    /// RNG seed for detection sampling.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            radar_update_interval_ms: 1000,
            max_retries: 3,
            engagement_probability_floor: 0.3,
            track_idle_ttl_s: 30.0,
            threat_expiry_s: 300.0,
            seed: 42,
        }
    }
}

impl SimulationConfig {
    /// Build from the key/value table, keeping defaults for missing or
    /// malformed entries.
    pub fn from_kv(kv: &HashMap<String, String>) -> Self {
        let mut config = Self::default();
        for (key, value) in kv {
            config.apply(key, value);
        }
        config
    }

    /// Apply one key/value pair. Unknown keys and bad values are ignored.
    pub fn apply(&mut self, key: &str, value: &str) {
        match key {
            "tick_ms" | "simulation_tick_ms" => {
                if let Ok(v) = value.parse() {
                    self.tick_ms = v;
                }
            }
            "radar_update_interval_ms" => {
                if let Ok(v) = value.parse() {
                    self.radar_update_interval_ms = v;
                }
            }
            "max_retries" => {
                if let Ok(v) = value.parse() {
                    self.max_retries = v;
                }
            }
            "engagement_probability_floor" => {
                if let Ok(v) = value.parse() {
                    self.engagement_probability_floor = v;
                }
            }
            "track_idle_ttl_s" => {
                if let Ok(v) = value.parse() {
                    self.track_idle_ttl_s = v;
                }
            }
            "threat_expiry_s" => {
                if let Ok(v) = value.parse() {
                    self.threat_expiry_s = v;
                }
            }
            "seed" => {
                if let Ok(v) = value.parse() {
                    self.seed = v;
                }
            }
            _ => {}
        }
    }

    /// Tick length in seconds.
    pub fn tick_secs(&self) -> f64 {
        self.tick_ms as f64 / 1000.0
    }
}
