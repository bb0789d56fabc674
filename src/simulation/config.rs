//! Simulation tuning loaded from JSON
//!
//! Every field has a default, so a config file only needs the values it
//! changes.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::apb::{RAMP_BASE, RAMP_GROWTH};
use super::lanes::MIN_LANE_GAP;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seed for the simulation RNG; random when absent
    pub seed: Option<u64>,
    /// Cap on regular traffic
    pub max_vehicles: usize,
    /// Seconds between base spawns
    pub spawn_interval: f32,
    /// Longest time step a single tick may simulate
    pub max_tick_delta: f32,
    pub lane_min_gap: f32,
    pub apb: ApbConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: None,
            max_vehicles: 24,
            spawn_interval: 1.5,
            max_tick_delta: 0.05,
            lane_min_gap: MIN_LANE_GAP,
            apb: ApbConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApbConfig {
    pub ramp_base: f32,
    pub ramp_growth: f32,
    /// Cap on traffic while a run is active, ramp spawns included
    pub max_vehicles: usize,
    /// Chaos hazard multiplier while a run is active
    pub chaos_multiplier: f32,
    pub pursuit_speed_tier: u8,
}

impl Default for ApbConfig {
    fn default() -> Self {
        Self {
            ramp_base: RAMP_BASE,
            ramp_growth: RAMP_GROWTH,
            max_vehicles: 40,
            chaos_multiplier: 3.0,
            pursuit_speed_tier: 0,
        }
    }
}

impl SimConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Invalid simulation config")
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_json_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config = SimConfig::from_json_str(r#"{"seed": 7, "apb": {"max_vehicles": 12}}"#).unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.apb.max_vehicles, 12);
        assert_eq!(config.apb.chaos_multiplier, 3.0);
        assert_eq!(config.max_tick_delta, 0.05);
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(SimConfig::from_json_str("{ seed: ").is_err());
    }
}
