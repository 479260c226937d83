//! Catalog rows: platform types, installations, and durable outcomes.
//!
//! These mirror the shared database tables. They are plain data; behavior
//! lives in the owning services.

use serde::{Deserialize, Serialize};

use crate::enums::{InstallationStatus, MissileKind, OutcomeKind, PlatformCategory};
use crate::types::{GeoPos, MissileId};

/// Immutable performance envelope for a platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformType {
    pub nickname: String,
    pub category: PlatformCategory,
    pub max_speed_mps: f64,
    pub max_range_m: f64,
    pub max_altitude_m: f64,
    /// Radar-only. `None` falls back to the in-memory default.
    pub detection_range_m: Option<f64>,
    /// Radar-only. Drives the scan interval.
    pub sweep_rate_deg_per_sec: Option<f64>,
    pub reload_time_sec: f64,
    pub accuracy_percent: f64,
    pub blast_radius_m: f64,
    pub fuel_capacity_kg: f64,
    pub fuel_consumption_rate_kgps: f64,
    pub thrust_n: f64,
}

impl PlatformType {
    /// Accuracy as a 0..1 fraction.
    pub fn accuracy(&self) -> f64 {
        self.accuracy_percent / 100.0
    }

    /// Uppercase letters and digits of the nickname, e.g. "SM-3" -> "SM3".
    pub fn abbreviation(&self) -> String {
        self.nickname
            .chars()
            .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
            .collect()
    }
}

/// A fixed (or mobile) site with a platform type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installation {
    /// Globally unique key.
    pub callsign: String,
    pub position: GeoPos,
    pub status: InstallationStatus,
    pub platform: PlatformType,
    /// Aggregated ammunition across the installation's munition rows.
    /// Zero for installations that do not fire.
    pub ammo_count: i64,
}

impl Installation {
    pub fn is_active(&self) -> bool {
        self.status == InstallationStatus::Active
    }
}

/// Durable record of how a munition ended. Written exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub missile_id: MissileId,
    pub kind: OutcomeKind,
    pub position: GeoPos,
    pub target_achieved: bool,
    pub intercepting_missile_id: Option<MissileId>,
    pub notes: Option<String>,
}

/// Row describing a launched munition while it is (or was) in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveMissileRecord {
    pub id: MissileId,
    pub callsign: String,
    pub platform_nickname: String,
    pub launch_callsign: String,
    pub kind: MissileKind,
    pub target: GeoPos,
    pub launch_ts: chrono::DateTime<chrono::Utc>,
}
