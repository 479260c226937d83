//! Row types that do not live in the shared catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rampart_core::enums::InstallationStatus;
use rampart_core::types::{GeoPos, MissileId, Velocity};

/// One radar sighting, persisted for every published detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub radar_callsign: String,
    pub missile_id: MissileId,
    pub position: GeoPos,
    pub velocity: Velocity,
    pub signal_strength_db: f64,
    pub confidence_percent: i32,
    pub detected_at: DateTime<Utc>,
}

/// One engagement attempt, recorded when a battery commits to a launch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementAttemptRecord {
    pub target_missile_id: MissileId,
    pub battery_callsign: String,
    pub probability_of_success: f64,
    pub attempted_at: DateTime<Utc>,
}

/// Live ammunition/status snapshot for one battery, refreshed by the
/// command center's housekeeping tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryStatusRow {
    pub callsign: String,
    pub ammo_count: i64,
    pub status: InstallationStatus,
}
