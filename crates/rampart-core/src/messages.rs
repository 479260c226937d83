//! Bus message schemas.
//!
//! Field names are the wire contract; every service serializes these with
//! `serde_json`. Messages that carry a `type` discriminator on the wire
//! expose it as `message_type` and fill it in their constructors.

use serde::{Deserialize, Serialize};

use crate::enums::{MissileKind, OutcomeKind};
use crate::types::{GeoPos, MissileId, Point3, Velocity};

fn default_missile_launch() -> String {
    LaunchRequest::MESSAGE_TYPE.to_string()
}

/// `simulation.launch` — request to create a munition.
///
/// Published by external launchers (attack) and batteries (defense).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchRequest {
    #[serde(rename = "type", default = "default_missile_launch")]
    pub message_type: String,
    pub platform_nickname: String,
    pub launch_callsign: String,
    pub launch_lat: f64,
    pub launch_lon: f64,
    pub launch_alt: f64,
    #[serde(default)]
    pub target_lat: f64,
    #[serde(default)]
    pub target_lon: f64,
    #[serde(default)]
    pub target_alt: f64,
    pub missile_type: MissileKind,
    /// Defense only: proximity-fuse radius of the interceptor.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub blast_radius: Option<f64>,
    /// Defense only: the munition this interceptor is assigned to.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub target_missile_id: Option<MissileId>,
    pub timestamp: f64,
}

impl LaunchRequest {
    pub const MESSAGE_TYPE: &'static str = "missile_launch";

    pub fn attack(
        platform_nickname: impl Into<String>,
        launch_callsign: impl Into<String>,
        launch: GeoPos,
        target: GeoPos,
        timestamp: f64,
    ) -> Self {
        Self {
            message_type: Self::MESSAGE_TYPE.to_string(),
            platform_nickname: platform_nickname.into(),
            launch_callsign: launch_callsign.into(),
            launch_lat: launch.lat,
            launch_lon: launch.lon,
            launch_alt: launch.alt_m,
            target_lat: target.lat,
            target_lon: target.lon,
            target_alt: target.alt_m,
            missile_type: MissileKind::Attack,
            blast_radius: None,
            target_missile_id: None,
            timestamp,
        }
    }

    pub fn defense(
        platform_nickname: impl Into<String>,
        launch_callsign: impl Into<String>,
        launch: GeoPos,
        target_missile_id: MissileId,
        blast_radius: f64,
        timestamp: f64,
    ) -> Self {
        Self {
            message_type: Self::MESSAGE_TYPE.to_string(),
            platform_nickname: platform_nickname.into(),
            launch_callsign: launch_callsign.into(),
            launch_lat: launch.lat,
            launch_lon: launch.lon,
            launch_alt: launch.alt_m,
            target_lat: 0.0,
            target_lon: 0.0,
            target_alt: 0.0,
            missile_type: MissileKind::Defense,
            blast_radius: Some(blast_radius),
            target_missile_id: Some(target_missile_id),
            timestamp,
        }
    }

    pub fn launch_position(&self) -> GeoPos {
        GeoPos::new(self.launch_lon, self.launch_lat, self.launch_alt)
    }

    pub fn target_position(&self) -> GeoPos {
        GeoPos::new(self.target_lon, self.target_lat, self.target_alt)
    }
}

/// `missile.position` — per-tick kinematic state of a live munition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub id: MissileId,
    pub callsign: String,
    pub position: Point3,
    pub velocity: Velocity,
    pub timestamp: f64,
    pub missile_type: MissileKind,
}

fn default_missile_impact() -> String {
    ImpactEvent::MESSAGE_TYPE.to_string()
}

/// `missile.impact` — terminal event for ground impact, detonation, or
/// fuel exhaustion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactEvent {
    #[serde(rename = "type", default = "default_missile_impact")]
    pub message_type: String,
    pub missile_id: MissileId,
    pub callsign: String,
    pub outcome_type: OutcomeKind,
    pub position: Point3,
    pub target_achieved: bool,
    pub timestamp: f64,
}

impl ImpactEvent {
    pub const MESSAGE_TYPE: &'static str = "missile_impact";
}

fn default_missile_intercepted() -> String {
    InterceptEvent::MESSAGE_TYPE.to_string()
}

/// `missile.intercepted` — terminal event for the attack missile a
/// defensive interceptor destroyed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterceptEvent {
    #[serde(rename = "type", default = "default_missile_intercepted")]
    pub message_type: String,
    pub target_missile_id: MissileId,
    pub defense_missile_id: MissileId,
    pub callsign: String,
    pub position: Point3,
    pub timestamp: f64,
}

impl InterceptEvent {
    pub const MESSAGE_TYPE: &'static str = "missile_intercepted";
}

fn default_radar_detection() -> String {
    DetectionEvent::MESSAGE_TYPE.to_string()
}

/// `radar.detection` — a radar installation spotted an attack missile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionEvent {
    #[serde(rename = "type", default = "default_radar_detection")]
    pub message_type: String,
    pub radar_callsign: String,
    pub missile_id: MissileId,
    pub missile_callsign: String,
    pub position: Point3,
    pub velocity: Velocity,
    pub confidence: f64,
    pub timestamp: f64,
}

impl DetectionEvent {
    pub const MESSAGE_TYPE: &'static str = "radar_detection";
}

fn default_engagement_order() -> String {
    EngagementOrder::MESSAGE_TYPE.to_string()
}

/// `battery.<callsign>.engage` — directive to intercept a specific munition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementOrder {
    #[serde(rename = "type", default = "default_engagement_order")]
    pub message_type: String,
    pub target_missile_id: MissileId,
    pub battery_callsign: String,
    pub intercept_point: Point3,
    pub intercept_altitude: f64,
    pub probability_of_success: f64,
    pub timestamp: f64,
}

impl EngagementOrder {
    pub const MESSAGE_TYPE: &'static str = "engagement_order";
}

/// `engagement.result` — did an engagement attempt succeed.
///
/// Published by the engine on intercept (success) and by batteries when an
/// order is rejected or a launch fails (failure).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementResult {
    pub target_missile_id: MissileId,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub defense_missile_id: Option<MissileId>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub failure_reason: Option<String>,
}
