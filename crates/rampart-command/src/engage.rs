//! Battery selection and intercept solution scoring.

use rampart_core::catalog::Installation;
use rampart_core::enums::InstallationStatus;
use rampart_core::types::GeoPos;

use crate::threat::ThreatAssessment;

/// Command-center view of one battery, refreshed from the database each
/// housekeeping tick.
#[derive(Debug, Clone)]
pub struct BatteryInfo {
    pub callsign: String,
    pub position: GeoPos,
    pub max_range_m: f64,
    pub max_altitude_m: f64,
    /// 0..1 fraction.
    pub accuracy: f64,
    pub reload_time_sec: f64,
    pub ammo_count: i64,
    pub status: InstallationStatus,
    /// Seconds until the battery can fire again (0 when ready).
    pub time_to_ready: f64,
}

impl BatteryInfo {
    pub fn from_installation(installation: &Installation) -> Self {
        Self {
            callsign: installation.callsign.clone(),
            position: installation.position,
            max_range_m: installation.platform.max_range_m,
            max_altitude_m: installation.platform.max_altitude_m,
            accuracy: installation.platform.accuracy(),
            reload_time_sec: installation.platform.reload_time_sec,
            ammo_count: installation.ammo_count,
            status: installation.status,
            time_to_ready: 0.0,
        }
    }

    pub fn can_fire(&self) -> bool {
        self.status == InstallationStatus::Active && self.ammo_count > 0
    }
}

/// A candidate firing solution for one battery.
#[derive(Debug, Clone)]
pub struct InterceptSolution {
    pub battery_callsign: String,
    pub intercept_point: GeoPos,
    pub intercept_altitude_m: f64,
    pub probability_of_success: f64,
    pub time_to_launch: f64,
}

impl InterceptSolution {
    /// Rank: success probability discounted by how long the battery needs
    /// to get a round off.
    pub fn score(&self) -> f64 {
        self.probability_of_success / (self.time_to_launch + 1.0)
    }
}

/// Compute the intercept solution for one battery, or `None` if the threat
/// is outside its envelope.
///
/// The intercept point is the midpoint between battery and threat; both the
/// range and altitude checks apply to that point. Submerged threats are
/// not engageable.
pub fn solve(threat: &ThreatAssessment, battery: &BatteryInfo) -> Option<InterceptSolution> {
    if threat.position.alt_m <= 0.0 {
        return None;
    }

    let intercept_point = battery.position.midpoint(&threat.position);
    let distance = battery.position.distance_m(&intercept_point);
    if distance > battery.max_range_m {
        return None;
    }
    if intercept_point.alt_m > battery.max_altitude_m {
        return None;
    }

    let probability = battery.accuracy * (1.0 - distance / battery.max_range_m);
    Some(InterceptSolution {
        battery_callsign: battery.callsign.clone(),
        intercept_point,
        intercept_altitude_m: intercept_point.alt_m,
        probability_of_success: probability,
        time_to_launch: battery.time_to_ready,
    })
}

/// Pick the highest-scoring solution among batteries that can fire.
pub fn select_battery(
    threat: &ThreatAssessment,
    batteries: &[BatteryInfo],
) -> Option<InterceptSolution> {
    batteries
        .iter()
        .filter(|battery| battery.can_fire())
        .filter_map(|battery| solve(threat, battery))
        .max_by(|a, b| a.score().total_cmp(&b.score()))
}
