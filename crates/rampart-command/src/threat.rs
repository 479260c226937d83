//! Threat assessment: impact prediction and priority classification.

use std::collections::BTreeSet;

use rampart_core::constants::{
    THREAT_CRITICAL_TTI_S, THREAT_HIGH_TTI_S, THREAT_MEDIUM_TTI_S,
};
use rampart_core::enums::ThreatLevel;
use rampart_core::types::{GeoPos, MissileId, Velocity};

/// Per-missile evaluation held by the command center while the threat is
/// live.
#[derive(Debug, Clone)]
pub struct ThreatAssessment {
    pub missile_id: MissileId,
    pub missile_callsign: String,
    pub position: GeoPos,
    /// Last known velocity; `None` until a position update arrives
    /// (detections alone do not always carry usable velocity).
    pub velocity: Option<Velocity>,
    pub predicted_impact: GeoPos,
    pub time_to_impact: f64,
    pub threat_level: ThreatLevel,
    pub confidence: f64,
    pub detecting_radars: BTreeSet<String>,
    pub last_update: f64,
}

/// Forward-project the ballistic impact point: fall time from altitude and
/// vertical rate, carried along the horizontal velocity.
pub fn predict_impact(position: &GeoPos, velocity: &Velocity) -> GeoPos {
    let fall_time = if velocity.z.abs() > 1e-6 {
        (position.alt_m / velocity.z.abs()).min(3_600.0)
    } else {
        100.0
    };
    let projected = position.translated(velocity.x * fall_time, velocity.y * fall_time, 0.0);
    GeoPos::new(projected.lon, projected.lat, 0.0)
}

/// Time to impact given a velocity: distance to the predicted point over
/// speed.
pub fn time_to_impact(position: &GeoPos, velocity: &Velocity, impact: &GeoPos) -> f64 {
    let speed = velocity.speed();
    if speed > 1e-6 {
        position.distance_m(impact) / speed
    } else {
        100.0
    }
}

/// Coarse estimate when no velocity is known, by current altitude.
pub fn estimate_time_to_impact(altitude_m: f64) -> f64 {
    if altitude_m > 1_000.0 {
        30.0
    } else if altitude_m > 100.0 {
        60.0
    } else {
        120.0
    }
}

/// Classify by time to impact.
pub fn classify(time_to_impact_s: f64) -> ThreatLevel {
    if time_to_impact_s < THREAT_CRITICAL_TTI_S {
        ThreatLevel::Critical
    } else if time_to_impact_s < THREAT_HIGH_TTI_S {
        ThreatLevel::High
    } else if time_to_impact_s < THREAT_MEDIUM_TTI_S {
        ThreatLevel::Medium
    } else {
        ThreatLevel::Low
    }
}

impl ThreatAssessment {
    /// Build a fresh assessment from the first sighting.
    pub fn new(
        missile_id: MissileId,
        missile_callsign: String,
        position: GeoPos,
        velocity: Option<Velocity>,
        now: f64,
    ) -> Self {
        let mut assessment = Self {
            missile_id,
            missile_callsign,
            position,
            velocity,
            predicted_impact: GeoPos::new(position.lon, position.lat, 0.0),
            time_to_impact: estimate_time_to_impact(position.alt_m),
            threat_level: ThreatLevel::Low,
            confidence: 0.85,
            detecting_radars: BTreeSet::new(),
            last_update: now,
        };
        assessment.reassess(now);
        assessment
    }

    /// Fold in a new observation and re-derive the prediction.
    pub fn update(
        &mut self,
        position: GeoPos,
        velocity: Option<Velocity>,
        detection_source: Option<&str>,
        now: f64,
    ) {
        self.position = position;
        if velocity.is_some() {
            self.velocity = velocity;
        }
        if let Some(radar) = detection_source {
            self.detecting_radars.insert(radar.to_string());
        }
        self.reassess(now);
    }

    fn reassess(&mut self, now: f64) {
        match &self.velocity {
            Some(velocity) => {
                self.predicted_impact = predict_impact(&self.position, velocity);
                self.time_to_impact =
                    time_to_impact(&self.position, velocity, &self.predicted_impact);
            }
            None => {
                self.predicted_impact =
                    GeoPos::new(self.position.lon, self.position.lat, 0.0);
                self.time_to_impact = estimate_time_to_impact(self.position.alt_m);
            }
        }
        self.threat_level = classify(self.time_to_impact);
        self.last_update = now;
    }

    /// Seconds-timestamp at which the threat is predicted to land.
    pub fn predicted_impact_time(&self) -> f64 {
        self.last_update + self.time_to_impact
    }
}
