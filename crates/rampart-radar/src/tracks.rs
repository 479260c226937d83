//! Ephemeral track correlation.
//!
//! One track per observed munition, created on first sighting and dropped
//! after the idle TTL. Confidence ramps with detection count and saturates
//! at 0.95.

use std::collections::{BTreeSet, HashMap};

use rampart_core::constants::{
    TRACK_CONFIDENCE_BASE, TRACK_CONFIDENCE_MAX, TRACK_CONFIDENCE_PER_HIT,
};
use rampart_core::messages::PositionUpdate;
use rampart_core::types::{GeoPos, MissileId, Velocity};

#[derive(Debug, Clone)]
pub struct Track {
    pub missile_id: MissileId,
    pub missile_callsign: String,
    pub position: GeoPos,
    pub velocity: Velocity,
    pub first_seen: f64,
    pub last_update: f64,
    pub detection_count: u32,
    pub confidence: f64,
    pub detecting_radars: BTreeSet<String>,
}

#[derive(Debug, Default)]
pub struct TrackTable {
    tracks: HashMap<MissileId, Track>,
}

impl TrackTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update or create the track for a position report.
    pub fn observe(&mut self, update: &PositionUpdate, now: f64) -> &Track {
        let track = self
            .tracks
            .entry(update.id)
            .or_insert_with(|| Track {
                missile_id: update.id,
                missile_callsign: update.callsign.clone(),
                position: update.position.into(),
                velocity: update.velocity,
                first_seen: now,
                last_update: now,
                detection_count: 0,
                confidence: 0.0,
                detecting_radars: BTreeSet::new(),
            });
        track.position = update.position.into();
        track.velocity = update.velocity;
        track.last_update = now;
        track
    }

    /// Count a detection by `radar_callsign` and return the new confidence.
    pub fn record_detection(&mut self, id: MissileId, radar_callsign: &str) -> Option<f64> {
        let track = self.tracks.get_mut(&id)?;
        track.detection_count += 1;
        track.detecting_radars.insert(radar_callsign.to_string());
        track.confidence = (TRACK_CONFIDENCE_BASE
            + track.detection_count as f64 * TRACK_CONFIDENCE_PER_HIT)
            .min(TRACK_CONFIDENCE_MAX);
        Some(track.confidence)
    }

    /// Drop tracks idle for longer than `ttl_s`. Returns how many died.
    pub fn expire_idle(&mut self, now: f64, ttl_s: f64) -> usize {
        let before = self.tracks.len();
        self.tracks.retain(|_, track| now - track.last_update <= ttl_s);
        before - self.tracks.len()
    }

    pub fn get(&self, id: MissileId) -> Option<&Track> {
        self.tracks.get(&id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
