//! In-memory store for tests and single-process demo runs.
//!
//! Enforces the same invariants as the Postgres implementation: unique
//! callsigns, non-negative ammunition, insert-once outcomes, idempotent
//! position updates.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use rampart_core::catalog::{ActiveMissileRecord, Installation, Outcome, PlatformType};
use rampart_core::enums::PlatformCategory;
use rampart_core::error::ValidationError;
use rampart_core::types::{GeoPos, MissileId, Velocity};

use crate::error::StoreError;
use crate::records::{BatteryStatusRow, DetectionRecord, EngagementAttemptRecord};
use crate::traits::Store;

/// Kinematic snapshot kept alongside an active-missile row.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionRow {
    pub position: GeoPos,
    pub velocity: Velocity,
    pub fuel_remaining_kg: f64,
}

#[derive(Default)]
struct State {
    platforms: HashMap<String, PlatformType>,
    installations: HashMap<String, Installation>,
    active: HashMap<MissileId, ActiveMissileRecord>,
    positions: HashMap<MissileId, PositionRow>,
    outcomes: HashMap<MissileId, Outcome>,
    detections: Vec<DetectionRecord>,
    attempts: Vec<EngagementAttemptRecord>,
    config: HashMap<String, String>,
}

#[derive(Clone, Default)]
pub struct MemStore {
    state: Arc<Mutex<State>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Seeding helpers for tests and demo setups ---

    pub fn add_platform(&self, platform: PlatformType) {
        self.state
            .lock()
            .platforms
            .insert(platform.nickname.clone(), platform);
    }

    pub fn add_installation(&self, installation: Installation) {
        self.state
            .lock()
            .installations
            .insert(installation.callsign.clone(), installation);
    }

    pub fn set_config(&self, key: &str, value: &str) {
        self.state
            .lock()
            .config
            .insert(key.to_string(), value.to_string());
    }

    // --- Inspection helpers ---

    pub fn outcome(&self, id: MissileId) -> Option<Outcome> {
        self.state.lock().outcomes.get(&id).cloned()
    }

    pub fn outcome_count(&self) -> usize {
        self.state.lock().outcomes.len()
    }

    pub fn active_count(&self) -> usize {
        self.state.lock().active.len()
    }

    pub fn position_row(&self, id: MissileId) -> Option<PositionRow> {
        self.state.lock().positions.get(&id).cloned()
    }

    pub fn detection_count(&self) -> usize {
        self.state.lock().detections.len()
    }

    pub fn attempt_count(&self) -> usize {
        self.state.lock().attempts.len()
    }

    pub fn ammo_count(&self, callsign: &str) -> i64 {
        self.state
            .lock()
            .installations
            .get(callsign)
            .map(|i| i.ammo_count)
            .unwrap_or(0)
    }
}

#[async_trait]
impl Store for MemStore {
    async fn platform_by_nickname(
        &self,
        nickname: &str,
    ) -> Result<Option<PlatformType>, StoreError> {
        Ok(self.state.lock().platforms.get(nickname).cloned())
    }

    async fn installations_by_category(
        &self,
        category: PlatformCategory,
    ) -> Result<Vec<Installation>, StoreError> {
        let state = self.state.lock();
        let mut found: Vec<Installation> = state
            .installations
            .values()
            .filter(|i| i.platform.category == category)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.callsign.cmp(&b.callsign));
        Ok(found)
    }

    async fn installation_by_callsign(
        &self,
        callsign: &str,
    ) -> Result<Option<Installation>, StoreError> {
        Ok(self.state.lock().installations.get(callsign).cloned())
    }

    async fn create_installation(
        &self,
        platform_nickname: &str,
        callsign: &str,
        position: GeoPos,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        let platform = state
            .platforms
            .get(platform_nickname)
            .cloned()
            .ok_or_else(|| ValidationError::UnknownPlatform(platform_nickname.to_string()))?;
        if state.installations.contains_key(callsign) {
            return Err(ValidationError::DuplicateCallsign(callsign.to_string()).into());
        }
        state.installations.insert(
            callsign.to_string(),
            Installation {
                callsign: callsign.to_string(),
                position,
                status: Default::default(),
                platform,
                ammo_count: 0,
            },
        );
        Ok(())
    }

    async fn arm_battery(
        &self,
        callsign: &str,
        munition_nickname: &str,
        quantity: i64,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        let munition_ok = state
            .platforms
            .get(munition_nickname)
            .map(|p| p.category == PlatformCategory::CounterDefense)
            .unwrap_or(false);
        if !munition_ok {
            return Err(ValidationError::WrongCategory {
                nickname: munition_nickname.to_string(),
                expected: PlatformCategory::CounterDefense,
            }
            .into());
        }
        let installation = state
            .installations
            .get_mut(callsign)
            .ok_or_else(|| ValidationError::UnknownInstallation(callsign.to_string()))?;
        installation.ammo_count += quantity;
        Ok(())
    }

    async fn decrement_ammo(&self, callsign: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        let installation = state
            .installations
            .get_mut(callsign)
            .ok_or_else(|| ValidationError::UnknownInstallation(callsign.to_string()))?;
        if installation.ammo_count <= 0 {
            return Err(ValidationError::InsufficientAmmo(callsign.to_string()).into());
        }
        installation.ammo_count -= 1;
        Ok(())
    }

    async fn battery_status(&self) -> Result<Vec<BatteryStatusRow>, StoreError> {
        let state = self.state.lock();
        let mut rows: Vec<BatteryStatusRow> = state
            .installations
            .values()
            .filter(|i| i.platform.category == PlatformCategory::CounterDefense)
            .map(|i| BatteryStatusRow {
                callsign: i.callsign.clone(),
                ammo_count: i.ammo_count,
                status: i.status,
            })
            .collect();
        rows.sort_by(|a, b| a.callsign.cmp(&b.callsign));
        Ok(rows)
    }

    async fn insert_active_missile(
        &self,
        record: &ActiveMissileRecord,
    ) -> Result<(), StoreError> {
        self.state.lock().active.insert(record.id, record.clone());
        Ok(())
    }

    async fn list_active_missiles(&self) -> Result<Vec<ActiveMissileRecord>, StoreError> {
        let state = self.state.lock();
        let mut rows: Vec<ActiveMissileRecord> = state.active.values().cloned().collect();
        rows.sort_by_key(|r| r.launch_ts);
        Ok(rows)
    }

    async fn update_missile_position(
        &self,
        id: MissileId,
        position: GeoPos,
        velocity: Velocity,
        fuel_remaining_kg: f64,
    ) -> Result<(), StoreError> {
        self.state.lock().positions.insert(
            id,
            PositionRow {
                position,
                velocity,
                fuel_remaining_kg,
            },
        );
        Ok(())
    }

    async fn finalize_missile(&self, outcome: &Outcome) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        if state.outcomes.contains_key(&outcome.missile_id) {
            return Err(StoreError::DuplicateOutcome(outcome.missile_id));
        }
        state.outcomes.insert(outcome.missile_id, outcome.clone());
        state.active.remove(&outcome.missile_id);
        state.positions.remove(&outcome.missile_id);
        Ok(())
    }

    async fn insert_detection(&self, record: &DetectionRecord) -> Result<(), StoreError> {
        self.state.lock().detections.push(record.clone());
        Ok(())
    }

    async fn insert_engagement_attempt(
        &self,
        record: &EngagementAttemptRecord,
    ) -> Result<(), StoreError> {
        self.state.lock().attempts.push(record.clone());
        Ok(())
    }

    async fn load_config(&self) -> Result<HashMap<String, String>, StoreError> {
        Ok(self.state.lock().config.clone())
    }
}
