//! The persistence contract.

use std::collections::HashMap;

use async_trait::async_trait;

use rampart_core::catalog::{ActiveMissileRecord, Installation, Outcome, PlatformType};
use rampart_core::enums::PlatformCategory;
use rampart_core::types::{GeoPos, MissileId, Velocity};

use crate::error::StoreError;
use crate::records::{BatteryStatusRow, DetectionRecord, EngagementAttemptRecord};

/// Access to the shared database.
///
/// The database is the only cross-service shared mutable state; everything
/// else coordinates over the bus. Ammunition updates and outcome
/// finalization are transactional on the implementation side.
#[async_trait]
pub trait Store: Send + Sync {
    // --- Catalog ---

    async fn platform_by_nickname(
        &self,
        nickname: &str,
    ) -> Result<Option<PlatformType>, StoreError>;

    async fn installations_by_category(
        &self,
        category: PlatformCategory,
    ) -> Result<Vec<Installation>, StoreError>;

    async fn installation_by_callsign(
        &self,
        callsign: &str,
    ) -> Result<Option<Installation>, StoreError>;

    /// Create an installation. Fails on duplicate callsign or unknown
    /// platform; no state is mutated on failure.
    async fn create_installation(
        &self,
        platform_nickname: &str,
        callsign: &str,
        position: GeoPos,
    ) -> Result<(), StoreError>;

    // --- Ammunition ---

    /// Add `quantity` rounds of a defensive munition to a battery
    /// (upsert into the munition join table).
    async fn arm_battery(
        &self,
        callsign: &str,
        munition_nickname: &str,
        quantity: i64,
    ) -> Result<(), StoreError>;

    /// Consume one round atomically. Fails with `InsufficientAmmo` when the
    /// battery is dry.
    async fn decrement_ammo(&self, callsign: &str) -> Result<(), StoreError>;

    /// Current ammo/status for every counter-defense installation.
    async fn battery_status(&self) -> Result<Vec<BatteryStatusRow>, StoreError>;

    // --- Munitions in flight ---

    async fn insert_active_missile(&self, record: &ActiveMissileRecord)
        -> Result<(), StoreError>;

    /// Every row still marked active. Used by the engine at startup to
    /// sweep orphans left by a crash mid-flight.
    async fn list_active_missiles(&self) -> Result<Vec<ActiveMissileRecord>, StoreError>;

    /// Overwrite the current kinematic state. Idempotent on `missile_id`.
    async fn update_missile_position(
        &self,
        id: MissileId,
        position: GeoPos,
        velocity: Velocity,
        fuel_remaining_kg: f64,
    ) -> Result<(), StoreError>;

    /// Record the outcome and remove the active row in one transaction.
    /// A second call for the same munition fails with `DuplicateOutcome`.
    async fn finalize_missile(&self, outcome: &Outcome) -> Result<(), StoreError>;

    // --- Events ---

    async fn insert_detection(&self, record: &DetectionRecord) -> Result<(), StoreError>;

    async fn insert_engagement_attempt(
        &self,
        record: &EngagementAttemptRecord,
    ) -> Result<(), StoreError>;

    // --- Configuration ---

    /// The `simulation_config` key/value table.
    async fn load_config(&self) -> Result<HashMap<String, String>, StoreError>;
}
