//! Postgres/PostGIS implementation of the [`Store`] contract.
//!
//! Geography columns round-trip through `ST_X`/`ST_Y`/`ST_MakePoint`; the
//! equirectangular math elsewhere expects plain lon/lat degrees. Ammunition
//! decrements and outcome finalization run inside transactions.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{info, warn};

use rampart_core::catalog::{ActiveMissileRecord, Installation, Outcome, PlatformType};
use rampart_core::enums::{InstallationStatus, MissileKind, PlatformCategory};
use rampart_core::error::ValidationError;
use rampart_core::types::{GeoPos, MissileId, Velocity};

use crate::error::StoreError;
use crate::records::{BatteryStatusRow, DetectionRecord, EngagementAttemptRecord};
use crate::traits::Store;

/// Connection retry policy: services wait for the database at startup and
/// exit only after the budget is exhausted.
pub const CONNECT_MAX_ATTEMPTS: u32 = 30;
pub const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Establish a pool, retrying while the database comes up.
pub async fn connect_with_retry(url: &str) -> Result<PgPool, StoreError> {
    let mut last_error = String::new();
    for attempt in 1..=CONNECT_MAX_ATTEMPTS {
        match PgPoolOptions::new().max_connections(8).connect(url).await {
            Ok(pool) => {
                info!(attempt, "database connection established");
                return Ok(pool);
            }
            Err(e) => {
                warn!(attempt, error = %e, "database connection failed");
                last_error = e.to_string();
                if attempt < CONNECT_MAX_ATTEMPTS {
                    tokio::time::sleep(CONNECT_RETRY_DELAY).await;
                }
            }
        }
    }
    Err(StoreError::Unavailable {
        attempts: CONNECT_MAX_ATTEMPTS,
        last_error,
    })
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with the standard retry policy.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        Ok(Self::new(connect_with_retry(url).await?))
    }
}

fn parse_category(s: &str) -> Result<PlatformCategory, sqlx::Error> {
    match s {
        "attack" => Ok(PlatformCategory::Attack),
        "counter_defense" => Ok(PlatformCategory::CounterDefense),
        "detection_system" => Ok(PlatformCategory::DetectionSystem),
        other => Err(sqlx::Error::Decode(
            format!("unknown platform category `{other}`").into(),
        )),
    }
}

fn parse_status(s: &str) -> InstallationStatus {
    if s == "disabled" {
        InstallationStatus::Disabled
    } else {
        InstallationStatus::Active
    }
}

fn platform_from_row(row: &PgRow) -> Result<PlatformType, sqlx::Error> {
    Ok(PlatformType {
        nickname: row.try_get("nickname")?,
        category: parse_category(&row.try_get::<String, _>("category")?)?,
        max_speed_mps: row.try_get("max_speed_mps")?,
        max_range_m: row.try_get("max_range_m")?,
        max_altitude_m: row.try_get("max_altitude_m")?,
        detection_range_m: row.try_get("detection_range_m")?,
        sweep_rate_deg_per_sec: row.try_get("sweep_rate_deg_per_sec")?,
        reload_time_sec: row.try_get("reload_time_sec")?,
        accuracy_percent: row.try_get("accuracy_percent")?,
        blast_radius_m: row.try_get("blast_radius_m")?,
        fuel_capacity_kg: row.try_get("fuel_capacity_kg")?,
        fuel_consumption_rate_kgps: row.try_get("fuel_consumption_rate_kgps")?,
        thrust_n: row.try_get("thrust_n")?,
    })
}

fn installation_from_row(row: &PgRow) -> Result<Installation, sqlx::Error> {
    Ok(Installation {
        callsign: row.try_get("callsign")?,
        position: GeoPos::new(
            row.try_get("lon")?,
            row.try_get("lat")?,
            row.try_get("altitude_m")?,
        ),
        status: parse_status(&row.try_get::<String, _>("status")?),
        platform: platform_from_row(row)?,
        ammo_count: row.try_get("ammo_count")?,
    })
}

const PLATFORM_COLUMNS: &str = "pt.nickname, pt.category, pt.max_speed_mps, pt.max_range_m, \
     pt.max_altitude_m, pt.detection_range_m, pt.sweep_rate_deg_per_sec, pt.reload_time_sec, \
     pt.accuracy_percent, pt.blast_radius_m, pt.fuel_capacity_kg, \
     pt.fuel_consumption_rate_kgps, pt.thrust_n";

fn installation_select(where_clause: &str) -> String {
    format!(
        "SELECT i.callsign, ST_X(i.geom::geometry) AS lon, ST_Y(i.geom::geometry) AS lat, \
                i.altitude_m, i.status, {PLATFORM_COLUMNS}, \
                COALESCE(am.total, 0)::bigint AS ammo_count \
         FROM installation i \
         JOIN platform_type pt ON pt.id = i.platform_type_id \
         LEFT JOIN (SELECT installation_id, SUM(quantity) AS total \
                    FROM installation_munition GROUP BY installation_id) am \
           ON am.installation_id = i.id \
         {where_clause} \
         ORDER BY i.callsign"
    )
}

#[async_trait]
impl Store for PgStore {
    async fn platform_by_nickname(
        &self,
        nickname: &str,
    ) -> Result<Option<PlatformType>, StoreError> {
        let query = format!("SELECT {PLATFORM_COLUMNS} FROM platform_type pt WHERE pt.nickname = $1");
        let row = sqlx::query(&query)
            .bind(nickname)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| platform_from_row(&r)).transpose().map_err(Into::into)
    }

    async fn installations_by_category(
        &self,
        category: PlatformCategory,
    ) -> Result<Vec<Installation>, StoreError> {
        let query = installation_select("WHERE pt.category = $1");
        let rows = sqlx::query(&query)
            .bind(category.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|r| installation_from_row(r).map_err(Into::into))
            .collect()
    }

    async fn installation_by_callsign(
        &self,
        callsign: &str,
    ) -> Result<Option<Installation>, StoreError> {
        let query = installation_select("WHERE i.callsign = $1");
        let row = sqlx::query(&query)
            .bind(callsign)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| installation_from_row(&r)).transpose().map_err(Into::into)
    }

    async fn create_installation(
        &self,
        platform_nickname: &str,
        callsign: &str,
        position: GeoPos,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let platform_id: Option<i32> =
            sqlx::query_scalar("SELECT id FROM platform_type WHERE nickname = $1")
                .bind(platform_nickname)
                .fetch_optional(&mut *tx)
                .await?;
        let platform_id = platform_id.ok_or_else(|| {
            ValidationError::UnknownPlatform(platform_nickname.to_string())
        })?;

        let existing: Option<i32> =
            sqlx::query_scalar("SELECT id FROM installation WHERE callsign = $1")
                .bind(callsign)
                .fetch_optional(&mut *tx)
                .await?;
        if existing.is_some() {
            return Err(ValidationError::DuplicateCallsign(callsign.to_string()).into());
        }

        sqlx::query(
            "INSERT INTO installation (platform_type_id, callsign, geom, altitude_m, status) \
             VALUES ($1, $2, ST_SetSRID(ST_MakePoint($3, $4), 4326)::geography, $5, 'active')",
        )
        .bind(platform_id)
        .bind(callsign)
        .bind(position.lon)
        .bind(position.lat)
        .bind(position.alt_m)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn arm_battery(
        &self,
        callsign: &str,
        munition_nickname: &str,
        quantity: i64,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let battery_id: Option<i32> =
            sqlx::query_scalar("SELECT id FROM installation WHERE callsign = $1")
                .bind(callsign)
                .fetch_optional(&mut *tx)
                .await?;
        let battery_id = battery_id
            .ok_or_else(|| ValidationError::UnknownInstallation(callsign.to_string()))?;

        let munition_id: Option<i32> = sqlx::query_scalar(
            "SELECT id FROM platform_type WHERE nickname = $1 AND category = 'counter_defense'",
        )
        .bind(munition_nickname)
        .fetch_optional(&mut *tx)
        .await?;
        let munition_id = munition_id.ok_or_else(|| ValidationError::WrongCategory {
            nickname: munition_nickname.to_string(),
            expected: PlatformCategory::CounterDefense,
        })?;

        sqlx::query(
            "INSERT INTO installation_munition (installation_id, platform_type_id, quantity) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (installation_id, platform_type_id) \
             DO UPDATE SET quantity = installation_munition.quantity + EXCLUDED.quantity",
        )
        .bind(battery_id)
        .bind(munition_id)
        .bind(quantity)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn decrement_ammo(&self, callsign: &str) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let updated: Option<i64> = sqlx::query_scalar(
            "UPDATE installation_munition SET quantity = quantity - 1 \
             WHERE id = (SELECT im.id FROM installation_munition im \
                         JOIN installation i ON i.id = im.installation_id \
                         WHERE i.callsign = $1 AND im.quantity > 0 \
                         ORDER BY im.id LIMIT 1 FOR UPDATE) \
             RETURNING quantity",
        )
        .bind(callsign)
        .fetch_optional(&mut *tx)
        .await?;

        if updated.is_none() {
            return Err(ValidationError::InsufficientAmmo(callsign.to_string()).into());
        }

        tx.commit().await?;
        Ok(())
    }

    async fn battery_status(&self) -> Result<Vec<BatteryStatusRow>, StoreError> {
        let rows = sqlx::query(
            "SELECT i.callsign, i.status, COALESCE(SUM(im.quantity), 0)::bigint AS ammo_count \
             FROM installation i \
             JOIN platform_type pt ON pt.id = i.platform_type_id \
             LEFT JOIN installation_munition im ON im.installation_id = i.id \
             WHERE pt.category = 'counter_defense' \
             GROUP BY i.callsign, i.status \
             ORDER BY i.callsign",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(BatteryStatusRow {
                    callsign: row.try_get("callsign")?,
                    ammo_count: row.try_get("ammo_count")?,
                    status: parse_status(&row.try_get::<String, _>("status")?),
                })
            })
            .collect::<Result<_, sqlx::Error>>()
            .map_err(Into::into)
    }

    async fn insert_active_missile(
        &self,
        record: &ActiveMissileRecord,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO active_missile \
                 (id, callsign, platform_type_id, launch_installation_id, missile_type, \
                  target_geom, target_altitude_m, launch_ts, status) \
             VALUES ($1, $2, \
                 (SELECT id FROM platform_type WHERE nickname = $3), \
                 (SELECT id FROM installation WHERE callsign = $4), $5, \
                 ST_SetSRID(ST_MakePoint($6, $7), 4326)::geography, $8, $9, 'active')",
        )
        .bind(record.id.0)
        .bind(&record.callsign)
        .bind(&record.platform_nickname)
        .bind(&record.launch_callsign)
        .bind(record.kind.as_str())
        .bind(record.target.lon)
        .bind(record.target.lat)
        .bind(record.target.alt_m)
        .bind(record.launch_ts)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_active_missiles(&self) -> Result<Vec<ActiveMissileRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT am.id, am.callsign, am.missile_type, \
                    pt.nickname AS platform_nickname, \
                    i.callsign AS launch_callsign, \
                    ST_X(am.target_geom::geometry) AS target_lon, \
                    ST_Y(am.target_geom::geometry) AS target_lat, \
                    am.target_altitude_m, am.launch_ts \
             FROM active_missile am \
             JOIN platform_type pt ON pt.id = am.platform_type_id \
             JOIN installation i ON i.id = am.launch_installation_id \
             WHERE am.status = 'active' \
             ORDER BY am.launch_ts",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let kind = match row.try_get::<String, _>("missile_type")?.as_str() {
                    "defense" => MissileKind::Defense,
                    _ => MissileKind::Attack,
                };
                Ok(ActiveMissileRecord {
                    id: MissileId(row.try_get("id")?),
                    callsign: row.try_get("callsign")?,
                    platform_nickname: row.try_get("platform_nickname")?,
                    launch_callsign: row.try_get("launch_callsign")?,
                    kind,
                    target: GeoPos::new(
                        row.try_get("target_lon")?,
                        row.try_get("target_lat")?,
                        row.try_get("target_altitude_m")?,
                    ),
                    launch_ts: row.try_get("launch_ts")?,
                })
            })
            .collect::<Result<_, sqlx::Error>>()
            .map_err(Into::into)
    }

    async fn update_missile_position(
        &self,
        id: MissileId,
        position: GeoPos,
        velocity: Velocity,
        fuel_remaining_kg: f64,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE active_missile SET \
                 current_geom = ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography, \
                 current_altitude_m = $3, \
                 velocity_x_mps = $4, velocity_y_mps = $5, velocity_z_mps = $6, \
                 fuel_remaining_kg = $7, updated_at = NOW() \
             WHERE id = $8",
        )
        .bind(position.lon)
        .bind(position.lat)
        .bind(position.alt_m)
        .bind(velocity.x)
        .bind(velocity.y)
        .bind(velocity.z)
        .bind(fuel_remaining_kg)
        .bind(id.0)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn finalize_missile(&self, outcome: &Outcome) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO missile_outcome \
                 (missile_id, outcome_type, outcome_geom, outcome_altitude_m, \
                  target_achieved, intercepting_missile_id, notes, recorded_at) \
             VALUES ($1, $2, ST_SetSRID(ST_MakePoint($3, $4), 4326)::geography, \
                     $5, $6, $7, $8, $9)",
        )
        .bind(outcome.missile_id.0)
        .bind(outcome.kind.as_str())
        .bind(outcome.position.lon)
        .bind(outcome.position.lat)
        .bind(outcome.position.alt_m)
        .bind(outcome.target_achieved)
        .bind(outcome.intercepting_missile_id.map(|id| id.0))
        .bind(&outcome.notes)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await;

        if let Err(sqlx::Error::Database(db)) = &inserted {
            if db.is_unique_violation() {
                return Err(StoreError::DuplicateOutcome(outcome.missile_id));
            }
        }
        inserted?;

        sqlx::query("DELETE FROM active_missile WHERE id = $1")
            .bind(outcome.missile_id.0)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn insert_detection(&self, record: &DetectionRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO detection_event \
                 (detection_installation_id, detected_missile_id, detection_geom, \
                  detection_altitude_m, detection_ts, signal_strength_db, confidence_percent) \
             VALUES ((SELECT id FROM installation WHERE callsign = $1), $2, \
                     ST_SetSRID(ST_MakePoint($3, $4), 4326)::geography, $5, $6, $7, $8)",
        )
        .bind(&record.radar_callsign)
        .bind(record.missile_id.0)
        .bind(record.position.lon)
        .bind(record.position.lat)
        .bind(record.position.alt_m)
        .bind(record.detected_at)
        .bind(record.signal_strength_db)
        .bind(record.confidence_percent)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_engagement_attempt(
        &self,
        record: &EngagementAttemptRecord,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO engagement_attempt \
                 (target_missile_id, battery_installation_id, probability_of_success, attempted_at) \
             VALUES ($1, (SELECT id FROM installation WHERE callsign = $2), $3, $4)",
        )
        .bind(record.target_missile_id.0)
        .bind(&record.battery_callsign)
        .bind(record.probability_of_success)
        .bind(record.attempted_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_config(&self) -> Result<HashMap<String, String>, StoreError> {
        let rows = sqlx::query("SELECT config_key, config_value FROM simulation_config")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| {
                Ok((
                    row.try_get::<String, _>("config_key")?,
                    row.try_get::<String, _>("config_value")?,
                ))
            })
            .collect::<Result<_, sqlx::Error>>()
            .map_err(Into::into)
    }
}
