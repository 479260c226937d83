//! Live munition state owned by the engine.

use glam::DVec3;

use rampart_core::catalog::PlatformType;
use rampart_core::enums::{MissileKind, MissileStatus};
use rampart_core::messages::LaunchRequest;
use rampart_core::types::{GeoPos, MissileId};

use crate::constants::{MAX_INITIAL_SPEED_MPS, UNDERWATER_LAUNCH_SPEED_MPS};

/// A munition under physics integration. Velocity is east/north/up m/s.
#[derive(Debug, Clone)]
pub struct Munition {
    pub id: MissileId,
    pub callsign: String,
    pub platform: PlatformType,
    pub launch_callsign: String,
    pub kind: MissileKind,
    pub position: GeoPos,
    pub velocity: DVec3,
    pub fuel_remaining_kg: f64,
    pub thrust_n: f64,
    pub blast_radius_m: f64,
    /// Attack missiles fly at a fixed surface target.
    pub target_position: Option<GeoPos>,
    /// Defense missiles chase another munition.
    pub target_missile_id: Option<MissileId>,
    pub status: MissileStatus,
    pub launch_time: f64,
    /// Launched from below the surface (affects the thrust schedule).
    pub underwater_launch: bool,
}

impl Munition {
    /// Build a munition from a validated launch request.
    ///
    /// Initial velocity points at the target with magnitude
    /// `min(platform.max_speed_mps, 1000)`; underwater launches instead get
    /// a fixed 50 m/s vertical. Defense launches aim at their quarry's last
    /// known position when the engine has one.
    pub fn from_launch(
        req: &LaunchRequest,
        platform: PlatformType,
        now: f64,
        defense_target: Option<GeoPos>,
    ) -> Self {
        let id = MissileId::new();
        let position = req.launch_position();
        let underwater = position.alt_m < 0.0;

        let aim_point = match req.missile_type {
            MissileKind::Attack => Some(req.target_position()),
            MissileKind::Defense => defense_target,
        };

        let velocity = if underwater {
            DVec3::new(0.0, 0.0, UNDERWATER_LAUNCH_SPEED_MPS)
        } else {
            let speed = platform.max_speed_mps.min(MAX_INITIAL_SPEED_MPS);
            match aim_point {
                Some(target) => {
                    let [e, n, u] = position.offset_m(&target);
                    let dir = DVec3::new(e, n, u);
                    if dir.length() > 1.0 {
                        dir.normalize() * speed
                    } else {
                        DVec3::new(0.0, 0.0, speed)
                    }
                }
                None => DVec3::new(0.0, 0.0, speed),
            }
        };

        let callsign = derive_callsign(req.missile_type, &req.launch_callsign, &platform, id);

        Self {
            id,
            callsign,
            blast_radius_m: req.blast_radius.unwrap_or(platform.blast_radius_m),
            fuel_remaining_kg: platform.fuel_capacity_kg,
            thrust_n: platform.thrust_n,
            launch_callsign: req.launch_callsign.clone(),
            kind: req.missile_type,
            position,
            velocity,
            target_position: (req.missile_type == MissileKind::Attack)
                .then(|| req.target_position()),
            target_missile_id: req.target_missile_id,
            status: MissileStatus::Active,
            launch_time: now,
            underwater_launch: underwater,
            platform,
        }
    }

    /// Total mass: dry airframe plus remaining fuel.
    pub fn mass_kg(&self) -> f64 {
        crate::constants::DRY_MASS_KG + self.fuel_remaining_kg
    }

    /// Seconds since launch.
    pub fn elapsed(&self, now: f64) -> f64 {
        (now - self.launch_time).max(0.0)
    }

    pub fn is_active(&self) -> bool {
        self.status == MissileStatus::Active
    }

    /// Descending through the air.
    pub fn is_descending(&self) -> bool {
        self.velocity.z < 0.0
    }
}

/// `ATK_JL2_0A1B` for attack launches, `B1-SM3-0A1B` for battery launches.
fn derive_callsign(
    kind: MissileKind,
    launch_callsign: &str,
    platform: &PlatformType,
    id: MissileId,
) -> String {
    match kind {
        MissileKind::Attack => {
            let prefix: String = platform
                .nickname
                .chars()
                .filter(char::is_ascii_alphanumeric)
                .take(3)
                .collect::<String>()
                .to_uppercase();
            format!("ATK_{}_{}", prefix, id.suffix())
        }
        MissileKind::Defense => {
            format!("{}-{}-{}", launch_callsign, platform.abbreviation(), id.suffix())
        }
    }
}
