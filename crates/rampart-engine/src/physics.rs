//! Flight dynamics: gravity, drag, buoyancy, and the thrust schedule.
//!
//! Acceleration is the sum of the four forces divided by mass, integrated
//! with an explicit Euler step at the engine tick. Positions stay geodetic;
//! each step converts the metric velocity into degree deltas through the
//! local equirectangular projection.

use glam::DVec3;
use thiserror::Error;

use rampart_core::constants::EARTH_RADIUS_M;
use rampart_core::enums::MissileKind;
use rampart_core::types::GeoPos;

use crate::constants::*;
use crate::munition::Munition;

/// A NaN or runaway state; the offending munition is terminated, never the
/// tick loop.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("physics anomaly: {0}")]
pub struct PhysicsAnomaly(pub String);

/// Air density at altitude via the exponential atmosphere.
pub fn air_density(altitude_m: f64) -> f64 {
    AIR_DENSITY_SEA_LEVEL * (-altitude_m / ATMOSPHERE_SCALE_HEIGHT_M).exp()
}

/// Water density at depth (meters below the surface, positive).
pub fn water_density(depth_m: f64) -> f64 {
    WATER_DENSITY_SURFACE * (1.0 + WATER_DENSITY_DEPTH_FACTOR * depth_m.max(0.0))
}

/// Density of whichever fluid surrounds altitude `z`.
pub fn fluid_density(z: f64) -> f64 {
    if z < 0.0 {
        water_density(-z)
    } else {
        air_density(z)
    }
}

/// Gravitational acceleration at altitude (inverse-square from Earth radius).
pub fn gravity(altitude_m: f64) -> f64 {
    let r = EARTH_RADIUS_M / (EARTH_RADIUS_M + altitude_m);
    GRAVITY_SEA_LEVEL * r * r
}

/// Drag force in newtons, opposite the velocity direction.
pub fn drag_force(velocity: DVec3, z: f64) -> DVec3 {
    let speed = velocity.length();
    if speed <= 0.0 {
        return DVec3::ZERO;
    }
    let cd = if z < 0.0 {
        if speed > WATER_DRAG_FAST_SPEED_MPS {
            DRAG_COEFF_WATER * WATER_DRAG_FAST_MULTIPLIER
        } else {
            DRAG_COEFF_WATER
        }
    } else {
        DRAG_COEFF_AIR
    };
    let magnitude = 0.5 * fluid_density(z) * speed * speed * cd * CROSS_SECTION_M2;
    -velocity / speed * magnitude
}

/// Buoyant force in newtons (upward, submerged hull only).
pub fn buoyancy_force(z: f64) -> DVec3 {
    if z < 0.0 {
        DVec3::new(0.0, 0.0, water_density(-z) * MISSILE_VOLUME_M3 * gravity(z))
    } else {
        DVec3::ZERO
    }
}

/// Optimal ballistic climb angle in radians for the remaining horizontal
/// distance at the current speed: `0.5 * asin(d * g / v^2)` (45 degrees
/// when the target is out of reach), clamped to the 30..60 degree
/// corridor.
pub fn ballistic_angle(horizontal_distance_m: f64, speed_mps: f64) -> f64 {
    let optimal = if speed_mps > 1.0 {
        let ratio = (horizontal_distance_m * GRAVITY_SEA_LEVEL) / (speed_mps * speed_mps);
        0.5 * ratio.clamp(0.0, 1.0).asin()
    } else {
        45f64.to_radians()
    };
    optimal.clamp(
        BALLISTIC_ANGLE_MIN_DEG.to_radians(),
        BALLISTIC_ANGLE_MAX_DEG.to_radians(),
    )
}

/// Vacuum ballistic range from altitude `h` at `speed` and climb `angle`.
/// Deliberately generous (no drag): cutting thrust against this estimate
/// biases the arc short, and the short side is what terminal homing can
/// still correct.
pub fn ballistic_reach_m(speed_mps: f64, angle_rad: f64, altitude_m: f64) -> f64 {
    let vh = speed_mps * angle_rad.cos();
    let vz = speed_mps * angle_rad.sin();
    vh * (vz + (vz * vz + 2.0 * GRAVITY_SEA_LEVEL * altitude_m.max(0.0)).sqrt())
        / GRAVITY_SEA_LEVEL
}

/// Thrust direction (unit) and throttle (0..1) for the munition's current
/// flight phase.
pub fn thrust_schedule(
    munition: &Munition,
    elapsed_secs: f64,
    defense_target: Option<&GeoPos>,
) -> (DVec3, f64) {
    let z = munition.position.alt_m;

    // Submerged: climb out of the water regardless of mission.
    if z < 0.0 {
        let throttle = if elapsed_secs < UNDERWATER_BOOST_SECS {
            UNDERWATER_THROTTLE_INITIAL
        } else {
            UNDERWATER_THROTTLE_ASCENT
        };
        return (DVec3::Z, throttle);
    }

    if munition.kind == MissileKind::Defense {
        // Chase the assigned munition; hold vertical until it is known.
        return match defense_target {
            Some(target) => {
                let [e, n, u] = munition.position.offset_m(target);
                let dir = DVec3::new(e, n, u);
                if dir.length() > 1.0 {
                    (dir.normalize(), 1.0)
                } else {
                    (DVec3::Z, 1.0)
                }
            }
            None => (DVec3::Z, 1.0),
        };
    }

    if z >= THRUST_CUTOFF_ALTITUDE_M {
        // Apogee coast: terminal ballistic descent begins up here.
        return (DVec3::ZERO, 0.0);
    }

    if munition.velocity.z < 0.0 {
        // Descending below the cutoff: correct straight onto the target.
        return match &munition.target_position {
            Some(target) => {
                let [e, n, u] = munition.position.offset_m(target);
                let dir = DVec3::new(e, n, u);
                if dir.length() > 1.0 {
                    (dir.normalize(), 1.0)
                } else {
                    (DVec3::ZERO, 0.0)
                }
            }
            None => (DVec3::ZERO, 0.0),
        };
    }

    if z < BOOST_CEILING_M {
        return (DVec3::Z, 1.0);
    }

    // Mid-course climb along the ballistic corridor; thrust cuts off once
    // the target is within ballistic reach at the current speed.
    match &munition.target_position {
        Some(target) => {
            let [e, n, _] = munition.position.offset_m(target);
            let horizontal = DVec3::new(e, n, 0.0);
            let distance = horizontal.length();
            if distance < 1.0 {
                return (DVec3::ZERO, 0.0);
            }
            let speed = munition.velocity.length();
            let angle = ballistic_angle(distance, speed);
            if ballistic_reach_m(speed, angle, z) >= distance {
                return (DVec3::ZERO, 0.0);
            }
            let dir = horizontal / distance * angle.cos() + DVec3::Z * angle.sin();
            (dir.normalize(), 1.0)
        }
        None => (DVec3::Z, 1.0),
    }
}

/// Advance one munition by `dt` seconds.
///
/// Consumes fuel proportional to throttle and returns an anomaly instead of
/// propagating NaN into the live map.
pub fn step(
    munition: &mut Munition,
    dt: f64,
    elapsed_secs: f64,
    defense_target: Option<&GeoPos>,
) -> Result<(), PhysicsAnomaly> {
    let z = munition.position.alt_m;
    let mass = munition.mass_kg();
    let speed = munition.velocity.length();

    let mut force = DVec3::new(0.0, 0.0, -gravity(z) * mass);

    // Cap the drag impulse at one that stops the munition within this step,
    // or water entry at speed flings the explicit integrator into
    // oscillation.
    let mut drag = drag_force(munition.velocity, z);
    let max_drag = mass * speed / dt;
    if drag.length() > max_drag {
        drag = drag.normalize_or_zero() * max_drag;
    }
    force += drag;
    force += buoyancy_force(z);

    if munition.fuel_remaining_kg > 0.0 {
        let (direction, throttle) = thrust_schedule(munition, elapsed_secs, defense_target);
        if throttle > 0.0 {
            force += direction * munition.thrust_n * throttle;
            let burn = munition.platform.fuel_consumption_rate_kgps * throttle * dt;
            munition.fuel_remaining_kg = (munition.fuel_remaining_kg - burn).max(0.0);
        }
    }

    let acceleration = force / mass;
    munition.velocity += acceleration * dt;
    munition.position = munition.position.translated(
        munition.velocity.x * dt,
        munition.velocity.y * dt,
        munition.velocity.z * dt,
    );

    let speed = munition.velocity.length();
    if !speed.is_finite()
        || !munition.position.alt_m.is_finite()
        || !munition.position.lat.is_finite()
        || !munition.position.lon.is_finite()
    {
        return Err(PhysicsAnomaly("non-finite state".to_string()));
    }
    if speed > RUNAWAY_SPEED_MPS {
        return Err(PhysicsAnomaly(format!("runaway speed {speed:.0} m/s")));
    }
    Ok(())
}
