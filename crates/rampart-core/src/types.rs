//! Fundamental geometric and timing types.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::METERS_PER_DEGREE;

/// Geodetic position: longitude/latitude in degrees, altitude in meters.
///
/// All distance math uses the local equirectangular approximation
/// (1 degree of latitude ~ 111 km, longitude scaled by cos(lat)), which is
/// what the rest of the system's geometry is calibrated against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPos {
    pub lon: f64,
    pub lat: f64,
    pub alt_m: f64,
}

impl GeoPos {
    pub fn new(lon: f64, lat: f64, alt_m: f64) -> Self {
        Self { lon, lat, alt_m }
    }

    /// East/north/up offset in meters from `self` to `other`.
    pub fn offset_m(&self, other: &GeoPos) -> [f64; 3] {
        let east = (other.lon - self.lon) * METERS_PER_DEGREE * self.lat.to_radians().cos();
        let north = (other.lat - self.lat) * METERS_PER_DEGREE;
        let up = other.alt_m - self.alt_m;
        [east, north, up]
    }

    /// 3D distance to another position in meters.
    pub fn distance_m(&self, other: &GeoPos) -> f64 {
        let [e, n, u] = self.offset_m(other);
        (e * e + n * n + u * u).sqrt()
    }

    /// Horizontal distance (ignoring altitude) in meters.
    pub fn horizontal_distance_m(&self, other: &GeoPos) -> f64 {
        let [e, n, _] = self.offset_m(other);
        (e * e + n * n).sqrt()
    }

    /// Position displaced by east/north/up meters.
    pub fn translated(&self, east_m: f64, north_m: f64, up_m: f64) -> GeoPos {
        GeoPos {
            lon: self.lon + east_m / (METERS_PER_DEGREE * self.lat.to_radians().cos()),
            lat: self.lat + north_m / METERS_PER_DEGREE,
            alt_m: self.alt_m + up_m,
        }
    }

    /// Midpoint between two positions.
    pub fn midpoint(&self, other: &GeoPos) -> GeoPos {
        GeoPos {
            lon: (self.lon + other.lon) / 2.0,
            lat: (self.lat + other.lat) / 2.0,
            alt_m: (self.alt_m + other.alt_m) / 2.0,
        }
    }
}

/// Wire-format point as carried on the bus: x = longitude, y = latitude,
/// z = altitude in meters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl From<GeoPos> for Point3 {
    fn from(p: GeoPos) -> Self {
        Point3 {
            x: p.lon,
            y: p.lat,
            z: p.alt_m,
        }
    }
}

impl From<Point3> for GeoPos {
    fn from(p: Point3) -> Self {
        GeoPos {
            lon: p.x,
            lat: p.y,
            alt_m: p.z,
        }
    }
}

/// Velocity in m/s: x = east, y = north, z = up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Velocity {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Speed magnitude (m/s).
    pub fn speed(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Opaque munition identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MissileId(pub Uuid);

impl MissileId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Last four hex characters, used in derived callsigns.
    pub fn suffix(&self) -> String {
        let s = self.0.simple().to_string();
        s[s.len() - 4..].to_uppercase()
    }
}

impl Default for MissileId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MissileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic simulation clock in seconds.
///
/// Every service reads time through one of these so tests can substitute a
/// manually advanced clock. Cloning shares the underlying source.
#[derive(Clone)]
pub struct SimClock(ClockSource);

#[derive(Clone)]
enum ClockSource {
    Wall(Instant),
    Manual(Arc<AtomicU64>),
}

impl SimClock {
    /// Clock backed by the OS monotonic clock, starting at zero.
    pub fn wall() -> Self {
        Self(ClockSource::Wall(Instant::now()))
    }

    /// Manually advanced clock for tests, starting at zero.
    pub fn manual() -> Self {
        Self(ClockSource::Manual(Arc::new(AtomicU64::new(0))))
    }

    /// Current time in seconds since clock creation.
    pub fn now(&self) -> f64 {
        match &self.0 {
            ClockSource::Wall(origin) => origin.elapsed().as_secs_f64(),
            ClockSource::Manual(micros) => micros.load(Ordering::Relaxed) as f64 / 1e6,
        }
    }

    /// Advance a manual clock. No effect on a wall clock.
    pub fn advance(&self, secs: f64) {
        if let ClockSource::Manual(micros) = &self.0 {
            micros.fetch_add((secs * 1e6) as u64, Ordering::Relaxed);
        }
    }
}

impl fmt::Debug for SimClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SimClock({:.3}s)", self.now())
    }
}
