//! Shared constants and tuning parameters.

/// Meters per degree of latitude in the equirectangular approximation.
pub const METERS_PER_DEGREE: f64 = 111_000.0;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

// --- Detection ---

/// Base probability of detection before range/altitude/signal factors.
pub const DETECTION_BASE_PROBABILITY: f64 = 0.8;

/// Altitude (m) at which the altitude factor saturates.
pub const DETECTION_ALTITUDE_NORM_M: f64 = 10_000.0;

/// Standard deviation of the Gaussian noise added to detection probability.
pub const DETECTION_NOISE_SIGMA: f64 = 0.05;

/// Default radar signal strength when the catalog does not specify one (dB).
pub const DEFAULT_SIGNAL_STRENGTH_DB: f64 = -50.0;

/// Detection range fallback when the catalog column is NULL (m).
pub const DEFAULT_DETECTION_RANGE_M: f64 = 100_000.0;

// --- Tracking ---

/// Track confidence floor applied at the first detection.
pub const TRACK_CONFIDENCE_BASE: f64 = 0.3;

/// Track confidence gained per detection.
pub const TRACK_CONFIDENCE_PER_HIT: f64 = 0.1;

/// Track confidence ceiling.
pub const TRACK_CONFIDENCE_MAX: f64 = 0.95;

// --- Battery ---

/// Mandatory delay between accepting an order and launching (seconds).
pub const BATTERY_PREPARE_SECS: f64 = 5.0;

// --- Threat classification (time-to-impact thresholds, seconds) ---

pub const THREAT_CRITICAL_TTI_S: f64 = 60.0;
pub const THREAT_HIGH_TTI_S: f64 = 180.0;
pub const THREAT_MEDIUM_TTI_S: f64 = 600.0;
