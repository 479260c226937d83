//! Per-installation radar state and the detection probability model.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use rampart_core::catalog::Installation;
use rampart_core::constants::{
    DEFAULT_DETECTION_RANGE_M, DEFAULT_SIGNAL_STRENGTH_DB, DETECTION_ALTITUDE_NORM_M,
    DETECTION_BASE_PROBABILITY, DETECTION_NOISE_SIGMA,
};
use rampart_core::enums::InstallationStatus;
use rampart_core::types::GeoPos;

/// Scan interval bounds (ms).
const MIN_INTERVAL_MS: u64 = 100;
const MAX_INTERVAL_MS: u64 = 5_000;

/// Sweep rate that maps to exactly the baseline interval (deg/s).
const BASE_SWEEP_RATE: f64 = 60.0;

/// One radar installation as loaded at service start.
#[derive(Debug, Clone)]
pub struct RadarSite {
    pub callsign: String,
    pub position: GeoPos,
    pub detection_range_m: f64,
    pub max_altitude_m: f64,
    pub signal_strength_db: f64,
    pub update_interval_ms: u64,
    pub status: InstallationStatus,
    /// Seconds timestamp of the last successful detection scan.
    pub last_scan: f64,
}

impl RadarSite {
    pub fn from_installation(installation: &Installation, base_interval_ms: u64) -> Self {
        let platform = &installation.platform;
        // The catalog value wins; the in-memory default only covers NULLs.
        let detection_range_m = platform
            .detection_range_m
            .unwrap_or(DEFAULT_DETECTION_RANGE_M);
        let sweep_rate = platform.sweep_rate_deg_per_sec.unwrap_or(BASE_SWEEP_RATE);
        Self {
            callsign: installation.callsign.clone(),
            position: installation.position,
            detection_range_m,
            max_altitude_m: platform.max_altitude_m,
            signal_strength_db: DEFAULT_SIGNAL_STRENGTH_DB,
            update_interval_ms: update_interval_ms(sweep_rate, base_interval_ms),
            status: installation.status,
            last_scan: 0.0,
        }
    }

    /// Is this radar due for a scan?
    pub fn due(&self, now: f64) -> bool {
        self.status == InstallationStatus::Active
            && now - self.last_scan >= self.update_interval_ms as f64 / 1000.0
    }

    /// Range to the contact if it is inside the detection envelope.
    pub fn eligible(&self, contact: &GeoPos) -> Option<f64> {
        let distance = self.position.distance_m(contact);
        if distance > self.detection_range_m {
            return None;
        }
        if contact.alt_m > self.max_altitude_m {
            return None;
        }
        Some(distance)
    }

    /// Probability of detection before noise:
    /// `base * range_factor * altitude_factor * signal_factor`.
    pub fn detection_probability(&self, distance_m: f64, altitude_m: f64) -> f64 {
        let range_factor = 1.0 - distance_m / self.detection_range_m;
        let altitude_factor = (altitude_m / DETECTION_ALTITUDE_NORM_M).clamp(0.0, 1.0);
        let signal_factor = 1.0 + self.signal_strength_db / 100.0;
        DETECTION_BASE_PROBABILITY * range_factor * altitude_factor * signal_factor
    }
}

/// Faster sweeps scan more often: `base * 60 / sweep_rate`, clamped to
/// [100 ms, 5 s].
pub fn update_interval_ms(sweep_rate_deg_per_sec: f64, base_interval_ms: u64) -> u64 {
    if sweep_rate_deg_per_sec <= 0.0 {
        return base_interval_ms.clamp(MIN_INTERVAL_MS, MAX_INTERVAL_MS);
    }
    let interval = base_interval_ms as f64 * (BASE_SWEEP_RATE / sweep_rate_deg_per_sec);
    (interval as u64).clamp(MIN_INTERVAL_MS, MAX_INTERVAL_MS)
}

/// One sample of Gaussian noise (Box-Muller).
pub fn gaussian_noise(rng: &mut ChaCha8Rng, sigma: f64) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    sigma * (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

/// Decide one scan from pre-drawn randomness: perturbed probability
/// against a uniform sample. Returns the clamped probability on success.
/// Randomness is drawn by the caller so the worker pool stays
/// deterministic under a seeded generator.
pub fn decide_detection(
    site: &RadarSite,
    distance_m: f64,
    altitude_m: f64,
    noise: f64,
    sample: f64,
) -> Option<f64> {
    let probability =
        (site.detection_probability(distance_m, altitude_m) + noise).clamp(0.0, 1.0);
    (sample < probability).then_some(probability)
}

/// Roll the dice for one scan with a live generator.
pub fn roll_detection(
    site: &RadarSite,
    distance_m: f64,
    altitude_m: f64,
    rng: &mut ChaCha8Rng,
) -> Option<f64> {
    let noise = gaussian_noise(rng, DETECTION_NOISE_SIGMA);
    let sample: f64 = rng.gen_range(0.0..1.0);
    decide_detection(site, distance_m, altitude_m, noise, sample)
}
