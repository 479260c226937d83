//! Physics constants and tuning parameters.

/// Gravitational acceleration at sea level (m/s²).
pub const GRAVITY_SEA_LEVEL: f64 = 9.81;

/// Air density at sea level (kg/m³).
pub const AIR_DENSITY_SEA_LEVEL: f64 = 1.225;

/// Exponential atmosphere scale height (m).
pub const ATMOSPHERE_SCALE_HEIGHT_M: f64 = 8_500.0;

/// Sea water density at the surface (kg/m³).
pub const WATER_DENSITY_SURFACE: f64 = 1_025.0;

/// Fractional water density increase per meter of depth (compressibility).
pub const WATER_DENSITY_DEPTH_FACTOR: f64 = 4.6e-6;

/// Drag coefficient in air.
pub const DRAG_COEFF_AIR: f64 = 0.3;

/// Drag coefficient in water.
pub const DRAG_COEFF_WATER: f64 = 0.35;

/// Above this speed the water drag coefficient gains 20%.
pub const WATER_DRAG_FAST_SPEED_MPS: f64 = 50.0;
pub const WATER_DRAG_FAST_MULTIPLIER: f64 = 1.2;

/// Cross-sectional reference area (m²).
pub const CROSS_SECTION_M2: f64 = 0.5;

/// Displaced volume used for buoyancy (m³).
pub const MISSILE_VOLUME_M3: f64 = 1.5;

/// Airframe mass without fuel (kg).
pub const DRY_MASS_KG: f64 = 1_000.0;

/// Sea floor: munitions terminate at or below this altitude (m).
pub const SEAFLOOR_M: f64 = -300.0;

// --- Thrust phase schedule ---

/// Underwater launches thrust at reduced throttle for this long (s).
pub const UNDERWATER_BOOST_SECS: f64 = 3.0;
pub const UNDERWATER_THROTTLE_INITIAL: f64 = 0.5;
pub const UNDERWATER_THROTTLE_ASCENT: f64 = 0.9;

/// Below this altitude airborne attack missiles boost straight up (m).
pub const BOOST_CEILING_M: f64 = 1_000.0;

/// Above this altitude thrust cuts off (terminal ballistic descent) (m).
pub const THRUST_CUTOFF_ALTITUDE_M: f64 = 50_000.0;

/// Ballistic climb angle clamp for mid-course attack guidance (degrees).
pub const BALLISTIC_ANGLE_MIN_DEG: f64 = 30.0;
pub const BALLISTIC_ANGLE_MAX_DEG: f64 = 60.0;

// --- Launch ---

/// Initial speed cap regardless of platform rating (m/s).
pub const MAX_INITIAL_SPEED_MPS: f64 = 1_000.0;

/// Fixed vertical launch speed for underwater launches (m/s).
pub const UNDERWATER_LAUNCH_SPEED_MPS: f64 = 50.0;

/// Speed beyond which the integrator declares a runaway state (m/s).
pub const RUNAWAY_SPEED_MPS: f64 = 20_000.0;
