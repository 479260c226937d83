//! Bus subject names and pattern matching.
//!
//! Patterns support exact match and a trailing `>` wildcard covering one or
//! more remaining tokens (`battery.>` matches `battery.B1.engage`).

/// Launch requests into the simulation engine. Reliable.
pub const SIMULATION_LAUNCH: &str = "simulation.launch";

/// Per-tick position stream. Lossy-tolerant; republished each tick.
pub const MISSILE_POSITION: &str = "missile.position";

/// Terminal impact events. Reliable.
pub const MISSILE_IMPACT: &str = "missile.impact";

/// Terminal intercept events. Reliable.
pub const MISSILE_INTERCEPTED: &str = "missile.intercepted";

/// Radar detections. Reliable.
pub const RADAR_DETECTION: &str = "radar.detection";

/// Engagement results back to the command center. Reliable.
pub const ENGAGEMENT_RESULT: &str = "engagement.result";

/// Wildcard over every battery's engage subject.
pub const BATTERY_ENGAGE_WILDCARD: &str = "battery.>";

/// Engage subject for one battery.
pub fn battery_engage(callsign: &str) -> String {
    format!("battery.{callsign}.engage")
}

/// Subjects that tolerate drops under backpressure.
pub fn is_lossy(subject: &str) -> bool {
    subject == MISSILE_POSITION
}

/// Does `pattern` match `subject`?
pub fn subject_matches(pattern: &str, subject: &str) -> bool {
    match pattern.strip_suffix('>') {
        // `>` alone matches everything; `prefix.>` requires at least one
        // token after the prefix.
        Some("") => !subject.is_empty(),
        Some(prefix) => {
            prefix.ends_with('.')
                && subject.len() > prefix.len()
                && subject.starts_with(prefix)
        }
        None => pattern == subject,
    }
}
