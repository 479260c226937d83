//! Tests for geometry, the simulation clock, configuration, and the wire
//! contract of the bus messages.

use std::collections::HashMap;

use crate::config::SimulationConfig;
use crate::enums::*;
use crate::messages::*;
use crate::types::{GeoPos, MissileId, Point3, SimClock, Velocity};

// ---- Geometry ----

#[test]
fn test_one_degree_latitude_is_111km() {
    let a = GeoPos::new(-157.0, 21.0, 0.0);
    let b = GeoPos::new(-157.0, 22.0, 0.0);
    let d = a.distance_m(&b);
    assert!(
        (d - 111_000.0).abs() < 1.0,
        "1 degree of latitude should be ~111km, got {d}"
    );
}

#[test]
fn test_longitude_cosine_correction() {
    // At 60N one degree of longitude is half of one at the equator.
    let eq_a = GeoPos::new(0.0, 0.0, 0.0);
    let eq_b = GeoPos::new(1.0, 0.0, 0.0);
    let hi_a = GeoPos::new(0.0, 60.0, 0.0);
    let hi_b = GeoPos::new(1.0, 60.0, 0.0);
    let ratio = hi_a.distance_m(&hi_b) / eq_a.distance_m(&eq_b);
    assert!(
        (ratio - 0.5).abs() < 0.01,
        "longitude distance at 60N should halve, ratio {ratio}"
    );
}

#[test]
fn test_translated_round_trip() {
    let origin = GeoPos::new(-157.86, 21.31, 0.0);
    let moved = origin.translated(5_000.0, -3_000.0, 1_200.0);
    let [e, n, u] = origin.offset_m(&moved);
    assert!((e - 5_000.0).abs() < 1.0);
    assert!((n + 3_000.0).abs() < 1.0);
    assert!((u - 1_200.0).abs() < 1e-9);
}

#[test]
fn test_altitude_contributes_to_distance() {
    let a = GeoPos::new(-157.0, 21.0, 0.0);
    let b = GeoPos::new(-157.0, 21.0, 30_000.0);
    assert!((a.distance_m(&b) - 30_000.0).abs() < 1e-9);
    assert!(a.horizontal_distance_m(&b) < 1e-9);
}

#[test]
fn test_point3_geo_round_trip() {
    let p = GeoPos::new(-155.5, 24.25, 1_234.5);
    let wire: Point3 = p.into();
    assert_eq!(wire.x, -155.5);
    assert_eq!(wire.y, 24.25);
    assert_eq!(wire.z, 1_234.5);
    let back: GeoPos = wire.into();
    assert_eq!(back, p);
}

// ---- Clock ----

#[test]
fn test_manual_clock_advances() {
    let clock = SimClock::manual();
    assert_eq!(clock.now(), 0.0);
    clock.advance(1.5);
    assert!((clock.now() - 1.5).abs() < 1e-6);

    // Clones share the source.
    let other = clock.clone();
    other.advance(0.5);
    assert!((clock.now() - 2.0).abs() < 1e-6);
}

#[test]
fn test_wall_clock_monotonic() {
    let clock = SimClock::wall();
    let a = clock.now();
    let b = clock.now();
    assert!(b >= a);
}

// ---- Configuration ----

#[test]
fn test_config_defaults() {
    let config = SimulationConfig::default();
    assert_eq!(config.tick_ms, 100);
    assert_eq!(config.radar_update_interval_ms, 1000);
    assert_eq!(config.max_retries, 3);
    assert_eq!(config.engagement_probability_floor, 0.3);
    assert_eq!(config.track_idle_ttl_s, 30.0);
    assert_eq!(config.threat_expiry_s, 300.0);
}

#[test]
fn test_config_from_kv_with_malformed_values() {
    let mut kv = HashMap::new();
    kv.insert("tick_ms".to_string(), "50".to_string());
    kv.insert("max_retries".to_string(), "not-a-number".to_string());
    kv.insert("unknown_key".to_string(), "whatever".to_string());

    let config = SimulationConfig::from_kv(&kv);
    assert_eq!(config.tick_ms, 50);
    assert_eq!(config.max_retries, 3, "malformed value keeps the default");
}

#[test]
fn test_config_accepts_legacy_tick_key() {
    let mut config = SimulationConfig::default();
    config.apply("simulation_tick_ms", "250");
    assert_eq!(config.tick_ms, 250);
}

// ---- Wire contract ----

#[test]
fn test_launch_request_wire_fields() {
    let req = LaunchRequest::attack(
        "JL-2",
        "SUB_ALPHA",
        GeoPos::new(-155.0, 25.0, -200.0),
        GeoPos::new(-157.86, 21.31, 0.0),
        12.5,
    );
    let json: serde_json::Value = serde_json::to_value(&req).unwrap();
    assert_eq!(json["type"], "missile_launch");
    assert_eq!(json["platform_nickname"], "JL-2");
    assert_eq!(json["launch_lat"], 25.0);
    assert_eq!(json["target_lon"], -157.86);
    assert_eq!(json["missile_type"], "attack");
    assert!(json.get("blast_radius").is_none());
    assert!(json.get("target_missile_id").is_none());
}

#[test]
fn test_defense_launch_carries_target_missile() {
    let target = MissileId::new();
    let req = LaunchRequest::defense(
        "SM-3",
        "B1",
        GeoPos::new(-157.88, 21.33, 0.0),
        target,
        150.0,
        3.0,
    );
    let json: serde_json::Value = serde_json::to_value(&req).unwrap();
    assert_eq!(json["missile_type"], "defense");
    assert_eq!(json["blast_radius"], 150.0);
    assert_eq!(json["target_missile_id"], target.to_string());

    let back: LaunchRequest = serde_json::from_value(json).unwrap();
    assert_eq!(back.target_missile_id, Some(target));
}

#[test]
fn test_launch_request_type_field_defaults_on_decode() {
    // External launchers occasionally omit the discriminator.
    let raw = serde_json::json!({
        "platform_nickname": "JL-2",
        "launch_callsign": "SUB_ALPHA",
        "launch_lat": 25.0,
        "launch_lon": -155.0,
        "launch_alt": -200.0,
        "target_lat": 21.31,
        "target_lon": -157.86,
        "target_alt": 0.0,
        "missile_type": "attack",
        "timestamp": 0.0
    });
    let req: LaunchRequest = serde_json::from_value(raw).unwrap();
    assert_eq!(req.message_type, LaunchRequest::MESSAGE_TYPE);
}

#[test]
fn test_impact_event_wire_fields() {
    let event = ImpactEvent {
        message_type: ImpactEvent::MESSAGE_TYPE.to_string(),
        missile_id: MissileId::new(),
        callsign: "ATK_JL2_0001".to_string(),
        outcome_type: OutcomeKind::GroundImpact,
        position: Point3 { x: -157.8, y: 21.3, z: 0.0 },
        target_achieved: false,
        timestamp: 99.0,
    };
    let json: serde_json::Value = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "missile_impact");
    assert_eq!(json["outcome_type"], "ground_impact");
    assert_eq!(json["target_achieved"], false);
}

#[test]
fn test_engagement_result_omits_empty_fields() {
    let result = EngagementResult {
        target_missile_id: MissileId::new(),
        defense_missile_id: None,
        success: false,
        failure_reason: Some("out_of_range".to_string()),
    };
    let json: serde_json::Value = serde_json::to_value(&result).unwrap();
    assert!(json.get("defense_missile_id").is_none());
    assert_eq!(json["failure_reason"], "out_of_range");
}

#[test]
fn test_position_update_round_trip() {
    let update = PositionUpdate {
        id: MissileId::new(),
        callsign: "ATK_JL2_0A1B".to_string(),
        position: Point3 { x: -156.0, y: 22.0, z: 15_000.0 },
        velocity: Velocity::new(120.0, -340.0, 80.0),
        timestamp: 42.1,
        missile_type: MissileKind::Attack,
    };
    let json = serde_json::to_string(&update).unwrap();
    let back: PositionUpdate = serde_json::from_str(&json).unwrap();
    assert_eq!(back, update);
}

#[test]
fn test_missile_id_suffix() {
    let id = MissileId::new();
    let suffix = id.suffix();
    assert_eq!(suffix.len(), 4);
    assert!(suffix.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
}
