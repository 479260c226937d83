//! Tests for the scan schedule, the probability model, track lifecycle,
//! and the detection pipeline end to end.

use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use rampart_bus::{EventBus, InProcessBus};
use rampart_core::catalog::{Installation, PlatformType};
use rampart_core::config::SimulationConfig;
use rampart_core::enums::{InstallationStatus, MissileKind, PlatformCategory};
use rampart_core::messages::{DetectionEvent, PositionUpdate};
use rampart_core::subjects;
use rampart_core::types::{GeoPos, MissileId, SimClock, Velocity};
use rampart_store::MemStore;

use crate::service::RadarService;
use crate::site::{gaussian_noise, roll_detection, update_interval_ms, RadarSite};
use crate::tracks::TrackTable;

fn radar_platform(detection_range_m: Option<f64>, sweep: Option<f64>) -> PlatformType {
    PlatformType {
        nickname: "SPY-1".to_string(),
        category: PlatformCategory::DetectionSystem,
        max_speed_mps: 0.0,
        max_range_m: 0.0,
        max_altitude_m: 100_000.0,
        detection_range_m,
        sweep_rate_deg_per_sec: sweep,
        reload_time_sec: 0.0,
        accuracy_percent: 0.0,
        blast_radius_m: 0.0,
        fuel_capacity_kg: 0.0,
        fuel_consumption_rate_kgps: 0.0,
        thrust_n: 0.0,
    }
}

fn radar_installation(callsign: &str, position: GeoPos) -> Installation {
    Installation {
        callsign: callsign.to_string(),
        position,
        status: InstallationStatus::Active,
        platform: radar_platform(Some(400_000.0), Some(60.0)),
        ammo_count: 0,
    }
}

fn site_at(position: GeoPos) -> RadarSite {
    RadarSite::from_installation(&radar_installation("R1", position), 1000)
}

fn position_update(id: MissileId, position: GeoPos) -> PositionUpdate {
    PositionUpdate {
        id,
        callsign: "ATK_JL2_0001".to_string(),
        position: position.into(),
        velocity: Velocity::new(0.0, -500.0, -100.0),
        timestamp: 0.0,
        missile_type: MissileKind::Attack,
    }
}

// ---- Scan interval ----

#[test]
fn test_update_interval_formula() {
    // 60 deg/s is the baseline.
    assert_eq!(update_interval_ms(60.0, 1000), 1000);
    // Faster sweeps scan more often.
    assert_eq!(update_interval_ms(120.0, 1000), 500);
    // Clamped to [100, 5000].
    assert_eq!(update_interval_ms(1_000.0, 1000), 100);
    assert_eq!(update_interval_ms(1.0, 1000), 5_000);
    assert_eq!(update_interval_ms(0.0, 1000), 1000);
}

#[test]
fn test_due_respects_interval() {
    let mut site = site_at(GeoPos::new(-157.86, 21.31, 0.0));
    assert_eq!(site.update_interval_ms, 1000);

    site.last_scan = 10.0;
    assert!(!site.due(10.5));
    assert!(site.due(11.0));

    site.status = InstallationStatus::Disabled;
    assert!(!site.due(100.0), "disabled radars never scan");
}

// ---- Probability model ----

#[test]
fn test_probability_decreases_with_range() {
    let site = site_at(GeoPos::new(-157.86, 21.31, 0.0));
    let close = site.detection_probability(50_000.0, 10_000.0);
    let far = site.detection_probability(350_000.0, 10_000.0);
    assert!(close > far, "close {close} should exceed far {far}");
}

#[test]
fn test_probability_increases_with_altitude_then_saturates() {
    let site = site_at(GeoPos::new(-157.86, 21.31, 0.0));
    let low = site.detection_probability(100_000.0, 1_000.0);
    let mid = site.detection_probability(100_000.0, 9_000.0);
    let high = site.detection_probability(100_000.0, 50_000.0);
    assert!(low < mid);
    assert!((high - site.detection_probability(100_000.0, 10_000.0)).abs() < 1e-12);
}

#[test]
fn test_sea_skimmer_is_invisible() {
    // The altitude factor zeroes out at the surface.
    let site = site_at(GeoPos::new(-157.86, 21.31, 0.0));
    assert_eq!(site.detection_probability(50_000.0, 0.0), 0.0);
}

#[test]
fn test_eligibility_envelope() {
    let site = site_at(GeoPos::new(-157.86, 21.31, 0.0));

    let inside = GeoPos::new(-157.86, 21.31, 10_000.0).translated(100_000.0, 0.0, 0.0);
    assert!(site.eligible(&inside).is_some());

    let beyond_range = GeoPos::new(-157.86, 21.31, 10_000.0).translated(500_000.0, 0.0, 0.0);
    assert!(site.eligible(&beyond_range).is_none());

    let too_high = GeoPos::new(-157.86, 21.31, 200_000.0);
    assert!(site.eligible(&too_high).is_none(), "above max altitude");
}

#[test]
fn test_gaussian_noise_statistics() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let samples: Vec<f64> = (0..10_000).map(|_| gaussian_noise(&mut rng, 0.05)).collect();
    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    let var = samples.iter().map(|s| (s - mean) * (s - mean)).sum::<f64>()
        / samples.len() as f64;
    assert!(mean.abs() < 0.005, "mean should be near zero, got {mean}");
    assert!(
        (var.sqrt() - 0.05).abs() < 0.01,
        "sigma should be ~0.05, got {}",
        var.sqrt()
    );
}

#[test]
fn test_roll_detection_deterministic_under_seed() {
    let site = site_at(GeoPos::new(-157.86, 21.31, 0.0));
    let roll = |seed: u64| {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..100)
            .map(|_| roll_detection(&site, 100_000.0, 10_000.0, &mut rng).is_some())
            .collect::<Vec<bool>>()
    };
    assert_eq!(roll(42), roll(42), "same seed, same rolls");
    assert_ne!(roll(42), roll(43), "different seeds diverge");

    // p = 0.8 * 0.75 * 1.0 * 0.5 = 0.3 for this geometry.
    let hits = roll(42).iter().filter(|h| **h).count();
    assert!(
        (10..=55).contains(&hits),
        "p ~ 0.3 geometry should hit roughly a third of the time, got {hits}/100"
    );
}

// ---- Track table ----

#[test]
fn test_track_lifecycle_and_confidence_ramp() {
    let mut tracks = TrackTable::new();
    let id = MissileId::new();
    let update = position_update(id, GeoPos::new(-156.0, 22.0, 12_000.0));

    tracks.observe(&update, 100.0);
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks.get(id).unwrap().detection_count, 0);

    let c1 = tracks.record_detection(id, "R1").unwrap();
    assert!((c1 - 0.4).abs() < 1e-9, "0.3 base + 0.1 per hit");

    for _ in 0..20 {
        tracks.record_detection(id, "R2");
    }
    let track = tracks.get(id).unwrap();
    assert_eq!(track.confidence, 0.95, "confidence caps at 0.95");
    assert_eq!(track.detecting_radars.len(), 2);

    // Idle expiry at 30 s.
    assert_eq!(tracks.expire_idle(129.0, 30.0), 0);
    assert_eq!(tracks.expire_idle(131.0, 30.0), 1);
    assert!(tracks.is_empty());
}

#[test]
fn test_observe_refreshes_idle_clock() {
    let mut tracks = TrackTable::new();
    let id = MissileId::new();
    let update = position_update(id, GeoPos::new(-156.0, 22.0, 12_000.0));

    tracks.observe(&update, 0.0);
    tracks.observe(&update, 25.0);
    assert_eq!(tracks.expire_idle(50.0, 30.0), 0, "refreshed at t=25");
    assert_eq!(tracks.expire_idle(56.0, 30.0), 1);
}

// ---- Service pipeline ----

async fn service_with_radar() -> (RadarService, InProcessBus, MemStore, SimClock) {
    let store = MemStore::new();
    store.add_installation(radar_installation("R1", GeoPos::new(-157.86, 21.31, 0.0)));
    let bus = InProcessBus::new();
    let clock = SimClock::manual();
    let service = RadarService::load(
        Arc::new(store.clone()),
        Arc::new(bus.clone()),
        clock.clone(),
        &SimulationConfig::default(),
    )
    .await
    .unwrap();
    (service, bus, store, clock)
}

#[tokio::test]
async fn test_detection_pipeline_publishes_and_persists() {
    let (mut service, bus, store, clock) = service_with_radar().await;
    let mut detections = bus.subscribe(subjects::RADAR_DETECTION).await.unwrap();

    let id = MissileId::new();
    // High-altitude contact 100 km out: p is comfortably positive, so a
    // couple of dozen scans will land several detections.
    let contact = GeoPos::new(-157.86, 21.31, 12_000.0).translated(100_000.0, 0.0, 0.0);

    for _ in 0..20 {
        clock.advance(1.1);
        service.handle_position(&position_update(id, contact)).await;
    }

    assert_eq!(service.tracks().len(), 1);
    let track = service.tracks().get(id).unwrap();
    assert!(track.detection_count > 0, "at least one scan should hit");
    assert!(track.detecting_radars.contains("R1"));
    assert_eq!(store.detection_count() as u32, track.detection_count);

    let mut published = 0;
    while let Some(message) = detections.try_next() {
        let event: DetectionEvent = message.decode().unwrap();
        assert_eq!(event.radar_callsign, "R1");
        assert_eq!(event.missile_id, id);
        assert!(event.confidence > 0.0 && event.confidence <= 0.95);
        published += 1;
    }
    assert_eq!(published, track.detection_count);
}

#[tokio::test]
async fn test_scan_interval_gates_repeat_detections() {
    let (mut service, _bus, _store, clock) = service_with_radar().await;
    let id = MissileId::new();
    let contact = GeoPos::new(-157.86, 21.31, 12_000.0).translated(50_000.0, 0.0, 0.0);

    // Land the first detection (p ~ 0.35 per scan; 100 tries is plenty).
    for _ in 0..100 {
        clock.advance(1.1);
        service.handle_position(&position_update(id, contact)).await;
        if service.tracks().get(id).is_some_and(|t| t.detection_count > 0) {
            break;
        }
    }
    let count = service.tracks().get(id).unwrap().detection_count;
    assert!(count > 0, "expected a detection within 100 scans");

    // Within the scan interval nothing new fires, however many reports
    // arrive.
    for _ in 0..10 {
        clock.advance(0.01);
        service.handle_position(&position_update(id, contact)).await;
    }
    assert_eq!(service.tracks().get(id).unwrap().detection_count, count);
}

#[tokio::test]
async fn test_out_of_envelope_contact_never_detected() {
    let (mut service, _bus, store, clock) = service_with_radar().await;
    let id = MissileId::new();
    let far = GeoPos::new(-157.86, 21.31, 12_000.0).translated(600_000.0, 0.0, 0.0);

    for _ in 0..30 {
        clock.advance(1.1);
        service.handle_position(&position_update(id, far)).await;
    }

    assert_eq!(service.tracks().len(), 1, "track exists from positions");
    assert_eq!(service.tracks().get(id).unwrap().detection_count, 0);
    assert_eq!(store.detection_count(), 0);
}

#[tokio::test]
async fn test_defense_missiles_are_ignored() {
    let (mut service, _bus, _store, clock) = service_with_radar().await;
    let id = MissileId::new();
    let mut update = position_update(id, GeoPos::new(-157.0, 21.5, 10_000.0));
    update.missile_type = MissileKind::Defense;

    clock.advance(1.1);
    service.handle_position(&update).await;
    assert!(service.tracks().is_empty(), "interceptors are not tracked");
}

#[tokio::test]
async fn test_housekeeping_drops_idle_tracks() {
    let (mut service, _bus, _store, clock) = service_with_radar().await;
    let id = MissileId::new();
    let contact = GeoPos::new(-157.86, 21.31, 12_000.0).translated(100_000.0, 0.0, 0.0);

    clock.advance(1.1);
    service.handle_position(&position_update(id, contact)).await;
    assert_eq!(service.tracks().len(), 1);

    clock.advance(31.0);
    service.housekeeping().await;
    assert!(service.tracks().is_empty(), "30 s idle TTL");
}
