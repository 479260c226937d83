//! Radar service: position consumption, the scan worker pool, detection
//! publication, and track housekeeping.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use rampart_bus::{EventBus, EventBusExt};
use rampart_core::config::SimulationConfig;
use rampart_core::constants::DETECTION_NOISE_SIGMA;
use rampart_core::enums::{MissileKind, PlatformCategory};
use rampart_core::messages::{DetectionEvent, PositionUpdate};
use rampart_core::subjects;
use rampart_core::types::{GeoPos, SimClock};
use rampart_store::{DetectionRecord, Store};

use crate::error::RadarError;
use crate::site::{decide_detection, gaussian_noise, RadarSite};
use crate::tracks::TrackTable;

/// Per-position scan checks fan out over this many workers.
pub const SCAN_WORKERS: usize = 10;

pub struct RadarService {
    store: Arc<dyn Store>,
    bus: Arc<dyn EventBus>,
    clock: SimClock,
    sites: Vec<RadarSite>,
    tracks: TrackTable,
    rng: ChaCha8Rng,
    track_idle_ttl_s: f64,
    pool: Arc<Semaphore>,
}

impl RadarService {
    /// Load every active `detection_system` installation.
    pub async fn load(
        store: Arc<dyn Store>,
        bus: Arc<dyn EventBus>,
        clock: SimClock,
        config: &SimulationConfig,
    ) -> Result<Self, RadarError> {
        let installations = store
            .installations_by_category(PlatformCategory::DetectionSystem)
            .await?;
        let sites: Vec<RadarSite> = installations
            .iter()
            .filter(|i| i.is_active())
            .map(|i| RadarSite::from_installation(i, config.radar_update_interval_ms))
            .collect();
        info!(count = sites.len(), "radar installations loaded");

        Ok(Self {
            store,
            bus,
            clock,
            sites,
            tracks: TrackTable::new(),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            track_idle_ttl_s: config.track_idle_ttl_s,
            pool: Arc::new(Semaphore::new(SCAN_WORKERS)),
        })
    }

    pub fn tracks(&self) -> &TrackTable {
        &self.tracks
    }

    pub fn site(&self, callsign: &str) -> Option<&RadarSite> {
        self.sites.iter().find(|s| s.callsign == callsign)
    }

    /// Process one position report: update the track, then check every due
    /// radar concurrently. Randomness is drawn serially in site order so a
    /// seeded run is deterministic regardless of worker scheduling.
    pub async fn handle_position(&mut self, update: &PositionUpdate) {
        if update.missile_type != MissileKind::Attack {
            return;
        }
        let now = self.clock.now();
        self.tracks.observe(update, now);
        let contact: GeoPos = update.position.into();

        let mut scans: JoinSet<(usize, Option<f64>)> = JoinSet::new();
        for (index, site) in self.sites.iter().enumerate() {
            if !site.due(now) {
                continue;
            }
            let Some(distance) = site.eligible(&contact) else {
                continue;
            };
            let noise = gaussian_noise(&mut self.rng, DETECTION_NOISE_SIGMA);
            let sample: f64 = self.rng.gen_range(0.0..1.0);
            let snapshot = site.clone();
            let altitude = contact.alt_m;
            let Ok(permit) = self.pool.clone().acquire_owned().await else {
                break;
            };
            scans.spawn(async move {
                let _permit = permit;
                (index, decide_detection(&snapshot, distance, altitude, noise, sample))
            });
        }

        let mut detections: Vec<(usize, f64)> = Vec::new();
        while let Some(joined) = scans.join_next().await {
            if let Ok((index, Some(probability))) = joined {
                detections.push((index, probability));
            }
        }
        detections.sort_by_key(|(index, _)| *index);

        for (index, probability) in detections {
            self.apply_detection(index, update, probability, now).await;
        }
    }

    /// A radar detected the missile: bump the track, persist the event row,
    /// publish `radar.detection`.
    async fn apply_detection(
        &mut self,
        site_index: usize,
        update: &PositionUpdate,
        probability: f64,
        now: f64,
    ) {
        let site = &mut self.sites[site_index];
        site.last_scan = now;
        let radar_callsign = site.callsign.clone();
        let signal_strength_db = site.signal_strength_db;

        let confidence = self
            .tracks
            .record_detection(update.id, &radar_callsign)
            .unwrap_or(0.0);

        debug!(
            radar = %radar_callsign,
            missile = %update.callsign,
            probability,
            confidence,
            "detection"
        );

        let record = DetectionRecord {
            radar_callsign: radar_callsign.clone(),
            missile_id: update.id,
            position: update.position.into(),
            velocity: update.velocity,
            signal_strength_db,
            confidence_percent: (confidence * 100.0) as i32,
            detected_at: Utc::now(),
        };
        if let Err(e) = self.store.insert_detection(&record).await {
            warn!(error = %e, "detection persist failed");
        }

        let event = DetectionEvent {
            message_type: DetectionEvent::MESSAGE_TYPE.to_string(),
            radar_callsign,
            missile_id: update.id,
            missile_callsign: update.callsign.clone(),
            position: update.position,
            velocity: update.velocity,
            confidence,
            timestamp: now,
        };
        if let Err(e) = self.bus.publish_json(subjects::RADAR_DETECTION, &event).await {
            warn!(error = %e, "detection publish failed");
        }
    }

    /// Periodic upkeep: expire idle tracks and refresh site status from the
    /// database.
    pub async fn housekeeping(&mut self) {
        let now = self.clock.now();
        let dropped = self.tracks.expire_idle(now, self.track_idle_ttl_s);
        if dropped > 0 {
            debug!(dropped, "idle tracks expired");
        }

        match self
            .store
            .installations_by_category(PlatformCategory::DetectionSystem)
            .await
        {
            Ok(installations) => {
                for site in &mut self.sites {
                    if let Some(row) =
                        installations.iter().find(|i| i.callsign == site.callsign)
                    {
                        site.status = row.status;
                    }
                }
            }
            Err(e) => warn!(error = %e, "radar status refresh failed"),
        }
    }

    /// Run until shutdown.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), RadarError> {
        let mut positions = self.bus.subscribe(subjects::MISSILE_POSITION).await?;
        let mut housekeeping = tokio::time::interval(Duration::from_secs(1));

        info!("radar service running");
        loop {
            tokio::select! {
                maybe = positions.next() => match maybe {
                    Some(message) => match message.decode::<PositionUpdate>() {
                        Ok(update) => self.handle_position(&update).await,
                        Err(e) => warn!(error = %e, "discarding malformed position"),
                    },
                    None => break,
                },
                _ = housekeeping.tick() => self.housekeeping().await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("radar service stopped");
        Ok(())
    }
}
