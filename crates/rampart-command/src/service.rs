//! Command center service: event handlers, engagement dispatch, and
//! housekeeping.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use rampart_bus::{EventBus, EventBusExt};
use rampart_core::config::SimulationConfig;
use rampart_core::enums::{MissileKind, PlatformCategory};
use rampart_core::messages::{
    DetectionEvent, EngagementOrder, EngagementResult, PositionUpdate,
};
use rampart_core::subjects;
use rampart_core::types::{GeoPos, MissileId, SimClock, Velocity};
use rampart_store::Store;

use crate::engage::{select_battery, BatteryInfo};
use crate::error::CommandError;
use crate::ledger::{Attempt, AttemptLedger};
use crate::threat::ThreatAssessment;

pub struct CommandCenter {
    store: Arc<dyn Store>,
    bus: Arc<dyn EventBus>,
    clock: SimClock,
    config: SimulationConfig,
    threats: HashMap<MissileId, ThreatAssessment>,
    ledger: AttemptLedger,
    batteries: Vec<BatteryInfo>,
}

impl CommandCenter {
    /// Load every counter-defense installation and start with an empty
    /// threat picture.
    pub async fn load(
        store: Arc<dyn Store>,
        bus: Arc<dyn EventBus>,
        clock: SimClock,
        config: SimulationConfig,
    ) -> Result<Self, CommandError> {
        let installations = store
            .installations_by_category(PlatformCategory::CounterDefense)
            .await?;
        let batteries: Vec<BatteryInfo> = installations
            .iter()
            .map(BatteryInfo::from_installation)
            .collect();
        info!(count = batteries.len(), "defense batteries loaded");

        Ok(Self {
            store,
            bus,
            clock,
            config,
            threats: HashMap::new(),
            ledger: AttemptLedger::new(),
            batteries,
        })
    }

    pub fn threat(&self, id: MissileId) -> Option<&ThreatAssessment> {
        self.threats.get(&id)
    }

    pub fn threat_count(&self) -> usize {
        self.threats.len()
    }

    pub fn attempt_count(&self, id: MissileId) -> usize {
        self.ledger.count(id)
    }

    pub fn battery(&self, callsign: &str) -> Option<&BatteryInfo> {
        self.batteries.iter().find(|b| b.callsign == callsign)
    }

    /// A radar saw something.
    pub async fn handle_detection(&mut self, event: &DetectionEvent) {
        self.assess(
            event.missile_id,
            &event.missile_callsign,
            event.position.into(),
            Some(event.velocity),
            Some(&event.radar_callsign),
        )
        .await;
    }

    /// The engine's position stream; only attack missiles are threats.
    pub async fn handle_position(&mut self, update: &PositionUpdate) {
        if update.missile_type != MissileKind::Attack {
            return;
        }
        self.assess(
            update.id,
            &update.callsign,
            update.position.into(),
            Some(update.velocity),
            None,
        )
        .await;
    }

    /// An engagement resolved: success erases the threat; failure retries
    /// while attempts remain.
    pub async fn handle_result(&mut self, result: &EngagementResult) {
        if result.success {
            info!(target = %result.target_missile_id, "intercept confirmed");
            self.threats.remove(&result.target_missile_id);
            self.ledger.clear(result.target_missile_id);
            return;
        }

        let reason = result.failure_reason.as_deref().unwrap_or("unknown");
        warn!(target = %result.target_missile_id, reason, "engagement failed");
        self.ledger.record_failure(result.target_missile_id, reason);
        if self.threats.contains_key(&result.target_missile_id) {
            self.consider_engagement(result.target_missile_id).await;
        }
    }

    /// Update or create the assessment, then engage if warranted.
    async fn assess(
        &mut self,
        id: MissileId,
        callsign: &str,
        position: GeoPos,
        velocity: Option<Velocity>,
        detection_source: Option<&str>,
    ) {
        let now = self.clock.now();
        match self.threats.get_mut(&id) {
            Some(threat) => threat.update(position, velocity, detection_source, now),
            None => {
                let mut threat =
                    ThreatAssessment::new(id, callsign.to_string(), position, velocity, now);
                if let Some(radar) = detection_source {
                    threat.detecting_radars.insert(radar.to_string());
                }
                debug!(missile = callsign, level = ?threat.threat_level, "new threat");
                self.threats.insert(id, threat);
            }
        }

        let warrants = self
            .threats
            .get(&id)
            .is_some_and(|t| t.threat_level.warrants_engagement());
        if warrants {
            self.consider_engagement(id).await;
        }
    }

    /// Pick the best battery and issue an order, within the retry cap and
    /// above the probability floor.
    async fn consider_engagement(&mut self, id: MissileId) {
        let Some(threat) = self.threats.get(&id) else {
            return;
        };
        if !self.ledger.can_attempt(id, self.config.max_retries) {
            debug!(target = %id, "retry cap reached, not engaging");
            return;
        }

        let Some(solution) = select_battery(threat, &self.batteries) else {
            debug!(target = %id, "no battery can reach this threat");
            return;
        };
        if solution.probability_of_success <= self.config.engagement_probability_floor {
            debug!(
                target = %id,
                probability = solution.probability_of_success,
                "best solution below the probability floor"
            );
            return;
        }

        let now = self.clock.now();
        let order = EngagementOrder {
            message_type: EngagementOrder::MESSAGE_TYPE.to_string(),
            target_missile_id: id,
            battery_callsign: solution.battery_callsign.clone(),
            intercept_point: solution.intercept_point.into(),
            intercept_altitude: solution.intercept_altitude_m,
            probability_of_success: solution.probability_of_success,
            timestamp: now,
        };
        let subject = subjects::battery_engage(&solution.battery_callsign);
        if let Err(e) = self.bus.publish_json(&subject, &order).await {
            warn!(error = %e, "engagement order publish failed");
            return;
        }

        info!(
            target = %id,
            battery = %solution.battery_callsign,
            probability = solution.probability_of_success,
            attempt = self.ledger.count(id) + 1,
            "engagement ordered"
        );
        self.ledger.record(
            id,
            Attempt {
                battery_callsign: solution.battery_callsign,
                timestamp: now,
                probability: solution.probability_of_success,
                failure_reason: None,
            },
        );
    }

    /// Once a second: refresh battery ammo/status from the database and
    /// drop threats long past their predicted impact.
    pub async fn housekeeping(&mut self) {
        match self
            .store
            .installations_by_category(PlatformCategory::CounterDefense)
            .await
        {
            Ok(installations) => {
                self.batteries = installations
                    .iter()
                    .map(BatteryInfo::from_installation)
                    .collect();
            }
            Err(e) => warn!(error = %e, "battery refresh failed"),
        }

        let now = self.clock.now();
        let expiry = self.config.threat_expiry_s;
        let expired: Vec<MissileId> = self
            .threats
            .values()
            .filter(|t| now > t.predicted_impact_time() + expiry)
            .map(|t| t.missile_id)
            .collect();
        for id in expired {
            info!(target = %id, "threat expired");
            self.threats.remove(&id);
            self.ledger.clear(id);
        }
    }

    /// Run until shutdown.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), CommandError> {
        let mut detections = self.bus.subscribe(subjects::RADAR_DETECTION).await?;
        let mut positions = self.bus.subscribe(subjects::MISSILE_POSITION).await?;
        let mut results = self.bus.subscribe(subjects::ENGAGEMENT_RESULT).await?;
        let mut housekeeping = tokio::time::interval(Duration::from_secs(1));

        info!("command center running");
        loop {
            tokio::select! {
                maybe = detections.next() => match maybe {
                    Some(message) => match message.decode::<DetectionEvent>() {
                        Ok(event) => self.handle_detection(&event).await,
                        Err(e) => warn!(error = %e, "discarding malformed detection"),
                    },
                    None => break,
                },
                maybe = positions.next() => match maybe {
                    Some(message) => match message.decode::<PositionUpdate>() {
                        Ok(update) => self.handle_position(&update).await,
                        Err(e) => warn!(error = %e, "discarding malformed position"),
                    },
                    None => break,
                },
                maybe = results.next() => match maybe {
                    Some(message) => match message.decode::<EngagementResult>() {
                        Ok(result) => self.handle_result(&result).await,
                        Err(e) => warn!(error = %e, "discarding malformed result"),
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
        info!("command center stopped");
        Ok(())
    }
}
