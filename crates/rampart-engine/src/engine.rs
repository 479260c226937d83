//! The simulation engine: owns the live munition map and drives the tick.
//!
//! Per tick, in order: drain queued launches, integrate physics, check
//! terminations (intercept first, then target detonation, sea floor, fuel),
//! flush outcomes, publish positions. The engine is the only component that
//! ever removes a munition.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use rampart_bus::{EventBus, EventBusExt};
use rampart_core::catalog::{ActiveMissileRecord, Outcome};
use rampart_core::enums::{MissileKind, MissileStatus, OutcomeKind};
use rampart_core::messages::{
    EngagementResult, ImpactEvent, InterceptEvent, LaunchRequest, PositionUpdate,
};
use rampart_core::subjects;
use rampart_core::types::{GeoPos, MissileId, SimClock, Velocity};

use rampart_store::{Store, StoreError};

use crate::constants::SEAFLOOR_M;
use crate::munition::Munition;
use crate::physics;

/// Terminal events held back until the outcome row is durable, so the
/// terminal event is always the last one published for an id.
enum TerminalEvent {
    Impact(ImpactEvent),
    Intercept(InterceptEvent),
    Result(EngagementResult),
}

struct PendingTerminal {
    outcome: Outcome,
    events: Vec<TerminalEvent>,
}

pub struct SimulationEngine {
    store: Arc<dyn Store>,
    bus: Arc<dyn EventBus>,
    clock: SimClock,
    missiles: HashMap<MissileId, Munition>,
    launch_queue: VecDeque<LaunchRequest>,
    pending_terminals: Vec<PendingTerminal>,
    tick_secs: f64,
    tick: u64,
}

impl SimulationEngine {
    pub fn new(
        store: Arc<dyn Store>,
        bus: Arc<dyn EventBus>,
        clock: SimClock,
        tick_secs: f64,
    ) -> Self {
        Self {
            store,
            bus,
            clock,
            missiles: HashMap::new(),
            launch_queue: VecDeque::new(),
            pending_terminals: Vec::new(),
            tick_secs,
            tick: 0,
        }
    }

    /// Queue a launch for processing at the next tick boundary.
    pub fn queue_launch(&mut self, request: LaunchRequest) {
        self.launch_queue.push_back(request);
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Live munitions (terminal-but-unrecorded ones included).
    pub fn missile_count(&self) -> usize {
        self.missiles.len()
    }

    pub fn missile(&self, id: MissileId) -> Option<&Munition> {
        self.missiles.get(&id)
    }

    pub fn missile_ids(&self) -> Vec<MissileId> {
        self.missiles.keys().copied().collect()
    }

    /// Mutable access for tests that need to corrupt a munition's state.
    #[cfg(test)]
    pub fn missile_mut(&mut self, id: MissileId) -> Option<&mut Munition> {
        self.missiles.get_mut(&id)
    }

    /// Startup sweep: `active_missile` rows with no munition behind them
    /// were orphaned by a crash mid-flight. Flights are not resumed; each
    /// orphan moves into `missile_outcome` with a distinguishing note so
    /// the ledger stays one-row-per-missile.
    pub async fn sweep_orphaned_rows(&mut self) {
        let rows = match self.store.list_active_missiles().await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "orphan sweep skipped");
                return;
            }
        };
        for row in rows {
            if self.missiles.contains_key(&row.id) {
                continue;
            }
            let outcome = Outcome {
                missile_id: row.id,
                kind: OutcomeKind::GroundImpact,
                position: row.target,
                target_achieved: false,
                intercepting_missile_id: None,
                notes: Some("orphaned active row swept at startup".to_string()),
            };
            match self.store.finalize_missile(&outcome).await {
                Ok(()) => info!(id = %row.id, callsign = %row.callsign, "orphan swept"),
                Err(StoreError::DuplicateOutcome(_)) => {}
                Err(e) => warn!(id = %row.id, error = %e, "orphan sweep failed"),
            }
        }
    }

    /// Advance the simulation by one tick.
    pub async fn tick(&mut self) {
        self.tick += 1;
        let now = self.clock.now();

        self.process_launches(now).await;
        self.integrate(now);
        self.check_terminations(now);
        self.flush_terminals().await;
        self.publish_positions(now).await;
    }

    /// Create munitions for every queued launch request.
    async fn process_launches(&mut self, now: f64) {
        while let Some(request) = self.launch_queue.pop_front() {
            let platform = match self
                .store
                .platform_by_nickname(&request.platform_nickname)
                .await
            {
                Ok(Some(platform)) => platform,
                Ok(None) => {
                    warn!(
                        platform = %request.platform_nickname,
                        "rejecting launch for unknown platform"
                    );
                    continue;
                }
                Err(e) => {
                    // Transient: requeue and let the next tick retry.
                    warn!(error = %e, "platform lookup failed, retrying next tick");
                    self.launch_queue.push_front(request);
                    break;
                }
            };

            let defense_target = request
                .target_missile_id
                .and_then(|id| self.missiles.get(&id))
                .map(|target| target.position);
            let munition = Munition::from_launch(&request, platform, now, defense_target);

            let record = ActiveMissileRecord {
                id: munition.id,
                callsign: munition.callsign.clone(),
                platform_nickname: munition.platform.nickname.clone(),
                launch_callsign: munition.launch_callsign.clone(),
                kind: munition.kind,
                target: munition.target_position.unwrap_or(munition.position),
                launch_ts: Utc::now(),
            };
            if let Err(e) = self.store.insert_active_missile(&record).await {
                match e {
                    StoreError::Validation(v) => {
                        warn!(error = %v, "rejecting invalid launch");
                        continue;
                    }
                    other => {
                        // Transient: without the row, every later position
                        // write, the outcome delete, and the restart sweep
                        // would miss this munition. Retry the request next
                        // tick instead of flying it untracked.
                        warn!(
                            error = %other,
                            "active-missile insert failed, retrying next tick"
                        );
                        self.launch_queue.push_front(request);
                        break;
                    }
                }
            }

            info!(
                id = %munition.id,
                callsign = %munition.callsign,
                kind = ?munition.kind,
                "munition launched"
            );
            self.missiles.insert(munition.id, munition);
        }
    }

    /// Advance kinematics for every active munition.
    fn integrate(&mut self, now: f64) {
        // Snapshot positions first so defense guidance can chase targets
        // without aliasing the mutable walk.
        let positions: HashMap<MissileId, GeoPos> = self
            .missiles
            .iter()
            .filter(|(_, m)| m.is_active())
            .map(|(id, m)| (*id, m.position))
            .collect();

        let mut anomalies: Vec<(MissileId, String)> = Vec::new();
        for munition in self.missiles.values_mut() {
            if !munition.is_active() {
                continue;
            }
            let defense_target = munition
                .target_missile_id
                .and_then(|id| positions.get(&id));
            let elapsed = munition.elapsed(now);
            if let Err(anomaly) =
                physics::step(munition, self.tick_secs, elapsed, defense_target)
            {
                error!(id = %munition.id, %anomaly, "terminating munition");
                anomalies.push((munition.id, anomaly.to_string()));
            }
        }

        for (id, note) in anomalies {
            self.terminate_fuel_exhaustion(id, Some(note));
        }
    }

    /// Check termination conditions in priority order.
    fn check_terminations(&mut self, now: f64) {
        // (a) Intercept proximity: a defense missile within its own blast
        // radius of its designated target takes both munitions out.
        let intercepts: Vec<(MissileId, MissileId)> = self
            .missiles
            .values()
            .filter(|m| m.is_active() && m.kind == MissileKind::Defense)
            .filter_map(|defense| {
                let target_id = defense.target_missile_id?;
                let target = self.missiles.get(&target_id)?;
                if !target.is_active() {
                    return None;
                }
                let distance = defense.position.distance_m(&target.position);
                (distance <= defense.blast_radius_m).then_some((defense.id, target_id))
            })
            .collect();
        for (defense_id, target_id) in intercepts {
            self.terminate_intercept(defense_id, target_id, now);
        }

        // (b) Target-achieved detonation, (c) sea floor, (d) fuel.
        let mut detonations = Vec::new();
        let mut floor_impacts = Vec::new();
        let mut fuel_outs = Vec::new();
        for munition in self.missiles.values().filter(|m| m.is_active()) {
            if munition.kind == MissileKind::Attack {
                if let Some(target) = munition.target_position {
                    let within = munition.position.horizontal_distance_m(&target)
                        <= munition.blast_radius_m;
                    if munition.is_descending()
                        && within
                        && munition.position.alt_m >= target.alt_m
                    {
                        detonations.push(munition.id);
                        continue;
                    }
                }
            }
            if munition.position.alt_m <= SEAFLOOR_M {
                floor_impacts.push(munition.id);
            } else if munition.fuel_remaining_kg <= 0.0 {
                fuel_outs.push(munition.id);
            }
        }

        for id in detonations {
            self.terminate_detonation(id, now);
        }
        for id in floor_impacts {
            self.terminate_ground_impact(id, now);
        }
        for id in fuel_outs {
            self.terminate_fuel_exhaustion(id, None);
        }
    }

    fn terminate_intercept(&mut self, defense_id: MissileId, target_id: MissileId, now: f64) {
        // The pairs were collected against one snapshot; when two
        // interceptors reach the same target in one tick, the first claim
        // wins and the others fly on.
        let target_claimed = self
            .missiles
            .get(&target_id)
            .map_or(true, |target| !target.is_active());
        if target_claimed {
            return;
        }

        let Some(defense) = self.missiles.get_mut(&defense_id) else {
            return;
        };
        if !defense.is_active() {
            return;
        }
        defense.status = MissileStatus::Destroyed;
        let defense_position = defense.position;
        let defense_callsign = defense.callsign.clone();

        let Some(target) = self.missiles.get_mut(&target_id) else {
            return;
        };
        target.status = MissileStatus::Intercepted;
        let target_position = target.position;
        let target_callsign = target.callsign.clone();

        info!(
            target = %target_callsign,
            interceptor = %defense_callsign,
            "intercept"
        );

        self.pending_terminals.push(PendingTerminal {
            outcome: Outcome {
                missile_id: target_id,
                kind: OutcomeKind::Intercepted,
                position: target_position,
                target_achieved: false,
                intercepting_missile_id: Some(defense_id),
                notes: None,
            },
            events: vec![
                TerminalEvent::Intercept(InterceptEvent {
                    message_type: InterceptEvent::MESSAGE_TYPE.to_string(),
                    target_missile_id: target_id,
                    defense_missile_id: defense_id,
                    callsign: target_callsign,
                    position: target_position.into(),
                    timestamp: now,
                }),
                TerminalEvent::Result(EngagementResult {
                    target_missile_id: target_id,
                    defense_missile_id: Some(defense_id),
                    success: true,
                    failure_reason: None,
                }),
            ],
        });
        self.pending_terminals.push(PendingTerminal {
            outcome: Outcome {
                missile_id: defense_id,
                kind: OutcomeKind::Detonated,
                position: defense_position,
                target_achieved: true,
                intercepting_missile_id: None,
                notes: None,
            },
            events: vec![TerminalEvent::Impact(ImpactEvent {
                message_type: ImpactEvent::MESSAGE_TYPE.to_string(),
                missile_id: defense_id,
                callsign: defense_callsign,
                outcome_type: OutcomeKind::Detonated,
                position: defense_position.into(),
                target_achieved: true,
                timestamp: now,
            })],
        });
    }

    fn terminate_detonation(&mut self, id: MissileId, now: f64) {
        let Some(munition) = self.missiles.get_mut(&id) else {
            return;
        };
        munition.status = MissileStatus::Impacted;
        info!(callsign = %munition.callsign, "warhead detonated at target");
        let event = ImpactEvent {
            message_type: ImpactEvent::MESSAGE_TYPE.to_string(),
            missile_id: id,
            callsign: munition.callsign.clone(),
            outcome_type: OutcomeKind::Detonated,
            position: munition.position.into(),
            target_achieved: true,
            timestamp: now,
        };
        let outcome = Outcome {
            missile_id: id,
            kind: OutcomeKind::Detonated,
            position: munition.position,
            target_achieved: true,
            intercepting_missile_id: None,
            notes: None,
        };
        self.pending_terminals.push(PendingTerminal {
            outcome,
            events: vec![TerminalEvent::Impact(event)],
        });
    }

    fn terminate_ground_impact(&mut self, id: MissileId, now: f64) {
        let Some(munition) = self.missiles.get_mut(&id) else {
            return;
        };
        munition.status = MissileStatus::Impacted;
        info!(callsign = %munition.callsign, alt = munition.position.alt_m, "surface impact");
        let event = ImpactEvent {
            message_type: ImpactEvent::MESSAGE_TYPE.to_string(),
            missile_id: id,
            callsign: munition.callsign.clone(),
            outcome_type: OutcomeKind::GroundImpact,
            position: munition.position.into(),
            target_achieved: false,
            timestamp: now,
        };
        let mut events = vec![TerminalEvent::Impact(event)];
        if munition.kind == MissileKind::Defense {
            // The interceptor fell short; tell the command center.
            events.push(TerminalEvent::Result(EngagementResult {
                target_missile_id: munition.target_missile_id.unwrap_or(id),
                defense_missile_id: Some(id),
                success: false,
                failure_reason: Some("interceptor ground impact".to_string()),
            }));
        }
        self.pending_terminals.push(PendingTerminal {
            outcome: Outcome {
                missile_id: id,
                kind: OutcomeKind::GroundImpact,
                position: munition.position,
                target_achieved: false,
                intercepting_missile_id: None,
                notes: None,
            },
            events,
        });
    }

    fn terminate_fuel_exhaustion(&mut self, id: MissileId, notes: Option<String>) {
        let now = self.clock.now();
        let Some(munition) = self.missiles.get_mut(&id) else {
            return;
        };
        munition.status = MissileStatus::FuelExhausted;
        debug!(callsign = %munition.callsign, "fuel exhausted");
        let event = ImpactEvent {
            message_type: ImpactEvent::MESSAGE_TYPE.to_string(),
            missile_id: id,
            callsign: munition.callsign.clone(),
            outcome_type: OutcomeKind::FuelExhaustion,
            position: munition.position.into(),
            target_achieved: false,
            timestamp: now,
        };
        let mut events = vec![TerminalEvent::Impact(event)];
        if munition.kind == MissileKind::Defense {
            events.push(TerminalEvent::Result(EngagementResult {
                target_missile_id: munition.target_missile_id.unwrap_or(id),
                defense_missile_id: Some(id),
                success: false,
                failure_reason: Some("interceptor fuel exhaustion".to_string()),
            }));
        }
        self.pending_terminals.push(PendingTerminal {
            outcome: Outcome {
                missile_id: id,
                kind: OutcomeKind::FuelExhaustion,
                position: munition.position,
                target_achieved: false,
                intercepting_missile_id: None,
                notes,
            },
            events,
        });
    }

    /// Record pending outcomes and publish their terminal events. A failed
    /// write keeps the munition terminal-but-unrecorded for the next tick.
    async fn flush_terminals(&mut self) {
        let pending = std::mem::take(&mut self.pending_terminals);
        for terminal in pending {
            match self.store.finalize_missile(&terminal.outcome).await {
                Ok(()) => {}
                Err(StoreError::DuplicateOutcome(id)) => {
                    // Recorded on an earlier attempt whose events were lost;
                    // fall through and publish.
                    warn!(%id, "outcome already recorded");
                }
                Err(e) => {
                    warn!(
                        id = %terminal.outcome.missile_id,
                        error = %e,
                        "outcome write failed, retrying next tick"
                    );
                    self.pending_terminals.push(terminal);
                    continue;
                }
            }

            for event in &terminal.events {
                let published = match event {
                    TerminalEvent::Impact(e) => {
                        self.bus.publish_json(subjects::MISSILE_IMPACT, e).await
                    }
                    TerminalEvent::Intercept(e) => {
                        self.bus.publish_json(subjects::MISSILE_INTERCEPTED, e).await
                    }
                    TerminalEvent::Result(e) => {
                        self.bus.publish_json(subjects::ENGAGEMENT_RESULT, e).await
                    }
                };
                if let Err(e) = published {
                    warn!(error = %e, "terminal event publish failed");
                }
            }
            self.missiles.remove(&terminal.outcome.missile_id);
        }
    }

    /// Persist and publish the position of every still-active munition.
    async fn publish_positions(&mut self, now: f64) {
        for munition in self.missiles.values() {
            if !munition.is_active() {
                continue;
            }
            let velocity = Velocity::new(
                munition.velocity.x,
                munition.velocity.y,
                munition.velocity.z,
            );
            if let Err(e) = self
                .store
                .update_missile_position(
                    munition.id,
                    munition.position,
                    velocity,
                    munition.fuel_remaining_kg,
                )
                .await
            {
                warn!(id = %munition.id, error = %e, "position persist failed");
            }

            let update = PositionUpdate {
                id: munition.id,
                callsign: munition.callsign.clone(),
                position: munition.position.into(),
                velocity,
                timestamp: now,
                missile_type: munition.kind,
            };
            if let Err(e) = self
                .bus
                .publish_json(subjects::MISSILE_POSITION, &update)
                .await
            {
                warn!(id = %munition.id, error = %e, "position publish failed");
            }
        }
    }
}
