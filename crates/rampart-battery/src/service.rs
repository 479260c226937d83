//! Battery service: the mailbox task around one controller.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{info, warn};

use rampart_bus::{EventBus, EventBusExt};
use rampart_core::messages::{EngagementOrder, EngagementResult, LaunchRequest};
use rampart_core::subjects;
use rampart_core::types::SimClock;
use rampart_store::{EngagementAttemptRecord, Store};

use crate::controller::{BatteryAction, BatteryController, RejectReason};
use crate::error::BatteryError;

/// Timed transitions are checked at this cadence.
const CONTROL_TICK_MS: u64 = 100;

pub struct BatteryService {
    controller: BatteryController,
    store: Arc<dyn Store>,
    bus: Arc<dyn EventBus>,
    clock: SimClock,
}

impl BatteryService {
    /// Load the installation for `callsign` and build its controller.
    pub async fn load(
        store: Arc<dyn Store>,
        bus: Arc<dyn EventBus>,
        clock: SimClock,
        callsign: &str,
    ) -> Result<Self, BatteryError> {
        let installation = store
            .installation_by_callsign(callsign)
            .await?
            .ok_or_else(|| BatteryError::UnknownBattery(callsign.to_string()))?;
        let controller = BatteryController::new(&installation, clock.now());
        info!(
            callsign,
            ammo = controller.ammo_count(),
            "battery controller ready"
        );
        Ok(Self {
            controller,
            store,
            bus,
            clock,
        })
    }

    pub fn controller(&self) -> &BatteryController {
        &self.controller
    }

    /// Feed one engage order into the controller.
    pub async fn handle_order(&mut self, order: EngagementOrder) {
        let now = self.clock.now();
        if let Some(action) = self.controller.submit(order, now) {
            self.execute(action).await;
        }
    }

    /// Advance timed transitions.
    pub async fn control_tick(&mut self) {
        let now = self.clock.now();
        for action in self.controller.tick(now) {
            self.execute(action).await;
        }
    }

    async fn execute(&mut self, action: BatteryAction) {
        match action {
            BatteryAction::Launch(order) => self.launch(order).await,
            BatteryAction::Reject { order, reason } => self.reject(order, reason).await,
        }
    }

    /// Issue the defensive launch: consume a round, publish
    /// `simulation.launch`, record the attempt.
    async fn launch(&mut self, order: EngagementOrder) {
        let callsign = self.controller.callsign().to_string();
        let now = self.clock.now();

        // The ammo transaction gates the launch: no confirmed debit, no
        // shot. A transient store failure aborts the same as a dry
        // magazine; the command center's failure handling retries while
        // attempts remain.
        if let Err(e) = self.store.decrement_ammo(&callsign).await {
            warn!(battery = %callsign, error = %e, "launch aborted");
            self.controller.abort_launch(now);
            self.publish_failure(&order, &e.to_string()).await;
            return;
        }

        let request = LaunchRequest::defense(
            self.controller.platform_nickname(),
            &callsign,
            self.controller.position(),
            order.target_missile_id,
            self.controller.blast_radius_m(),
            now,
        );
        if let Err(e) = self
            .bus
            .publish_json(subjects::SIMULATION_LAUNCH, &request)
            .await
        {
            warn!(battery = %callsign, error = %e, "launch publish failed");
            // Return the round that the transaction already took.
            if let Err(e) = self
                .store
                .arm_battery(&callsign, self.controller.platform_nickname(), 1)
                .await
            {
                warn!(battery = %callsign, error = %e, "ammo restock failed");
            }
            self.controller.abort_launch(now);
            self.publish_failure(&order, "launch publish failed").await;
            return;
        }

        info!(
            battery = %callsign,
            target = %order.target_missile_id,
            "interceptor away"
        );
        self.controller.confirm_launch(now);

        let attempt = EngagementAttemptRecord {
            target_missile_id: order.target_missile_id,
            battery_callsign: callsign,
            probability_of_success: order.probability_of_success,
            attempted_at: Utc::now(),
        };
        if let Err(e) = self.store.insert_engagement_attempt(&attempt).await {
            warn!(error = %e, "attempt record failed");
        }
    }

    /// Envelope or readiness rejection: log, report, stay ready.
    async fn reject(&mut self, order: EngagementOrder, reason: RejectReason) {
        warn!(
            battery = %self.controller.callsign(),
            target = %order.target_missile_id,
            %reason,
            "engagement order rejected"
        );
        self.publish_failure(&order, &reason.to_string()).await;
    }

    async fn publish_failure(&self, order: &EngagementOrder, reason: &str) {
        let result = EngagementResult {
            target_missile_id: order.target_missile_id,
            defense_missile_id: None,
            success: false,
            failure_reason: Some(reason.to_string()),
        };
        if let Err(e) = self
            .bus
            .publish_json(subjects::ENGAGEMENT_RESULT, &result)
            .await
        {
            warn!(error = %e, "failure result publish failed");
        }
    }

    /// Run until shutdown, draining any queued orders first.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), BatteryError> {
        let subject = subjects::battery_engage(self.controller.callsign());
        let mut mailbox = self.bus.subscribe(&subject).await?;
        let mut ticker = tokio::time::interval(Duration::from_millis(CONTROL_TICK_MS));

        info!(battery = %self.controller.callsign(), "battery service running");
        loop {
            tokio::select! {
                maybe = mailbox.next() => match maybe {
                    Some(message) => match message.decode::<EngagementOrder>() {
                        Ok(order) => self.handle_order(order).await,
                        Err(e) => warn!(error = %e, "discarding malformed order"),
                    },
                    None => break,
                },
                _ = ticker.tick() => self.control_tick().await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        // Drain the mailbox before going dark.
                        while let Some(message) = mailbox.try_next() {
                            if let Ok(order) = message.decode::<EngagementOrder>() {
                                self.handle_order(order).await;
                            }
                        }
                        break;
                    }
                }
            }
        }
        info!(battery = %self.controller.callsign(), "battery service stopped");
        Ok(())
    }
}
