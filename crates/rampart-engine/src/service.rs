//! Async pacing loop around the engine.
//!
//! Subscribes to `simulation.launch`, drains the inbox at each tick
//! boundary, and advances the engine at the configured rate. Shutdown
//! cancels the ticker after the current tick completes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use rampart_bus::EventBus;
use rampart_core::messages::LaunchRequest;
use rampart_core::subjects;

use crate::engine::SimulationEngine;
use crate::error::EngineError;

/// Run the engine until `shutdown` flips to true.
pub async fn run(
    mut engine: SimulationEngine,
    bus: Arc<dyn EventBus>,
    tick_ms: u64,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), EngineError> {
    let mut launches = bus.subscribe(subjects::SIMULATION_LAUNCH).await?;
    engine.sweep_orphaned_rows().await;

    let mut ticker = tokio::time::interval(Duration::from_millis(tick_ms));
    // Never try to catch up after a stall; positions republish each tick.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(tick_ms, "simulation engine running");
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // Reliable subject: drain everything that arrived since the
                // previous tick boundary.
                while let Some(message) = launches.try_next() {
                    match message.decode::<LaunchRequest>() {
                        Ok(request) => engine.queue_launch(request),
                        Err(e) => warn!(error = %e, "discarding malformed launch"),
                    }
                }
                engine.tick().await;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    info!("simulation engine stopped");
    Ok(())
}
