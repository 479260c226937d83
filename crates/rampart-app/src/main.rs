//! RAMPART service binary.
//!
//! One subcommand per long-running service. All services share the same
//! wiring: environment (with `.env` support), structured logging, the NATS
//! bus, the Postgres store with startup retry, configuration from the
//! `simulation_config` table, and ctrl-c shutdown.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rampart_bus::{EventBus, NatsBus};
use rampart_core::config::SimulationConfig;
use rampart_core::types::SimClock;
use rampart_store::{PgStore, Store};

#[derive(Parser)]
#[command(name = "rampart", about = "Distributed missile-defense simulation services")]
struct Cli {
    /// Postgres DSN for the shared spatial database.
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// NATS server for the event bus.
    #[arg(long, env = "NATS_URL", default_value = "nats://127.0.0.1:4222")]
    nats_url: String,

    /// Detection sampling seed.
    #[arg(long, env = "RAMPART_SEED")]
    seed: Option<u64>,

    #[command(subcommand)]
    service: Service,
}

#[derive(Subcommand)]
enum Service {
    /// Physics engine: munition integration, intercepts, outcomes.
    Engine,
    /// Radar subsystem: probabilistic detection and tracks.
    Radar,
    /// Command center: threat assessment and engagement orders.
    Command,
    /// One battery controller.
    Battery {
        /// Installation callsign this controller owns.
        #[arg(long)]
        callsign: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let store: Arc<dyn Store> = Arc::new(PgStore::connect(&cli.database_url).await?);
    let bus: Arc<dyn EventBus> = Arc::new(NatsBus::connect(&cli.nats_url).await?);
    let clock = SimClock::wall();

    let kv = store.load_config().await?;
    let mut config = SimulationConfig::from_kv(&kv);
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    info!(tick_ms = config.tick_ms, "configuration loaded");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    match cli.service {
        Service::Engine => {
            let engine = rampart_engine::SimulationEngine::new(
                store,
                bus.clone(),
                clock,
                config.tick_secs(),
            );
            rampart_engine::service::run(engine, bus, config.tick_ms, shutdown_rx).await?;
        }
        Service::Radar => {
            let service =
                rampart_radar::RadarService::load(store, bus, clock, &config).await?;
            service.run(shutdown_rx).await?;
        }
        Service::Command => {
            let center =
                rampart_command::CommandCenter::load(store, bus, clock, config).await?;
            center.run(shutdown_rx).await?;
        }
        Service::Battery { callsign } => {
            let service =
                rampart_battery::BatteryService::load(store, bus, clock, &callsign).await?;
            service.run(shutdown_rx).await?;
        }
    }

    Ok(())
}
