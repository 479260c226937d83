//! Radar service error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RadarError {
    #[error(transparent)]
    Bus(#[from] rampart_bus::BusError),

    #[error(transparent)]
    Store(#[from] rampart_store::StoreError),

    #[error("no active radar installations")]
    NoInstallations,
}
