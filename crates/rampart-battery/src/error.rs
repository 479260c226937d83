//! Battery service error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BatteryError {
    #[error(transparent)]
    Bus(#[from] rampart_bus::BusError),

    #[error(transparent)]
    Store(#[from] rampart_store::StoreError),

    #[error("battery installation `{0}` not found")]
    UnknownBattery(String),
}
