//! Command center error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Bus(#[from] rampart_bus::BusError),

    #[error(transparent)]
    Store(#[from] rampart_store::StoreError),
}
