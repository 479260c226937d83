//! Engine error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Bus(#[from] rampart_bus::BusError),

    #[error(transparent)]
    Store(#[from] rampart_store::StoreError),
}
