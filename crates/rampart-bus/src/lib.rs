//! Event bus for RAMPART services.
//!
//! Defines the publish/subscribe contract (`EventBus`), an in-process
//! implementation used by tests and single-process runs, and a NATS-backed
//! implementation for distributed deployments. Delivery is at-most-once;
//! messages published by one producer on one subject arrive at each
//! subscriber in publish order.

pub mod error;
pub mod in_process;
pub mod nats;
pub mod traits;

pub use error::BusError;
pub use in_process::InProcessBus;
pub use nats::NatsBus;
pub use traits::{BusMessage, EventBus, EventBusExt, Subscription};
