//! Battery controller for RAMPART.
//!
//! One logical instance per counter-defense installation: a readiness state
//! machine with a mailbox on `battery.<callsign>.engage`. Accepted orders
//! walk `Ready -> Preparing -> Launching -> Reloading -> Ready`; rejected
//! orders leave the state untouched and report a failure result.

pub mod controller;
pub mod error;
pub mod service;

pub use controller::{BatteryAction, BatteryController, RejectReason};
pub use error::BatteryError;
pub use service::BatteryService;
