//! Radar subsystem for RAMPART.
//!
//! Consumes the engine's position stream and, per radar installation,
//! probabilistically emits detection events subject to range, altitude, and
//! scan-schedule constraints. Maintains ephemeral tracks that expire after
//! 30 seconds without updates. The subsystem never removes munitions; that
//! is the engine's exclusive responsibility.

pub mod error;
pub mod service;
pub mod site;
pub mod tracks;

pub use error::RadarError;
pub use service::RadarService;
pub use site::RadarSite;
pub use tracks::{Track, TrackTable};

#[cfg(test)]
mod tests;
