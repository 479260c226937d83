//! Simulation engine for RAMPART.
//!
//! Owns every in-flight munition, advances physics at a fixed tick,
//! detects intercepts and impacts, records outcomes, and publishes the
//! position stream. Completely headless: the async service wrapper in
//! [`service`] is a thin pacing loop, so tests drive [`SimulationEngine`]
//! tick by tick with a manual clock.

pub mod constants;
pub mod engine;
pub mod error;
pub mod munition;
pub mod physics;
pub mod service;

pub use engine::SimulationEngine;
pub use error::EngineError;

#[cfg(test)]
mod tests;
