//! Core types and definitions for the RAMPART missile-defense simulation.
//!
//! This crate defines the vocabulary shared across all services: geometry,
//! domain enums, the platform/installation catalog, bus message schemas,
//! subject names, and configuration. It has no dependency on the runtime,
//! the bus, or the database.

pub mod catalog;
pub mod config;
pub mod constants;
pub mod enums;
pub mod error;
pub mod messages;
pub mod subjects;
pub mod types;

#[cfg(test)]
mod tests;
