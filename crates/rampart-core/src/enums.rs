//! Enumeration types used throughout the simulation.
//!
//! Serialized forms match the wire and database contract (snake_case).

use serde::{Deserialize, Serialize};

/// Catalog category of a platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformCategory {
    /// Offensive launcher (submarine, silo, mobile TEL).
    Attack,
    /// Defensive interceptor battery.
    CounterDefense,
    /// Radar installation.
    DetectionSystem,
}

impl PlatformCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Attack => "attack",
            Self::CounterDefense => "counter_defense",
            Self::DetectionSystem => "detection_system",
        }
    }
}

/// Whether a munition is an attack missile or a defensive interceptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissileKind {
    #[default]
    Attack,
    Defense,
}

impl MissileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Attack => "attack",
            Self::Defense => "defense",
        }
    }
}

/// Lifecycle state of a munition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissileStatus {
    #[default]
    Active,
    Impacted,
    Intercepted,
    FuelExhausted,
    Destroyed,
}

impl MissileStatus {
    /// A terminal status removes the munition from the live map once its
    /// outcome is recorded.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

/// Durable outcome classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// Warhead detonated (at target, or interceptor at its quarry).
    Detonated,
    /// Ran dry before any other terminal condition.
    FuelExhaustion,
    /// Hit the ground or sea floor away from the target.
    GroundImpact,
    /// Destroyed by a defensive interceptor.
    Intercepted,
}

impl OutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Detonated => "detonated",
            Self::FuelExhaustion => "fuel_exhaustion",
            Self::GroundImpact => "ground_impact",
            Self::Intercepted => "intercepted",
        }
    }
}

/// Installation operational status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallationStatus {
    #[default]
    Active,
    Disabled,
}

/// Threat priority assigned by the command center.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl ThreatLevel {
    /// High and critical threats are eligible for engagement.
    pub fn warrants_engagement(&self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }
}

/// Battery readiness state machine.
///
/// `Ready -> Preparing -> Launching -> Reloading -> Ready` is the only
/// forward path; a rejected order leaves the state unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatteryState {
    #[default]
    Ready,
    Preparing,
    Launching,
    Reloading,
}
