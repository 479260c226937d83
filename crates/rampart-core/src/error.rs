//! Validation errors shared by the store and the services.
//!
//! These report bad input without mutating state; infrastructure errors live
//! in the crate that owns the resource.

use thiserror::Error;

use crate::enums::PlatformCategory;
use crate::types::MissileId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("unknown platform `{0}`")]
    UnknownPlatform(String),

    #[error("unknown installation `{0}`")]
    UnknownInstallation(String),

    #[error("installation `{0}` already exists")]
    DuplicateCallsign(String),

    #[error("platform `{nickname}` is not in category {expected:?}")]
    WrongCategory {
        nickname: String,
        expected: PlatformCategory,
    },

    #[error("battery `{0}` has no ammunition")]
    InsufficientAmmo(String),

    #[error("unknown missile {0}")]
    UnknownMissile(MissileId),
}
