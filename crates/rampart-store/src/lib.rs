//! Persistence layer over the shared PostGIS database.
//!
//! The [`Store`] trait is the only surface the services see. `PgStore` is
//! the production implementation (sqlx/Postgres, geography columns);
//! `MemStore` backs tests and single-process demo runs while enforcing the
//! same invariants (unique callsigns, non-negative ammunition, insert-once
//! outcomes).

pub mod error;
pub mod mem;
pub mod pg;
pub mod records;
pub mod traits;

pub use error::StoreError;
pub use mem::MemStore;
pub use pg::{connect_with_retry, PgStore};
pub use records::{BatteryStatusRow, DetectionRecord, EngagementAttemptRecord};
pub use traits::Store;
