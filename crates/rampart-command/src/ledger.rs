//! Per-target engagement attempt ledger.
//!
//! Enforces the retry cap: no target ever receives more than `max_retries`
//! engagement orders, however it comes back around.

use std::collections::HashMap;

use rampart_core::types::MissileId;

#[derive(Debug, Clone)]
pub struct Attempt {
    pub battery_callsign: String,
    pub timestamp: f64,
    pub probability: f64,
    /// Filled when a failure result comes back.
    pub failure_reason: Option<String>,
}

#[derive(Debug, Default)]
pub struct AttemptLedger {
    attempts: HashMap<MissileId, Vec<Attempt>>,
}

impl AttemptLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, target: MissileId) -> usize {
        self.attempts.get(&target).map_or(0, Vec::len)
    }

    pub fn can_attempt(&self, target: MissileId, max_retries: u32) -> bool {
        self.count(target) < max_retries as usize
    }

    pub fn record(&mut self, target: MissileId, attempt: Attempt) {
        self.attempts.entry(target).or_default().push(attempt);
    }

    /// Note the failure reason on the most recent attempt.
    pub fn record_failure(&mut self, target: MissileId, reason: &str) {
        if let Some(attempt) = self
            .attempts
            .get_mut(&target)
            .and_then(|attempts| attempts.last_mut())
        {
            attempt.failure_reason = Some(reason.to_string());
        }
    }

    /// Forget a target entirely (intercept confirmed or threat expired).
    pub fn clear(&mut self, target: MissileId) {
        self.attempts.remove(&target);
    }
}
