//! The battery readiness state machine.
//!
//! Pure state: all I/O (launch publication, ammo transactions, result
//! reporting) happens in the service layer, driven by the actions this
//! controller emits. That keeps the transition rules directly testable
//! against a virtual clock.

use std::collections::VecDeque;
use std::fmt;

use rampart_core::catalog::Installation;
use rampart_core::constants::BATTERY_PREPARE_SECS;
use rampart_core::enums::BatteryState;
use rampart_core::messages::EngagementOrder;
use rampart_core::types::GeoPos;

/// Why an order was turned down. The state stays `Ready` in every case.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    NoAmmo,
    OutOfRange { distance_m: f64, max_range_m: f64 },
    AboveAltitude { altitude_m: f64, max_altitude_m: f64 },
    StillReloading { remaining_s: f64 },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAmmo => write!(f, "no ammunition"),
            Self::OutOfRange {
                distance_m,
                max_range_m,
            } => write!(f, "intercept {distance_m:.0}m beyond range {max_range_m:.0}m"),
            Self::AboveAltitude {
                altitude_m,
                max_altitude_m,
            } => write!(
                f,
                "intercept altitude {altitude_m:.0}m above ceiling {max_altitude_m:.0}m"
            ),
            Self::StillReloading { remaining_s } => {
                write!(f, "reloading for another {remaining_s:.1}s")
            }
        }
    }
}

/// Side effects for the service layer to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum BatteryAction {
    /// The preparing delay elapsed: fire at this order's target.
    Launch(EngagementOrder),
    /// An order was rejected; report the failure.
    Reject {
        order: EngagementOrder,
        reason: RejectReason,
    },
}

pub struct BatteryController {
    callsign: String,
    position: GeoPos,
    platform_nickname: String,
    max_range_m: f64,
    max_altitude_m: f64,
    reload_time_sec: f64,
    blast_radius_m: f64,
    state: BatteryState,
    state_since: f64,
    ammo_count: i64,
    /// Timestamp of the last launch; seeded far in the past so a fresh
    /// battery is not "reloading".
    last_launch: f64,
    current: Option<EngagementOrder>,
    queue: VecDeque<EngagementOrder>,
}

impl BatteryController {
    pub fn new(installation: &Installation, now: f64) -> Self {
        let platform = &installation.platform;
        Self {
            callsign: installation.callsign.clone(),
            position: installation.position,
            platform_nickname: platform.nickname.clone(),
            max_range_m: platform.max_range_m,
            max_altitude_m: platform.max_altitude_m,
            reload_time_sec: platform.reload_time_sec,
            blast_radius_m: platform.blast_radius_m,
            state: BatteryState::Ready,
            state_since: now,
            ammo_count: installation.ammo_count,
            last_launch: now - platform.reload_time_sec,
            current: None,
            queue: VecDeque::new(),
        }
    }

    pub fn callsign(&self) -> &str {
        &self.callsign
    }

    pub fn position(&self) -> GeoPos {
        self.position
    }

    pub fn platform_nickname(&self) -> &str {
        &self.platform_nickname
    }

    pub fn blast_radius_m(&self) -> f64 {
        self.blast_radius_m
    }

    pub fn state(&self) -> BatteryState {
        self.state
    }

    pub fn ammo_count(&self) -> i64 {
        self.ammo_count
    }

    pub fn set_ammo_count(&mut self, ammo: i64) {
        self.ammo_count = ammo;
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// An engage order arrived on the mailbox.
    ///
    /// While not `Ready` the order queues (duplicates for a target already
    /// queued or in hand are discarded). When `Ready`, the gate runs
    /// immediately: pass starts the 5-second preparing delay, fail emits a
    /// rejection and stays `Ready`.
    pub fn submit(&mut self, order: EngagementOrder, now: f64) -> Option<BatteryAction> {
        if self.state != BatteryState::Ready {
            let duplicate = self
                .queue
                .iter()
                .chain(self.current.as_ref())
                .any(|queued| queued.target_missile_id == order.target_missile_id);
            if !duplicate {
                self.queue.push_back(order);
            }
            return None;
        }
        self.try_accept(order, now)
    }

    /// Advance timed transitions. Call at the service tick.
    pub fn tick(&mut self, now: f64) -> Vec<BatteryAction> {
        let mut actions = Vec::new();
        match self.state {
            BatteryState::Preparing => {
                if now - self.state_since >= BATTERY_PREPARE_SECS {
                    self.state = BatteryState::Launching;
                    self.state_since = now;
                    if let Some(order) = self.current.clone() {
                        actions.push(BatteryAction::Launch(order));
                    }
                }
            }
            BatteryState::Reloading => {
                if now - self.last_launch >= self.reload_time_sec {
                    self.state = BatteryState::Ready;
                    self.state_since = now;
                    self.current = None;
                    // Work the queue now that we can fire again.
                    if let Some(order) = self.queue.pop_front() {
                        if let Some(action) = self.try_accept(order, now) {
                            actions.push(action);
                        }
                    }
                }
            }
            BatteryState::Ready => {
                if let Some(order) = self.queue.pop_front() {
                    if let Some(action) = self.try_accept(order, now) {
                        actions.push(action);
                    }
                }
            }
            BatteryState::Launching => {}
        }
        actions
    }

    /// The service confirmed the launch was issued (message published and
    /// ammo decremented): move to reloading.
    pub fn confirm_launch(&mut self, now: f64) {
        self.last_launch = now;
        self.ammo_count -= 1;
        self.state = BatteryState::Reloading;
        self.state_since = now;
    }

    /// The launch could not be issued (e.g. the ammo transaction failed):
    /// give up on the order and return to ready.
    pub fn abort_launch(&mut self, now: f64) {
        self.state = BatteryState::Ready;
        self.state_since = now;
        self.current = None;
    }

    /// Gate an order while `Ready`: ammo, envelope, reload clock.
    fn try_accept(&mut self, order: EngagementOrder, now: f64) -> Option<BatteryAction> {
        if let Some(reason) = self.check_order(&order, now) {
            return Some(BatteryAction::Reject { order, reason });
        }
        self.state = BatteryState::Preparing;
        self.state_since = now;
        self.current = Some(order);
        None
    }

    fn check_order(&self, order: &EngagementOrder, now: f64) -> Option<RejectReason> {
        if self.ammo_count <= 0 {
            return Some(RejectReason::NoAmmo);
        }
        let since_launch = now - self.last_launch;
        if since_launch < self.reload_time_sec {
            return Some(RejectReason::StillReloading {
                remaining_s: self.reload_time_sec - since_launch,
            });
        }
        let intercept: GeoPos = order.intercept_point.into();
        let distance = self.position.distance_m(&intercept);
        if distance > self.max_range_m {
            return Some(RejectReason::OutOfRange {
                distance_m: distance,
                max_range_m: self.max_range_m,
            });
        }
        if order.intercept_altitude > self.max_altitude_m {
            return Some(RejectReason::AboveAltitude {
                altitude_m: order.intercept_altitude,
                max_altitude_m: self.max_altitude_m,
            });
        }
        None
    }
}
