//! Service lifecycle management.
//!
//! Implements the idle-timeout state machine:
//! STARTING → ACTIVE ⇄ IDLE → TERMINATING
//!
//! The deadline only runs while nothing holds the service and no invocation
//! is in flight.

use std::time::Duration;
use tokio::time::Instant;

use crate::types::{Error, Result};

/// Lifecycle state of the whole service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Starting,
    Active,
    Idle,
    Terminating,
}

impl LifecycleState {
    /// Check if this is a terminal state.
    pub fn is_terminal(self) -> bool {
        self == LifecycleState::Terminating
    }

    /// Check if transition is valid.
    pub fn can_transition_to(self, to: LifecycleState) -> bool {
        match (self, to) {
            (LifecycleState::Starting, LifecycleState::Active) => true,
            (LifecycleState::Active, LifecycleState::Idle) => true,
            (LifecycleState::Idle, LifecycleState::Active) => true,
            (LifecycleState::Idle, LifecycleState::Terminating) => true,
            // External shutdown (signal, disconnect) skips the idle state.
            (LifecycleState::Starting, LifecycleState::Terminating) => true,
            (LifecycleState::Active, LifecycleState::Terminating) => true,
            // TERMINATING is terminal
            _ => false,
        }
    }
}

/// Lifecycle controller - decides when the process may exit.
///
/// NOT a separate actor - owned by the service loop and called via &mut self.
#[derive(Debug)]
pub struct LifecycleController {
    state: LifecycleState,
    hold_count: u32,
    /// Holds that `release` can never remove (persistent mode).
    floor: u32,
    in_flight: usize,
    timeout: Duration,
    deadline: Instant,
}

impl LifecycleController {
    pub fn new(timeout: Duration) -> Self {
        Self {
            state: LifecycleState::Starting,
            hold_count: 0,
            floor: 0,
            in_flight: 0,
            timeout,
            deadline: Instant::now() + timeout,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn hold_count(&self) -> u32 {
        self.hold_count
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn transition(&mut self, to: LifecycleState) -> Result<()> {
        if !self.state.can_transition_to(to) {
            return Err(Error::state_transition(format!(
                "cannot move lifecycle from {:?} to {:?}",
                self.state, to
            )));
        }
        tracing::debug!(from = ?self.state, to = ?to, "lifecycle transition");
        self.state = to;
        Ok(())
    }

    /// Bootstrap finished: STARTING → ACTIVE, deadline starts now.
    pub fn start(&mut self, now: Instant) -> Result<()> {
        self.transition(LifecycleState::Active)?;
        self.deadline = now + self.timeout;
        Ok(())
    }

    /// Any activity pushes the deadline out and wakes an idle service.
    fn touch(&mut self, now: Instant) {
        self.deadline = now + self.timeout;
        if self.state == LifecycleState::Idle {
            // Idle → Active is always valid.
            self.state = LifecycleState::Active;
            tracing::debug!("lifecycle woke from idle");
        }
    }

    /// Explicit hold: suppresses the timer until released.
    pub fn hold(&mut self, now: Instant) {
        self.hold_count += 1;
        self.touch(now);
    }

    /// Permanent hold for persistent mode: raises the floor `release`
    /// cannot go below.
    pub fn pin(&mut self, now: Instant) {
        self.floor += 1;
        self.hold(now);
    }

    pub fn is_pinned(&self) -> bool {
        self.floor > 0
    }

    /// Release one hold, floored at the pinned count. Timer behavior resumes
    /// from `now` once the count reaches zero.
    pub fn release(&mut self, now: Instant) {
        if self.hold_count <= self.floor {
            tracing::warn!(floor = self.floor, "release without a matching hold");
            return;
        }
        self.hold_count -= 1;
        self.touch(now);
    }

    /// A new invocation was accepted.
    pub fn invocation_started(&mut self, now: Instant) {
        self.in_flight += 1;
        self.touch(now);
    }

    /// An invocation's reply went out.
    pub fn invocation_finished(&mut self, now: Instant) {
        self.in_flight = self.in_flight.saturating_sub(1);
        if !self.state.is_terminal() {
            self.touch(now);
        }
    }

    /// When the timer would fire, or `None` while held, busy, or not active.
    pub fn deadline(&self) -> Option<Instant> {
        let armed = self.state == LifecycleState::Active && self.hold_count == 0 && self.in_flight == 0;
        armed.then_some(self.deadline)
    }

    /// ACTIVE → IDLE once the deadline has passed. Returns true exactly once
    /// per idle period.
    pub fn check_expiry(&mut self, now: Instant) -> bool {
        match self.deadline() {
            Some(deadline) if now >= deadline => {
                // Active → Idle is always valid.
                self.state = LifecycleState::Idle;
                tracing::info!(timeout = ?self.timeout, "inactivity timeout elapsed");
                true
            }
            _ => false,
        }
    }

    /// Enter TERMINATING. Valid from every state except TERMINATING itself.
    pub fn terminate(&mut self) -> Result<()> {
        self.transition(LifecycleState::Terminating)
    }
}
