//! Well-known name lease.
//!
//! State machine: UNOWNED → ACQUIRED → LOST, with UNOWNED → LOST when the
//! bus refuses the request. LOST is terminal; the process exits instead of
//! re-requesting.

use crate::bus::transport::Transport;
use crate::types::Result;

/// Ownership state of the well-known name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameLeaseState {
    Unowned,
    Acquired,
    Lost,
}

impl NameLeaseState {
    /// Check if transition is valid.
    pub fn can_transition_to(self, to: NameLeaseState) -> bool {
        matches!(
            (self, to),
            (NameLeaseState::Unowned, NameLeaseState::Acquired)
                | (NameLeaseState::Unowned, NameLeaseState::Lost)
                | (NameLeaseState::Acquired, NameLeaseState::Lost)
                // graceful release
                | (NameLeaseState::Acquired, NameLeaseState::Unowned)
        )
    }
}

/// Owns the name's state. Transitions only happen in response to bus events.
#[derive(Debug)]
pub struct NameLease {
    name: String,
    state: NameLeaseState,
    requested: bool,
}

impl NameLease {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: NameLeaseState::Unowned,
            requested: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> NameLeaseState {
        self.state
    }

    pub fn is_acquired(&self) -> bool {
        self.state == NameLeaseState::Acquired
    }

    /// Request the name. Returns once the request is issued.
    pub async fn acquire<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<()> {
        if self.requested {
            tracing::debug!(name = %self.name, "name already requested");
            return Ok(());
        }
        self.requested = true;
        tracing::debug!(name = %self.name, "requesting well-known name");
        transport.request_name(&self.name).await
    }

    /// Bus says the name is ours. Returns true when this is a fresh
    /// acquisition the caller should act on.
    pub fn on_acquired(&mut self, name: &str) -> bool {
        if name != self.name || !self.state.can_transition_to(NameLeaseState::Acquired) {
            return false;
        }
        self.state = NameLeaseState::Acquired;
        tracing::info!("Search provider name acquired: {}", self.name);
        true
    }

    /// Bus says the name is gone (refused or preempted). Returns true on the
    /// first loss; the caller must unexport before discarding its handle.
    pub fn on_lost(&mut self, name: &str) -> bool {
        if name != self.name || !self.state.can_transition_to(NameLeaseState::Lost) {
            return false;
        }
        self.state = NameLeaseState::Lost;
        tracing::info!("Search provider name lost: {}", self.name);
        true
    }

    /// Give the name back during teardown. No-op unless currently owned.
    pub async fn release<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<()> {
        if !self.is_acquired() {
            return Ok(());
        }
        self.state = NameLeaseState::Unowned;
        tracing::debug!(name = %self.name, "releasing well-known name");
        transport.release_name(&self.name).await
    }
}
