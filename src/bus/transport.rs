//! Transport binding contract.
//!
//! The event loop only ever talks to the bus through this trait: it asks for
//! the well-known name, pulls events, and writes replies. Name ownership
//! outcomes arrive as events, never as return values.

use async_trait::async_trait;

use crate::ipc::{CallFrame, Reply};
use crate::types::Result;

/// Something the bus delivered to the service.
#[derive(Debug)]
pub enum BusEvent<T> {
    /// The well-known name is now ours.
    NameAcquired(String),
    /// The well-known name was refused or taken away.
    NameLost(String),
    /// A method call; `target` is the opaque handle the reply goes back to.
    MethodCall { target: T, frame: CallFrame },
}

/// Adapter to the underlying IPC bus.
#[async_trait]
pub trait Transport: Send {
    /// Opaque per-call reply handle.
    type Target: Send + 'static;

    /// Ask for ownership of `name`. The outcome is delivered later as
    /// [`BusEvent::NameAcquired`] or [`BusEvent::NameLost`].
    async fn request_name(&mut self, name: &str) -> Result<()>;

    /// Give `name` back to the bus.
    async fn release_name(&mut self, name: &str) -> Result<()>;

    /// Next event, or `None` once the connection is gone.
    async fn next_event(&mut self) -> Option<BusEvent<Self::Target>>;

    /// Send the one reply for a method call.
    async fn reply(&mut self, target: Self::Target, reply: Reply) -> Result<()>;
}
