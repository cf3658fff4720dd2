//! Request dispatch for the search provider interface.
//!
//! Method-call frames arrive from the bus adapter, are decoded against the
//! method table, and become [`PendingInvocation`]s whose replies flow back to
//! the event loop.

pub mod dispatch;
pub mod frame;
pub mod method;
pub mod pending;

pub use dispatch::{decode, Dispatcher, Request};
pub use frame::{Arg, CallFrame, Reply, ReplyBody};
pub use method::Method;
pub use pending::{Completion, PendingInvocation};
