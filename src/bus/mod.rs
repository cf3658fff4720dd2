//! Bus-facing components: transport binding, name lease and object export.
//!
//! ```text
//!   session bus ──▶ SessionBus (Transport) ──▶ BusEvent queue ──▶ service loop
//!                        ▲                                          │
//!                        └──────────── replies ◀────────────────────┘
//! ```

pub mod exporter;
pub mod lease;
pub mod session;
pub mod transport;

pub use exporter::{ExportHandle, ObjectExporter, Route};
pub use lease::{NameLease, NameLeaseState};
pub use session::SessionBus;
pub use transport::{BusEvent, Transport};
