//! # Search Provider - session-bus search provider service
//!
//! Rust implementation of a desktop-shell search provider:
//! - Transport binding to the session bus (zbus)
//! - Well-known name lease with acquired/lost tracking
//! - Single export of the provider interface at a fixed object path
//! - Request dispatch for the five provider methods with exactly-once replies
//! - Idle-timeout lifecycle with hold/release and a persistent mode
//!
//! ## Architecture
//!
//! One event loop owns every component and all mutable state:
//! ```text
//!                    ┌─────────────────────────────────┐
//!   bus events   →   │    SearchProviderService        │
//!                    │  ┌─────────┐ ┌─────────┐        │
//!                    │  │  Name   │ │ Object  │        │
//!                    │  │  Lease  │ │Exporter │        │
//!                    │  └─────────┘ └─────────┘        │
//!                    │  ┌─────────┐ ┌─────────┐        │
//!                    │  │Lifecycle│ │Dispatch-│  ──▶ SearchProvider
//!                    │  │  Ctrl   │ │   er    │        │
//!                    │  └─────────┘ └─────────┘        │
//!                    └─────────────────────────────────┘
//! ```

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

pub mod bus;
pub mod ipc;
pub mod provider;
pub mod service;
pub mod types;

// Internal utilities
pub mod observability;

pub use provider::{LoggingProvider, SearchProvider};
pub use service::{ExitReason, SearchProviderService, ServiceHandle};
pub use types::{Config, Error, Result};
