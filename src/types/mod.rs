//! Core types for the search provider service.
//!
//! This module provides foundational types used throughout the system:
//! - **IDs**: invocation identifiers and the result/term aliases
//! - **Errors**: Application error types with thiserror derives
//! - **Config**: Configuration loaded from the environment
//! - **Identity**: the fixed bus name, object path and interface

mod config;
mod errors;
mod identity;
mod ids;

pub use config::{
    Config, ObservabilityConfig, ServiceConfig, INACTIVITY_TIMEOUT, LOG_FORMAT_ENV, PERSIST_ENV,
};
pub use errors::{names as error_names, Error, Result};
pub use identity::{ServiceIdentity, DEFAULT_BUS_NAME, DEFAULT_INTERFACE, DEFAULT_OBJECT_PATH};
pub use ids::{InvocationId, ResultId, SearchTerms};
