//! Application hooks behind the five search provider methods.
//!
//! The service core never ranks, indexes or renders anything. The embedding
//! application implements [`SearchProvider`]; the dispatcher decodes calls,
//! invokes exactly one hook and shapes the reply.

mod logging;

pub use logging::LoggingProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{ResultId, SearchTerms};

/// Failure reported by an application hook.
///
/// The dispatcher turns it into a `Failed` error reply; it never brings the
/// service down.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct HandlerError(String);

impl HandlerError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Result type for application hooks.
pub type HandlerResult<T> = std::result::Result<T, HandlerError>;

/// Display metadata for one result.
///
/// On the wire this is an `a{sv}` dictionary with string values under the keys
/// `id`, `name`, and optionally `description` and `icon`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultMeta {
    pub id: ResultId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Themed icon name or file path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl ResultMeta {
    pub fn new(id: impl Into<ResultId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            icon: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Key/value pairs in wire order; absent optional keys are omitted.
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        let mut entries = vec![("id", self.id.as_str()), ("name", self.name.as_str())];
        if let Some(description) = &self.description {
            entries.push(("description", description.as_str()));
        }
        if let Some(icon) = &self.icon {
            entries.push(("icon", icon.as_str()));
        }
        entries
    }
}

/// Handler table for the five provider methods.
///
/// Hooks run on the service's event-loop thread: long work must be awaited,
/// never blocked on. Every hook gets its arguments exactly as the shell sent
/// them.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// First query of a search session. Returned identifiers must be unique.
    async fn initial_result_set(&self, terms: SearchTerms) -> HandlerResult<Vec<ResultId>>;

    /// Refines a previous result set as the user keeps typing.
    async fn subsearch_result_set(
        &self,
        previous_results: Vec<ResultId>,
        terms: SearchTerms,
    ) -> HandlerResult<Vec<ResultId>>;

    /// Metadata for each requested identifier, same order and length, one
    /// entry per input even when the identifier is unknown or repeated.
    async fn result_metas(&self, results: Vec<ResultId>) -> HandlerResult<Vec<ResultMeta>>;

    /// Open the application's own search UI for `terms`.
    async fn launch_search(&self, terms: SearchTerms, timestamp: u32) -> HandlerResult<()>;

    /// Open one result.
    async fn activate_result(
        &self,
        result: ResultId,
        terms: SearchTerms,
        timestamp: u32,
    ) -> HandlerResult<()>;
}
