//! Reference provider that only logs what the shell asks for.

use async_trait::async_trait;

use super::{HandlerResult, ResultMeta, SearchProvider};
use crate::types::{ResultId, SearchTerms};

/// Logs every call and returns empty result sets.
///
/// Useful for wiring up a new provider against a running shell before any
/// real search backend exists.
#[derive(Debug, Default, Clone)]
pub struct LoggingProvider;

impl LoggingProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SearchProvider for LoggingProvider {
    async fn initial_result_set(&self, terms: SearchTerms) -> HandlerResult<Vec<ResultId>> {
        tracing::info!("GetInitialResultSet() called with {}", terms.join(" "));
        Ok(Vec::new())
    }

    async fn subsearch_result_set(
        &self,
        previous_results: Vec<ResultId>,
        terms: SearchTerms,
    ) -> HandlerResult<Vec<ResultId>> {
        tracing::info!(
            previous = previous_results.len(),
            "GetSubsearchResultSet() called with {}",
            terms.join(" ")
        );
        Ok(Vec::new())
    }

    async fn result_metas(&self, results: Vec<ResultId>) -> HandlerResult<Vec<ResultMeta>> {
        tracing::info!("GetResultMetas() called for {} results", results.len());
        for id in &results {
            tracing::info!("   {}", id);
        }
        Ok(results
            .into_iter()
            .map(|id| {
                let name = id.clone();
                ResultMeta::new(id, name)
            })
            .collect())
    }

    async fn launch_search(&self, terms: SearchTerms, timestamp: u32) -> HandlerResult<()> {
        tracing::info!(timestamp, "LaunchSearch() called with {}", terms.join(" "));
        Ok(())
    }

    async fn activate_result(
        &self,
        result: ResultId,
        terms: SearchTerms,
        timestamp: u32,
    ) -> HandlerResult<()> {
        tracing::info!(
            timestamp,
            "ActivateResult() called for {} and result {}",
            terms.join(" "),
            result
        );
        Ok(())
    }
}
