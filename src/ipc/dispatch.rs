//! Request dispatcher: decode, invoke one hook, shape the reply.

use std::collections::HashSet;
use std::sync::Arc;

use crate::ipc::frame::{signature_of, Arg, Reply, ReplyBody};
use crate::ipc::method::Method;
use crate::provider::{ResultMeta, SearchProvider};
use crate::types::{Error, ResultId, Result, SearchTerms};

/// A method call whose arguments matched the method's signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    InitialResultSet {
        terms: SearchTerms,
    },
    SubsearchResultSet {
        previous_results: Vec<ResultId>,
        terms: SearchTerms,
    },
    ResultMetas {
        results: Vec<ResultId>,
    },
    LaunchSearch {
        terms: SearchTerms,
        timestamp: u32,
    },
    ActivateResult {
        result: ResultId,
        terms: SearchTerms,
        timestamp: u32,
    },
}

impl Request {
    pub fn method(&self) -> Method {
        match self {
            Request::InitialResultSet { .. } => Method::GetInitialResultSet,
            Request::SubsearchResultSet { .. } => Method::GetSubsearchResultSet,
            Request::ResultMetas { .. } => Method::GetResultMetas,
            Request::LaunchSearch { .. } => Method::LaunchSearch,
            Request::ActivateResult { .. } => Method::ActivateResult,
        }
    }

    /// Terms joined with spaces, for log lines only.
    pub fn joined_terms(&self) -> Option<String> {
        match self {
            Request::InitialResultSet { terms }
            | Request::SubsearchResultSet { terms, .. }
            | Request::LaunchSearch { terms, .. }
            | Request::ActivateResult { terms, .. } => Some(terms.join(" ")),
            Request::ResultMetas { .. } => None,
        }
    }
}

/// Decode positional arguments against the method's fixed signature.
///
/// Fails with `ArgumentShape` on any arity or type mismatch. Strings pass
/// through untouched, empty lists included.
pub fn decode(method: Method, args: Vec<Arg>) -> Result<Request> {
    let got = signature_of(&args);
    if got != method.in_signature() {
        return Err(Error::argument_shape(format!(
            "{} expects ({}), got ({})",
            method,
            method.in_signature(),
            got
        )));
    }

    let mut args = args.into_iter();
    let request = match method {
        Method::GetInitialResultSet => Request::InitialResultSet {
            terms: next_list(&mut args, method)?,
        },
        Method::GetSubsearchResultSet => Request::SubsearchResultSet {
            previous_results: next_list(&mut args, method)?,
            terms: next_list(&mut args, method)?,
        },
        Method::GetResultMetas => Request::ResultMetas {
            results: next_list(&mut args, method)?,
        },
        Method::LaunchSearch => Request::LaunchSearch {
            terms: next_list(&mut args, method)?,
            timestamp: next_u32(&mut args, method)?,
        },
        Method::ActivateResult => Request::ActivateResult {
            result: next_str(&mut args, method)?,
            terms: next_list(&mut args, method)?,
            timestamp: next_u32(&mut args, method)?,
        },
    };
    Ok(request)
}

fn next_list(args: &mut impl Iterator<Item = Arg>, method: Method) -> Result<Vec<String>> {
    match args.next() {
        Some(Arg::StrList(list)) => Ok(list),
        other => Err(shape_mismatch(method, "as", other)),
    }
}

fn next_str(args: &mut impl Iterator<Item = Arg>, method: Method) -> Result<String> {
    match args.next() {
        Some(Arg::Str(s)) => Ok(s),
        other => Err(shape_mismatch(method, "s", other)),
    }
}

fn next_u32(args: &mut impl Iterator<Item = Arg>, method: Method) -> Result<u32> {
    match args.next() {
        Some(Arg::U32(n)) => Ok(n),
        other => Err(shape_mismatch(method, "u", other)),
    }
}

fn shape_mismatch(method: Method, expected: &str, got: Option<Arg>) -> Error {
    let got = got.map(|a| a.signature().to_string()).unwrap_or_default();
    Error::argument_shape(format!("{method}: expected {expected}, got {got:?}"))
}

/// Routes decoded requests to the application's hooks.
///
/// Cheap to clone; each in-flight invocation carries its own copy.
#[derive(Clone)]
pub struct Dispatcher {
    provider: Arc<dyn SearchProvider>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self { provider }
    }

    /// Invoke exactly one hook and encode its outcome as a reply.
    ///
    /// Never fails: hook errors and contract violations become error replies.
    pub async fn dispatch(&self, request: &Request) -> Reply {
        let method = request.method();
        match &request.joined_terms() {
            Some(terms) => tracing::debug!(%method, terms = %terms, "dispatching"),
            None => tracing::debug!(%method, "dispatching"),
        }

        match self.invoke(request).await {
            Ok(body) => Reply::Return(body),
            Err(e) => {
                tracing::warn!(%method, error = %e, "handler failed");
                Reply::from(e)
            }
        }
    }

    async fn invoke(&self, request: &Request) -> Result<ReplyBody> {
        let provider = &self.provider;
        match request.clone() {
            Request::InitialResultSet { terms } => {
                let ids = provider.initial_result_set(terms).await.map_err(handler_error)?;
                check_unique(Method::GetInitialResultSet, &ids)?;
                Ok(ReplyBody::Identifiers(ids))
            }
            Request::SubsearchResultSet {
                previous_results,
                terms,
            } => {
                let ids = provider
                    .subsearch_result_set(previous_results, terms)
                    .await
                    .map_err(handler_error)?;
                check_unique(Method::GetSubsearchResultSet, &ids)?;
                Ok(ReplyBody::Identifiers(ids))
            }
            Request::ResultMetas { results } => {
                let metas = provider
                    .result_metas(results.clone())
                    .await
                    .map_err(handler_error)?;
                check_aligned(&results, &metas)?;
                Ok(ReplyBody::Metas(metas))
            }
            Request::LaunchSearch { terms, timestamp } => {
                provider
                    .launch_search(terms, timestamp)
                    .await
                    .map_err(handler_error)?;
                Ok(ReplyBody::Void)
            }
            Request::ActivateResult {
                result,
                terms,
                timestamp,
            } => {
                provider
                    .activate_result(result, terms, timestamp)
                    .await
                    .map_err(handler_error)?;
                Ok(ReplyBody::Void)
            }
        }
    }
}

fn handler_error(e: crate::provider::HandlerError) -> Error {
    Error::handler(e.message())
}

/// Result sets must not repeat an identifier.
fn check_unique(method: Method, ids: &[ResultId]) -> Result<()> {
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        if !seen.insert(id.as_str()) {
            return Err(Error::handler(format!(
                "{method} returned duplicate identifier {id:?}"
            )));
        }
    }
    Ok(())
}

/// Metas must answer every requested id, in order, with no extras.
fn check_aligned(requested: &[ResultId], metas: &[ResultMeta]) -> Result<()> {
    if requested.len() != metas.len() {
        return Err(Error::handler(format!(
            "GetResultMetas returned {} metas for {} identifiers",
            metas.len(),
            requested.len()
        )));
    }
    for (i, (id, meta)) in requested.iter().zip(metas).enumerate() {
        if *id != meta.id {
            return Err(Error::handler(format!(
                "GetResultMetas entry {i} is for {:?}, expected {id:?}",
                meta.id
            )));
        }
    }
    Ok(())
}
