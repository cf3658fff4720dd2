//! The five provider methods and their fixed signatures.

use std::fmt;

/// Method table of the search provider interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    GetInitialResultSet,
    GetSubsearchResultSet,
    GetResultMetas,
    LaunchSearch,
    ActivateResult,
}

impl Method {
    pub const ALL: [Method; 5] = [
        Method::GetInitialResultSet,
        Method::GetSubsearchResultSet,
        Method::GetResultMetas,
        Method::ActivateResult,
        Method::LaunchSearch,
    ];

    /// Look up a method by its wire member name (case-sensitive).
    pub fn from_member(member: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == member)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Method::GetInitialResultSet => "GetInitialResultSet",
            Method::GetSubsearchResultSet => "GetSubsearchResultSet",
            Method::GetResultMetas => "GetResultMetas",
            Method::LaunchSearch => "LaunchSearch",
            Method::ActivateResult => "ActivateResult",
        }
    }

    /// Input signature, concatenated.
    pub fn in_signature(self) -> &'static str {
        match self {
            Method::GetInitialResultSet => "as",
            Method::GetSubsearchResultSet => "asas",
            Method::GetResultMetas => "as",
            Method::LaunchSearch => "asu",
            Method::ActivateResult => "sasu",
        }
    }

    /// Named input arguments, for introspection.
    pub fn in_args(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Method::GetInitialResultSet => &[("terms", "as")],
            Method::GetSubsearchResultSet => &[("previous_results", "as"), ("terms", "as")],
            Method::GetResultMetas => &[("identifiers", "as")],
            Method::LaunchSearch => &[("terms", "as"), ("timestamp", "u")],
            Method::ActivateResult => &[("identifier", "s"), ("terms", "as"), ("timestamp", "u")],
        }
    }

    /// Named output arguments, for introspection.
    pub fn out_args(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Method::GetInitialResultSet | Method::GetSubsearchResultSet => &[("results", "as")],
            Method::GetResultMetas => &[("metas", "aa{sv}")],
            Method::LaunchSearch | Method::ActivateResult => &[],
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
