//! Transport-neutral method-call and reply frames.
//!
//! The bus adapter decodes incoming messages into a [`CallFrame`] of
//! positional [`Arg`]s and encodes a [`Reply`] back onto the wire. Nothing
//! above the adapter sees bus library types.

use crate::provider::ResultMeta;
use crate::types::{Error, ResultId};

/// One positional argument of a method call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    /// `s`
    Str(String),
    /// `as`
    StrList(Vec<String>),
    /// `u`
    U32(u32),
    /// Anything else, kept only by its signature so shape errors can name it.
    Other(String),
}

impl Arg {
    /// D-Bus signature of this argument.
    pub fn signature(&self) -> &str {
        match self {
            Arg::Str(_) => "s",
            Arg::StrList(_) => "as",
            Arg::U32(_) => "u",
            Arg::Other(signature) => signature,
        }
    }
}

/// Concatenated signature of a positional argument list.
pub fn signature_of(args: &[Arg]) -> String {
    args.iter().map(Arg::signature).collect()
}

/// A decoded method-call message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFrame {
    pub path: String,
    /// Method calls may omit the interface.
    pub interface: Option<String>,
    pub member: String,
    pub args: Vec<Arg>,
}

impl CallFrame {
    pub fn new(
        path: impl Into<String>,
        interface: Option<&str>,
        member: impl Into<String>,
        args: Vec<Arg>,
    ) -> Self {
        Self {
            path: path.into(),
            interface: interface.map(str::to_string),
            member: member.into(),
            args,
        }
    }
}

/// Successful reply payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyBody {
    /// `as`
    Identifiers(Vec<ResultId>),
    /// `aa{sv}`
    Metas(Vec<ResultMeta>),
    /// `s` (introspection XML)
    Xml(String),
    /// Empty method return.
    Void,
}

/// Exactly one of these is sent per method call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Return(ReplyBody),
    Error { name: String, message: String },
}

impl Reply {
    pub fn error(name: impl Into<String>, message: impl Into<String>) -> Self {
        Reply::Error {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error { .. })
    }

    /// Error name for error replies.
    pub fn error_name(&self) -> Option<&str> {
        match self {
            Reply::Error { name, .. } => Some(name),
            Reply::Return(_) => None,
        }
    }
}

impl From<Error> for Reply {
    fn from(err: Error) -> Self {
        Reply::error(err.to_dbus_error_name(), err.to_string())
    }
}
