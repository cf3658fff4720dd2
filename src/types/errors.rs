//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation and map
//! onto a D-Bus error name when they have to travel back to a caller.

use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Standard D-Bus error names used in error replies.
pub mod names {
    pub const FAILED: &str = "org.freedesktop.DBus.Error.Failed";
    pub const INVALID_ARGS: &str = "org.freedesktop.DBus.Error.InvalidArgs";
    pub const UNKNOWN_METHOD: &str = "org.freedesktop.DBus.Error.UnknownMethod";
    pub const UNKNOWN_OBJECT: &str = "org.freedesktop.DBus.Error.UnknownObject";
    pub const UNKNOWN_INTERFACE: &str = "org.freedesktop.DBus.Error.UnknownInterface";
}

/// Main error enum for the search provider service.
#[derive(Error, Debug)]
pub enum Error {
    /// The session bus connection could not be established (fatal at startup).
    #[error("bus connection error: {0}")]
    BusConnection(String),

    /// The well-known name was lost or never granted.
    #[error("name lost: {0}")]
    NameLost(String),

    /// A method-call frame did not match the method's signature.
    #[error("argument shape error: {0}")]
    ArgumentShape(String),

    /// The embedding application's handler reported a failure or broke the
    /// reply contract.
    #[error("handler error: {0}")]
    Handler(String),

    /// A second export was attempted while one is live.
    #[error("already bound: {0}")]
    AlreadyBound(String),

    /// No object is exported at the called path.
    #[error("unknown object: {0}")]
    UnknownObject(String),

    /// The exported object does not implement the called interface.
    #[error("unknown interface: {0}")]
    UnknownInterface(String),

    /// The called interface has no such member.
    #[error("unknown method: {0}")]
    UnknownMethod(String),

    /// Invalid lifecycle state transition.
    #[error("state transition error: {0}")]
    StateTransition(String),

    /// Validation errors (malformed identity strings and the like).
    #[error("validation error: {0}")]
    Validation(String),

    /// Bus transport errors after startup.
    #[error("bus error: {0}")]
    Bus(#[from] zbus::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// D-Bus error name carried by the error reply for this error.
    pub fn to_dbus_error_name(&self) -> &'static str {
        match self {
            Error::ArgumentShape(_) => names::INVALID_ARGS,
            Error::UnknownMethod(_) => names::UNKNOWN_METHOD,
            Error::UnknownObject(_) => names::UNKNOWN_OBJECT,
            Error::UnknownInterface(_) => names::UNKNOWN_INTERFACE,
            Error::BusConnection(_)
            | Error::NameLost(_)
            | Error::Handler(_)
            | Error::AlreadyBound(_)
            | Error::StateTransition(_)
            | Error::Validation(_)
            | Error::Bus(_)
            | Error::Io(_) => names::FAILED,
        }
    }

    /// Whether this error ends the process rather than a single call.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::BusConnection(_) | Error::AlreadyBound(_))
    }
}

// Convenience constructors
impl Error {
    pub fn bus_connection(msg: impl Into<String>) -> Self {
        Self::BusConnection(msg.into())
    }

    pub fn name_lost(msg: impl Into<String>) -> Self {
        Self::NameLost(msg.into())
    }

    pub fn argument_shape(msg: impl Into<String>) -> Self {
        Self::ArgumentShape(msg.into())
    }

    pub fn handler(msg: impl Into<String>) -> Self {
        Self::Handler(msg.into())
    }

    pub fn already_bound(msg: impl Into<String>) -> Self {
        Self::AlreadyBound(msg.into())
    }

    pub fn unknown_object(msg: impl Into<String>) -> Self {
        Self::UnknownObject(msg.into())
    }

    pub fn unknown_interface(msg: impl Into<String>) -> Self {
        Self::UnknownInterface(msg.into())
    }

    pub fn unknown_method(msg: impl Into<String>) -> Self {
        Self::UnknownMethod(msg.into())
    }

    pub fn state_transition(msg: impl Into<String>) -> Self {
        Self::StateTransition(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
