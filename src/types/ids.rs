//! Strongly-typed identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to define a UUID-backed ID newtype wrapper.
///
/// Generates: struct, `new()` (UUID v4), `as_str()`, Default, Display.
macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(InvocationId);

/// Opaque identifier of one search result, chosen by the embedding application.
pub type ResultId = String;

/// Ordered search terms as sent by the shell. An empty list is a valid query.
pub type SearchTerms = Vec<String>;
