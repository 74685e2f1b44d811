//! Newtype identifiers for every addressable entity in a config.
//!
//! All of these are plain `lowercase_name` strings on the wire (see the
//! normalized schema in spec §6); wrapping them keeps `HashMap<HostId, _>`
//! from being confused with `HashMap<NodeId, _>` at the type level.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(HostId);
string_id!(ProcessId);
string_id!(NodeId);
string_id!(DataTypeId);
string_id!(RequirementId);
string_id!(RoleId);
string_id!(EdgeId);
