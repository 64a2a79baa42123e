// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ID generation abstractions.
//!
//! Mirrors `define_id!` in spirit: a fixed-prefix nanoid wrapper with
//! `Display`/`serde` support, used for values that need a short, random,
//! human-greppable identifier (e.g. a WebSocket connection).

/// Define a newtype ID wrapper around a nanoid string with a type prefix.
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident($prefix:literal);
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            pub fn new() -> Self {
                Self(format!("{}{}", Self::PREFIX, nanoid::nanoid!(12)))
            }

            pub fn from_string(id: impl Into<String>) -> Self {
                Self(id.into())
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

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

crate::define_id! {
    /// Identifies one accepted WebSocket connection, for broker-internal bookkeeping.
    pub struct ConnectionId("ws-");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_id_carries_prefix() {
        let id = ConnectionId::new();
        assert!(id.as_str().starts_with("ws-"));
    }

    #[test]
    fn connection_ids_are_unique() {
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }
}
