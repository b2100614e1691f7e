//! Opaque, server-assigned identifiers.
//!
//! The roster service hands out ids as either JSON strings or integers
//! depending on the endpoint, so every id is stored as its string form and
//! accepts both shapes when deserialized.

use std::fmt;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw.to_string())
            }
        }

        #[cfg(feature = "serde")]
        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(&self.0)
            }
        }

        #[cfg(feature = "serde")]
        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                deserializer
                    .deserialize_any(serde_support::OpaqueIdVisitor)
                    .map(Self)
            }
        }
    };
}

opaque_id!(
    /// Identifier of a registered attendee (an event user on the server).
    AttendeeId
);
opaque_id!(
    /// Identifier of an event.
    EventId
);
opaque_id!(
    /// Identifier of a session area inside an event.
    SessionAreaId
);
opaque_id!(
    /// Identifier of a check-in/check-out gate.
    GateId
);
opaque_id!(AgendaId);
opaque_id!(
    /// Server-side status row that must accompany a check-out request.
    CheckOutStatusId
);

#[cfg(feature = "serde")]
mod serde_support {
    use std::fmt;

    use serde::de::{self, Visitor};

    pub(super) struct OpaqueIdVisitor;

    impl<'de> Visitor<'de> for OpaqueIdVisitor {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string or integer identifier")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            if v.is_empty() {
                return Err(E::invalid_value(de::Unexpected::Str(v), &self));
            }
            Ok(v.to_owned())
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
            if v.is_empty() {
                return Err(E::invalid_value(de::Unexpected::Str(&v), &self));
            }
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }
    }
}
