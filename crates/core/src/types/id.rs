//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different entity types. The remote service
//! owns identity, so IDs wrap the opaque strings it hands out.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_str()`
/// - `From<String>`, `From<&str>`, and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use segundo_lote_core::define_id;
/// define_id!(EventId);
/// define_id!(OrderId);
///
/// let event_id = EventId::new("evt_01H");
/// let order_id = OrderId::new("ord_01H");
///
/// // These are different types, so this won't compile:
/// // let _: EventId = order_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

// Define standard entity IDs
define_id!(EventId);
define_id!(OrderId);
define_id!(PaymentId);
define_id!(CategoryId);
define_id!(LocationId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_display_and_convert() {
        let id = EventId::new("evt_123");
        assert_eq!(id.as_str(), "evt_123");
        assert_eq!(id.to_string(), "evt_123");
        assert_eq!(String::from(id), "evt_123");
    }

    #[test]
    fn test_ids_serde_transparent() {
        let id = OrderId::new("ord_9");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"ord_9\"");
        let back: OrderId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
    }
}
