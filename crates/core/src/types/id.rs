//! Newtype IDs for Shopify global IDs.
//!
//! Shopify identifies resources with global IDs such as
//! `gid://shopify/LineItem/12345`, while the REST-style refund gateway only
//! accepts the trailing numeric part. Use the `define_gid!` macro to create
//! type-safe wrappers that prevent mixing IDs from different resource types
//! and know how to convert between both forms.

/// Macro to define a type-safe Shopify global ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - `new()`, `from_numeric()`, `as_str()`, `numeric_id()`
/// - `Display` and `From<String>`/`From<&str>` implementations
///
/// # Example
///
/// ```rust
/// # use refund_desk_core::define_gid;
/// define_gid!(ProductId, "Product");
///
/// let id = ProductId::from_numeric(42);
/// assert_eq!(id.as_str(), "gid://shopify/Product/42");
/// assert_eq!(id.numeric_id(), "42");
///
/// // Bare numeric IDs pass through unchanged
/// assert_eq!(ProductId::new("42").numeric_id(), "42");
/// ```
#[macro_export]
macro_rules! define_gid {
    ($name:ident, $resource:literal) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Shopify resource name used in the global ID.
            pub const RESOURCE: &'static str = $resource;

            /// Wrap an ID as received (global ID or bare numeric ID).
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Build a global ID from a numeric resource ID.
            #[must_use]
            pub fn from_numeric(id: impl ::core::fmt::Display) -> Self {
                Self(format!("gid://shopify/{}/{id}", $resource))
            }

            /// The ID exactly as received.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// The trailing path segment of the ID.
            ///
            /// `gid://shopify/LineItem/123` becomes `123`; an ID without any
            /// `/` is returned unchanged.
            #[must_use]
            pub fn numeric_id(&self) -> &str {
                $crate::types::id::strip_to_numeric_suffix(&self.0)
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
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
    };
}

/// Return the segment after the last `/` of a Shopify ID.
#[must_use]
pub fn strip_to_numeric_suffix(id: &str) -> &str {
    id.rsplit('/').next().unwrap_or(id)
}

define_gid!(OrderId, "Order");
define_gid!(LineItemId, "LineItem");
define_gid!(LocationId, "Location");
define_gid!(TransactionId, "OrderTransaction");
