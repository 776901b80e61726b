//! Newtype IDs for type-safe catalog references.
//!
//! Stripe identifiers are opaque strings with a type prefix (`prod_`,
//! `price_`, `cs_`). Use the `define_string_id!` macro to create wrappers
//! that prevent accidentally passing a product id where a price id is
//! expected. No validation is performed; the provider is the authority on
//! what an id looks like.

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>` and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use ignite_shop_core::define_string_id;
/// define_string_id!(CouponId);
/// define_string_id!(CustomerId);
///
/// let coupon = CouponId::new("co_123");
/// let customer = CustomerId::new("cus_123");
///
/// // These are different types, so this won't compile:
/// // let _: CouponId = customer;
/// # let _ = (coupon, customer);
/// ```
#[macro_export]
macro_rules! define_string_id {
    ($name:ident) => {
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
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the underlying identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the underlying string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
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
                Self(id.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(ProductId);
define_string_id!(PriceId);
define_string_id!(CheckoutSessionId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_is_raw_value() {
        let id = ProductId::new("prod_NdSKKrvk4LDcXT");
        assert_eq!(id.to_string(), "prod_NdSKKrvk4LDcXT");
        assert_eq!(id.as_str(), "prod_NdSKKrvk4LDcXT");
    }

    #[test]
    fn test_id_serializes_transparently() {
        let id = PriceId::from("price_1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"price_1\"");

        let back: PriceId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
