//! Cart error types.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::ProductId;

/// Errors returned by cart operations.
///
/// All variants are caller errors; none of them leave the cart modified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// The quantity passed to `add` was not positive, the merged quantity
    /// exceeded [`Cart::MAX_QUANTITY`] or it carried too many fractional digits.
    ///
    /// [`Cart::MAX_QUANTITY`]: super::Cart::MAX_QUANTITY
    #[error("quantity must be positive and at most 1000000 with 4 decimals (got {0})")]
    InvalidQuantity(Decimal),

    /// A per-unit product amount was negative, too large or too precise.
    #[error("{field} must be between 0 and 1000000000 with at most 4 decimals (got {value})")]
    InvalidAmount {
        /// Name of the offending product field.
        field: &'static str,
        /// Value supplied by the caller.
        value: Decimal,
    },

    /// Adding a new product would exceed the distinct product limit.
    #[error("cart is full ({max} products)")]
    Full {
        /// Maximum number of distinct products.
        max: usize,
    },

    /// The product is not in the cart.
    #[error("product {0} is not in the cart")]
    ItemNotFound(ProductId),

    /// A range filter was given `min > max`.
    #[error("invalid range: min {min} is greater than max {max}")]
    InvalidRange {
        /// Lower bound supplied by the caller.
        min: Decimal,
        /// Upper bound supplied by the caller.
        max: Decimal,
    },

    /// The totals could not be updated without leaving the decimal range.
    #[error("cart totals overflowed")]
    Overflow,
}
