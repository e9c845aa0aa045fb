//! Cart line items and the totals they contribute.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::CartError;
use crate::ProductId;

/// The monetary and physical fields that are summed across a cart.
///
/// Used three ways: as per-unit catalog values, as a line's values scaled by
/// quantity, and as the cart-level aggregate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub weight: Decimal,
}

impl CartTotals {
    /// All-zero totals (an empty cart).
    pub const ZERO: Self = Self {
        subtotal: Decimal::ZERO,
        tax: Decimal::ZERO,
        discount: Decimal::ZERO,
        total: Decimal::ZERO,
        weight: Decimal::ZERO,
    };

    /// Multiply every field by `quantity`, or `None` on overflow.
    #[must_use]
    pub fn checked_scale(self, quantity: Decimal) -> Option<Self> {
        Some(Self {
            subtotal: self.subtotal.checked_mul(quantity)?,
            tax: self.tax.checked_mul(quantity)?,
            discount: self.discount.checked_mul(quantity)?,
            total: self.total.checked_mul(quantity)?,
            weight: self.weight.checked_mul(quantity)?,
        })
    }

    /// Field-wise addition, or `None` on overflow.
    #[must_use]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        Some(Self {
            subtotal: self.subtotal.checked_add(rhs.subtotal)?,
            tax: self.tax.checked_add(rhs.tax)?,
            discount: self.discount.checked_add(rhs.discount)?,
            total: self.total.checked_add(rhs.total)?,
            weight: self.weight.checked_add(rhs.weight)?,
        })
    }

    /// Field-wise subtraction, or `None` on overflow.
    #[must_use]
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        Some(Self {
            subtotal: self.subtotal.checked_sub(rhs.subtotal)?,
            tax: self.tax.checked_sub(rhs.tax)?,
            discount: self.discount.checked_sub(rhs.discount)?,
            total: self.total.checked_sub(rhs.total)?,
            weight: self.weight.checked_sub(rhs.weight)?,
        })
    }

    /// Normalize trailing zeros so equal amounts compare and print the same.
    #[must_use]
    pub fn normalize(self) -> Self {
        Self {
            subtotal: self.subtotal.normalize(),
            tax: self.tax.normalize(),
            discount: self.discount.normalize(),
            total: self.total.normalize(),
            weight: self.weight.normalize(),
        }
    }
}

/// A product as supplied by the catalog at add time.
///
/// The amounts are per unit; the cart trusts them and never re-fetches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartProduct {
    pub id: ProductId,
    pub brand: String,
    pub category: String,
    #[serde(rename = "type")]
    pub product_type: String,
    #[serde(default)]
    pub subtotal: Decimal,
    #[serde(default)]
    pub tax: Decimal,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub total: Decimal,
    #[serde(default)]
    pub weight: Decimal,
}

impl CartProduct {
    /// Largest accepted per-unit amount.
    pub const MAX_UNIT_VALUE: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

    /// Most fractional digits a per-unit amount may carry.
    pub const MAX_SCALE: u32 = 4;

    /// The per-unit values of this product.
    #[must_use]
    pub const fn unit(&self) -> CartTotals {
        CartTotals {
            subtotal: self.subtotal,
            tax: self.tax,
            discount: self.discount,
            total: self.total,
            weight: self.weight,
        }
    }

    /// Check every amount against the accepted bounds and strip trailing
    /// zeros.
    ///
    /// Amounts must be non-negative, at most [`Self::MAX_UNIT_VALUE`] and
    /// carry at most [`Self::MAX_SCALE`] fractional digits once normalized.
    /// Within these bounds no line or cart total can lose precision.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidAmount`] naming the first offending field.
    pub fn validated(mut self) -> Result<Self, CartError> {
        for (field, value) in [
            ("subtotal", &mut self.subtotal),
            ("tax", &mut self.tax),
            ("discount", &mut self.discount),
            ("total", &mut self.total),
            ("weight", &mut self.weight),
        ] {
            let normalized = value.normalize();
            if normalized < Decimal::ZERO
                || normalized > Self::MAX_UNIT_VALUE
                || normalized.scale() > Self::MAX_SCALE
            {
                return Err(CartError::InvalidAmount {
                    field,
                    value: *value,
                });
            }
            *value = normalized;
        }
        Ok(self)
    }
}

/// One line of a cart: a product, how much of it, and the scaled values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: CartProduct,
    pub quantity: Decimal,
    /// `product.unit()` scaled by `quantity`.
    pub totals: CartTotals,
}

impl CartItem {
    #[must_use]
    pub const fn product_id(&self) -> ProductId {
        self.product.id
    }
}
