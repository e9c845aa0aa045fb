//! The cart aggregate.
//!
//! A [`Cart`] holds at most one [`CartItem`] per product and keeps cart-level
//! totals in step with its items incrementally: every mutation adjusts the
//! totals by the delta it causes instead of rescanning the items. At every
//! point between operations, each field of [`Cart::totals`] equals the sum of
//! that field over the current items.
//!
//! The cart is a plain value. Callers that share a cart between tasks must
//! wrap it in a lock; the storefront keeps one lock per cart.
//!
//! # Counter semantics
//!
//! [`Cart::size`] counts distinct products, not cumulative quantity: adding
//! 3 units of one product yields a size of 1.

mod error;
mod item;

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub use error::CartError;
pub use item::{CartItem, CartProduct, CartTotals};

use crate::{CartId, ProductId};

/// A shopping cart with incrementally maintained totals.
#[derive(Debug, Clone)]
pub struct Cart {
    id: CartId,
    items: HashMap<ProductId, CartItem>,
    counter: usize,
    totals: CartTotals,
}

/// An immutable copy of a cart taken at checkout (or for display).
///
/// Items are ordered by product ID so snapshots are deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub id: CartId,
    pub size: usize,
    pub totals: CartTotals,
    pub items: Vec<CartItem>,
}

impl Cart {
    /// Largest quantity a single line may hold.
    pub const MAX_QUANTITY: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

    /// Most distinct products a cart may hold.
    pub const MAX_PRODUCTS: usize = 10_000;

    /// Create an empty cart.
    #[must_use]
    pub fn new(id: CartId) -> Self {
        Self {
            id,
            items: HashMap::new(),
            counter: 0,
            totals: CartTotals::ZERO,
        }
    }

    #[must_use]
    pub const fn id(&self) -> &CartId {
        &self.id
    }

    /// Number of distinct products in the cart. O(1).
    #[must_use]
    pub const fn size(&self) -> usize {
        self.counter
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counter == 0
    }

    /// Cart-level totals.
    #[must_use]
    pub const fn totals(&self) -> CartTotals {
        self.totals
    }

    #[must_use]
    pub fn item(&self, id: ProductId) -> Option<&CartItem> {
        self.items.get(&id)
    }

    /// Items ordered by product ID.
    #[must_use]
    pub fn items(&self) -> Vec<CartItem> {
        self.collect_sorted(|_| true)
    }

    /// Add `quantity` units of `product`.
    ///
    /// If the product is already in the cart its quantity grows and its scaled
    /// values are recomputed from the unit values passed in this call (the
    /// catalog's current price wins). The cart totals move by the difference
    /// between the old and new line values.
    ///
    /// Unit amounts, quantities and the number of products are bounded so that
    /// every line and cart total is exact.
    ///
    /// # Errors
    ///
    /// - [`CartError::InvalidAmount`] if a unit amount is out of bounds
    /// - [`CartError::InvalidQuantity`] if `quantity <= 0`, the merged quantity
    ///   exceeds [`Self::MAX_QUANTITY`] or has more than 4 decimals
    /// - [`CartError::Full`] if a new product would exceed [`Self::MAX_PRODUCTS`]
    /// - [`CartError::Overflow`] if the totals leave the decimal range
    ///
    /// The cart is unchanged on error.
    pub fn add(
        &mut self,
        product: CartProduct,
        quantity: Decimal,
    ) -> Result<&CartItem, CartError> {
        let product = product.validated()?;
        let quantity = quantity.normalize();
        if quantity <= Decimal::ZERO || quantity.scale() > CartProduct::MAX_SCALE {
            return Err(CartError::InvalidQuantity(quantity));
        }

        let id = product.id;
        let (old_line, new_quantity) = match self.items.get(&id) {
            Some(existing) => (
                existing.totals,
                existing
                    .quantity
                    .checked_add(quantity)
                    .ok_or(CartError::Overflow)?,
            ),
            None if self.counter >= Self::MAX_PRODUCTS => {
                return Err(CartError::Full {
                    max: Self::MAX_PRODUCTS,
                });
            }
            None => (CartTotals::ZERO, quantity),
        };
        if new_quantity > Self::MAX_QUANTITY {
            return Err(CartError::InvalidQuantity(new_quantity));
        }

        let new_line = product
            .unit()
            .checked_scale(new_quantity)
            .ok_or(CartError::Overflow)?;
        let totals = self
            .totals
            .checked_sub(old_line)
            .and_then(|t| t.checked_add(new_line))
            .ok_or(CartError::Overflow)?;

        let item = CartItem {
            product,
            quantity: new_quantity,
            totals: new_line,
        };
        self.totals = totals;
        match self.items.entry(id) {
            Entry::Occupied(mut slot) => {
                slot.insert(item);
                Ok(slot.into_mut())
            }
            Entry::Vacant(slot) => {
                self.counter += 1;
                Ok(slot.insert(item))
            }
        }
    }

    /// Remove a product and its whole quantity.
    ///
    /// # Errors
    ///
    /// - [`CartError::ItemNotFound`] if the product is not in the cart
    /// - [`CartError::Overflow`] if the totals cannot be reduced by the line
    ///
    /// The cart is unchanged on error.
    pub fn remove(&mut self, id: ProductId) -> Result<CartItem, CartError> {
        let line = self
            .items
            .get(&id)
            .map(|item| item.totals)
            .ok_or(CartError::ItemNotFound(id))?;
        let totals = self.totals.checked_sub(line).ok_or(CartError::Overflow)?;

        let item = self.items.remove(&id).ok_or(CartError::ItemNotFound(id))?;
        self.totals = totals;
        self.counter -= 1;
        Ok(item)
    }

    /// Drop every item and zero all totals.
    pub fn reset(&mut self) {
        self.items.clear();
        self.counter = 0;
        self.totals = CartTotals::ZERO;
    }

    #[must_use]
    pub fn filter_by_brand(&self, brand: &str) -> Vec<CartItem> {
        self.collect_sorted(|item| item.product.brand == brand)
    }

    #[must_use]
    pub fn filter_by_category(&self, category: &str) -> Vec<CartItem> {
        self.collect_sorted(|item| item.product.category == category)
    }

    #[must_use]
    pub fn filter_by_type(&self, product_type: &str) -> Vec<CartItem> {
        self.collect_sorted(|item| item.product.product_type == product_type)
    }

    /// Items whose line total lies in `[min, max]`.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidRange`] if `min > max`.
    pub fn filter_by_total_range(
        &self,
        min: Decimal,
        max: Decimal,
    ) -> Result<Vec<CartItem>, CartError> {
        check_range(min, max)?;
        Ok(self.collect_sorted(|item| (min..=max).contains(&item.totals.total)))
    }

    /// Items whose line weight lies in `[min, max]`.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidRange`] if `min > max`.
    pub fn filter_by_weight_range(
        &self,
        min: Decimal,
        max: Decimal,
    ) -> Result<Vec<CartItem>, CartError> {
        check_range(min, max)?;
        Ok(self.collect_sorted(|item| (min..=max).contains(&item.totals.weight)))
    }

    /// Snapshot the cart. The cart itself is left untouched.
    #[must_use]
    pub fn checkout(&self) -> CartSnapshot {
        CartSnapshot {
            id: self.id.clone(),
            size: self.counter,
            totals: self.totals.normalize(),
            items: self.items(),
        }
    }

    fn collect_sorted(&self, predicate: impl Fn(&CartItem) -> bool) -> Vec<CartItem> {
        let mut matched: Vec<CartItem> = self
            .items
            .values()
            .filter(|item| predicate(item))
            .cloned()
            .collect();
        matched.sort_by_key(CartItem::product_id);
        matched
    }
}

fn check_range(min: Decimal, max: Decimal) -> Result<(), CartError> {
    if min > max {
        return Err(CartError::InvalidRange { min, max });
    }
    Ok(())
}
