//! Cart storage.
//!
//! The outer map is only locked long enough to find or insert a cart; each
//! cart then has its own `RwLock`, so mutations are serialized per cart,
//! readers share it, and different carts never contend.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use adak_core::{Cart, CartId};

/// A cart behind its own lock.
pub type SharedCart = Arc<RwLock<Cart>>;

/// All live carts, keyed by cart id.
#[derive(Debug, Default)]
pub struct CartStore {
    carts: RwLock<HashMap<CartId, SharedCart>>,
}

impl CartStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty cart for `id`, or return the existing one.
    pub fn create(&self, id: CartId) -> SharedCart {
        let mut carts = self.carts.write();
        Arc::clone(
            carts
                .entry(id.clone())
                .or_insert_with(|| Arc::new(RwLock::new(Cart::new(id)))),
        )
    }

    #[must_use]
    pub fn get(&self, id: &CartId) -> Option<SharedCart> {
        self.carts.read().get(id).cloned()
    }

    /// Destroy a cart. Returns whether it existed.
    pub fn delete(&self, id: &CartId) -> bool {
        self.carts.write().remove(id).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.carts.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use adak_core::{CartProduct, ProductId};

    use super::*;

    fn product(id: i32) -> CartProduct {
        CartProduct {
            id: ProductId::new(id),
            brand: "acme".to_owned(),
            category: "tools".to_owned(),
            product_type: "hammer".to_owned(),
            subtotal: Decimal::from(10),
            tax: Decimal::ONE,
            discount: Decimal::ZERO,
            total: Decimal::from(11),
            weight: Decimal::from(2),
        }
    }

    #[test]
    fn test_create_is_idempotent() {
        let store = CartStore::new();
        let id = CartId::new("c1".to_owned());

        let first = store.create(id.clone());
        first.write().add(product(1), Decimal::ONE).unwrap();
        let second = store.create(id);

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.read().size(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_and_delete() {
        let store = CartStore::new();
        let id = CartId::new("c1".to_owned());
        store.create(id.clone());

        assert!(store.get(&id).is_some());
        assert!(store.delete(&id));
        assert!(!store.delete(&id));
        assert!(store.get(&id).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_adds_keep_totals_consistent() {
        let store = Arc::new(CartStore::new());
        let id = CartId::new("c1".to_owned());
        store.create(id.clone());

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = Arc::clone(&store);
                let id = id.clone();
                std::thread::spawn(move || {
                    let cart = store.get(&id).unwrap();
                    for i in 0..50 {
                        let product = product(t * 100 + i % 5);
                        cart.write().add(product, Decimal::ONE).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let cart = store.get(&id).unwrap();
        let cart = cart.read();
        assert_eq!(cart.size(), 20);
        assert_eq!(cart.totals().total, Decimal::from(11 * 200));
        assert_eq!(cart.totals().weight, Decimal::from(2 * 200));
    }
}
