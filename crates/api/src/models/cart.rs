//! Per-user cart and wishlist documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use corner_shop_core::{ProductId, UserId};

/// Errors raised by cart changes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    #[error("quantity must be at least 1")]
    InvalidQuantity,
    #[error("only {available} in stock")]
    ExceedsStock { available: i32 },
    #[error("item is not in the cart")]
    NotInCart,
}

/// One cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    #[serde(default)]
    pub variant_sku: Option<String>,
    pub quantity: i32,
}

/// A user's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cart {
    pub user_id: UserId,
    pub items: Vec<CartItem>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// An empty cart for a user.
    #[must_use]
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            items: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    fn position(&self, product_id: ProductId, sku: Option<&str>) -> Option<usize> {
        self.items
            .iter()
            .position(|i| i.product_id == product_id && i.variant_sku.as_deref() == sku)
    }

    /// Add `quantity` of a product (or variant), capped by `available` stock.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` for non-positive quantities and
    /// `CartError::ExceedsStock` if the resulting line would exceed stock.
    pub fn add(
        &mut self,
        product_id: ProductId,
        sku: Option<&str>,
        quantity: i32,
        available: i32,
    ) -> Result<(), CartError> {
        if quantity < 1 {
            return Err(CartError::InvalidQuantity);
        }

        let existing = self
            .position(product_id, sku)
            .and_then(|idx| self.items.get(idx))
            .map_or(0, |i| i.quantity);
        self.set_quantity(product_id, sku, existing.saturating_add(quantity), available)
    }

    /// Set the quantity of a line, adding it if missing. Zero removes it.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` for negative quantities and
    /// `CartError::ExceedsStock` if `quantity` exceeds `available`.
    pub fn set_quantity(
        &mut self,
        product_id: ProductId,
        sku: Option<&str>,
        quantity: i32,
        available: i32,
    ) -> Result<(), CartError> {
        if quantity < 0 {
            return Err(CartError::InvalidQuantity);
        }
        if quantity == 0 {
            return self.remove(product_id, sku);
        }
        if quantity > available {
            return Err(CartError::ExceedsStock {
                available: available.max(0),
            });
        }

        match self.position(product_id, sku) {
            Some(idx) => {
                if let Some(line) = self.items.get_mut(idx) {
                    line.quantity = quantity;
                }
            }
            None => self.items.push(CartItem {
                product_id,
                variant_sku: sku.map(String::from),
                quantity,
            }),
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NotInCart` if the line doesn't exist.
    pub fn remove(&mut self, product_id: ProductId, sku: Option<&str>) -> Result<(), CartError> {
        let idx = self
            .position(product_id, sku)
            .ok_or(CartError::NotInCart)?;
        self.items.remove(idx);
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// A user's wishlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Wishlist {
    pub user_id: UserId,
    pub product_ids: Vec<ProductId>,
}

impl Wishlist {
    /// Add a product; returns false if it was already listed.
    pub fn add(&mut self, product_id: ProductId) -> bool {
        if self.product_ids.contains(&product_id) {
            return false;
        }
        self.product_ids.push(product_id);
        true
    }

    /// Remove a product; returns false if it wasn't listed.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        let before = self.product_ids.len();
        self.product_ids.retain(|id| *id != product_id);
        before != self.product_ids.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const P1: ProductId = ProductId::new(1);

    #[test]
    fn test_add_merges_lines() {
        let mut cart = Cart::empty(UserId::new(1));
        cart.add(P1, None, 2, 10).unwrap();
        cart.add(P1, None, 3, 10).unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 5);
    }

    #[test]
    fn test_variants_are_separate_lines() {
        let mut cart = Cart::empty(UserId::new(1));
        cart.add(P1, Some("S"), 1, 10).unwrap();
        cart.add(P1, Some("L"), 1, 10).unwrap();
        assert_eq!(cart.items.len(), 2);
    }

    #[test]
    fn test_cannot_exceed_stock() {
        let mut cart = Cart::empty(UserId::new(1));
        cart.add(P1, None, 3, 4).unwrap();
        assert_eq!(
            cart.add(P1, None, 2, 4),
            Err(CartError::ExceedsStock { available: 4 })
        );
        assert_eq!(cart.items[0].quantity, 3);
        assert_eq!(
            cart.set_quantity(P1, None, 5, 4),
            Err(CartError::ExceedsStock { available: 4 })
        );
    }

    #[test]
    fn test_zero_quantity_removes() {
        let mut cart = Cart::empty(UserId::new(1));
        cart.add(P1, None, 1, 4).unwrap();
        cart.set_quantity(P1, None, 0, 4).unwrap();
        assert!(cart.items.is_empty());
    }

    #[test]
    fn test_invalid_quantities() {
        let mut cart = Cart::empty(UserId::new(1));
        assert_eq!(cart.add(P1, None, 0, 4), Err(CartError::InvalidQuantity));
        assert_eq!(
            cart.set_quantity(P1, None, -1, 4),
            Err(CartError::InvalidQuantity)
        );
        assert_eq!(cart.remove(P1, None), Err(CartError::NotInCart));
    }

    #[test]
    fn test_wishlist_dedupes() {
        let mut wishlist = Wishlist {
            user_id: UserId::new(1),
            product_ids: vec![],
        };
        assert!(wishlist.add(P1));
        assert!(!wishlist.add(P1));
        assert!(wishlist.remove(P1));
        assert!(!wishlist.remove(P1));
    }
}
