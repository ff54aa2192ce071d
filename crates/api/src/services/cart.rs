//! Cart and wishlist operations for signed-in users.

use serde::Deserialize;

use corner_shop_core::{ProductId, UserId};

use crate::db::{CartRepository, ProductRepository, WishlistRepository};
use crate::error::{AppError, Result};
use crate::events::EventKind;
use crate::models::{Cart, Product, Wishlist};
use crate::state::AppState;

/// Body for add/update/remove.
#[derive(Debug, Clone, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    #[serde(default)]
    pub variant_sku: Option<String>,
    #[serde(default = "one")]
    pub quantity: i32,
}

const fn one() -> i32 {
    1
}

/// The SKU a cart line is stored under, and the stock that caps it.
///
/// Products with several variants must be bought by variant. A line
/// without a SKU on a single-variant product is stored under that
/// variant's SKU so it shares one line with explicit picks.
fn line_stock(product: &Product, sku: Option<&str>) -> Result<(Option<String>, i32)> {
    if sku.is_none() && product.is_multi_variant() {
        return Err(AppError::BadRequest(format!(
            "choose a variant of {}",
            product.name
        )));
    }
    let resolved = product
        .line_variant(sku)?
        .and_then(|v| v.sku.clone())
        .or_else(|| sku.map(str::to_owned));
    Ok((resolved, product.available(sku)?))
}

/// Cart service.
pub struct CartService<'a> {
    state: &'a AppState,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    fn carts(&self) -> CartRepository<'a> {
        CartRepository::new(self.state.pool())
    }

    async fn product(&self, id: ProductId) -> Result<Product> {
        ProductRepository::new(self.state.pool())
            .get(id)
            .await?
            .filter(|p| !p.hidden)
            .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    async fn save(&self, cart: &Cart) -> Result<()> {
        self.carts().save(cart).await?;
        self.state
            .events()
            .to_user(cart.user_id, EventKind::CartUpdated);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn get(&self, user_id: UserId) -> Result<Cart> {
        Ok(self.carts().get(user_id).await?)
    }

    /// Add to a line, capped at current stock.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ExceedsStock` when the line would pass stock.
    pub async fn add(&self, user_id: UserId, line: &CartLine) -> Result<Cart> {
        let product = self.product(line.product_id).await?;
        let (sku, available) = line_stock(&product, line.variant_sku.as_deref())?;

        let mut cart = self.carts().get(user_id).await?;
        cart.add(product.id, sku.as_deref(), line.quantity, available)?;
        self.save(&cart).await?;
        Ok(cart)
    }

    /// Set a line's quantity; zero removes it.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ExceedsStock` when the quantity passes stock.
    pub async fn update(&self, user_id: UserId, line: &CartLine) -> Result<Cart> {
        let product = self.product(line.product_id).await?;
        let (sku, available) = line_stock(&product, line.variant_sku.as_deref())?;

        let mut cart = self.carts().get(user_id).await?;
        cart.set_quantity(product.id, sku.as_deref(), line.quantity, available)?;
        self.save(&cart).await?;
        Ok(cart)
    }

    /// # Errors
    ///
    /// Returns `CartError::NotInCart` for unknown lines.
    pub async fn remove(&self, user_id: UserId, line: &CartLine) -> Result<Cart> {
        let sku = match ProductRepository::new(self.state.pool())
            .get(line.product_id)
            .await?
        {
            Some(product) => product
                .line_variant(line.variant_sku.as_deref())
                .ok()
                .flatten()
                .and_then(|v| v.sku.clone())
                .or_else(|| line.variant_sku.clone()),
            None => line.variant_sku.clone(),
        };
        let mut cart = self.carts().get(user_id).await?;
        cart.remove(line.product_id, sku.as_deref())?;
        self.save(&cart).await?;
        Ok(cart)
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` if the update fails.
    pub async fn clear(&self, user_id: UserId) -> Result<()> {
        self.carts().clear(user_id).await?;
        self.state
            .events()
            .to_user(user_id, EventKind::CartUpdated);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn wishlist(&self, user_id: UserId) -> Result<Wishlist> {
        Ok(WishlistRepository::new(self.state.pool())
            .get(user_id)
            .await?)
    }

    /// # Errors
    ///
    /// Returns not found for unknown or hidden products.
    pub async fn wishlist_add(&self, user_id: UserId, product_id: ProductId) -> Result<Wishlist> {
        self.product(product_id).await?;
        let wishlists = WishlistRepository::new(self.state.pool());
        let mut wishlist = wishlists.get(user_id).await?;
        if wishlist.add(product_id) {
            wishlists.save(&wishlist).await?;
        }
        Ok(wishlist)
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` if the update fails.
    pub async fn wishlist_remove(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Wishlist> {
        let wishlists = WishlistRepository::new(self.state.pool());
        let mut wishlist = wishlists.get(user_id).await?;
        if wishlist.remove(product_id) {
            wishlists.save(&wishlist).await?;
        }
        Ok(wishlist)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::CartError;
    use crate::models::product::tests::{product, variant};

    #[test]
    fn test_multi_variant_needs_sku() {
        let p = product(vec![
            variant("Small", "CB-S", 500, 3),
            variant("Large", "CB-L", 700, 1),
        ]);
        assert!(matches!(line_stock(&p, None), Err(AppError::BadRequest(_))));
        assert_eq!(line_stock(&p, Some("CB-L")).unwrap(), (Some("CB-L".to_string()), 1));
    }

    #[test]
    fn test_single_variant_line_is_stored_under_its_sku() {
        let p = product(vec![variant("Default", "CB", 500, 6)]);
        assert_eq!(line_stock(&p, None).unwrap(), (Some("CB".to_string()), 6));
    }

    #[test]
    fn test_product_without_variants_keeps_bare_line() {
        let p = product(vec![]);
        assert_eq!(line_stock(&p, None).unwrap(), (None, 10));
    }

    #[test]
    fn test_cart_cap_against_line_stock() {
        let p = product(vec![
            variant("Small", "CB-S", 500, 3),
            variant("Large", "CB-L", 700, 1),
        ]);
        let (_, available) = line_stock(&p, Some("CB-S")).unwrap();
        let mut cart = Cart::empty(UserId::new(1));
        cart.add(p.id, Some("CB-S"), 2, available).unwrap();
        assert_eq!(
            cart.add(p.id, Some("CB-S"), 2, available),
            Err(CartError::ExceedsStock { available: 3 })
        );
    }

    #[test]
    fn test_quantity_defaults_to_one() {
        let line: CartLine = serde_json::from_str(r#"{"product_id": 4}"#).unwrap();
        assert_eq!(line.quantity, 1);
        assert!(line.variant_sku.is_none());
    }
}
