//! Cart and wishlist repositories. One JSONB document per user.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use corner_shop_core::{ProductId, UserId};

use super::RepositoryError;
use crate::models::{Cart, CartItem, Wishlist};

#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    items: Json<Vec<CartItem>>,
    updated_at: DateTime<Utc>,
}

/// Repository for cart documents.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Load a user's cart; users without one get an empty cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(
            "SELECT items, updated_at FROM carts WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map_or_else(
            || Cart::empty(user_id),
            |r| Cart {
                user_id,
                items: r.items.0,
                updated_at: r.updated_at,
            },
        ))
    }

    /// Store a cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn save(&self, cart: &Cart) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO carts (user_id, items, updated_at) VALUES ($1, $2, now())
             ON CONFLICT (user_id) DO UPDATE SET items = EXCLUDED.items, updated_at = now()",
        )
        .bind(cart.user_id)
        .bind(Json(&cart.items))
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Empty a user's cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn clear(&self, user_id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE carts SET items = '[]'::jsonb, updated_at = now() WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Remove a product from every cart. Returns the affected users.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn strip_product(&self, product_id: ProductId) -> Result<Vec<UserId>, RepositoryError> {
        let users: Vec<i32> = sqlx::query_scalar(
            "UPDATE carts SET
                items = COALESCE(
                    (SELECT jsonb_agg(e) FROM jsonb_array_elements(items) e
                     WHERE (e->>'product_id')::int <> $1),
                    '[]'::jsonb),
                updated_at = now()
             WHERE items @> jsonb_build_array(jsonb_build_object('product_id', $1::int))
             RETURNING user_id",
        )
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        Ok(users.into_iter().map(UserId::new).collect())
    }
}

/// Repository for wishlist documents.
pub struct WishlistRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WishlistRepository<'a> {
    /// Create a new wishlist repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Load a user's wishlist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, user_id: UserId) -> Result<Wishlist, RepositoryError> {
        let ids: Option<Json<Vec<ProductId>>> =
            sqlx::query_scalar("SELECT product_ids FROM wishlists WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(self.pool)
                .await?;

        Ok(Wishlist {
            user_id,
            product_ids: ids.map(|ids| ids.0).unwrap_or_default(),
        })
    }

    /// Store a wishlist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn save(&self, wishlist: &Wishlist) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO wishlists (user_id, product_ids) VALUES ($1, $2)
             ON CONFLICT (user_id) DO UPDATE SET product_ids = EXCLUDED.product_ids",
        )
        .bind(wishlist.user_id)
        .bind(Json(&wishlist.product_ids))
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Remove a product from every wishlist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn strip_product(&self, product_id: ProductId) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE wishlists SET
                product_ids = COALESCE(
                    (SELECT jsonb_agg(e) FROM jsonb_array_elements(product_ids) e
                     WHERE e <> to_jsonb($1::int)),
                    '[]'::jsonb)
             WHERE product_ids @> jsonb_build_array($1::int)",
        )
        .bind(product_id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
