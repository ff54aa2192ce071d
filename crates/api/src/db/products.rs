//! Product repository.
//!
//! Variants, images and categories live in JSONB columns. Lookups by POS
//! item ID or SKU use JSONB containment so they also match inside the
//! embedded variants.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;

use corner_shop_core::ProductId;

use super::RepositoryError;
use crate::models::{Product, ProductDraft, Variant};

macro_rules! product_columns {
    () => {
        "id, name, description, price, stock_count, images, categories, variants, \
         pos_item_id, pos_group_id, hidden, created_at, updated_at"
    };
}

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    description: String,
    price: Decimal,
    stock_count: i32,
    images: Json<Vec<String>>,
    categories: Json<Vec<String>>,
    variants: Json<Vec<Variant>>,
    pos_item_id: Option<String>,
    pos_group_id: Option<String>,
    hidden: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            name: row.name,
            description: row.description,
            price: row.price,
            stock_count: row.stock_count,
            images: row.images.0,
            categories: row.categories.0,
            variants: row.variants.0,
            pos_item_id: row.pos_item_id,
            pos_group_id: row.pos_group_id,
            hidden: row.hidden,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Storefront listing filters.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category: Option<String>,
    /// Case-insensitive substring of the name.
    pub search: Option<String>,
    pub include_hidden: bool,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(concat!(
            "SELECT ",
            product_columns!(),
            " FROM products
              WHERE ($1 OR NOT hidden)
                AND ($2::text IS NULL OR categories @> jsonb_build_array($2::text))
                AND ($3::text IS NULL OR name ILIKE '%' || $3 || '%')
              ORDER BY created_at DESC, id DESC"
        ))
        .bind(filter.include_hidden)
        .bind(filter.category.as_deref())
        .bind(filter.search.as_deref())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(concat!(
            "SELECT ",
            product_columns!(),
            " FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Find the product linked to a POS item group.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_group_id(
        &self,
        group_id: &str,
    ) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(concat!(
            "SELECT ",
            product_columns!(),
            " FROM products WHERE pos_group_id = $1 ORDER BY id LIMIT 1"
        ))
        .bind(group_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Find the product whose own POS item ID, or any variant's, matches.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_pos_item_id(
        &self,
        item_id: &str,
    ) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(concat!(
            "SELECT ",
            product_columns!(),
            " FROM products
              WHERE pos_item_id = $1
                 OR variants @> jsonb_build_array(jsonb_build_object('pos_item_id', $1::text))
              ORDER BY id LIMIT 1"
        ))
        .bind(item_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Find the product with a variant carrying this SKU.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_sku(&self, sku: &str) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(concat!(
            "SELECT ",
            product_columns!(),
            " FROM products
              WHERE variants @> jsonb_build_array(jsonb_build_object('sku', $1::text))
              ORDER BY id LIMIT 1"
        ))
        .bind(sku)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Exact name match among products with no POS linkage at all.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_unlinked_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(concat!(
            "SELECT ",
            product_columns!(),
            " FROM products
              WHERE name = $1
                AND pos_item_id IS NULL
                AND pos_group_id IS NULL
                AND NOT EXISTS (
                    SELECT 1 FROM jsonb_array_elements(variants) v
                    WHERE v->>'pos_item_id' IS NOT NULL
                )
              ORDER BY id LIMIT 1"
        ))
        .bind(name)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Insert a new product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, draft: &ProductDraft) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(concat!(
            "INSERT INTO products
                (name, description, price, stock_count, images, categories, variants,
                 pos_item_id, pos_group_id, hidden)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING ",
            product_columns!()
        ))
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(draft.price)
        .bind(draft.stock_count)
        .bind(Json(&draft.images))
        .bind(Json(&draft.categories))
        .bind(Json(&draft.variants))
        .bind(draft.pos_item_id.as_deref())
        .bind(draft.pos_group_id.as_deref())
        .bind(draft.hidden)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Overwrite every stored field of a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn update(&self, product: &Product) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(concat!(
            "UPDATE products SET
                name = $2, description = $3, price = $4, stock_count = $5,
                images = $6, categories = $7, variants = $8,
                pos_item_id = $9, pos_group_id = $10, hidden = $11,
                updated_at = now()
             WHERE id = $1
             RETURNING ",
            product_columns!()
        ))
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.stock_count)
        .bind(Json(&product.images))
        .bind(Json(&product.categories))
        .bind(Json(&product.variants))
        .bind(product.pos_item_id.as_deref())
        .bind(product.pos_group_id.as_deref())
        .bind(product.hidden)
        .fetch_optional(self.pool)
        .await?;

        row.map(Into::into).ok_or(RepositoryError::NotFound)
    }

    /// Write back stock levels only.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn save_stock(&self, product: &Product) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE products SET stock_count = $2, variants = $3, updated_at = now() WHERE id = $1",
        )
        .bind(product.id)
        .bind(product.stock_count)
        .bind(Json(&product.variants))
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
