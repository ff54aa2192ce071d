//! Postgres-backed [`CatalogStore`] for the pull sync.

use async_trait::async_trait;
use sqlx::PgPool;

use super::{
    CategoryRepository, OrderRepository, PosMirrorRepository, ProductRepository, RepositoryError,
};
use crate::models::{Modifier, NewOrder, Product, ProductDraft};
use crate::sync::{CatalogStore, UpsertOutcome};

/// Catalog store over the shop database.
#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn products(&self) -> ProductRepository<'_> {
        ProductRepository::new(&self.pool)
    }
}

#[async_trait]
impl CatalogStore for PgCatalog {
    async fn find_by_group_id(&self, group_id: &str) -> Result<Option<Product>, RepositoryError> {
        self.products().find_by_group_id(group_id).await
    }

    async fn find_by_pos_item_id(
        &self,
        item_id: &str,
    ) -> Result<Option<Product>, RepositoryError> {
        self.products().find_by_pos_item_id(item_id).await
    }

    async fn find_by_sku(&self, sku: &str) -> Result<Option<Product>, RepositoryError> {
        self.products().find_by_sku(sku).await
    }

    async fn find_unlinked_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Product>, RepositoryError> {
        self.products().find_unlinked_by_name(name).await
    }

    async fn insert_product(&self, draft: &ProductDraft) -> Result<Product, RepositoryError> {
        self.products().create(draft).await
    }

    async fn update_product(&self, product: &Product) -> Result<Product, RepositoryError> {
        self.products().update(product).await
    }

    async fn upsert_category(
        &self,
        pos_category_id: &str,
        name: &str,
    ) -> Result<UpsertOutcome, RepositoryError> {
        CategoryRepository::new(&self.pool)
            .upsert_pos(pos_category_id, name)
            .await
    }

    async fn upsert_item_group(
        &self,
        pos_group_id: &str,
        name: &str,
        pos_item_ids: &[String],
    ) -> Result<UpsertOutcome, RepositoryError> {
        PosMirrorRepository::new(&self.pool)
            .upsert_item_group(pos_group_id, name, pos_item_ids)
            .await
    }

    async fn upsert_modifier_group(
        &self,
        pos_group_id: &str,
        name: &str,
        modifiers: &[Modifier],
    ) -> Result<UpsertOutcome, RepositoryError> {
        PosMirrorRepository::new(&self.pool)
            .upsert_modifier_group(pos_group_id, name, modifiers)
            .await
    }

    async fn upsert_pos_order(&self, order: &NewOrder) -> Result<UpsertOutcome, RepositoryError> {
        OrderRepository::new(&self.pool).upsert_pos(order).await
    }
}
