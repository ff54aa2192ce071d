//! Two-way catalog reconciliation with the POS.
//!
//! - [`pull`] imports POS categories, groups, items and orders into the
//!   local catalog, merging grouped items into multi-variant products.
//! - [`push`] mirrors a locally saved product back out to the POS.
//!
//! Both directions are best-effort. Failures are recorded per record and
//! never abort the run or the enclosing save.

pub mod identity;
pub mod pull;
pub mod push;
pub mod report;

pub use identity::{IdentityKeys, MatchedBy, resolve};
pub use pull::PullSync;
pub use push::{PushFailure, PushOutcome, mirror_product, push_inventory};
pub use report::{CollectionReport, SyncReport, UpsertOutcome};

use async_trait::async_trait;

use crate::db::RepositoryError;
use crate::models::{Modifier, NewOrder, Product, ProductDraft};

/// Local catalog operations the pull sync needs.
///
/// Implemented over Postgres by [`crate::db::PgCatalog`].
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn find_by_group_id(&self, group_id: &str) -> Result<Option<Product>, RepositoryError>;

    /// Match a product whose own POS ID or any variant's POS ID equals `item_id`.
    async fn find_by_pos_item_id(&self, item_id: &str)
    -> Result<Option<Product>, RepositoryError>;

    /// Match a product with a variant carrying `sku`.
    async fn find_by_sku(&self, sku: &str) -> Result<Option<Product>, RepositoryError>;

    /// Exact name match among products with no POS linkage.
    async fn find_unlinked_by_name(&self, name: &str)
    -> Result<Option<Product>, RepositoryError>;

    async fn insert_product(&self, draft: &ProductDraft) -> Result<Product, RepositoryError>;

    async fn update_product(&self, product: &Product) -> Result<Product, RepositoryError>;

    async fn upsert_category(
        &self,
        pos_category_id: &str,
        name: &str,
    ) -> Result<UpsertOutcome, RepositoryError>;

    async fn upsert_item_group(
        &self,
        pos_group_id: &str,
        name: &str,
        pos_item_ids: &[String],
    ) -> Result<UpsertOutcome, RepositoryError>;

    async fn upsert_modifier_group(
        &self,
        pos_group_id: &str,
        name: &str,
        modifiers: &[Modifier],
    ) -> Result<UpsertOutcome, RepositoryError>;

    /// Insert a POS order once, refreshing its status on later runs.
    async fn upsert_pos_order(&self, order: &NewOrder) -> Result<UpsertOutcome, RepositoryError>;
}
