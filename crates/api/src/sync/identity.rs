//! Matching POS records to local products.

use crate::db::RepositoryError;
use crate::models::Product;

use super::CatalogStore;

/// Which key matched a local product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchedBy {
    GroupId,
    ItemId,
    Sku,
    Name,
}

/// Every identity key a POS record (or group of records) carries.
#[derive(Debug, Clone, Default)]
pub struct IdentityKeys<'a> {
    pub group_id: Option<&'a str>,
    pub item_ids: Vec<&'a str>,
    pub skus: Vec<&'a str>,
    pub name: &'a str,
}

/// Find the local product for a POS record.
///
/// Keys are tried strongest first: group ID, then any item ID, then any SKU,
/// then the exact name. The name lookup only considers products that have
/// no POS linkage yet, so an already linked product is never captured by a
/// namesake.
///
/// # Errors
///
/// Returns `RepositoryError` if a lookup fails.
pub async fn resolve(
    store: &dyn CatalogStore,
    keys: &IdentityKeys<'_>,
) -> Result<Option<(Product, MatchedBy)>, RepositoryError> {
    if let Some(group_id) = keys.group_id
        && let Some(product) = store.find_by_group_id(group_id).await?
    {
        return Ok(Some((product, MatchedBy::GroupId)));
    }

    for item_id in &keys.item_ids {
        if let Some(product) = store.find_by_pos_item_id(item_id).await? {
            return Ok(Some((product, MatchedBy::ItemId)));
        }
    }

    for sku in &keys.skus {
        if let Some(product) = store.find_by_sku(sku).await? {
            return Ok(Some((product, MatchedBy::Sku)));
        }
    }

    let name = keys.name.trim();
    if !name.is_empty()
        && let Some(product) = store.find_unlinked_by_name(name).await?
    {
        return Ok(Some((product, MatchedBy::Name)));
    }

    Ok(None)
}
