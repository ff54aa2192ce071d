//! Short-lived cache for storefront catalog reads.
//!
//! Any catalog write clears the whole cache; listings depend on too many
//! products to invalidate selectively.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use corner_shop_core::ProductId;

use crate::db::ProductFilter;
use crate::models::{Category, Product};

const TTL: Duration = Duration::from_secs(60);
const MAX_ENTRIES: u64 = 1000;

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Product(ProductId),
    Products {
        category: Option<String>,
        search: Option<String>,
    },
    Categories,
}

#[derive(Debug, Clone)]
enum CacheValue {
    Product(Box<Product>),
    Products(Arc<Vec<Product>>),
    Categories(Arc<Vec<Category>>),
}

/// Cache of public catalog responses.
#[derive(Clone)]
pub struct CatalogCache {
    cache: Cache<CacheKey, CacheValue>,
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(MAX_ENTRIES)
                .time_to_live(TTL)
                .build(),
        }
    }

    fn listing_key(filter: &ProductFilter) -> Option<CacheKey> {
        (!filter.include_hidden).then(|| CacheKey::Products {
            category: filter.category.clone(),
            search: filter.search.clone(),
        })
    }

    pub async fn product(&self, id: ProductId) -> Option<Product> {
        match self.cache.get(&CacheKey::Product(id)).await {
            Some(CacheValue::Product(product)) => Some(*product),
            _ => None,
        }
    }

    pub async fn store_product(&self, product: &Product) {
        self.cache
            .insert(
                CacheKey::Product(product.id),
                CacheValue::Product(Box::new(product.clone())),
            )
            .await;
    }

    /// Cached public listing. Admin listings (with hidden products) are never cached.
    pub async fn products(&self, filter: &ProductFilter) -> Option<Arc<Vec<Product>>> {
        let key = Self::listing_key(filter)?;
        match self.cache.get(&key).await {
            Some(CacheValue::Products(products)) => Some(products),
            _ => None,
        }
    }

    pub async fn store_products(&self, filter: &ProductFilter, products: Arc<Vec<Product>>) {
        if let Some(key) = Self::listing_key(filter) {
            self.cache.insert(key, CacheValue::Products(products)).await;
        }
    }

    pub async fn categories(&self) -> Option<Arc<Vec<Category>>> {
        match self.cache.get(&CacheKey::Categories).await {
            Some(CacheValue::Categories(categories)) => Some(categories),
            _ => None,
        }
    }

    pub async fn store_categories(&self, categories: Arc<Vec<Category>>) {
        self.cache
            .insert(CacheKey::Categories, CacheValue::Categories(categories))
            .await;
    }

    /// Drop every cached entry.
    pub fn invalidate(&self) {
        self.cache.invalidate_all();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::product::tests::{product, variant};

    #[tokio::test]
    async fn test_product_roundtrip_and_invalidate() {
        let cache = CatalogCache::new();
        let p = product(vec![variant("Small", "CB-S", 500, 3)]);
        cache.store_product(&p).await;
        assert_eq!(cache.product(p.id).await.unwrap().name, "Cold Brew");

        cache.invalidate();
        cache.cache.run_pending_tasks().await;
        assert!(cache.product(p.id).await.is_none());
    }

    #[tokio::test]
    async fn test_hidden_listings_are_not_cached() {
        let cache = CatalogCache::new();
        let filter = ProductFilter {
            include_hidden: true,
            ..ProductFilter::default()
        };
        cache.store_products(&filter, Arc::new(vec![])).await;
        assert!(cache.products(&filter).await.is_none());
    }
}
