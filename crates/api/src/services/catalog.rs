//! Catalog management: storefront reads and back office writes.
//!
//! Every successful write invalidates the catalog cache, publishes an event,
//! and (when enabled) mirrors the product to the POS.

use std::collections::HashSet;
use std::fmt::Display;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, instrument, warn};

use corner_shop_core::ProductId;

use crate::db::{
    CartRepository, CategoryRepository, ProductFilter, ProductRepository, SettingsRepository,
    WishlistRepository,
};
use crate::error::{AppError, Result};
use crate::events::EventKind;
use crate::models::{Category, Product, ProductDraft};
use crate::services::notifications::{NotificationService, is_restock};
use crate::pos::PosClient;
use crate::state::AppState;
use crate::sync::{PushFailure, PushOutcome, mirror_product};

/// A saved product and whatever the POS mirror reported.
#[derive(Debug, Clone, Serialize)]
pub struct SavedProduct {
    pub product: Product,
    pub push_failures: Vec<PushFailure>,
}

impl SavedProduct {
    const fn unmirrored(product: Product) -> Self {
        Self {
            product,
            push_failures: Vec::new(),
        }
    }

    /// Record a mirror step that failed after the product row was written.
    fn with_failure(mut self, step: &str, error: impl Display) -> Self {
        warn!(product_id = %self.product.id, step, error = %error, "POS mirror step failed");
        self.push_failures.push(PushFailure {
            target: format!("{} ({step})", self.product.name),
            error: error.to_string(),
        });
        self
    }
}

/// Reject drafts the storefront can't sell.
///
/// # Errors
///
/// Returns `AppError::BadRequest` naming the first problem.
pub fn validate_draft(draft: &ProductDraft) -> Result<()> {
    let bad = |msg: &str| Err(AppError::BadRequest(msg.to_string()));

    if draft.name.trim().is_empty() {
        return bad("name is required");
    }
    if draft.price < Decimal::ZERO {
        return bad("price cannot be negative");
    }
    if draft.stock_count < 0 {
        return bad("stock cannot be negative");
    }

    let mut skus = HashSet::new();
    for variant in &draft.variants {
        if variant.label.trim().is_empty() {
            return bad("every variant needs a label");
        }
        if variant.price < Decimal::ZERO || variant.quantity < 0 {
            return bad("variant price and quantity cannot be negative");
        }
        if let Some(sku) = &variant.sku
            && !skus.insert(sku.as_str())
        {
            return Err(AppError::BadRequest(format!("duplicate SKU {sku}")));
        }
    }
    Ok(())
}

/// Catalog service.
pub struct CatalogService<'a> {
    state: &'a AppState,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    fn products(&self) -> ProductRepository<'a> {
        ProductRepository::new(self.state.pool())
    }

    /// Product listing. Public listings are cached.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn list(&self, filter: &ProductFilter) -> Result<Arc<Vec<Product>>> {
        let cache = self.state.cache();
        if let Some(products) = cache.products(filter).await {
            return Ok(products);
        }

        let products = Arc::new(self.products().list(filter).await?);
        cache.store_products(filter, Arc::clone(&products)).await;
        Ok(products)
    }

    /// One product. Hidden products are only visible to the back office.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the product doesn't exist or is hidden.
    pub async fn get(&self, id: ProductId, include_hidden: bool) -> Result<Product> {
        let cache = self.state.cache();
        let product = match cache.product(id).await {
            Some(product) => product,
            None => {
                let product = self
                    .products()
                    .get(id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Product".to_string()))?;
                cache.store_product(&product).await;
                product
            }
        };

        if product.hidden && !include_hidden {
            return Err(AppError::NotFound("Product".to_string()));
        }
        Ok(product)
    }

    /// Category list, cached.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn categories(&self) -> Result<Arc<Vec<Category>>> {
        let cache = self.state.cache();
        if let Some(categories) = cache.categories().await {
            return Ok(categories);
        }
        let categories = Arc::new(CategoryRepository::new(self.state.pool()).list().await?);
        cache.store_categories(Arc::clone(&categories)).await;
        Ok(categories)
    }

    /// Create a product and mirror it to the POS.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for invalid drafts or a database error.
    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn create(&self, mut draft: ProductDraft) -> Result<SavedProduct> {
        validate_draft(&draft)?;
        draft.recompute_stock();

        let product = self.products().create(&draft).await?;
        info!(product_id = %product.id, "Product created");

        let saved = self.mirror(product).await;
        self.state.cache().invalidate();
        self.state.events().broadcast(EventKind::ProductCreated {
            product_id: saved.product.id,
        });
        Ok(saved)
    }

    /// Overwrite a product's editable fields and mirror it to the POS.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for invalid drafts and not found for
    /// unknown products.
    #[instrument(skip(self, draft))]
    pub async fn update(&self, id: ProductId, draft: ProductDraft) -> Result<SavedProduct> {
        validate_draft(&draft)?;

        let mut product = self
            .products()
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;
        let stock_before = product.stock_count;

        product.apply_draft(draft);
        let product = self.products().update(&product).await?;
        let saved = self.mirror(product).await;

        self.state.cache().invalidate();
        self.state
            .events()
            .broadcast(EventKind::ProductUpdated { product_id: id });

        if is_restock(stock_before, saved.product.stock_count)
            && let Err(e) = self.notifications().notify_restock(&saved.product).await
        {
            warn!(product_id = %id, error = %e, "Restock notifications not sent");
        }
        Ok(saved)
    }

    /// Delete a product and strip it from carts and wishlists.
    ///
    /// The POS item is left alone.
    ///
    /// # Errors
    ///
    /// Returns not found for unknown products.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<()> {
        let pool = self.state.pool();
        self.products().delete(id).await?;

        let carts = CartRepository::new(pool).strip_product(id).await?;
        WishlistRepository::new(pool).strip_product(id).await?;

        self.state.cache().invalidate();
        let events = self.state.events();
        events.broadcast(EventKind::ProductRemoved { product_id: id });
        for user_id in carts {
            events.to_user(user_id, EventKind::CartUpdated);
        }
        info!(product_id = %id, "Product deleted");
        Ok(())
    }

    /// The POS client to push local edits to, if pushing is on right now.
    ///
    /// `None` when no POS is configured or settings turn pushing off.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if settings can't be read.
    pub async fn push_target(&self) -> Result<Option<&'a dyn PosClient>> {
        let Some(pos) = self.state.pos() else {
            return Ok(None);
        };
        let settings = SettingsRepository::new(self.state.pool()).get().await?;
        Ok(settings.pos_sync_enabled.then_some(pos))
    }

    /// Push a saved product to the POS and persist any new linkage.
    ///
    /// Never fails: the product row is already written, so anything that
    /// goes wrong here is reported in `push_failures`.
    async fn mirror(&self, product: Product) -> SavedProduct {
        let pos = match self.push_target().await {
            Ok(Some(pos)) => pos,
            Ok(None) => return SavedProduct::unmirrored(product),
            Err(e) => {
                return SavedProduct::unmirrored(product).with_failure("read sync setting", e);
            }
        };

        let PushOutcome {
            product,
            failures,
            linked,
        } = mirror_product(pos, product).await;
        if !failures.is_empty() {
            warn!(
                product_id = %product.id,
                failures = failures.len(),
                "Product saved but POS mirror was incomplete"
            );
        }

        let mirrored = SavedProduct {
            product,
            push_failures: failures,
        };
        if !linked {
            return mirrored;
        }
        match self.products().update(&mirrored.product).await {
            Ok(product) => SavedProduct {
                product,
                ..mirrored
            },
            Err(e) => mirrored.with_failure("save POS links", e),
        }
    }

    fn notifications(&self) -> NotificationService<'a> {
        NotificationService::new(self.state.pool(), self.state.events())
    }
}
