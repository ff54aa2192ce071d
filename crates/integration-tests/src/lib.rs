//! Integration tests for Corner Shop.
//!
//! The sync engine and the order/cart rules are exercised end to end against
//! in-memory stand-ins, so these tests need no database and no POS account:
//!
//! - [`MemoryCatalog`] implements `CatalogStore` with the same matching rules
//!   as the `PostgreSQL` queries.
//! - [`FakePos`] implements `PosClient` from scripted records and logs every
//!   write it receives.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p corner-shop-integration-tests
//! ```

#![allow(clippy::missing_panics_doc)]

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use corner_shop_api::db::RepositoryError;
use corner_shop_api::models::{Modifier, NewOrder, Product, ProductDraft, Variant};
use corner_shop_api::pos::{
    CheckoutRequest, CheckoutSession, NewRemoteItem, PosClient, PosError, RemoteCategory,
    RemoteItem, RemoteItemGroup, RemoteItemUpdate, RemoteModifierGroup, RemoteOrder,
};
use corner_shop_api::sync::{CatalogStore, UpsertOutcome};
use corner_shop_core::ProductId;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// MemoryCatalog
// =============================================================================

#[derive(Default)]
struct CatalogData {
    products: Vec<Product>,
    next_id: i32,
    categories: HashMap<String, String>,
    item_groups: HashMap<String, (String, Vec<String>)>,
    modifier_groups: HashMap<String, (String, Vec<Modifier>)>,
    orders: HashMap<String, NewOrder>,
}

/// In-memory catalog store.
#[derive(Default)]
pub struct MemoryCatalog {
    data: Mutex<CatalogData>,
}

impl MemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a product directly, as an admin would.
    pub fn seed(&self, draft: &ProductDraft) -> Product {
        let mut data = lock(&self.data);
        insert(&mut data, draft)
    }

    #[must_use]
    pub fn products(&self) -> Vec<Product> {
        lock(&self.data).products.clone()
    }

    #[must_use]
    pub fn product(&self, id: ProductId) -> Option<Product> {
        lock(&self.data).products.iter().find(|p| p.id == id).cloned()
    }

    #[must_use]
    pub fn category_names(&self) -> Vec<String> {
        let mut names: Vec<String> = lock(&self.data).categories.values().cloned().collect();
        names.sort();
        names
    }

    #[must_use]
    pub fn orders(&self) -> Vec<NewOrder> {
        lock(&self.data).orders.values().cloned().collect()
    }

    #[must_use]
    pub fn item_group_count(&self) -> usize {
        lock(&self.data).item_groups.len()
    }

    #[must_use]
    pub fn modifier_group(&self, pos_group_id: &str) -> Option<(String, Vec<Modifier>)> {
        lock(&self.data).modifier_groups.get(pos_group_id).cloned()
    }
}

fn insert(data: &mut CatalogData, draft: &ProductDraft) -> Product {
    data.next_id += 1;
    let now = Utc::now();
    let product = Product {
        id: ProductId::new(data.next_id),
        name: draft.name.clone(),
        description: draft.description.clone(),
        price: draft.price,
        stock_count: draft.stock_count,
        images: draft.images.clone(),
        categories: draft.categories.clone(),
        variants: draft.variants.clone(),
        pos_item_id: draft.pos_item_id.clone(),
        pos_group_id: draft.pos_group_id.clone(),
        hidden: draft.hidden,
        created_at: now,
        updated_at: now,
    };
    data.products.push(product.clone());
    product
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn find_by_group_id(&self, group_id: &str) -> Result<Option<Product>, RepositoryError> {
        Ok(lock(&self.data)
            .products
            .iter()
            .find(|p| p.pos_group_id.as_deref() == Some(group_id))
            .cloned())
    }

    async fn find_by_pos_item_id(
        &self,
        item_id: &str,
    ) -> Result<Option<Product>, RepositoryError> {
        Ok(lock(&self.data)
            .products
            .iter()
            .find(|p| {
                p.pos_item_id.as_deref() == Some(item_id)
                    || p.variants
                        .iter()
                        .any(|v| v.pos_item_id.as_deref() == Some(item_id))
            })
            .cloned())
    }

    async fn find_by_sku(&self, sku: &str) -> Result<Option<Product>, RepositoryError> {
        Ok(lock(&self.data)
            .products
            .iter()
            .find(|p| p.variants.iter().any(|v| v.sku.as_deref() == Some(sku)))
            .cloned())
    }

    async fn find_unlinked_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Product>, RepositoryError> {
        Ok(lock(&self.data)
            .products
            .iter()
            .find(|p| p.name == name && !p.has_pos_link())
            .cloned())
    }

    async fn insert_product(&self, draft: &ProductDraft) -> Result<Product, RepositoryError> {
        let mut data = lock(&self.data);
        Ok(insert(&mut data, draft))
    }

    async fn update_product(&self, product: &Product) -> Result<Product, RepositoryError> {
        let mut data = lock(&self.data);
        let stored = data
            .products
            .iter_mut()
            .find(|p| p.id == product.id)
            .ok_or(RepositoryError::NotFound)?;
        *stored = Product {
            updated_at: Utc::now(),
            ..product.clone()
        };
        Ok(stored.clone())
    }

    async fn upsert_category(
        &self,
        pos_category_id: &str,
        name: &str,
    ) -> Result<UpsertOutcome, RepositoryError> {
        let mut data = lock(&self.data);
        Ok(match data.categories.get_mut(pos_category_id) {
            Some(current) if current.as_str() == name => UpsertOutcome::Unchanged,
            Some(current) => {
                *current = name.to_string();
                UpsertOutcome::Updated
            }
            None => {
                data.categories
                    .insert(pos_category_id.to_string(), name.to_string());
                UpsertOutcome::Created
            }
        })
    }

    async fn upsert_item_group(
        &self,
        pos_group_id: &str,
        name: &str,
        pos_item_ids: &[String],
    ) -> Result<UpsertOutcome, RepositoryError> {
        let mut data = lock(&self.data);
        let next = (name.to_string(), pos_item_ids.to_vec());
        let existing = data.item_groups.get(pos_group_id).cloned();
        Ok(match existing {
            Some(current) if current == next => UpsertOutcome::Unchanged,
            Some(_) => {
                data.item_groups.insert(pos_group_id.to_string(), next);
                UpsertOutcome::Updated
            }
            None => {
                data.item_groups.insert(pos_group_id.to_string(), next);
                UpsertOutcome::Created
            }
        })
    }

    async fn upsert_modifier_group(
        &self,
        pos_group_id: &str,
        name: &str,
        modifiers: &[Modifier],
    ) -> Result<UpsertOutcome, RepositoryError> {
        let mut data = lock(&self.data);
        let next = (name.to_string(), modifiers.to_vec());
        let existing = data.modifier_groups.get(pos_group_id).cloned();
        Ok(match existing {
            Some(current) if current == next => UpsertOutcome::Unchanged,
            Some(_) => {
                data.modifier_groups.insert(pos_group_id.to_string(), next);
                UpsertOutcome::Updated
            }
            None => {
                data.modifier_groups.insert(pos_group_id.to_string(), next);
                UpsertOutcome::Created
            }
        })
    }

    async fn upsert_pos_order(&self, order: &NewOrder) -> Result<UpsertOutcome, RepositoryError> {
        let key = order
            .pos_order_id
            .clone()
            .ok_or_else(|| RepositoryError::DataCorruption("POS order without ID".to_string()))?;
        let mut data = lock(&self.data);
        Ok(match data.orders.get_mut(&key) {
            Some(current)
                if (&current.items, current.payment_status, current.status, current.total)
                    == (&order.items, order.payment_status, order.status, order.total) =>
            {
                UpsertOutcome::Unchanged
            }
            Some(current) => {
                current.items.clone_from(&order.items);
                current.payment_status = order.payment_status;
                current.status = order.status;
                current.total = order.total;
                UpsertOutcome::Updated
            }
            None => {
                data.orders.insert(key, order.clone());
                UpsertOutcome::Created
            }
        })
    }
}

// =============================================================================
// FakePos
// =============================================================================

/// A write the fake POS received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PosCall {
    CreateItem(NewRemoteItem),
    UpdateItem(String, RemoteItemUpdate),
    CreateItemGroup(String),
    UpdateItemGroup(String, String),
    UpdateInventory(String, i32),
    CreateCheckout(CheckoutRequest),
}

#[derive(Default)]
struct PosData {
    items: Vec<RemoteItem>,
    categories: Vec<RemoteCategory>,
    item_groups: Vec<RemoteItemGroup>,
    modifier_groups: Vec<RemoteModifierGroup>,
    orders: Vec<RemoteOrder>,
    calls: Vec<PosCall>,
    failing: HashSet<&'static str>,
    next_id: u32,
}

/// Scripted POS.
///
/// Writes are logged in order and, for items and groups, applied to the
/// scripted records so a later pull sees them.
#[derive(Default)]
pub struct FakePos {
    data: Mutex<PosData>,
}

impl FakePos {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_item(&self, item: RemoteItem) {
        lock(&self.data).items.push(item);
    }

    pub fn add_category(&self, id: &str, name: &str) {
        lock(&self.data).categories.push(RemoteCategory {
            id: id.to_string(),
            name: name.to_string(),
        });
    }

    pub fn add_item_group(&self, id: &str, name: &str, item_ids: &[&str]) {
        lock(&self.data).item_groups.push(RemoteItemGroup {
            id: id.to_string(),
            name: name.to_string(),
            item_ids: item_ids.iter().map(ToString::to_string).collect(),
        });
    }

    pub fn add_modifier_group(&self, group: RemoteModifierGroup) {
        lock(&self.data).modifier_groups.push(group);
    }

    pub fn add_order(&self, order: RemoteOrder) {
        lock(&self.data).orders.push(order);
    }

    /// Change the on-hand quantity of a scripted item.
    pub fn set_quantity(&self, item_id: &str, quantity: i32) {
        if let Some(item) = lock(&self.data).items.iter_mut().find(|i| i.id == item_id) {
            item.quantity = quantity;
        }
    }

    /// Make every call to `operation` fail (e.g. `"create_item"`).
    pub fn fail(&self, operation: &'static str) {
        lock(&self.data).failing.insert(operation);
    }

    #[must_use]
    pub fn calls(&self) -> Vec<PosCall> {
        lock(&self.data).calls.clone()
    }

    #[must_use]
    pub fn items(&self) -> Vec<RemoteItem> {
        lock(&self.data).items.clone()
    }

    fn check(data: &PosData, operation: &'static str) -> Result<(), PosError> {
        if data.failing.contains(operation) {
            return Err(PosError::Api {
                status: 500,
                message: format!("{operation} unavailable"),
            });
        }
        Ok(())
    }

    fn record(&self, operation: &'static str, call: PosCall) -> Result<MutexGuard<'_, PosData>, PosError> {
        let mut data = lock(&self.data);
        data.calls.push(call);
        Self::check(&data, operation)?;
        Ok(data)
    }
}

/// A scripted POS item with no group, category or images.
#[must_use]
pub fn remote_item(id: &str, name: &str, price_minor: i64, quantity: i32) -> RemoteItem {
    RemoteItem {
        id: id.to_string(),
        name: name.to_string(),
        price_minor,
        sku: Some(format!("SKU-{id}")),
        hidden: false,
        group_id: None,
        category_ids: Vec::new(),
        quantity,
        image_urls: Vec::new(),
    }
}

/// An admin-authored product draft with one variant per `(label, price, qty)`.
#[must_use]
pub fn draft(name: &str, variants: &[(&str, i64, i32)]) -> ProductDraft {
    let variants: Vec<Variant> = variants
        .iter()
        .map(|&(label, price, quantity)| Variant {
            label: label.to_string(),
            price: Decimal::new(price, 2),
            quantity,
            sku: Some(format!("{name}-{label}").to_uppercase().replace(' ', "-")),
            pos_item_id: None,
            images: Vec::new(),
        })
        .collect();
    let mut draft = ProductDraft {
        name: name.to_string(),
        description: String::new(),
        price: variants.iter().map(|v| v.price).min().unwrap_or_default(),
        stock_count: 0,
        images: Vec::new(),
        categories: Vec::new(),
        variants,
        pos_item_id: None,
        pos_group_id: None,
        hidden: false,
    };
    draft.recompute_stock();
    draft
}

#[async_trait]
impl PosClient for FakePos {
    async fn list_items(&self) -> Result<Vec<RemoteItem>, PosError> {
        let data = lock(&self.data);
        Self::check(&data, "list_items")?;
        Ok(data.items.clone())
    }

    async fn list_categories(&self) -> Result<Vec<RemoteCategory>, PosError> {
        let data = lock(&self.data);
        Self::check(&data, "list_categories")?;
        Ok(data.categories.clone())
    }

    async fn list_item_groups(&self) -> Result<Vec<RemoteItemGroup>, PosError> {
        let data = lock(&self.data);
        Self::check(&data, "list_item_groups")?;
        Ok(data.item_groups.clone())
    }

    async fn list_modifier_groups(&self) -> Result<Vec<RemoteModifierGroup>, PosError> {
        let data = lock(&self.data);
        Self::check(&data, "list_modifier_groups")?;
        Ok(data.modifier_groups.clone())
    }

    async fn list_orders(&self) -> Result<Vec<RemoteOrder>, PosError> {
        let data = lock(&self.data);
        Self::check(&data, "list_orders")?;
        Ok(data.orders.clone())
    }

    async fn create_item(&self, item: &NewRemoteItem) -> Result<String, PosError> {
        let mut data = self.record("create_item", PosCall::CreateItem(item.clone()))?;
        data.next_id += 1;
        let id = format!("ITEM-{}", data.next_id);
        data.items.push(RemoteItem {
            id: id.clone(),
            name: item.name.clone(),
            price_minor: item.price_minor,
            sku: item.sku.clone(),
            hidden: item.hidden,
            group_id: item.group_id.clone(),
            category_ids: Vec::new(),
            quantity: 0,
            image_urls: Vec::new(),
        });
        Ok(id)
    }

    async fn update_item(&self, id: &str, update: &RemoteItemUpdate) -> Result<(), PosError> {
        let mut data = self.record(
            "update_item",
            PosCall::UpdateItem(id.to_string(), update.clone()),
        )?;
        let item = data
            .items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| PosError::Api {
                status: 404,
                message: format!("item {id} not found"),
            })?;
        if let Some(name) = &update.name {
            item.name.clone_from(name);
        }
        item.price_minor = update.price_minor;
        item.sku.clone_from(&update.sku);
        item.hidden = update.hidden;
        if update.group_id.is_some() {
            item.group_id.clone_from(&update.group_id);
        }
        Ok(())
    }

    async fn create_item_group(&self, name: &str) -> Result<String, PosError> {
        let mut data = self.record(
            "create_item_group",
            PosCall::CreateItemGroup(name.to_string()),
        )?;
        data.next_id += 1;
        let id = format!("GROUP-{}", data.next_id);
        data.item_groups.push(RemoteItemGroup {
            id: id.clone(),
            name: name.to_string(),
            item_ids: Vec::new(),
        });
        Ok(id)
    }

    async fn update_item_group(&self, id: &str, name: &str) -> Result<(), PosError> {
        let mut data = self.record(
            "update_item_group",
            PosCall::UpdateItemGroup(id.to_string(), name.to_string()),
        )?;
        if let Some(group) = data.item_groups.iter_mut().find(|g| g.id == id) {
            group.name = name.to_string();
        }
        Ok(())
    }

    async fn update_inventory(&self, item_id: &str, quantity: i32) -> Result<(), PosError> {
        let mut data = self.record(
            "update_inventory",
            PosCall::UpdateInventory(item_id.to_string(), quantity),
        )?;
        if let Some(item) = data.items.iter_mut().find(|i| i.id == item_id) {
            item.quantity = quantity;
        }
        Ok(())
    }

    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, PosError> {
        let mut data = self.record(
            "create_checkout_session",
            PosCall::CreateCheckout(request.clone()),
        )?;
        data.next_id += 1;
        Ok(CheckoutSession {
            id: format!("CHK-{}", data.next_id),
            url: format!("https://pos.test/checkout/{}", request.reference),
        })
    }
}
