//! Pull direction: POS records into the local catalog.
//!
//! Runs sequentially over each remote collection. Every record is upserted
//! on its own; one failure is counted and the run moves on.

use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::{debug, info, instrument};

use corner_shop_core::{
    OrderSource, OrderStatus, PaymentMethod, PaymentStatus, ProductId, minor_to_major,
};

use super::CatalogStore;
use super::identity::{IdentityKeys, resolve};
use super::report::{SyncReport, UpsertOutcome};
use crate::db::RepositoryError;
use crate::models::{Modifier, NewOrder, OrderItem, Product, ProductDraft, Variant};
use crate::pos::{PosClient, RemoteItem, RemoteOrder};

/// Label for the only variant of an ungrouped item.
pub const DEFAULT_VARIANT_LABEL: &str = "Default";

/// One pull sync run.
pub struct PullSync<'a> {
    pos: &'a dyn PosClient,
    store: &'a dyn CatalogStore,
}

/// POS items that become one local product.
#[derive(Debug)]
struct Listing<'r> {
    group_id: Option<&'r str>,
    name: String,
    items: Vec<&'r RemoteItem>,
}

impl<'a> PullSync<'a> {
    #[must_use]
    pub const fn new(pos: &'a dyn PosClient, store: &'a dyn CatalogStore) -> Self {
        Self { pos, store }
    }

    /// Import everything from the POS.
    ///
    /// Collections are processed in dependency order: categories, item
    /// groups, modifier groups, items, then orders.
    #[instrument(skip(self))]
    pub async fn run(&self) -> SyncReport {
        let mut report = SyncReport::default();

        let category_names = self.pull_categories(&mut report).await;
        let group_names = self.pull_item_groups(&mut report).await;
        self.pull_modifier_groups(&mut report).await;
        self.pull_items(&category_names, &group_names, &mut report)
            .await;
        self.pull_orders(&mut report).await;

        info!(
            products_created = report.products.created,
            products_updated = report.products.updated,
            orders_created = report.orders.created,
            failed = report.failed(),
            restocked = report.restocked.len(),
            "POS pull sync finished"
        );
        report
    }

    async fn pull_categories(&self, report: &mut SyncReport) -> HashMap<String, String> {
        let categories = match self.pos.list_categories().await {
            Ok(categories) => categories,
            Err(e) => {
                report.error(format!("fetching categories: {e}"));
                return HashMap::new();
            }
        };

        let mut names = HashMap::with_capacity(categories.len());
        for category in categories {
            match self.store.upsert_category(&category.id, &category.name).await {
                Ok(outcome) => report.categories.record(outcome),
                Err(e) => {
                    report.categories.failed += 1;
                    report.error(format!("category {}: {e}", category.id));
                }
            }
            names.insert(category.id, category.name);
        }
        names
    }

    async fn pull_item_groups(&self, report: &mut SyncReport) -> HashMap<String, String> {
        let groups = match self.pos.list_item_groups().await {
            Ok(groups) => groups,
            Err(e) => {
                report.error(format!("fetching item groups: {e}"));
                return HashMap::new();
            }
        };

        let mut names = HashMap::with_capacity(groups.len());
        for group in groups {
            match self
                .store
                .upsert_item_group(&group.id, &group.name, &group.item_ids)
                .await
            {
                Ok(outcome) => report.item_groups.record(outcome),
                Err(e) => {
                    report.item_groups.failed += 1;
                    report.error(format!("item group {}: {e}", group.id));
                }
            }
            names.insert(group.id, group.name);
        }
        names
    }

    async fn pull_modifier_groups(&self, report: &mut SyncReport) {
        let groups = match self.pos.list_modifier_groups().await {
            Ok(groups) => groups,
            Err(e) => {
                report.error(format!("fetching modifier groups: {e}"));
                return;
            }
        };

        for group in groups {
            let modifiers: Vec<Modifier> = group
                .modifiers
                .iter()
                .map(|m| Modifier {
                    pos_modifier_id: m.id.clone(),
                    name: m.name.clone(),
                    price: minor_to_major(m.price_minor),
                })
                .collect();

            match self
                .store
                .upsert_modifier_group(&group.id, &group.name, &modifiers)
                .await
            {
                Ok(outcome) => report.modifier_groups.record(outcome),
                Err(e) => {
                    report.modifier_groups.failed += 1;
                    report.error(format!("modifier group {}: {e}", group.id));
                }
            }
        }
    }

    async fn pull_items(
        &self,
        category_names: &HashMap<String, String>,
        group_names: &HashMap<String, String>,
        report: &mut SyncReport,
    ) {
        let items = match self.pos.list_items().await {
            Ok(items) => items,
            Err(e) => {
                report.error(format!("fetching items: {e}"));
                return;
            }
        };

        for listing in group_items(&items, group_names) {
            let incoming = build_draft(&listing, category_names);
            let label = listing
                .group_id
                .map_or_else(|| listing.name.clone(), |g| format!("group {g}"));

            match self.upsert_listing(&listing, incoming).await {
                Ok((outcome, id, restocked)) => report.record_product(outcome, id, restocked),
                Err(e) => {
                    report.products.failed += 1;
                    report.error(format!("{label}: {e}"));
                }
            }
        }
    }

    async fn upsert_listing(
        &self,
        listing: &Listing<'_>,
        incoming: ProductDraft,
    ) -> Result<(UpsertOutcome, ProductId, bool), RepositoryError> {
        let keys = IdentityKeys {
            group_id: listing.group_id,
            item_ids: listing.items.iter().map(|i| i.id.as_str()).collect(),
            skus: listing.items.iter().filter_map(|i| i.sku.as_deref()).collect(),
            name: &listing.name,
        };

        let Some((existing, matched_by)) = resolve(self.store, &keys).await? else {
            let created = self.store.insert_product(&incoming).await?;
            debug!(product_id = %created.id, name = %created.name, "Created product from POS");
            return Ok((UpsertOutcome::Created, created.id, false));
        };

        let merged = merge_into(&existing, incoming);
        if merged == existing {
            return Ok((UpsertOutcome::Unchanged, existing.id, false));
        }

        let saved = self.store.update_product(&merged).await?;
        debug!(product_id = %saved.id, ?matched_by, "Updated product from POS");

        let restocked = existing.stock_count <= 0 && saved.stock_count > 0;
        Ok((UpsertOutcome::Updated, saved.id, restocked))
    }

    async fn pull_orders(&self, report: &mut SyncReport) {
        let orders = match self.pos.list_orders().await {
            Ok(orders) => orders,
            Err(e) => {
                report.error(format!("fetching orders: {e}"));
                return;
            }
        };

        for remote in &orders {
            match self.mirror_order(remote).await {
                Ok(outcome) => report.orders.record(outcome),
                Err(e) => {
                    report.orders.failed += 1;
                    report.error(format!("order {}: {e}", remote.id));
                }
            }
        }
    }

    async fn mirror_order(&self, remote: &RemoteOrder) -> Result<UpsertOutcome, RepositoryError> {
        let (status, payment_status) = order_status(remote);

        let mut items = Vec::with_capacity(remote.line_items.len());
        for line in &remote.line_items {
            let product = match line.item_id.as_deref() {
                Some(item_id) => self.store.find_by_pos_item_id(item_id).await?,
                None => None,
            };
            let variant = product.as_ref().and_then(|p| {
                p.variants
                    .iter()
                    .find(|v| v.pos_item_id.is_some() && v.pos_item_id == line.item_id)
            });

            items.push(OrderItem {
                product_id: product.as_ref().map(|p| p.id),
                name: line.name.clone(),
                variant_label: variant
                    .map(|v| v.label.clone())
                    .filter(|l| l != DEFAULT_VARIANT_LABEL),
                sku: variant.and_then(|v| v.sku.clone()),
                unit_price: minor_to_major(line.price_minor),
                quantity: line.quantity,
                status,
            });
        }

        let order = NewOrder {
            user_id: None,
            source: OrderSource::Pos,
            pos_order_id: Some(remote.id.clone()),
            items,
            address: None,
            payment_method: PaymentMethod::InStore,
            payment_status,
            status,
            total: minor_to_major(remote.total_minor),
            discount_code: None,
        };
        self.store.upsert_pos_order(&order).await
    }
}

/// Map POS order and payment states onto local statuses.
fn order_status(remote: &RemoteOrder) -> (OrderStatus, PaymentStatus) {
    let payment = match remote.payment_state.as_deref().map(str::to_ascii_uppercase).as_deref() {
        Some("PAID") => PaymentStatus::Paid,
        Some("REFUNDED" | "PARTIALLY_REFUNDED") => PaymentStatus::Refunded,
        Some("FAILED") => PaymentStatus::Failed,
        _ => PaymentStatus::Pending,
    };

    let status = if payment == PaymentStatus::Refunded {
        OrderStatus::Cancelled
    } else {
        match remote.state.as_deref() {
            Some("locked") => OrderStatus::Processing,
            _ => OrderStatus::Pending,
        }
    };
    (status, payment)
}

/// Split items into listings: one per item group (in first-seen order),
/// then one per ungrouped item.
fn group_items<'r>(
    items: &'r [RemoteItem],
    group_names: &HashMap<String, String>,
) -> Vec<Listing<'r>> {
    let mut grouped: Vec<Listing<'r>> = Vec::new();
    let mut positions: HashMap<&'r str, usize> = HashMap::new();
    let mut standalone = Vec::new();

    for item in items {
        match item.group_id.as_deref() {
            Some(group_id) => {
                if let Some(listing) = positions
                    .get(group_id)
                    .and_then(|&pos| grouped.get_mut(pos))
                {
                    listing.items.push(item);
                    continue;
                }
                positions.insert(group_id, grouped.len());
                grouped.push(Listing {
                    group_id: Some(group_id),
                    name: group_names
                        .get(group_id)
                        .cloned()
                        .unwrap_or_else(|| item.name.clone()),
                    items: vec![item],
                });
            }
            None => standalone.push(Listing {
                group_id: None,
                name: item.name.clone(),
                items: vec![item],
            }),
        }
    }

    grouped.extend(standalone);
    grouped
}

/// Variant label from an item name, minus the group name prefix.
///
/// `"Cold Brew - Large"` in group `"Cold Brew"` becomes `"Large"`.
#[must_use]
pub fn variant_label(group_name: &str, item_name: &str) -> String {
    let stripped = item_name
        .strip_prefix(group_name)
        .map(|rest| rest.trim_start_matches(|c: char| c.is_whitespace() || "-–:/|,".contains(c)))
        .unwrap_or(item_name)
        .trim();

    if stripped.is_empty() {
        item_name.trim().to_string()
    } else {
        stripped.to_string()
    }
}

/// Append URLs from `extra` that aren't already in `base`, in order.
fn union_urls(base: &[String], extra: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(base.len() + extra.len());
    for url in base.iter().chain(extra) {
        if !out.contains(url) {
            out.push(url.clone());
        }
    }
    out
}

fn min_price(variants: &[Variant]) -> Option<Decimal> {
    variants.iter().map(|v| v.price).min()
}

/// Local product fields for a listing, as if it were new.
fn build_draft(listing: &Listing<'_>, category_names: &HashMap<String, String>) -> ProductDraft {
    let grouped = listing.group_id.is_some();

    let variants: Vec<Variant> = listing
        .items
        .iter()
        .map(|item| Variant {
            label: if grouped {
                variant_label(&listing.name, &item.name)
            } else {
                DEFAULT_VARIANT_LABEL.to_string()
            },
            price: minor_to_major(item.price_minor),
            quantity: item.quantity.max(0),
            sku: item.sku.clone(),
            pos_item_id: Some(item.id.clone()),
            images: union_urls(&[], &item.image_urls),
        })
        .collect();

    let images = variants
        .iter()
        .fold(Vec::new(), |acc, v| union_urls(&acc, &v.images));

    let mut categories: Vec<String> = Vec::new();
    for name in listing
        .items
        .iter()
        .flat_map(|i| &i.category_ids)
        .filter_map(|id| category_names.get(id))
    {
        if !categories.contains(name) {
            categories.push(name.clone());
        }
    }

    let mut draft = ProductDraft {
        name: listing.name.clone(),
        description: String::new(),
        price: min_price(&variants).unwrap_or_default(),
        stock_count: 0,
        images,
        categories,
        pos_item_id: if grouped {
            None
        } else {
            listing.items.first().map(|i| i.id.clone())
        },
        pos_group_id: listing.group_id.map(String::from),
        hidden: listing.items.iter().all(|i| i.hidden),
        variants,
    };
    draft.recompute_stock();
    draft
}

/// Match incoming variants to stored ones and carry local data across.
///
/// Stored variants are matched by POS item ID, then SKU. Matched variants
/// keep their local images. Linked variants that no longer appear remotely
/// are dropped; variants that were never pushed are kept.
fn merge_variants(existing: &[Variant], incoming: Vec<Variant>) -> Vec<Variant> {
    let mut pool: Vec<Option<&Variant>> = existing.iter().map(Some).collect();
    let mut merged = Vec::with_capacity(incoming.len());

    for mut variant in incoming {
        let position = pool
            .iter()
            .position(|slot| {
                slot.is_some_and(|local| {
                    local.pos_item_id.is_some() && local.pos_item_id == variant.pos_item_id
                })
            })
            .or_else(|| {
                let sku = variant.sku.as_deref()?;
                pool.iter()
                    .position(|slot| slot.is_some_and(|local| local.sku.as_deref() == Some(sku)))
            });

        if let Some(local) = position.and_then(|i| pool.get_mut(i)).and_then(Option::take) {
            variant.images = union_urls(&local.images, &variant.images);
            if variant.sku.is_none() {
                variant.sku.clone_from(&local.sku);
            }
        }
        merged.push(variant);
    }

    merged.extend(
        pool.into_iter()
            .flatten()
            .filter(|local| local.pos_item_id.is_none())
            .cloned(),
    );
    merged
}

/// Fold a freshly built draft into the stored product.
///
/// Description and local images survive; linkage, pricing and stock come
/// from the POS.
fn merge_into(existing: &Product, incoming: ProductDraft) -> Product {
    let mut merged = existing.clone();

    merged.name = incoming.name;
    merged.images = union_urls(&existing.images, &incoming.images);
    merged.categories = union_urls(&existing.categories, &incoming.categories);
    merged.variants = merge_variants(&existing.variants, incoming.variants);
    merged.pos_item_id = incoming.pos_item_id;
    merged.pos_group_id = incoming.pos_group_id;
    merged.hidden = incoming.hidden;
    merged.price = min_price(&merged.variants).unwrap_or(incoming.price);
    merged.recompute_stock();
    merged
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::models::product::tests::{product, variant};

    fn item(id: &str, name: &str, price: i64, qty: i32, group: Option<&str>) -> RemoteItem {
        RemoteItem {
            id: id.to_string(),
            name: name.to_string(),
            price_minor: price,
            sku: Some(format!("SKU-{id}")),
            hidden: false,
            group_id: group.map(String::from),
            category_ids: vec![],
            quantity: qty,
            image_urls: vec![],
        }
    }

    #[test]
    fn test_variant_label_strips_group_prefix() {
        assert_eq!(variant_label("Cold Brew", "Cold Brew - Large"), "Large");
        assert_eq!(variant_label("Cold Brew", "Cold Brew: 16oz"), "16oz");
        assert_eq!(variant_label("Cold Brew", "Cold Brew"), "Cold Brew");
        assert_eq!(variant_label("Cold Brew", "Nitro"), "Nitro");
    }

    #[test]
    fn test_group_items_orders_groups_first() {
        let items = vec![
            item("A", "Scone", 300, 1, None),
            item("B", "Brew - S", 500, 2, Some("G")),
            item("C", "Brew - L", 700, 3, Some("G")),
        ];
        let names = HashMap::from([("G".to_string(), "Brew".to_string())]);
        let listings = group_items(&items, &names);

        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].name, "Brew");
        assert_eq!(listings[0].items.len(), 2);
        assert_eq!(listings[1].name, "Scone");
    }

    #[test]
    fn test_group_draft_uses_min_price_and_summed_stock() {
        let items = vec![
            item("B", "Brew - S", 500, 2, Some("G")),
            item("C", "Brew - L", 700, 3, Some("G")),
        ];
        let names = HashMap::from([("G".to_string(), "Brew".to_string())]);
        let listings = group_items(&items, &names);
        let draft = build_draft(&listings[0], &HashMap::new());

        assert_eq!(draft.price, Decimal::new(500, 2));
        assert_eq!(draft.stock_count, 5);
        assert_eq!(draft.pos_group_id.as_deref(), Some("G"));
        assert_eq!(draft.pos_item_id, None);
        assert_eq!(draft.variants[0].label, "S");
        assert_eq!(draft.variants[1].label, "L");
    }

    #[test]
    fn test_images_are_deduplicated_in_order() {
        let mut a = item("B", "Brew - S", 500, 2, Some("G"));
        a.image_urls = vec!["x.jpg".into(), "y.jpg".into()];
        let mut b = item("C", "Brew - L", 700, 3, Some("G"));
        b.image_urls = vec!["y.jpg".into(), "z.jpg".into(), "x.jpg".into()];
        let items = vec![a, b];
        let listings = group_items(&items, &HashMap::new());
        let draft = build_draft(&listings[0], &HashMap::new());

        assert_eq!(draft.images, vec!["x.jpg", "y.jpg", "z.jpg"]);
    }

    #[test]
    fn test_categories_resolve_to_names() {
        let mut a = item("A", "Scone", 300, 1, None);
        a.category_ids = vec!["C1".into(), "C2".into(), "C1".into()];
        let items = vec![a];
        let listings = group_items(&items, &HashMap::new());
        let categories = HashMap::from([
            ("C1".to_string(), "Bakery".to_string()),
            ("C2".to_string(), "Breakfast".to_string()),
        ]);
        let draft = build_draft(&listings[0], &categories);
        assert_eq!(draft.categories, vec!["Bakery", "Breakfast"]);
        assert_eq!(draft.variants[0].label, DEFAULT_VARIANT_LABEL);
        assert_eq!(draft.pos_item_id.as_deref(), Some("A"));
    }

    #[test]
    fn test_merge_keeps_local_fields() {
        let mut local_variant = variant("S", "SKU-B", 500, 0);
        local_variant.pos_item_id = Some("B".into());
        local_variant.images = vec!["local.jpg".into()];
        let mut unpushed = variant("XL", "SKU-XL", 900, 1);
        unpushed.pos_item_id = None;
        let mut stale = variant("M", "SKU-M", 600, 4);
        stale.pos_item_id = Some("GONE".into());

        let mut existing = product(vec![local_variant, stale, unpushed]);
        existing.description = "Slow steeped".into();
        existing.images = vec!["hero.jpg".into()];
        existing.pos_group_id = Some("G".into());

        let items = vec![
            item("B", "Brew - S", 500, 2, Some("G")),
            item("C", "Brew - L", 700, 3, Some("G")),
        ];
        let names = HashMap::from([("G".to_string(), "Brew".to_string())]);
        let listings = group_items(&items, &names);
        let merged = merge_into(&existing, build_draft(&listings[0], &HashMap::new()));

        assert_eq!(merged.description, "Slow steeped");
        assert_eq!(merged.images, vec!["hero.jpg"]);
        let labels: Vec<&str> = merged.variants.iter().map(|v| v.label.as_str()).collect();
        assert_eq!(labels, vec!["S", "L", "XL"]);
        assert_eq!(merged.variants[0].images, vec!["local.jpg"]);
        assert_eq!(merged.stock_count, 6);
        assert_eq!(merged.price, Decimal::new(500, 2));
    }

    #[test]
    fn test_merge_matches_by_sku_when_unlinked() {
        let existing = product(vec![variant("Small", "SKU-B", 450, 0)]);
        let items = vec![item("B", "Brew", 500, 2, None)];
        let listings = group_items(&items, &HashMap::new());
        let merged = merge_into(&existing, build_draft(&listings[0], &HashMap::new()));

        assert_eq!(merged.variants.len(), 1);
        assert_eq!(merged.variants[0].pos_item_id.as_deref(), Some("B"));
        assert_eq!(merged.pos_item_id.as_deref(), Some("B"));
        assert_eq!(merged.stock_count, 2);
    }

    #[test]
    fn test_remerging_same_data_is_unchanged() {
        let items = vec![
            item("B", "Brew - S", 500, 2, Some("G")),
            item("C", "Brew - L", 700, 3, Some("G")),
        ];
        let listings = group_items(&items, &HashMap::new());
        let first = merge_into(&product(vec![]), build_draft(&listings[0], &HashMap::new()));
        let second = merge_into(&first, build_draft(&listings[0], &HashMap::new()));
        assert_eq!(first, second);
    }

    #[test]
    fn test_order_status_mapping() {
        let mut remote = RemoteOrder {
            id: "O".into(),
            state: Some("locked".into()),
            payment_state: Some("paid".into()),
            total_minor: 0,
            created_at: None,
            line_items: vec![],
        };
        assert_eq!(
            order_status(&remote),
            (OrderStatus::Processing, PaymentStatus::Paid)
        );

        remote.payment_state = Some("REFUNDED".into());
        assert_eq!(
            order_status(&remote),
            (OrderStatus::Cancelled, PaymentStatus::Refunded)
        );

        remote.state = Some("open".into());
        remote.payment_state = None;
        assert_eq!(
            order_status(&remote),
            (OrderStatus::Pending, PaymentStatus::Pending)
        );
    }
}
