//! Push direction: mirror a saved local product onto the POS.
//!
//! Three shapes are handled:
//!
//! - **Grouped**: the product already has a POS item group. The group is
//!   renamed, each variant item is updated (price, SKU and visibility only)
//!   and missing variant items are created inside the group.
//! - **Promote**: the product has several variants but no group yet. A
//!   group is created; the first variant takes over the product's previous
//!   standalone item, if any, and the rest are created.
//! - **Standalone**: a single item, updated in place or created.
//!
//! Every POS call is best-effort. Failures are logged and returned in the
//! [`PushOutcome`] so the caller can persist whatever linkage did succeed.

use serde::Serialize;
use tracing::{debug, instrument, warn};

use corner_shop_core::major_to_minor;
use rust_decimal::Decimal;

use crate::models::{Product, Variant};
use crate::pos::{NewRemoteItem, PosClient, PosError, RemoteItemUpdate};

/// One POS call that didn't go through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushFailure {
    /// What was being pushed (product, variant label, group).
    pub target: String,
    pub error: String,
}

/// Result of mirroring a product.
#[derive(Debug, Clone)]
pub struct PushOutcome {
    /// The product with whatever POS IDs were assigned.
    pub product: Product,
    pub failures: Vec<PushFailure>,
    /// True when POS linkage changed and the product should be saved again.
    pub linked: bool,
}

struct Pusher<'a> {
    pos: &'a dyn PosClient,
    failures: Vec<PushFailure>,
}

impl Pusher<'_> {
    fn fail(&mut self, target: impl Into<String>, error: &PosError) {
        let target = target.into();
        warn!(target = %target, error = %error, "POS push failed");
        self.failures.push(PushFailure {
            target,
            error: error.to_string(),
        });
    }

    fn price(&mut self, target: &str, price: Decimal) -> Option<i64> {
        let minor = major_to_minor(price);
        if minor.is_none() {
            self.failures.push(PushFailure {
                target: target.to_string(),
                error: format!("price {price} is out of range"),
            });
        }
        minor
    }

    async fn push_grouped(&mut self, product: &mut Product, group_id: &str) {
        if let Err(e) = self.pos.update_item_group(group_id, &product.name).await {
            self.fail(format!("group {group_id}"), &e);
        }

        let name = product.name.clone();
        let hidden = product.hidden;
        for variant in &mut product.variants {
            self.push_grouped_variant(&name, hidden, group_id, variant, false)
                .await;
        }
    }

    /// Update or create one variant item inside a group.
    ///
    /// `joining` marks an existing standalone item being moved into the
    /// group, which needs the group set on update.
    async fn push_grouped_variant(
        &mut self,
        product_name: &str,
        hidden: bool,
        group_id: &str,
        variant: &mut Variant,
        joining: bool,
    ) {
        let target = format!("{product_name} / {}", variant.label);
        let Some(price_minor) = self.price(&target, variant.price) else {
            return;
        };

        match variant.pos_item_id.as_deref() {
            Some(item_id) => {
                let update = RemoteItemUpdate {
                    name: None,
                    price_minor,
                    sku: variant.sku.clone(),
                    hidden,
                    group_id: joining.then(|| group_id.to_string()),
                };
                if let Err(e) = self.pos.update_item(item_id, &update).await {
                    self.fail(target, &e);
                }
            }
            None => {
                let item = NewRemoteItem {
                    name: format!("{product_name} - {}", variant.label),
                    price_minor,
                    sku: variant.sku.clone(),
                    hidden,
                    group_id: Some(group_id.to_string()),
                };
                match self.pos.create_item(&item).await {
                    Ok(id) => variant.pos_item_id = Some(id),
                    Err(e) => self.fail(target, &e),
                }
            }
        }
    }

    async fn promote(&mut self, product: &mut Product) {
        let group_id = match self.pos.create_item_group(&product.name).await {
            Ok(id) => id,
            Err(e) => {
                self.fail(format!("group for {}", product.name), &e);
                return;
            }
        };
        debug!(group_id = %group_id, product_id = %product.id, "Promoted product to POS group");

        let previous = product.pos_item_id.take();
        let name = product.name.clone();
        let hidden = product.hidden;

        for (index, variant) in product.variants.iter_mut().enumerate() {
            let mut joining = variant.pos_item_id.is_some();
            if index == 0
                && variant.pos_item_id.is_none()
                && let Some(previous) = previous.clone()
            {
                variant.pos_item_id = Some(previous);
                joining = true;
            }
            self.push_grouped_variant(&name, hidden, &group_id, variant, joining)
                .await;
        }

        product.pos_group_id = Some(group_id);
    }

    async fn push_standalone(&mut self, product: &mut Product) {
        let item_id = product
            .pos_item_id
            .clone()
            .or_else(|| product.variants.first().and_then(|v| v.pos_item_id.clone()));
        let Some(price_minor) = self.price(&product.name, product.price) else {
            return;
        };
        let sku = product.variants.first().and_then(|v| v.sku.clone());

        match item_id {
            Some(item_id) => {
                let update = RemoteItemUpdate {
                    name: Some(product.name.clone()),
                    price_minor,
                    sku,
                    hidden: product.hidden,
                    group_id: None,
                };
                if let Err(e) = self.pos.update_item(&item_id, &update).await {
                    self.fail(product.name.clone(), &e);
                }
                product.pos_item_id = Some(item_id);
            }
            None => {
                let item = NewRemoteItem {
                    name: product.name.clone(),
                    price_minor,
                    sku,
                    hidden: product.hidden,
                    group_id: None,
                };
                match self.pos.create_item(&item).await {
                    Ok(id) => product.pos_item_id = Some(id),
                    Err(e) => {
                        self.fail(product.name.clone(), &e);
                        return;
                    }
                }
            }
        }

        if let Some(variant) = product.variants.first_mut()
            && variant.pos_item_id.is_none()
        {
            variant.pos_item_id.clone_from(&product.pos_item_id);
        }
    }

    async fn push_inventory(&mut self, product: &Product) {
        let targets: Vec<(&str, i32)> = if product.pos_group_id.is_some() || product.is_multi_variant() {
            product
                .variants
                .iter()
                .filter_map(|v| v.pos_item_id.as_deref().map(|id| (id, v.quantity)))
                .collect()
        } else {
            product
                .pos_item_id
                .as_deref()
                .map(|id| (id, product.stock_count))
                .into_iter()
                .collect()
        };

        for (item_id, quantity) in targets {
            if let Err(e) = self.pos.update_inventory(item_id, quantity).await {
                self.fail(format!("stock for {item_id}"), &e);
            }
        }
    }
}

fn linkage(product: &Product) -> (Option<String>, Option<String>, Vec<Option<String>>) {
    (
        product.pos_item_id.clone(),
        product.pos_group_id.clone(),
        product.variants.iter().map(|v| v.pos_item_id.clone()).collect(),
    )
}

/// Mirror a saved product onto the POS, then push its stock levels.
///
/// Never fails: POS errors are collected in [`PushOutcome::failures`].
#[instrument(skip(pos, product), fields(product_id = %product.id))]
pub async fn mirror_product(pos: &dyn PosClient, mut product: Product) -> PushOutcome {
    let before = linkage(&product);
    let mut pusher = Pusher {
        pos,
        failures: Vec::new(),
    };

    if let Some(group_id) = product.pos_group_id.clone() {
        pusher.push_grouped(&mut product, &group_id).await;
    } else if product.is_multi_variant() {
        pusher.promote(&mut product).await;
    } else {
        pusher.push_standalone(&mut product).await;
    }
    pusher.push_inventory(&product).await;

    let linked = linkage(&product) != before;
    if pusher.failures.is_empty() {
        debug!(linked, "Product mirrored to POS");
    }

    PushOutcome {
        product,
        failures: pusher.failures,
        linked,
    }
}

/// Push only stock levels for a product's linked items.
///
/// Used after local stock moves (orders, cancellations).
pub async fn push_inventory(pos: &dyn PosClient, product: &Product) -> Vec<PushFailure> {
    let mut pusher = Pusher {
        pos,
        failures: Vec::new(),
    };
    pusher.push_inventory(product).await;
    pusher.failures
}
