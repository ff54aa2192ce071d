//! Order placement and status changes, with their stock side effects.
//!
//! Stock moves are sequential read-modify-write per product. Two orders
//! racing on the same product can overwrite each other's decrement.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use corner_shop_core::{
    OrderId, OrderSource, OrderStatus, PaymentMethod, PaymentStatus, ProductId, major_to_minor,
};

use crate::db::{CartRepository, OrderRepository, ProductRepository, SettingsRepository};
use crate::error::{AppError, Result};
use crate::events::EventKind;
use crate::models::{
    Address, Cart, CurrentUser, NewOrder, Order, OrderError, OrderItem, Product, StockChange,
    StockError,
};
use crate::pos::{CheckoutLine, CheckoutRequest};
use crate::services::catalog::CatalogService;
use crate::services::discounts::{DiscountService, discount_amount};
use crate::services::notifications::{NotificationService, is_restock};
use crate::state::AppState;
use crate::sync::push_inventory;

/// Checkout form.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrder {
    pub address: Address,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub discount_code: Option<String>,
}

/// Priced lines and the stock they take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPlan {
    pub items: Vec<OrderItem>,
    pub changes: Vec<StockChange>,
    pub subtotal: Decimal,
}

/// Snapshot a cart into order lines, checking every line against stock.
///
/// Lines are taken from a working copy of each product, so several lines
/// drawing on the same variant are checked against its stock together.
///
/// # Errors
///
/// Returns `OrderError::EmptyCart` or `OrderError::Unavailable` for the
/// first line that can't be filled.
pub fn plan_order(
    cart: &Cart,
    products: &HashMap<ProductId, Product>,
) -> std::result::Result<OrderPlan, OrderError> {
    if cart.items.is_empty() {
        return Err(OrderError::EmptyCart);
    }

    let mut plan = OrderPlan {
        items: Vec::with_capacity(cart.items.len()),
        changes: Vec::with_capacity(cart.items.len()),
        subtotal: Decimal::ZERO,
    };
    let mut remaining: HashMap<ProductId, Product> = HashMap::new();

    for line in &cart.items {
        let sku = line.variant_sku.as_deref();
        let product = products
            .get(&line.product_id)
            .filter(|p| !p.hidden)
            .ok_or_else(|| OrderError::Unavailable {
                name: format!("product {}", line.product_id),
                reason: "no longer available".to_string(),
            })?;
        let unavailable = |reason: String| OrderError::Unavailable {
            name: product.name.clone(),
            reason,
        };

        if line.quantity <= 0 {
            return Err(unavailable(format!("invalid quantity {}", line.quantity)));
        }
        let variant = product
            .line_variant(sku)
            .map_err(|e| unavailable(e.to_string()))?;
        let unit_price = product
            .unit_price(sku)
            .map_err(|e| unavailable(e.to_string()))?;
        remaining
            .entry(product.id)
            .or_insert_with(|| product.clone())
            .adjust_stock(sku, -line.quantity)
            .map_err(|e| match e {
                StockError::Insufficient { available } => {
                    unavailable(format!("only {} left in stock", available.max(0)))
                }
                other => unavailable(other.to_string()),
            })?;

        let item = OrderItem {
            product_id: Some(product.id),
            name: product.name.clone(),
            variant_label: variant.map(|v| v.label.clone()),
            sku: variant
                .and_then(|v| v.sku.clone())
                .or_else(|| line.variant_sku.clone()),
            unit_price,
            quantity: line.quantity,
            status: OrderStatus::Pending,
        };
        plan.subtotal += item.total();
        plan.changes.push(StockChange {
            product_id: product.id,
            sku: item.sku.clone(),
            delta: -line.quantity,
        });
        plan.items.push(item);
    }
    Ok(plan)
}

/// Order total: discounted subtotal plus shipping.
#[must_use]
pub fn order_total(subtotal: Decimal, shipping_fee: Decimal, percent_off: Option<i32>) -> Decimal {
    let discount = percent_off.map_or(Decimal::ZERO, |pct| discount_amount(subtotal, pct));
    subtotal - discount + shipping_fee
}

/// Lines for a hosted card checkout.
///
/// Discounted orders go through as one line for the total, since the
/// discount can't be spread over lines exactly.
fn checkout_lines(order: &Order) -> Option<Vec<CheckoutLine>> {
    if order.discount_code.is_some() {
        return Some(vec![CheckoutLine {
            name: format!("Order #{}", order.id),
            price_minor: major_to_minor(order.total)?,
            quantity: 1,
        }]);
    }

    let mut lines = Vec::with_capacity(order.items.len() + 1);
    let mut subtotal = Decimal::ZERO;
    for item in &order.items {
        subtotal += item.total();
        let name = match &item.variant_label {
            Some(label) => format!("{} - {label}", item.name),
            None => item.name.clone(),
        };
        lines.push(CheckoutLine {
            name,
            price_minor: major_to_minor(item.unit_price)?,
            quantity: item.quantity,
        });
    }
    let shipping = order.total - subtotal;
    if shipping > Decimal::ZERO {
        lines.push(CheckoutLine {
            name: "Shipping".to_string(),
            price_minor: major_to_minor(shipping)?,
            quantity: 1,
        });
    }
    Some(lines)
}

/// Order service.
pub struct OrderService<'a> {
    state: &'a AppState,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    fn orders(&self) -> OrderRepository<'a> {
        OrderRepository::new(self.state.pool())
    }

    fn products(&self) -> ProductRepository<'a> {
        ProductRepository::new(self.state.pool())
    }

    /// Place an order from the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `OrderError` variants for empty carts or missing stock,
    /// `AppError::Discount` for bad codes, and POS errors when a card
    /// checkout session can't be opened.
    #[instrument(skip(self, user, input), fields(user_id = %user.id))]
    pub async fn place(&self, user: &CurrentUser, input: PlaceOrder) -> Result<Order> {
        if input.payment_method == PaymentMethod::InStore {
            return Err(AppError::BadRequest(
                "in-store payment is only for register orders".to_string(),
            ));
        }
        if input.payment_method == PaymentMethod::Card && self.state.pos().is_none() {
            return Err(AppError::BadRequest(
                "card payments are not available".to_string(),
            ));
        }

        let carts = CartRepository::new(self.state.pool());
        let cart = carts.get(user.id).await?;

        let mut products = HashMap::new();
        for line in &cart.items {
            if !products.contains_key(&line.product_id)
                && let Some(product) = self.products().get(line.product_id).await?
            {
                products.insert(product.id, product);
            }
        }
        let plan = plan_order(&cart, &products)?;

        let discounts = DiscountService::new(self.state.pool());
        let discount = match input.discount_code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => Some(discounts.validate(code).await?),
            _ => None,
        };
        let settings = SettingsRepository::new(self.state.pool()).get().await?;
        let total = order_total(
            plan.subtotal,
            settings.shipping_fee,
            discount.as_ref().map(|d| d.percent_off),
        );

        for change in &plan.changes {
            if let Some(product) = products.get_mut(&change.product_id) {
                product.adjust_stock(change.sku.as_deref(), change.delta)?;
                self.products().save_stock(product).await?;
            }
        }

        let order = self
            .orders()
            .create(&NewOrder {
                user_id: Some(user.id),
                source: OrderSource::Storefront,
                pos_order_id: None,
                items: plan.items,
                address: Some(input.address),
                payment_method: input.payment_method,
                payment_status: PaymentStatus::Pending,
                status: OrderStatus::Pending,
                total,
                discount_code: discount.as_ref().map(|d| d.code.clone()),
            })
            .await?;
        info!(order_id = %order.id, total = %order.total, "Order placed");

        let order = if order.payment_method == PaymentMethod::Card {
            match self.open_checkout(order.clone(), user).await {
                Ok(order) => order,
                Err(e) => {
                    warn!(order_id = %order.id, error = %e, "Checkout session failed; cancelling order");
                    self.change_status(order.id, OrderStatus::Cancelled).await?;
                    return Err(e);
                }
            }
        } else {
            order
        };

        // Only counted once payment setup succeeded.
        if let Some(discount) = &discount
            && let Err(e) = discounts.redeem(discount).await
        {
            warn!(code = %discount.code, error = %e, "Discount usage not recorded");
        }

        carts.clear(user.id).await?;
        self.after_stock_moved(products.values()).await;

        let events = self.state.events();
        events.to_user(user.id, EventKind::CartUpdated);
        events.to_user(
            user.id,
            EventKind::OrderUpdated {
                order_id: order.id,
                status: order.status,
            },
        );
        Ok(order)
    }

    async fn open_checkout(&self, mut order: Order, user: &CurrentUser) -> Result<Order> {
        let pos = self
            .state
            .pos()
            .ok_or_else(|| AppError::BadRequest("card payments are not available".to_string()))?;
        let lines = checkout_lines(&order)
            .ok_or_else(|| AppError::Internal(format!("order {} total out of range", order.id)))?;

        let session = pos
            .create_checkout_session(&CheckoutRequest {
                reference: order.id.to_string(),
                customer_email: Some(user.email.as_str().to_string()),
                lines,
            })
            .await?;
        order.checkout_url = Some(session.url);
        Ok(self.orders().save(&order).await?)
    }

    /// A user's own order.
    ///
    /// # Errors
    ///
    /// Returns not found for unknown orders and orders of other users.
    pub async fn get_for_user(&self, user: &CurrentUser, id: OrderId) -> Result<Order> {
        self.orders()
            .get(id)
            .await?
            .filter(|o| o.user_id == Some(user.id))
            .ok_or_else(|| AppError::NotFound("Order".to_string()))
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn list_for_user(&self, user: &CurrentUser) -> Result<Vec<Order>> {
        Ok(self.orders().list_for_user(user.id).await?)
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn list_all(&self, status: Option<OrderStatus>) -> Result<Vec<Order>> {
        Ok(self.orders().list_all(status).await?)
    }

    /// Customers may cancel their own orders while still pending.
    ///
    /// # Errors
    ///
    /// Returns not found for other users' orders and a conflict once the
    /// order has moved on.
    pub async fn cancel_for_user(&self, user: &CurrentUser, id: OrderId) -> Result<Order> {
        let order = self.get_for_user(user, id).await?;
        if order.status != OrderStatus::Pending {
            return Err(OrderError::InvalidTransition {
                from: order.status,
                to: OrderStatus::Cancelled,
            }
            .into());
        }
        self.change_status(id, OrderStatus::Cancelled).await
    }

    /// Move an order through its status machine.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidTransition` for disallowed moves.
    #[instrument(skip(self))]
    pub async fn change_status(&self, id: OrderId, next: OrderStatus) -> Result<Order> {
        let mut order = self
            .orders()
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        let restores = order.transition(next)?;
        let order = self.orders().save(&order).await?;
        self.restore_stock(&order, &restores).await?;
        self.announce(&order);
        Ok(order)
    }

    /// Move one item through the status machine.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::UnknownItem` or `OrderError::InvalidTransition`.
    #[instrument(skip(self))]
    pub async fn change_item_status(
        &self,
        id: OrderId,
        index: usize,
        next: OrderStatus,
    ) -> Result<Order> {
        let mut order = self
            .orders()
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        let restore = order.transition_item(index, next)?;
        let order = self.orders().save(&order).await?;
        self.restore_stock(&order, restore.as_slice()).await?;
        self.announce(&order);
        Ok(order)
    }

    /// Put cancelled stock back. POS orders never took local stock.
    async fn restore_stock(&self, order: &Order, changes: &[StockChange]) -> Result<()> {
        if order.source == OrderSource::Pos || changes.is_empty() {
            return Ok(());
        }

        let notifications = NotificationService::new(self.state.pool(), self.state.events());
        let mut touched = Vec::new();
        for change in changes {
            let Some(mut product) = self.products().get(change.product_id).await? else {
                warn!(product_id = %change.product_id, "Cancelled item's product no longer exists");
                continue;
            };
            let before = product.stock_count;
            if let Err(e) = product.adjust_stock(change.sku.as_deref(), change.delta) {
                warn!(product_id = %product.id, error = %e, "Could not restore stock");
                continue;
            }
            self.products().save_stock(&product).await?;
            if is_restock(before, product.stock_count) {
                notifications.notify_restock(&product).await?;
            }
            touched.push(product);
        }
        self.after_stock_moved(touched.iter()).await;
        Ok(())
    }

    /// Cache, events and POS inventory after local stock changed.
    async fn after_stock_moved<'p>(&self, products: impl Iterator<Item = &'p Product>) {
        self.state.cache().invalidate();

        let pos = match CatalogService::new(self.state).push_target().await {
            Ok(pos) => pos,
            Err(e) => {
                warn!(error = %e, "Could not read POS sync setting");
                None
            }
        };

        for product in products {
            self.state.events().broadcast(EventKind::ProductUpdated {
                product_id: product.id,
            });
            if let Some(pos) = pos {
                push_inventory(pos, product).await;
            }
        }
    }

    fn announce(&self, order: &Order) {
        if let Some(user_id) = order.user_id {
            self.state.events().to_user(
                user_id,
                EventKind::OrderUpdated {
                    order_id: order.id,
                    status: order.status,
                },
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use corner_shop_core::UserId;

    use super::*;
    use crate::models::CartItem;
    use crate::models::order::tests::{item, order};
    use crate::models::product::tests::{product, variant};

    fn cart(lines: Vec<(i32, Option<&str>, i32)>) -> Cart {
        let mut cart = Cart::empty(UserId::new(1));
        cart.items = lines
            .into_iter()
            .map(|(id, sku, quantity)| CartItem {
                product_id: ProductId::new(id),
                variant_sku: sku.map(String::from),
                quantity,
            })
            .collect();
        cart
    }

    fn catalog() -> HashMap<ProductId, Product> {
        let p = product(vec![
            variant("Small", "CB-S", 500, 3),
            variant("Large", "CB-L", 700, 1),
        ]);
        HashMap::from([(p.id, p)])
    }

    #[test]
    fn test_plan_snapshots_variant_prices() {
        let plan = plan_order(&cart(vec![(1, Some("CB-L"), 1), (1, Some("CB-S"), 2)]), &catalog())
            .unwrap();
        assert_eq!(plan.items[0].unit_price, Decimal::new(700, 2));
        assert_eq!(plan.items[0].variant_label.as_deref(), Some("Large"));
        assert_eq!(plan.subtotal, Decimal::new(1700, 2));
        assert_eq!(plan.changes[1].delta, -2);
    }

    #[test]
    fn test_plan_rejects_overdraw() {
        let err = plan_order(&cart(vec![(1, Some("CB-L"), 2)]), &catalog()).unwrap_err();
        assert_eq!(err.to_string(), "Cold Brew: only 1 left in stock");
    }

    #[test]
    fn test_plan_counts_lines_on_same_variant_together() {
        let err = plan_order(&cart(vec![(1, Some("CB-S"), 2), (1, Some("CB-S"), 2)]), &catalog())
            .unwrap_err();
        assert_eq!(err.to_string(), "Cold Brew: only 1 left in stock");
    }

    #[test]
    fn test_plan_resolves_line_without_sku_to_sole_variant() {
        let p = product(vec![variant("Default", "MUG-DEFAULT", 1200, 5)]);
        let products = HashMap::from([(p.id, p)]);
        let plan = plan_order(&cart(vec![(1, None, 2)]), &products).unwrap();
        assert_eq!(plan.items[0].sku.as_deref(), Some("MUG-DEFAULT"));
        assert_eq!(plan.items[0].variant_label.as_deref(), Some("Default"));
        assert_eq!(plan.changes[0].sku.as_deref(), Some("MUG-DEFAULT"));
    }

    #[test]
    fn test_plan_rejects_missing_and_hidden_products() {
        let err = plan_order(&cart(vec![(9, None, 1)]), &catalog()).unwrap_err();
        assert!(matches!(err, OrderError::Unavailable { .. }));

        let mut products = catalog();
        products.values_mut().for_each(|p| p.hidden = true);
        assert!(plan_order(&cart(vec![(1, Some("CB-S"), 1)]), &products).is_err());
    }

    #[test]
    fn test_plan_rejects_empty_cart() {
        assert_eq!(
            plan_order(&cart(vec![]), &catalog()).unwrap_err(),
            OrderError::EmptyCart
        );
    }

    #[test]
    fn test_place_then_cancel_restores_stock() {
        let mut products = catalog();
        let plan = plan_order(&cart(vec![(1, Some("CB-S"), 2)]), &products).unwrap();
        let p = products.get_mut(&ProductId::new(1)).unwrap();
        for change in &plan.changes {
            p.adjust_stock(change.sku.as_deref(), change.delta).unwrap();
        }
        assert_eq!(p.stock_count, 2);

        let mut placed = order(plan.items);
        let restores = placed.transition(OrderStatus::Cancelled).unwrap();
        for change in &restores {
            p.adjust_stock(change.sku.as_deref(), change.delta).unwrap();
        }
        assert_eq!(p.variant("CB-S").unwrap().quantity, 3);
        assert_eq!(p.stock_count, 4);
    }

    #[test]
    fn test_total_applies_discount_before_shipping() {
        let total = order_total(Decimal::new(2000, 2), Decimal::new(499, 2), Some(10));
        assert_eq!(total, Decimal::new(2299, 2));
        assert_eq!(
            order_total(Decimal::new(2000, 2), Decimal::ZERO, None),
            Decimal::new(2000, 2)
        );
    }

    #[test]
    fn test_checkout_lines_include_shipping() {
        let mut o = order(vec![item(1, None, 2)]);
        o.total = Decimal::new(1500, 2);
        let lines = checkout_lines(&o).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].price_minor, 500);
        assert_eq!(lines[1].name, "Shipping");
        assert_eq!(lines[1].price_minor, 500);
    }

    #[test]
    fn test_discounted_checkout_is_one_line() {
        let mut o = order(vec![item(1, None, 2)]);
        o.discount_code = Some("TEN".to_string());
        o.total = Decimal::new(900, 2);
        let lines = checkout_lines(&o).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].price_minor, 900);
    }
}
