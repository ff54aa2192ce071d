//! Order documents and their status machine.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use corner_shop_core::{
    OrderId, OrderSource, OrderStatus, PaymentMethod, PaymentStatus, ProductId, UserId,
};

/// Errors raised by order status changes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("order has no item at position {0}")]
    UnknownItem(usize),
    #[error("cart is empty")]
    EmptyCart,
    #[error("{name}: {reason}")]
    Unavailable { name: String, reason: String },
}

/// Shipping address snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub full_name: String,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default)]
    pub region: Option<String>,
    pub postal_code: String,
    pub country: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// One purchased line, snapshotted at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// `None` for POS lines that don't map to a local product.
    pub product_id: Option<ProductId>,
    pub name: String,
    #[serde(default)]
    pub variant_label: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    pub unit_price: Decimal,
    pub quantity: i32,
    #[serde(default)]
    pub status: OrderStatus,
}

/// A stock movement to apply to a local product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockChange {
    pub product_id: ProductId,
    pub sku: Option<String>,
    pub delta: i32,
}

impl OrderItem {
    fn restore(&self) -> Option<StockChange> {
        self.product_id.map(|product_id| StockChange {
            product_id,
            sku: self.sku.clone(),
            delta: self.quantity,
        })
    }

    /// Line total.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// A stored order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: Option<UserId>,
    pub source: OrderSource,
    pub pos_order_id: Option<String>,
    pub items: Vec<OrderItem>,
    pub address: Option<Address>,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub total: Decimal,
    /// Discount code applied at checkout.
    pub discount_code: Option<String>,
    /// Hosted payment page for card orders.
    pub checkout_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Order fields for inserts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: Option<UserId>,
    pub source: OrderSource,
    pub pos_order_id: Option<String>,
    pub items: Vec<OrderItem>,
    pub address: Option<Address>,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub total: Decimal,
    pub discount_code: Option<String>,
}

impl Order {
    /// Move the whole order to `next`.
    ///
    /// Items that are still live follow the order. Cancelling returns the
    /// stock to restore for every item that wasn't already cancelled.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidTransition` if the move isn't allowed.
    pub fn transition(&mut self, next: OrderStatus) -> Result<Vec<StockChange>, OrderError> {
        if !self.status.can_transition_to(next) {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }

        let mut restores = Vec::new();
        for item in &mut self.items {
            if item.status == OrderStatus::Cancelled {
                continue;
            }
            if next == OrderStatus::Cancelled {
                restores.extend(item.restore());
            }
            if item.status.can_transition_to(next) {
                item.status = next;
            }
        }

        self.status = next;
        Ok(restores)
    }

    /// Move one item to `next`.
    ///
    /// Cancelling an item restores just that item. When every item ends up
    /// cancelled the order is cancelled too.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::UnknownItem` or `OrderError::InvalidTransition`.
    pub fn transition_item(
        &mut self,
        index: usize,
        next: OrderStatus,
    ) -> Result<Option<StockChange>, OrderError> {
        let item = self
            .items
            .get_mut(index)
            .ok_or(OrderError::UnknownItem(index))?;

        if !item.status.can_transition_to(next) {
            return Err(OrderError::InvalidTransition {
                from: item.status,
                to: next,
            });
        }
        item.status = next;
        let restore = (next == OrderStatus::Cancelled)
            .then(|| item.restore())
            .flatten();

        if self
            .items
            .iter()
            .all(|i| i.status == OrderStatus::Cancelled)
        {
            self.status = OrderStatus::Cancelled;
        }
        Ok(restore)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn item(product: i32, sku: Option<&str>, quantity: i32) -> OrderItem {
        OrderItem {
            product_id: Some(ProductId::new(product)),
            name: format!("product {product}"),
            variant_label: None,
            sku: sku.map(String::from),
            unit_price: Decimal::new(500, 2),
            quantity,
            status: OrderStatus::Pending,
        }
    }

    pub(crate) fn order(items: Vec<OrderItem>) -> Order {
        Order {
            id: OrderId::new(1),
            user_id: Some(UserId::new(1)),
            source: OrderSource::Storefront,
            pos_order_id: None,
            items,
            address: None,
            payment_method: PaymentMethod::CashOnDelivery,
            payment_status: PaymentStatus::Pending,
            status: OrderStatus::Pending,
            total: Decimal::ZERO,
            discount_code: None,
            checkout_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_forward_transition_moves_items() {
        let mut order = order(vec![item(1, None, 2)]);
        let restores = order.transition(OrderStatus::Processing).unwrap();
        assert!(restores.is_empty());
        assert_eq!(order.items[0].status, OrderStatus::Processing);
    }

    #[test]
    fn test_cancel_restores_every_live_item() {
        let mut order = order(vec![item(1, Some("A"), 2), item(2, None, 1)]);
        let restores = order.transition(OrderStatus::Cancelled).unwrap();
        assert_eq!(
            restores,
            vec![
                StockChange {
                    product_id: ProductId::new(1),
                    sku: Some("A".to_string()),
                    delta: 2
                },
                StockChange {
                    product_id: ProductId::new(2),
                    sku: None,
                    delta: 1
                },
            ]
        );
    }

    #[test]
    fn test_cancel_skips_already_cancelled_items() {
        let mut order = order(vec![item(1, None, 2), item(2, None, 1)]);
        order.transition_item(0, OrderStatus::Cancelled).unwrap();
        let restores = order.transition(OrderStatus::Cancelled).unwrap();
        assert_eq!(restores.len(), 1);
        assert_eq!(restores[0].product_id, ProductId::new(2));
    }

    #[test]
    fn test_delivered_order_cannot_be_cancelled() {
        let mut order = order(vec![item(1, None, 2)]);
        order.status = OrderStatus::Delivered;
        assert_eq!(
            order.transition(OrderStatus::Cancelled),
            Err(OrderError::InvalidTransition {
                from: OrderStatus::Delivered,
                to: OrderStatus::Cancelled
            })
        );
    }

    #[test]
    fn test_cancelling_last_item_cancels_order() {
        let mut order = order(vec![item(1, None, 2)]);
        let restore = order.transition_item(0, OrderStatus::Cancelled).unwrap();
        assert_eq!(restore.map(|r| r.delta), Some(2));
        assert_eq!(order.status, OrderStatus::Cancelled);
    }

    #[test]
    fn test_unknown_item() {
        let mut order = order(vec![]);
        assert_eq!(
            order.transition_item(3, OrderStatus::Shipped),
            Err(OrderError::UnknownItem(3))
        );
    }
}
