//! Storefront customer accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use corner_shop_core::{Email, ProductId, UserId};

/// A stored in-app notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    #[serde(default)]
    pub product_id: Option<ProductId>,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// A "back in stock" notification for a product.
    #[must_use]
    pub fn restock(product_id: ProductId, product_name: &str) -> Self {
        Self {
            message: format!("{product_name} is back in stock"),
            product_id: Some(product_id),
            read: false,
            created_at: Utc::now(),
        }
    }
}

/// A storefront user (domain type).
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub name: String,
    pub notifications: Vec<Notification>,
    /// Products the user asked to hear about when restocked.
    pub waitlist: Vec<ProductId>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Number of unread notifications.
    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.notifications.iter().filter(|n| !n.read).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restock_message() {
        let n = Notification::restock(ProductId::new(4), "Cold Brew");
        assert_eq!(n.message, "Cold Brew is back in stock");
        assert_eq!(n.product_id, Some(ProductId::new(4)));
        assert!(!n.read);
    }
}
