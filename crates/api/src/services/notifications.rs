//! In-app notifications and restock waitlists.

use sqlx::PgPool;
use tracing::{info, instrument};

use corner_shop_core::{ProductId, UserId};

use crate::db::{ProductRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::events::{EventHub, EventKind};
use crate::models::{Notification, Product};

/// Whether a stock change should wake up the waitlist.
#[must_use]
pub const fn is_restock(before: i32, after: i32) -> bool {
    before <= 0 && after > 0
}

/// Notification service.
///
/// Takes the pool and event hub directly so the CLI sync can use it
/// without a running server.
pub struct NotificationService<'a> {
    pool: &'a PgPool,
    events: &'a EventHub,
}

impl<'a> NotificationService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, events: &'a EventHub) -> Self {
        Self { pool, events }
    }

    /// Tell everyone waiting on `product` that it is back, and clear them
    /// from its waitlist.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the update fails.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn notify_restock(&self, product: &Product) -> Result<Vec<UserId>> {
        let notification = Notification::restock(product.id, &product.name);
        let users = UserRepository::new(self.pool)
            .notify_waitlist(product.id, &notification)
            .await?;

        for user_id in &users {
            self.events.to_user(
                *user_id,
                EventKind::Notification {
                    notification: notification.clone(),
                },
            );
        }
        if !users.is_empty() {
            info!(notified = users.len(), "Sent restock notifications");
        }
        Ok(users)
    }

    /// Restock notifications for products by ID, skipping any that vanished.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if a lookup or update fails.
    pub async fn notify_restocked(&self, product_ids: &[ProductId]) -> Result<usize> {
        let products = ProductRepository::new(self.pool);
        let mut notified = 0;
        for id in product_ids {
            if let Some(product) = products.get(*id).await? {
                notified += self.notify_restock(&product).await?.len();
            }
        }
        Ok(notified)
    }

    /// A user's notifications, oldest first. Positions match [`Self::mark_read`].
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the user doesn't exist.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<Notification>> {
        let user = UserRepository::new(self.pool)
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        Ok(user.notifications)
    }

    /// Mark one notification read. `index` counts from the oldest.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown user or index.
    pub async fn mark_read(&self, user_id: UserId, index: usize) -> Result<()> {
        let users = UserRepository::new(self.pool);
        let mut user = users
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        let notification = user
            .notifications
            .get_mut(index)
            .ok_or_else(|| AppError::NotFound("Notification".to_string()))?;
        if notification.read {
            return Ok(());
        }
        notification.read = true;
        users
            .save_notifications(user_id, &user.notifications)
            .await?;
        Ok(())
    }

    /// Ask to be told when an out-of-stock product returns.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for unknown or hidden products and
    /// `AppError::BadRequest` when the product is in stock.
    pub async fn join_waitlist(&self, user_id: UserId, product_id: ProductId) -> Result<bool> {
        let product = ProductRepository::new(self.pool)
            .get(product_id)
            .await?
            .filter(|p| !p.hidden)
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        if product.stock_count > 0 {
            return Err(AppError::BadRequest(format!(
                "{} is in stock",
                product.name
            )));
        }
        Ok(UserRepository::new(self.pool)
            .join_waitlist(user_id, product_id)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restock_edges() {
        assert!(is_restock(0, 1));
        assert!(is_restock(-2, 5));
        assert!(!is_restock(0, 0));
        assert!(!is_restock(3, 4));
        assert!(!is_restock(2, 0));
    }
}
