//! Order repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;

use corner_shop_core::{OrderId, OrderStatus, UserId};

use super::{RepositoryError, parse_text};
use crate::models::{Address, NewOrder, Order, OrderItem};
use crate::sync::UpsertOutcome;

macro_rules! order_columns {
    () => {
        "id, user_id, source, pos_order_id, items, address, payment_method, payment_status, \
         status, total, discount_code, checkout_url, created_at, updated_at"
    };
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: Option<i32>,
    source: String,
    pos_order_id: Option<String>,
    items: Json<Vec<OrderItem>>,
    address: Option<Json<Address>>,
    payment_method: String,
    payment_status: String,
    status: String,
    total: Decimal,
    discount_code: Option<String>,
    checkout_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: OrderId::new(row.id),
            user_id: row.user_id.map(UserId::new),
            source: parse_text(&row.source, "order source")?,
            pos_order_id: row.pos_order_id,
            items: row.items.0,
            address: row.address.map(|a| a.0),
            payment_method: parse_text(&row.payment_method, "payment method")?,
            payment_status: parse_text(&row.payment_status, "payment status")?,
            status: parse_text(&row.status, "order status")?,
            total: row.total,
            discount_code: row.discount_code,
            checkout_url: row.checkout_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` for a duplicate POS order ID.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(concat!(
            "INSERT INTO orders
                (user_id, source, pos_order_id, items, address, payment_method,
                 payment_status, status, total, discount_code)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING ",
            order_columns!()
        ))
        .bind(order.user_id)
        .bind(order.source.as_str())
        .bind(order.pos_order_id.as_deref())
        .bind(Json(&order.items))
        .bind(order.address.as_ref().map(Json))
        .bind(order.payment_method.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.status.as_str())
        .bind(order.total)
        .bind(order.discount_code.as_deref())
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "order"))?;

        row.try_into()
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a status column is invalid.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(concat!(
            "SELECT ",
            order_columns!(),
            " FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// A user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a status column is invalid.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(concat!(
            "SELECT ",
            order_columns!(),
            " FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Every order, optionally filtered by status, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a status column is invalid.
    pub async fn list_all(
        &self,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(concat!(
            "SELECT ",
            order_columns!(),
            " FROM orders WHERE ($1::text IS NULL OR status = $1) ORDER BY created_at DESC, id DESC"
        ))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Save status, items and payment fields after a change.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn save(&self, order: &Order) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(concat!(
            "UPDATE orders SET
                items = $2, status = $3, payment_status = $4, checkout_url = $5,
                updated_at = now()
             WHERE id = $1
             RETURNING ",
            order_columns!()
        ))
        .bind(order.id)
        .bind(Json(&order.items))
        .bind(order.status.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.checkout_url.as_deref())
        .fetch_optional(self.pool)
        .await?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    /// Insert a POS order, or refresh its status if it was mirrored before.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the statement fails.
    pub async fn upsert_pos(&self, order: &NewOrder) -> Result<UpsertOutcome, RepositoryError> {
        let inserted: Option<bool> = sqlx::query_scalar(
            "INSERT INTO orders
                (user_id, source, pos_order_id, items, address, payment_method,
                 payment_status, status, total)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (pos_order_id) DO UPDATE SET
                items = EXCLUDED.items,
                payment_status = EXCLUDED.payment_status,
                status = EXCLUDED.status,
                total = EXCLUDED.total,
                updated_at = now()
             WHERE (orders.items, orders.payment_status, orders.status, orders.total)
                IS DISTINCT FROM
                   (EXCLUDED.items, EXCLUDED.payment_status, EXCLUDED.status, EXCLUDED.total)
             RETURNING (xmax = 0)",
        )
        .bind(order.user_id)
        .bind(order.source.as_str())
        .bind(order.pos_order_id.as_deref())
        .bind(Json(&order.items))
        .bind(order.address.as_ref().map(Json))
        .bind(order.payment_method.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.status.as_str())
        .bind(order.total)
        .fetch_optional(self.pool)
        .await?;

        Ok(match inserted {
            Some(true) => UpsertOutcome::Created,
            Some(false) => UpsertOutcome::Updated,
            None => UpsertOutcome::Unchanged,
        })
    }
}
