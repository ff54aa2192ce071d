//! Database operations for the shop's `PostgreSQL` store.
//!
//! ## Tables
//!
//! - `products` - Catalog, variants embedded as JSONB
//! - `orders` - Storefront and POS orders, items embedded as JSONB
//! - `carts`, `wishlists` - One document per user
//! - `categories`, `pos_item_groups`, `pos_modifier_groups` - POS mirrors
//! - `users`, `admins` - Accounts
//! - `discount_codes`, `settings`
//! - `tower_sessions.session` - Session storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p corner-shop-cli -- migrate
//! ```

pub mod admins;
pub mod carts;
pub mod catalog;
pub mod categories;
pub mod discounts;
pub mod orders;
pub mod pos_mirror;
pub mod products;
pub mod settings;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use admins::AdminRepository;
pub use carts::{CartRepository, WishlistRepository};
pub use catalog::PgCatalog;
pub use categories::CategoryRepository;
pub use discounts::DiscountRepository;
pub use orders::OrderRepository;
pub use pos_mirror::PosMirrorRepository;
pub use products::{ProductFilter, ProductRepository};
pub use settings::SettingsRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map unique violations to `Conflict`, everything else to `Database`.
    pub(crate) fn from_insert(e: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return Self::Conflict(format!("{what} already exists"));
        }
        Self::Database(e)
    }
}

/// Parse a TEXT column into a typed enum.
pub(crate) fn parse_text<T>(value: &str, column: &str) -> Result<T, RepositoryError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid {column}: {e}")))
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
