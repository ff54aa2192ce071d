//! Point-of-sale integration.
//!
//! [`PosClient`] is the seam between the shop and the POS REST API. The sync
//! engine only talks to the trait, so it runs the same against
//! [`HttpPosClient`] in production and scripted fakes in tests.
//!
//! # API Reference
//!
//! - Base URL: per [`PosEnvironment`](crate::config::PosEnvironment)
//! - Authentication: bearer token
//! - Listing endpoints page with `limit`/`offset`

mod client;
pub mod types;

pub use client::HttpPosClient;
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when talking to the POS.
#[derive(Debug, Error)]
pub enum PosError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limited by the POS.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Token rejected.
    #[error("Unauthorized: invalid API token")]
    Unauthorized,

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// No POS credentials configured.
    #[error("POS integration is not configured")]
    NotConfigured,
}

/// Operations the shop needs from the POS.
#[async_trait]
pub trait PosClient: Send + Sync {
    async fn list_items(&self) -> Result<Vec<RemoteItem>, PosError>;

    async fn list_categories(&self) -> Result<Vec<RemoteCategory>, PosError>;

    async fn list_item_groups(&self) -> Result<Vec<RemoteItemGroup>, PosError>;

    async fn list_modifier_groups(&self) -> Result<Vec<RemoteModifierGroup>, PosError>;

    async fn list_orders(&self) -> Result<Vec<RemoteOrder>, PosError>;

    /// Create an item and return its POS ID.
    async fn create_item(&self, item: &NewRemoteItem) -> Result<String, PosError>;

    async fn update_item(&self, id: &str, update: &RemoteItemUpdate) -> Result<(), PosError>;

    /// Create an item group and return its POS ID.
    async fn create_item_group(&self, name: &str) -> Result<String, PosError>;

    async fn update_item_group(&self, id: &str, name: &str) -> Result<(), PosError>;

    /// Set the on-hand quantity for an item.
    async fn update_inventory(&self, item_id: &str, quantity: i32) -> Result<(), PosError>;

    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, PosError>;
}
