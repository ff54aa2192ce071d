//! POS records as the rest of the crate sees them.
//!
//! Prices are in minor currency units, exactly as the POS reports them.
//! Conversion to major units happens in the sync layer.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A sellable item on the POS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteItem {
    pub id: String,
    pub name: String,
    pub price_minor: i64,
    pub sku: Option<String>,
    pub hidden: bool,
    /// Item group this item belongs to, if any.
    pub group_id: Option<String>,
    pub category_ids: Vec<String>,
    pub quantity: i32,
    pub image_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteItemGroup {
    pub id: String,
    pub name: String,
    pub item_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteCategory {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteModifier {
    pub id: String,
    pub name: String,
    pub price_minor: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteModifierGroup {
    pub id: String,
    pub name: String,
    pub modifiers: Vec<RemoteModifier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteLineItem {
    pub id: String,
    pub name: String,
    pub price_minor: i64,
    pub item_id: Option<String>,
    pub quantity: i32,
}

/// An order taken at the register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteOrder {
    pub id: String,
    /// POS order state (`open`, `locked`, ...).
    pub state: Option<String>,
    /// POS payment state (`OPEN`, `PAID`, `REFUNDED`, ...).
    pub payment_state: Option<String>,
    pub total_minor: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub line_items: Vec<RemoteLineItem>,
}

/// Fields for creating a POS item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRemoteItem {
    pub name: String,
    pub price_minor: i64,
    pub sku: Option<String>,
    pub hidden: bool,
    pub group_id: Option<String>,
}

/// Fields for updating a POS item.
///
/// `name` is `None` for items inside a group; the POS won't rename those.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteItemUpdate {
    pub name: Option<String>,
    pub price_minor: i64,
    pub sku: Option<String>,
    pub hidden: bool,
    pub group_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLine {
    pub name: String,
    pub price_minor: i64,
    pub quantity: i32,
}

/// Hosted checkout request for a card payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    /// Local order reference echoed back by the POS.
    pub reference: String,
    pub customer_email: Option<String>,
    pub lines: Vec<CheckoutLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutSession {
    pub id: String,
    /// Where to send the shopper to pay.
    pub url: String,
}
