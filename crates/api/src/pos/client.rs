//! REST implementation of [`PosClient`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use super::types::{
    CheckoutRequest, CheckoutSession, NewRemoteItem, RemoteCategory, RemoteItem, RemoteItemGroup,
    RemoteItemUpdate, RemoteLineItem, RemoteModifier, RemoteModifierGroup, RemoteOrder,
};
use super::{PosClient, PosError};
use crate::config::PosConfig;

const PAGE_SIZE: usize = 100;
const CHECKOUT_PATH: &str = "/invoicingcheckoutservice/v1/checkouts";

/// POS REST API client.
#[derive(Clone)]
pub struct HttpPosClient {
    inner: Arc<HttpPosClientInner>,
}

struct HttpPosClientInner {
    client: reqwest::Client,
    base_url: Url,
    merchant_id: String,
}

impl std::fmt::Debug for HttpPosClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPosClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("merchant_id", &self.inner.merchant_id)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Deserialize)]
struct Elements<T> {
    #[serde(default = "Vec::new")]
    elements: Vec<T>,
}

impl<T> Default for Elements<T> {
    fn default() -> Self {
        Self {
            elements: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct IdRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct UrlRef {
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireStock {
    #[serde(default)]
    quantity: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireItem {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    price: i64,
    #[serde(default)]
    sku: Option<String>,
    #[serde(default)]
    hidden: bool,
    #[serde(default)]
    item_group: Option<IdRef>,
    #[serde(default)]
    categories: Elements<IdRef>,
    #[serde(default)]
    item_stock: Option<WireStock>,
    #[serde(default)]
    images: Elements<UrlRef>,
}

impl From<WireItem> for RemoteItem {
    fn from(w: WireItem) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let quantity = w
            .item_stock
            .map_or(0, |s| s.quantity.max(0.0).round() as i32);
        Self {
            id: w.id,
            name: w.name,
            price_minor: w.price,
            sku: w.sku.filter(|s| !s.trim().is_empty()),
            hidden: w.hidden,
            group_id: w.item_group.map(|g| g.id),
            category_ids: w.categories.elements.into_iter().map(|c| c.id).collect(),
            quantity,
            image_urls: w.images.elements.into_iter().map(|i| i.url).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireItemGroup {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    items: Elements<IdRef>,
}

#[derive(Debug, Deserialize)]
struct WireNamed {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    price: i64,
}

#[derive(Debug, Deserialize)]
struct WireModifierGroup {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    modifiers: Elements<WireNamed>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireLineItem {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    price: i64,
    #[serde(default)]
    item: Option<IdRef>,
    /// Thousandths of a unit.
    #[serde(default)]
    unit_qty: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireOrder {
    id: String,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    payment_state: Option<String>,
    #[serde(default)]
    total: i64,
    #[serde(default)]
    created_time: Option<i64>,
    #[serde(default)]
    line_items: Elements<WireLineItem>,
}

impl From<WireOrder> for RemoteOrder {
    fn from(w: WireOrder) -> Self {
        let line_items = w
            .line_items
            .elements
            .into_iter()
            .map(|l| RemoteLineItem {
                id: l.id,
                name: l.name,
                price_minor: l.price,
                item_id: l.item.map(|i| i.id),
                quantity: l
                    .unit_qty
                    .and_then(|q| i32::try_from(q / 1000).ok())
                    .filter(|q| *q > 0)
                    .unwrap_or(1),
            })
            .collect();

        Self {
            id: w.id,
            state: w.state,
            payment_state: w.payment_state,
            total_minor: w.total,
            created_at: w.created_time.and_then(DateTime::from_timestamp_millis),
            line_items,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireItemBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    price: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    sku: Option<&'a str>,
    hidden: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    item_group: Option<IdRef>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireCheckoutLine<'a> {
    name: &'a str,
    price: i64,
    unit_qty: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireCheckoutCart<'a> {
    line_items: Vec<WireCheckoutLine<'a>>,
}

#[derive(Debug, Serialize)]
struct WireCustomer<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireCheckoutBody<'a> {
    customer: WireCustomer<'a>,
    shopping_cart: WireCheckoutCart<'a>,
    external_reference_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCheckoutResponse {
    href: String,
    checkout_session_id: String,
}

// =============================================================================
// Client
// =============================================================================

impl HttpPosClient {
    /// Create a client for the configured merchant.
    ///
    /// # Errors
    ///
    /// Returns error if the token isn't a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &PosConfig) -> Result<Self, PosError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!(
            "Bearer {}",
            config.api_token.expose_secret()
        ))
        .map_err(|e| PosError::Parse(format!("Invalid API token format: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        let base_url = Url::parse(config.environment.base_url())
            .map_err(|e| PosError::Parse(format!("Invalid base URL: {e}")))?;

        Ok(Self {
            inner: Arc::new(HttpPosClientInner {
                client,
                base_url,
                merchant_id: config.merchant_id.clone(),
            }),
        })
    }

    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url, PosError> {
        let mut url = self
            .inner
            .base_url
            .join(path)
            .map_err(|e| PosError::Parse(format!("Invalid path {path}: {e}")))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn merchant_path(&self, resource: &str) -> String {
        format!("/v3/merchants/{}/{resource}", self.inner.merchant_id)
    }

    /// Fetch every page of a listing endpoint.
    async fn list_all<T: DeserializeOwned>(
        &self,
        resource: &str,
        expand: Option<&str>,
    ) -> Result<Vec<T>, PosError> {
        let path = self.merchant_path(resource);
        let mut out = Vec::new();
        let mut offset = 0;

        loop {
            let mut query = vec![
                ("limit", PAGE_SIZE.to_string()),
                ("offset", offset.to_string()),
            ];
            if let Some(expand) = expand {
                query.push(("expand", expand.to_string()));
            }

            let url = self.url(&path, &query)?;
            let response = self.inner.client.get(url).send().await?;
            let page: Elements<T> = handle_response(response).await?;

            let fetched = page.elements.len();
            out.extend(page.elements);
            if fetched < PAGE_SIZE {
                break;
            }
            offset += fetched;
        }

        debug!(resource, count = out.len(), "Fetched POS listing");
        Ok(out)
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, PosError> {
        let url = self.url(path, &[])?;
        let response = self.inner.client.post(url).json(body).send().await?;
        handle_response(response).await
    }

    async fn post_ignore<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<(), PosError> {
        let url = self.url(path, &[])?;
        let response = self.inner.client.post(url).json(body).send().await?;
        if response.status().is_success() {
            return Ok(());
        }
        Err(parse_error(response).await)
    }
}

async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, PosError> {
    if response.status().is_success() {
        return response
            .json()
            .await
            .map_err(|e| PosError::Parse(format!("Failed to parse response: {e}")));
    }
    Err(parse_error(response).await)
}

async fn parse_error(response: reqwest::Response) -> PosError {
    let status = response.status().as_u16();

    if status == 429 {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);
        return PosError::RateLimited(retry_after);
    }

    if status == 401 || status == 403 {
        return PosError::Unauthorized;
    }

    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    PosError::Api { status, message }
}

#[async_trait]
impl PosClient for HttpPosClient {
    #[instrument(skip(self))]
    async fn list_items(&self) -> Result<Vec<RemoteItem>, PosError> {
        let items: Vec<WireItem> = self
            .list_all("items", Some("itemStock,categories,itemGroup"))
            .await?;
        Ok(items.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn list_categories(&self) -> Result<Vec<RemoteCategory>, PosError> {
        let categories: Vec<WireNamed> = self.list_all("categories", None).await?;
        Ok(categories
            .into_iter()
            .map(|c| RemoteCategory {
                id: c.id,
                name: c.name,
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn list_item_groups(&self) -> Result<Vec<RemoteItemGroup>, PosError> {
        let groups: Vec<WireItemGroup> = self.list_all("item_groups", Some("items")).await?;
        Ok(groups
            .into_iter()
            .map(|g| RemoteItemGroup {
                id: g.id,
                name: g.name,
                item_ids: g.items.elements.into_iter().map(|i| i.id).collect(),
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn list_modifier_groups(&self) -> Result<Vec<RemoteModifierGroup>, PosError> {
        let groups: Vec<WireModifierGroup> =
            self.list_all("modifier_groups", Some("modifiers")).await?;
        Ok(groups
            .into_iter()
            .map(|g| RemoteModifierGroup {
                id: g.id,
                name: g.name,
                modifiers: g
                    .modifiers
                    .elements
                    .into_iter()
                    .map(|m| RemoteModifier {
                        id: m.id,
                        name: m.name,
                        price_minor: m.price,
                    })
                    .collect(),
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn list_orders(&self) -> Result<Vec<RemoteOrder>, PosError> {
        let orders: Vec<WireOrder> = self.list_all("orders", Some("lineItems")).await?;
        Ok(orders.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self, item), fields(name = %item.name))]
    async fn create_item(&self, item: &NewRemoteItem) -> Result<String, PosError> {
        let body = WireItemBody {
            name: Some(&item.name),
            price: item.price_minor,
            sku: item.sku.as_deref(),
            hidden: item.hidden,
            item_group: item.group_id.clone().map(|id| IdRef { id }),
        };
        let created: IdRef = self.post(&self.merchant_path("items"), &body).await?;
        debug!(item_id = %created.id, "Created POS item");
        Ok(created.id)
    }

    #[instrument(skip(self, update))]
    async fn update_item(&self, id: &str, update: &RemoteItemUpdate) -> Result<(), PosError> {
        let body = WireItemBody {
            name: update.name.as_deref(),
            price: update.price_minor,
            sku: update.sku.as_deref(),
            hidden: update.hidden,
            item_group: update.group_id.clone().map(|id| IdRef { id }),
        };
        self.post_ignore(&self.merchant_path(&format!("items/{id}")), &body)
            .await
    }

    #[instrument(skip(self))]
    async fn create_item_group(&self, name: &str) -> Result<String, PosError> {
        let created: IdRef = self
            .post(
                &self.merchant_path("item_groups"),
                &serde_json::json!({ "name": name }),
            )
            .await?;
        debug!(group_id = %created.id, "Created POS item group");
        Ok(created.id)
    }

    #[instrument(skip(self))]
    async fn update_item_group(&self, id: &str, name: &str) -> Result<(), PosError> {
        self.post_ignore(
            &self.merchant_path(&format!("item_groups/{id}")),
            &serde_json::json!({ "name": name }),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn update_inventory(&self, item_id: &str, quantity: i32) -> Result<(), PosError> {
        self.post_ignore(
            &self.merchant_path(&format!("item_stocks/{item_id}")),
            &serde_json::json!({ "quantity": quantity }),
        )
        .await
    }

    #[instrument(skip(self, request), fields(reference = %request.reference))]
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, PosError> {
        let body = WireCheckoutBody {
            customer: WireCustomer {
                email: request.customer_email.as_deref(),
            },
            shopping_cart: WireCheckoutCart {
                line_items: request
                    .lines
                    .iter()
                    .map(|l| WireCheckoutLine {
                        name: &l.name,
                        price: l.price_minor,
                        unit_qty: l.quantity,
                    })
                    .collect(),
            },
            external_reference_id: &request.reference,
        };

        let url = self.url(CHECKOUT_PATH, &[])?;
        let response = self
            .inner
            .client
            .post(url)
            .header("X-Clover-Merchant-Id", &self.inner.merchant_id)
            .json(&body)
            .send()
            .await?;
        let created: WireCheckoutResponse = handle_response(response).await?;

        Ok(CheckoutSession {
            id: created.checkout_session_id,
            url: created.href,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_item_wire_conversion() {
        let json = r#"{
            "id": "ITEM1",
            "name": "Cold Brew - Large",
            "price": 700,
            "sku": "CB-L",
            "hidden": false,
            "itemGroup": {"id": "GRP1"},
            "categories": {"elements": [{"id": "CAT1"}]},
            "itemStock": {"quantity": 4.0}
        }"#;
        let item: RemoteItem = serde_json::from_str::<WireItem>(json).unwrap().into();
        assert_eq!(item.price_minor, 700);
        assert_eq!(item.group_id.as_deref(), Some("GRP1"));
        assert_eq!(item.category_ids, vec!["CAT1".to_string()]);
        assert_eq!(item.quantity, 4);
        assert!(item.image_urls.is_empty());
    }

    #[test]
    fn test_blank_sku_is_dropped() {
        let item: RemoteItem = serde_json::from_str::<WireItem>(r#"{"id":"I","sku":"  "}"#)
            .unwrap()
            .into();
        assert_eq!(item.sku, None);
        assert_eq!(item.quantity, 0);
    }

    #[test]
    fn test_order_wire_conversion() {
        let json = r#"{
            "id": "ORD1",
            "state": "locked",
            "paymentState": "PAID",
            "total": 1200,
            "createdTime": 1700000000000,
            "lineItems": {"elements": [
                {"id": "L1", "name": "Cold Brew", "price": 500, "item": {"id": "ITEM1"}},
                {"id": "L2", "name": "Beans", "price": 700, "unitQty": 2000}
            ]}
        }"#;
        let order: RemoteOrder = serde_json::from_str::<WireOrder>(json).unwrap().into();
        assert_eq!(order.line_items.len(), 2);
        assert_eq!(order.line_items[0].quantity, 1);
        assert_eq!(order.line_items[0].item_id.as_deref(), Some("ITEM1"));
        assert_eq!(order.line_items[1].quantity, 2);
        assert!(order.created_at.is_some());
    }

    #[test]
    fn test_grouped_update_omits_name() {
        let body = WireItemBody {
            name: None,
            price: 500,
            sku: Some("CB-S"),
            hidden: false,
            item_group: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("name").is_none());
        assert_eq!(json["price"], 500);
    }
}
