//! Back office order management.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use corner_shop_core::{OrderId, OrderStatus};

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::routes::success;
use crate::services::OrderService;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: OrderStatus,
}

/// GET /api/admin/orders
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<OrderQuery>,
) -> Result<Json<Value>> {
    let orders = OrderService::new(&state).list_all(query.status).await?;
    Ok(success(json!({ "orders": orders })))
}

/// POST /api/admin/orders/{id}/status
pub async fn set_status(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<OrderId>,
    Json(form): Json<StatusForm>,
) -> Result<Json<Value>> {
    let order = OrderService::new(&state)
        .change_status(id, form.status)
        .await?;
    Ok(success(json!({ "order": order })))
}

/// POST /api/admin/orders/{id}/items/{index}/status
pub async fn set_item_status(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path((id, index)): Path<(OrderId, usize)>,
    Json(form): Json<StatusForm>,
) -> Result<Json<Value>> {
    let order = OrderService::new(&state)
        .change_item_status(id, index, form.status)
        .await?;
    Ok(success(json!({ "order": order })))
}
