//! Customer order routes.

use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::{Value, json};

use corner_shop_core::OrderId;

use super::success;
use crate::error::Result;
use crate::middleware::RequireUser;
use crate::services::{OrderService, PlaceOrder};
use crate::state::AppState;

/// POST /api/order
///
/// Card orders come back with a `checkout_url` to redirect to.
pub async fn place(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(input): Json<PlaceOrder>,
) -> Result<Json<Value>> {
    let order = OrderService::new(&state).place(&user, input).await?;
    Ok(success(json!({ "order": order })))
}

/// GET /api/order
pub async fn mine(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Value>> {
    let orders = OrderService::new(&state).list_for_user(&user).await?;
    Ok(success(json!({ "orders": orders })))
}

/// GET /api/order/{id}
pub async fn show(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<OrderId>,
) -> Result<Json<Value>> {
    let order = OrderService::new(&state).get_for_user(&user, id).await?;
    Ok(success(json!({ "order": order })))
}

/// POST /api/order/{id}/cancel
pub async fn cancel(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<OrderId>,
) -> Result<Json<Value>> {
    let order = OrderService::new(&state).cancel_for_user(&user, id).await?;
    Ok(success(json!({ "order": order })))
}
