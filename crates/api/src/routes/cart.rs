//! Cart and wishlist routes. All require a signed-in user.

use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::{Value, json};

use corner_shop_core::ProductId;

use super::success;
use crate::error::Result;
use crate::middleware::RequireUser;
use crate::services::{CartLine, CartService};
use crate::state::AppState;

/// GET /api/cart
pub async fn show(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Value>> {
    let cart = CartService::new(&state).get(user.id).await?;
    Ok(success(json!({ "cart": cart })))
}

/// POST /api/cart/add
pub async fn add(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(line): Json<CartLine>,
) -> Result<Json<Value>> {
    let cart = CartService::new(&state).add(user.id, &line).await?;
    Ok(success(json!({ "cart": cart })))
}

/// POST /api/cart/update
pub async fn update(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(line): Json<CartLine>,
) -> Result<Json<Value>> {
    let cart = CartService::new(&state).update(user.id, &line).await?;
    Ok(success(json!({ "cart": cart })))
}

/// POST /api/cart/remove
pub async fn remove(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(line): Json<CartLine>,
) -> Result<Json<Value>> {
    let cart = CartService::new(&state).remove(user.id, &line).await?;
    Ok(success(json!({ "cart": cart })))
}

/// DELETE /api/cart
pub async fn clear(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Value>> {
    CartService::new(&state).clear(user.id).await?;
    Ok(success(json!({})))
}

/// GET /api/wishlist
pub async fn wishlist(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Value>> {
    let wishlist = CartService::new(&state).wishlist(user.id).await?;
    Ok(success(json!({ "wishlist": wishlist })))
}

/// POST /api/wishlist/{product_id}
pub async fn wishlist_add(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(product_id): Path<ProductId>,
) -> Result<Json<Value>> {
    let wishlist = CartService::new(&state)
        .wishlist_add(user.id, product_id)
        .await?;
    Ok(success(json!({ "wishlist": wishlist })))
}

/// DELETE /api/wishlist/{product_id}
pub async fn wishlist_remove(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(product_id): Path<ProductId>,
) -> Result<Json<Value>> {
    let wishlist = CartService::new(&state)
        .wishlist_remove(user.id, product_id)
        .await?;
    Ok(success(json!({ "wishlist": wishlist })))
}
