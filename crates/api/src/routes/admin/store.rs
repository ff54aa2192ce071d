//! Owner-only routes: discount codes and store settings.

use axum::{
    Json,
    extract::{Path, State},
};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tracing::info;

use corner_shop_core::DiscountCodeId;

use crate::db::SettingsRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireOwner;
use crate::models::{DiscountInput, StoreSettings};
use crate::routes::success;
use crate::services::DiscountService;
use crate::state::AppState;

/// GET /api/admin/discounts
pub async fn list_discounts(
    State(state): State<AppState>,
    RequireOwner(_owner): RequireOwner,
) -> Result<Json<Value>> {
    let codes = DiscountService::new(state.pool()).list().await?;
    Ok(success(json!({ "discounts": codes })))
}

/// POST /api/admin/discounts
pub async fn create_discount(
    State(state): State<AppState>,
    RequireOwner(_owner): RequireOwner,
    Json(input): Json<DiscountInput>,
) -> Result<Json<Value>> {
    let code = DiscountService::new(state.pool()).create(input).await?;
    Ok(success(json!({ "discount": code })))
}

/// PUT /api/admin/discounts/{id}
pub async fn update_discount(
    State(state): State<AppState>,
    RequireOwner(_owner): RequireOwner,
    Path(id): Path<DiscountCodeId>,
    Json(input): Json<DiscountInput>,
) -> Result<Json<Value>> {
    let code = DiscountService::new(state.pool()).update(id, input).await?;
    Ok(success(json!({ "discount": code })))
}

/// DELETE /api/admin/discounts/{id}
pub async fn delete_discount(
    State(state): State<AppState>,
    RequireOwner(_owner): RequireOwner,
    Path(id): Path<DiscountCodeId>,
) -> Result<Json<Value>> {
    DiscountService::new(state.pool()).delete(id).await?;
    Ok(success(json!({})))
}

fn validate_settings(settings: &StoreSettings) -> Result<()> {
    if settings.store_name.trim().is_empty() {
        return Err(AppError::BadRequest("store name is required".to_string()));
    }
    if settings.currency.len() != 3 || !settings.currency.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(AppError::BadRequest(
            "currency must be a three-letter code".to_string(),
        ));
    }
    if settings.shipping_fee < Decimal::ZERO {
        return Err(AppError::BadRequest(
            "shipping fee cannot be negative".to_string(),
        ));
    }
    Ok(())
}

/// PUT /api/admin/settings
pub async fn update_settings(
    State(state): State<AppState>,
    RequireOwner(owner): RequireOwner,
    Json(settings): Json<StoreSettings>,
) -> Result<Json<Value>> {
    validate_settings(&settings)?;
    SettingsRepository::new(state.pool()).save(&settings).await?;
    info!(admin_id = %owner.id, pos_sync = settings.pos_sync_enabled, "Settings updated");
    Ok(success(json!({ "settings": settings })))
}
