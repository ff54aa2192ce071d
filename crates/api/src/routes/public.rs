//! Small public routes: categories, settings and discount checks.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};

use super::success;
use crate::db::SettingsRepository;
use crate::error::Result;
use crate::services::{CatalogService, DiscountService};
use crate::state::AppState;

/// GET /api/category
pub async fn categories(State(state): State<AppState>) -> Result<Json<Value>> {
    let categories = CatalogService::new(&state).categories().await?;
    Ok(success(json!({ "categories": *categories })))
}

/// GET /api/settings
pub async fn settings(State(state): State<AppState>) -> Result<Json<Value>> {
    let settings = SettingsRepository::new(state.pool()).get().await?;
    Ok(success(json!({ "settings": settings })))
}

#[derive(Debug, Deserialize)]
pub struct ValidateDiscount {
    pub code: String,
}

/// POST /api/discount/validate
pub async fn validate_discount(
    State(state): State<AppState>,
    Json(form): Json<ValidateDiscount>,
) -> Result<Json<Value>> {
    let code = DiscountService::new(state.pool())
        .validate(&form.code)
        .await?;
    Ok(success(json!({
        "code": code.code,
        "percent_off": code.percent_off,
    })))
}
