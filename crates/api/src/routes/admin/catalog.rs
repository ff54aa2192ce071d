//! Back office product and category management.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde_json::{Value, json};

use corner_shop_core::{CategoryId, ProductId};

use crate::db::CategoryRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{CategoryInput, ProductDraft};
use crate::routes::products::ListQuery;
use crate::routes::success;
use crate::services::CatalogService;
use crate::state::AppState;

/// GET /api/admin/products
///
/// Includes hidden products.
pub async fn list_products(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>> {
    let products = CatalogService::new(&state)
        .list(&query.into_filter(true))
        .await?;
    Ok(success(json!({ "products": *products })))
}

/// GET /api/admin/products/{id}
pub async fn show_product(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<Json<Value>> {
    let product = CatalogService::new(&state).get(id, true).await?;
    Ok(success(json!({ "product": product })))
}

/// POST /api/admin/products
pub async fn create_product(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(draft): Json<ProductDraft>,
) -> Result<Json<Value>> {
    let saved = CatalogService::new(&state).create(draft).await?;
    Ok(success(json!({
        "product": saved.product,
        "push_failures": saved.push_failures,
    })))
}

/// PUT /api/admin/products/{id}
pub async fn update_product(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(draft): Json<ProductDraft>,
) -> Result<Json<Value>> {
    let saved = CatalogService::new(&state).update(id, draft).await?;
    Ok(success(json!({
        "product": saved.product,
        "push_failures": saved.push_failures,
    })))
}

/// DELETE /api/admin/products/{id}
pub async fn delete_product(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<Json<Value>> {
    CatalogService::new(&state).delete(id).await?;
    Ok(success(json!({})))
}

fn category_name(input: &CategoryInput) -> Result<&str> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("name is required".to_string()));
    }
    Ok(name)
}

/// GET /api/admin/categories
pub async fn list_categories(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Value>> {
    let categories = CategoryRepository::new(state.pool()).list().await?;
    Ok(success(json!({ "categories": categories })))
}

/// POST /api/admin/categories
pub async fn create_category(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(input): Json<CategoryInput>,
) -> Result<Json<Value>> {
    let category = CategoryRepository::new(state.pool())
        .create(category_name(&input)?)
        .await?;
    state.cache().invalidate();
    Ok(success(json!({ "category": category })))
}

/// PUT /api/admin/categories/{id}
pub async fn rename_category(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<CategoryId>,
    Json(input): Json<CategoryInput>,
) -> Result<Json<Value>> {
    let category = CategoryRepository::new(state.pool())
        .rename(id, category_name(&input)?)
        .await?;
    state.cache().invalidate();
    Ok(success(json!({ "category": category })))
}

/// DELETE /api/admin/categories/{id}
pub async fn delete_category(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<CategoryId>,
) -> Result<Json<Value>> {
    CategoryRepository::new(state.pool()).delete(id).await?;
    state.cache().invalidate();
    Ok(success(json!({})))
}
