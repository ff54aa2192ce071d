//! Public catalog routes.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use corner_shop_core::ProductId;

use super::success;
use crate::db::ProductFilter;
use crate::error::Result;
use crate::services::CatalogService;
use crate::state::AppState;

/// Listing query string.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
    pub search: Option<String>,
}

impl ListQuery {
    pub(crate) fn into_filter(self, include_hidden: bool) -> ProductFilter {
        let clean = |s: Option<String>| s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        ProductFilter {
            category: clean(self.category),
            search: clean(self.search),
            include_hidden,
        }
    }
}

/// GET /api/product
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>> {
    let products = CatalogService::new(&state)
        .list(&query.into_filter(false))
        .await?;
    Ok(success(json!({ "products": *products })))
}

/// GET /api/product/{id}
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Value>> {
    let product = CatalogService::new(&state).get(id, false).await?;
    Ok(success(json!({ "product": product })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_filters_are_dropped() {
        let filter = ListQuery {
            category: Some("  ".to_string()),
            search: Some(" brew ".to_string()),
        }
        .into_filter(false);
        assert_eq!(filter.category, None);
        assert_eq!(filter.search.as_deref(), Some("brew"));
        assert!(!filter.include_hidden);
    }
}
