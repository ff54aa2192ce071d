//! Back office routes, mounted under `/api/admin`.

pub mod auth;
pub mod catalog;
pub mod orders;
pub mod store;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

/// Create the admin routes router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .route(
            "/products",
            get(catalog::list_products).post(catalog::create_product),
        )
        .route(
            "/products/{id}",
            get(catalog::show_product)
                .put(catalog::update_product)
                .delete(catalog::delete_product),
        )
        .route(
            "/categories",
            get(catalog::list_categories).post(catalog::create_category),
        )
        .route(
            "/categories/{id}",
            put(catalog::rename_category).delete(catalog::delete_category),
        )
        .route("/orders", get(orders::list))
        .route("/orders/{id}/status", post(orders::set_status))
        .route(
            "/orders/{id}/items/{index}/status",
            post(orders::set_item_status),
        )
        .route(
            "/discounts",
            get(store::list_discounts).post(store::create_discount),
        )
        .route(
            "/discounts/{id}",
            put(store::update_discount).delete(store::delete_discount),
        )
        .route("/settings", put(store::update_settings))
}
