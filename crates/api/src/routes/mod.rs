//! HTTP route handlers.
//!
//! Every response is JSON with a `success` flag; errors carry a `message`.
//!
//! # Route Structure
//!
//! ```text
//! # Accounts
//! POST /api/user/register                      - Create account and sign in
//! POST /api/user/login                         - Sign in
//! POST /api/user/logout                        - Sign out
//! GET  /api/user/me                            - Current user
//! GET  /api/user/notifications                 - Notifications, oldest first
//! POST /api/user/notifications/{index}/read    - Mark one read
//! POST /api/user/waitlist/{product_id}         - Join a restock waitlist
//!
//! # Catalog
//! GET  /api/product                            - Listing (?category=&search=)
//! GET  /api/product/{id}                       - Product detail
//! GET  /api/category                           - Categories
//! GET  /api/settings                           - Public store settings
//! POST /api/discount/validate                  - Check a discount code
//!
//! # Cart and wishlist (requires auth)
//! GET  /api/cart                               - Cart
//! DELETE /api/cart                             - Empty the cart
//! POST /api/cart/add | update | remove         - Edit lines
//! GET  /api/wishlist                           - Wishlist
//! POST /api/wishlist/{product_id}              - Add to wishlist
//! DELETE /api/wishlist/{product_id}            - Remove from wishlist
//!
//! # Orders (requires auth)
//! POST /api/order                              - Place an order from the cart
//! GET  /api/order                              - Own orders
//! GET  /api/order/{id}                         - One own order
//! POST /api/order/{id}/cancel                  - Cancel while pending
//!
//! # Live updates
//! GET  /api/events                             - Server-sent events
//!
//! # Back office (requires admin)
//! /api/admin/...                               - See `admin::routes`
//! POST /api/pos/sync                           - Pull the POS catalog now
//! GET  /api/pos/items | categories | mirrors   - POS listings
//! ```

pub mod admin;
pub mod cart;
pub mod events;
pub mod orders;
pub mod pos;
pub mod products;
pub mod public;
pub mod users;

use axum::{
    Json, Router,
    routing::{get, post},
};
use serde_json::{Map, Value};

use crate::state::AppState;

/// Wrap a payload object in the `{ "success": true, ... }` envelope.
///
/// Non-object payloads are placed under `data`.
#[must_use]
pub fn success(payload: Value) -> Json<Value> {
    let mut body = Map::new();
    body.insert("success".to_string(), Value::Bool(true));
    match payload {
        Value::Object(fields) => body.extend(fields),
        Value::Null => {}
        other => {
            body.insert("data".to_string(), other);
        }
    }
    Json(Value::Object(body))
}

/// Create the account routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .route("/logout", post(users::logout))
        .route("/me", get(users::me))
        .route("/notifications", get(users::notifications))
        .route(
            "/notifications/{index}/read",
            post(users::mark_notification_read),
        )
        .route("/waitlist/{product_id}", post(users::join_waitlist))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
}

/// Create the wishlist routes router.
pub fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::wishlist))
        .route(
            "/{product_id}",
            post(cart::wishlist_add).delete(cart::wishlist_remove),
        )
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::mine).post(orders::place))
        .route("/{id}", get(orders::show))
        .route("/{id}/cancel", post(orders::cancel))
}

/// Create the POS routes router.
pub fn pos_routes() -> Router<AppState> {
    Router::new()
        .route("/sync", post(pos::sync))
        .route("/items", get(pos::items))
        .route("/categories", get(pos::categories))
        .route("/mirrors", get(pos::mirrors))
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    let api = Router::new()
        .nest("/user", user_routes())
        .nest("/product", product_routes())
        .nest("/cart", cart_routes())
        .nest("/wishlist", wishlist_routes())
        .nest("/order", order_routes())
        .route("/category", get(public::categories))
        .route("/settings", get(public::settings))
        .route("/discount/validate", post(public::validate_discount))
        .route("/events", get(events::stream))
        .nest("/admin", admin::routes())
        .nest("/pos", pos_routes());

    Router::new().nest("/api", api)
}
