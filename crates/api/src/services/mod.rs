//! Business logic between the routes and the repositories.
//!
//! Services that need POS access, events or the cache take the whole
//! [`AppState`](crate::state::AppState); the rest take the pool.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod discounts;
pub mod notifications;
pub mod orders;
pub mod sync;

pub use auth::{AuthError, AuthService};
pub use cart::{CartLine, CartService};
pub use catalog::{CatalogService, SavedProduct};
pub use discounts::DiscountService;
pub use notifications::NotificationService;
pub use orders::{OrderService, PlaceOrder};
pub use sync::pull_and_notify;
