//! HTTP middleware for the API.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, transactions)
//! 2. `TraceLayer` (request span with method, uri, status, latency)
//! 3. Request ID (recorded on the span, echoed as `x-request-id`)
//! 4. Session layer (tower-sessions with `PostgreSQL` store)

pub mod auth;
pub mod request_id;
pub mod session;

pub use auth::{
    OptionalUser, RequireAdmin, RequireOwner, RequireUser, clear_current_admin,
    clear_current_user, set_current_admin, set_current_user,
};
pub use request_id::request_id_middleware;
pub use session::create_session_layer;
