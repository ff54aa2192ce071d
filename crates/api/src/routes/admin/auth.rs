//! Back office sign-in.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_sessions::Session;
use tracing::info;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireAdmin, clear_current_admin, set_current_admin};
use crate::models::CurrentAdmin;
use crate::routes::success;
use crate::services::AuthService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// POST /api/admin/login
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<LoginForm>,
) -> Result<Json<Value>> {
    let admin = AuthService::new(state.pool())
        .login_admin(&form.email, &form.password)
        .await?;

    let current = CurrentAdmin {
        id: admin.id,
        email: admin.email.clone(),
        name: admin.name.clone(),
        role: admin.role,
    };
    set_current_admin(&session, &current).await?;
    set_sentry_user(&admin.id, Some(admin.email.as_str()));
    info!(admin_id = %admin.id, "Admin signed in");

    Ok(success(json!({ "admin": admin })))
}

/// POST /api/admin/logout
pub async fn logout(session: Session) -> Result<Json<Value>> {
    clear_current_admin(&session).await?;
    clear_sentry_user();
    Ok(success(json!({})))
}

/// GET /api/admin/me
pub async fn me(RequireAdmin(admin): RequireAdmin) -> Json<Value> {
    success(json!({ "admin": admin }))
}
