//! Storefront account routes.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_sessions::Session;
use tracing::info;

use corner_shop_core::ProductId;

use super::success;
use crate::db::UserRepository;
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireUser, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::{AuthService, NotificationService};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

fn session_user(user: &User) -> CurrentUser {
    CurrentUser {
        id: user.id,
        email: user.email.clone(),
        name: user.name.clone(),
    }
}

async fn sign_in(session: &Session, user: &User) -> Result<()> {
    set_current_user(session, &session_user(user)).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

/// POST /api/user/register
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<RegisterForm>,
) -> Result<Json<Value>> {
    let user = AuthService::new(state.pool())
        .register(&form.email, &form.name, &form.password)
        .await?;
    sign_in(&session, &user).await?;
    info!(user_id = %user.id, "User registered");
    Ok(success(json!({ "user": user })))
}

/// POST /api/user/login
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<LoginForm>,
) -> Result<Json<Value>> {
    let user = AuthService::new(state.pool())
        .login(&form.email, &form.password)
        .await?;
    sign_in(&session, &user).await?;
    Ok(success(json!({ "user": user })))
}

/// POST /api/user/logout
pub async fn logout(session: Session) -> Result<Json<Value>> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(success(json!({})))
}

/// GET /api/user/me
pub async fn me(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
) -> Result<Json<Value>> {
    let user = UserRepository::new(state.pool())
        .get_by_id(current.id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Please sign in".to_string()))?;
    let unread = user.unread_count();
    Ok(success(json!({ "user": user, "unread": unread })))
}

/// GET /api/user/notifications
pub async fn notifications(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Value>> {
    let notifications = NotificationService::new(state.pool(), state.events())
        .list(user.id)
        .await?;
    Ok(success(json!({ "notifications": notifications })))
}

/// POST /api/user/notifications/{index}/read
pub async fn mark_notification_read(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(index): Path<usize>,
) -> Result<Json<Value>> {
    NotificationService::new(state.pool(), state.events())
        .mark_read(user.id, index)
        .await?;
    Ok(success(json!({})))
}

/// POST /api/user/waitlist/{product_id}
pub async fn join_waitlist(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(product_id): Path<ProductId>,
) -> Result<Json<Value>> {
    let added = NotificationService::new(state.pool(), state.events())
        .join_waitlist(user.id, product_id)
        .await?;
    Ok(success(json!({ "added": added })))
}
