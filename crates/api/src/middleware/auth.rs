//! Session-backed authentication extractors.
//!
//! Rejections render through [`AppError`], so clients always get the JSON
//! error envelope.

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::de::DeserializeOwned;
use tower_sessions::Session;

use corner_shop_core::AdminRole;

use crate::error::AppError;
use crate::models::session::keys;
use crate::models::{CurrentAdmin, CurrentUser};

async fn from_session<T: DeserializeOwned>(parts: &Parts, key: &str) -> Option<T> {
    let session = parts.extensions.get::<Session>()?;
    session.get::<T>(key).await.ok().flatten()
}

/// Extractor that requires a signed-in storefront user.
///
/// ```rust,ignore
/// async fn handler(RequireUser(user): RequireUser) -> String {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireUser(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        from_session(parts, keys::CURRENT_USER)
            .await
            .map(Self)
            .ok_or_else(|| AppError::Unauthorized("Please sign in".to_string()))
    }
}

/// Extractor for the storefront user, if any.
pub struct OptionalUser(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(from_session(parts, keys::CURRENT_USER).await))
    }
}

/// Extractor that requires a signed-in admin of any role.
pub struct RequireAdmin(pub CurrentAdmin);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        from_session(parts, keys::CURRENT_ADMIN)
            .await
            .map(Self)
            .ok_or_else(|| AppError::Unauthorized("Admin sign-in required".to_string()))
    }
}

/// Extractor that requires an owner. Staff get 403.
pub struct RequireOwner(pub CurrentAdmin);

impl<S> FromRequestParts<S> for RequireOwner
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireAdmin(admin) = RequireAdmin::from_request_parts(parts, state).await?;
        if admin.role != AdminRole::Owner {
            return Err(AppError::Forbidden(
                "Only owners can do this".to_string(),
            ));
        }
        Ok(Self(admin))
    }
}

/// Store the signed-in user in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(keys::CURRENT_USER, user).await
}

/// Store the signed-in admin in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_admin(
    session: &Session,
    admin: &CurrentAdmin,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(keys::CURRENT_ADMIN, admin).await
}

/// Sign the user out.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<CurrentUser>(keys::CURRENT_USER).await?;
    Ok(())
}

/// Sign the admin out.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_admin(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<CurrentAdmin>(keys::CURRENT_ADMIN).await?;
    Ok(())
}
