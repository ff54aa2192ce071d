//! Admin account management.
//!
//! ```bash
//! corner-shop admin create -e owner@example.com -n "Shop Owner" -r owner -p '...'
//! ```
//!
//! Accounts can only be created here; the API has no sign-up for admins.

use corner_shop_api::services::{AuthError, AuthService};
use corner_shop_core::{AdminId, AdminRole};
use thiserror::Error;

use super::{ConnectError, connect};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: owner, staff")]
    InvalidRole(String),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Create a new admin account.
///
/// # Errors
///
/// Returns `AdminError` for an unknown role, an invalid email or weak
/// password, an existing account, or a database failure.
pub async fn create_user(
    email: &str,
    name: &str,
    role: &str,
    password: &str,
) -> Result<AdminId, AdminError> {
    let role: AdminRole = role
        .parse()
        .map_err(|_| AdminError::InvalidRole(role.to_owned()))?;

    let pool = connect().await?;

    tracing::info!("Creating admin user: {} ({})", email, role);
    let admin = AuthService::new(&pool)
        .create_admin(email, name, role, password)
        .await?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}, Role: {}",
        admin.id,
        admin.email,
        admin.role
    );
    Ok(admin.id)
}
