//! Session-stored identities.

use serde::{Deserialize, Serialize};

use corner_shop_core::{AdminId, AdminRole, Email, UserId};

/// Signed-in storefront user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: Email,
    pub name: String,
}

/// Signed-in admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentAdmin {
    pub id: AdminId,
    pub email: Email,
    pub name: String,
    pub role: AdminRole,
}

/// Session keys.
pub mod keys {
    pub const CURRENT_USER: &str = "current_user";
    pub const CURRENT_ADMIN: &str = "current_admin";
}
