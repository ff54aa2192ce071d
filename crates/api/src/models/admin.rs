//! Back office accounts.

use chrono::{DateTime, Utc};
use serde::Serialize;

use corner_shop_core::{AdminId, AdminRole, Email};

/// An admin user (domain type).
#[derive(Debug, Clone, Serialize)]
pub struct Admin {
    pub id: AdminId,
    pub email: Email,
    pub name: String,
    pub role: AdminRole,
    pub created_at: DateTime<Utc>,
}
