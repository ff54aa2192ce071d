//! Settings repository. The store settings live under one key.

use sqlx::PgPool;
use sqlx::types::Json;

use super::RepositoryError;
use crate::models::StoreSettings;

const STORE_KEY: &str = "store";

/// Repository for the settings document.
pub struct SettingsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SettingsRepository<'a> {
    /// Create a new settings repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Load the settings, falling back to defaults when none are stored.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self) -> Result<StoreSettings, RepositoryError> {
        let value: Option<Json<StoreSettings>> =
            sqlx::query_scalar("SELECT value FROM settings WHERE key = $1")
                .bind(STORE_KEY)
                .fetch_optional(self.pool)
                .await?;

        Ok(value.map(|v| v.0).unwrap_or_default())
    }

    /// Store the settings.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn save(&self, settings: &StoreSettings) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO settings (key, value, updated_at) VALUES ($1, $2, now())
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()",
        )
        .bind(STORE_KEY)
        .bind(Json(settings))
        .execute(self.pool)
        .await?;
        Ok(())
    }
}
