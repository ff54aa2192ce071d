//! Discount code repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use corner_shop_core::DiscountCodeId;

use super::RepositoryError;
use crate::models::{DiscountCode, DiscountInput};

macro_rules! discount_columns {
    () => {
        "id, code, percent_off, starts_at, ends_at, max_usage, usage_count, active, created_at"
    };
}

#[derive(Debug, sqlx::FromRow)]
struct DiscountRow {
    id: i32,
    code: String,
    percent_off: i32,
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
    max_usage: Option<i32>,
    usage_count: i32,
    active: bool,
    created_at: DateTime<Utc>,
}

impl From<DiscountRow> for DiscountCode {
    fn from(row: DiscountRow) -> Self {
        Self {
            id: DiscountCodeId::new(row.id),
            code: row.code,
            percent_off: row.percent_off,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            max_usage: row.max_usage,
            usage_count: row.usage_count,
            active: row.active,
            created_at: row.created_at,
        }
    }
}

/// Repository for discount codes. Codes are expected already normalized.
pub struct DiscountRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DiscountRepository<'a> {
    /// Create a new discount repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All codes, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<DiscountCode>, RepositoryError> {
        let rows = sqlx::query_as::<_, DiscountRow>(concat!(
            "SELECT ",
            discount_columns!(),
            " FROM discount_codes ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Look up a code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_code(&self, code: &str) -> Result<Option<DiscountCode>, RepositoryError> {
        let row = sqlx::query_as::<_, DiscountRow>(concat!(
            "SELECT ",
            discount_columns!(),
            " FROM discount_codes WHERE code = $1"
        ))
        .bind(code)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Create a code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, input: &DiscountInput) -> Result<DiscountCode, RepositoryError> {
        let row = sqlx::query_as::<_, DiscountRow>(concat!(
            "INSERT INTO discount_codes (code, percent_off, starts_at, ends_at, max_usage, active)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING ",
            discount_columns!()
        ))
        .bind(&input.code)
        .bind(input.percent_off)
        .bind(input.starts_at)
        .bind(input.ends_at)
        .bind(input.max_usage)
        .bind(input.active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "discount code"))?;

        Ok(row.into())
    }

    /// Overwrite a code's settings. Usage count is kept.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the code doesn't exist.
    /// Returns `RepositoryError::Conflict` if the new code is taken.
    pub async fn update(
        &self,
        id: DiscountCodeId,
        input: &DiscountInput,
    ) -> Result<DiscountCode, RepositoryError> {
        let row = sqlx::query_as::<_, DiscountRow>(concat!(
            "UPDATE discount_codes SET
                code = $2, percent_off = $3, starts_at = $4, ends_at = $5,
                max_usage = $6, active = $7
             WHERE id = $1
             RETURNING ",
            discount_columns!()
        ))
        .bind(id)
        .bind(&input.code)
        .bind(input.percent_off)
        .bind(input.starts_at)
        .bind(input.ends_at)
        .bind(input.max_usage)
        .bind(input.active)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "discount code"))?;

        row.map(Into::into).ok_or(RepositoryError::NotFound)
    }

    /// Delete a code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the code doesn't exist.
    pub async fn delete(&self, id: DiscountCodeId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM discount_codes WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Count one use, unless the code is already at its limit.
    /// Returns false when no use was recorded.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn increment_usage(&self, id: DiscountCodeId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE discount_codes SET usage_count = usage_count + 1
             WHERE id = $1 AND (max_usage IS NULL OR usage_count < max_usage)",
        )
        .bind(id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
