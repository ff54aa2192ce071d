//! Category repository.

use sqlx::PgPool;

use corner_shop_core::CategoryId;

use super::RepositoryError;
use crate::models::Category;
use crate::sync::UpsertOutcome;

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: i32,
    name: String,
    pos_category_id: Option<String>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: CategoryId::new(row.id),
            name: row.name,
            pos_category_id: row.pos_category_id,
        }
    }
}

/// Repository for category database operations.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All categories by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, pos_category_id FROM categories ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Create a local category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, name: &str) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "INSERT INTO categories (name) VALUES ($1) RETURNING id, name, pos_category_id",
        )
        .bind(name)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "category"))?;

        Ok(row.into())
    }

    /// Rename a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category doesn't exist.
    /// Returns `RepositoryError::Conflict` if the new name is taken.
    pub async fn rename(&self, id: CategoryId, name: &str) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "UPDATE categories SET name = $2 WHERE id = $1 RETURNING id, name, pos_category_id",
        )
        .bind(id)
        .bind(name)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "category"))?;

        row.map(Into::into).ok_or(RepositoryError::NotFound)
    }

    /// Delete a category. Products keep the name in their category list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category doesn't exist.
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Mirror a POS category.
    ///
    /// Matches by POS ID first, then adopts an unlinked local category with
    /// the same name, and otherwise inserts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a statement fails.
    pub async fn upsert_pos(
        &self,
        pos_category_id: &str,
        name: &str,
    ) -> Result<UpsertOutcome, RepositoryError> {
        let existing = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, pos_category_id FROM categories WHERE pos_category_id = $1",
        )
        .bind(pos_category_id)
        .fetch_optional(self.pool)
        .await?;

        if let Some(row) = existing {
            if row.name == name {
                return Ok(UpsertOutcome::Unchanged);
            }
            sqlx::query("UPDATE categories SET name = $2 WHERE id = $1")
                .bind(row.id)
                .bind(name)
                .execute(self.pool)
                .await
                .map_err(|e| RepositoryError::from_insert(e, "category"))?;
            return Ok(UpsertOutcome::Updated);
        }

        let adopted = sqlx::query(
            "UPDATE categories SET pos_category_id = $1
             WHERE name = $2 AND pos_category_id IS NULL",
        )
        .bind(pos_category_id)
        .bind(name)
        .execute(self.pool)
        .await?;
        if adopted.rows_affected() > 0 {
            return Ok(UpsertOutcome::Updated);
        }

        sqlx::query("INSERT INTO categories (name, pos_category_id) VALUES ($1, $2)")
            .bind(name)
            .bind(pos_category_id)
            .execute(self.pool)
            .await
            .map_err(|e| RepositoryError::from_insert(e, "category"))?;
        Ok(UpsertOutcome::Created)
    }
}
