//! Mirrors of POS item groups and modifier groups.

use sqlx::PgPool;
use sqlx::types::Json;

use corner_shop_core::{ItemGroupId, ModifierGroupId};

use super::RepositoryError;
use crate::models::{ItemGroup, Modifier, ModifierGroup};
use crate::sync::UpsertOutcome;

#[derive(Debug, sqlx::FromRow)]
struct ItemGroupRow {
    id: i32,
    pos_group_id: String,
    name: String,
    pos_item_ids: Json<Vec<String>>,
}

impl From<ItemGroupRow> for ItemGroup {
    fn from(row: ItemGroupRow) -> Self {
        Self {
            id: ItemGroupId::new(row.id),
            pos_group_id: row.pos_group_id,
            name: row.name,
            pos_item_ids: row.pos_item_ids.0,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ModifierGroupRow {
    id: i32,
    pos_group_id: String,
    name: String,
    modifiers: Json<Vec<Modifier>>,
}

impl From<ModifierGroupRow> for ModifierGroup {
    fn from(row: ModifierGroupRow) -> Self {
        Self {
            id: ModifierGroupId::new(row.id),
            pos_group_id: row.pos_group_id,
            name: row.name,
            modifiers: row.modifiers.0,
        }
    }
}

const fn outcome(inserted: Option<bool>) -> UpsertOutcome {
    match inserted {
        Some(true) => UpsertOutcome::Created,
        Some(false) => UpsertOutcome::Updated,
        None => UpsertOutcome::Unchanged,
    }
}

/// Repository for POS mirror tables.
pub struct PosMirrorRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PosMirrorRepository<'a> {
    /// Create a new mirror repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert or refresh an item group.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the statement fails.
    pub async fn upsert_item_group(
        &self,
        pos_group_id: &str,
        name: &str,
        pos_item_ids: &[String],
    ) -> Result<UpsertOutcome, RepositoryError> {
        let inserted: Option<bool> = sqlx::query_scalar(
            "INSERT INTO pos_item_groups (pos_group_id, name, pos_item_ids)
             VALUES ($1, $2, $3)
             ON CONFLICT (pos_group_id) DO UPDATE SET
                name = EXCLUDED.name, pos_item_ids = EXCLUDED.pos_item_ids
             WHERE (pos_item_groups.name, pos_item_groups.pos_item_ids)
                IS DISTINCT FROM (EXCLUDED.name, EXCLUDED.pos_item_ids)
             RETURNING (xmax = 0)",
        )
        .bind(pos_group_id)
        .bind(name)
        .bind(Json(pos_item_ids))
        .fetch_optional(self.pool)
        .await?;

        Ok(outcome(inserted))
    }

    /// Insert or refresh a modifier group.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the statement fails.
    pub async fn upsert_modifier_group(
        &self,
        pos_group_id: &str,
        name: &str,
        modifiers: &[Modifier],
    ) -> Result<UpsertOutcome, RepositoryError> {
        let inserted: Option<bool> = sqlx::query_scalar(
            "INSERT INTO pos_modifier_groups (pos_group_id, name, modifiers)
             VALUES ($1, $2, $3)
             ON CONFLICT (pos_group_id) DO UPDATE SET
                name = EXCLUDED.name, modifiers = EXCLUDED.modifiers
             WHERE (pos_modifier_groups.name, pos_modifier_groups.modifiers)
                IS DISTINCT FROM (EXCLUDED.name, EXCLUDED.modifiers)
             RETURNING (xmax = 0)",
        )
        .bind(pos_group_id)
        .bind(name)
        .bind(Json(modifiers))
        .fetch_optional(self.pool)
        .await?;

        Ok(outcome(inserted))
    }

    /// All mirrored item groups.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_item_groups(&self) -> Result<Vec<ItemGroup>, RepositoryError> {
        let rows = sqlx::query_as::<_, ItemGroupRow>(
            "SELECT id, pos_group_id, name, pos_item_ids FROM pos_item_groups ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// All mirrored modifier groups.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_modifier_groups(&self) -> Result<Vec<ModifierGroup>, RepositoryError> {
        let rows = sqlx::query_as::<_, ModifierGroupRow>(
            "SELECT id, pos_group_id, name, modifiers FROM pos_modifier_groups ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

