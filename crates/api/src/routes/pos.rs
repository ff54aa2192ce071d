//! Back office POS routes: manual sync and read-through listings.

use axum::{Json, extract::State};
use serde_json::{Value, json};
use tracing::info;

use super::success;
use crate::db::PosMirrorRepository;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::pos::{PosClient, PosError};
use crate::services::pull_and_notify;
use crate::state::AppState;

fn pos(state: &AppState) -> Result<&dyn PosClient> {
    Ok(state.pos().ok_or(PosError::NotConfigured)?)
}

/// POST /api/pos/sync
pub async fn sync(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<Value>> {
    let pos = pos(&state)?;
    info!(admin_id = %admin.id, "Manual POS sync");

    let report = pull_and_notify(state.pool(), pos, state.events()).await;
    state.cache().invalidate();
    Ok(success(json!({ "report": report })))
}

/// GET /api/pos/items
pub async fn items(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Value>> {
    let items = pos(&state)?.list_items().await?;
    Ok(success(json!({ "items": items })))
}

/// GET /api/pos/categories
pub async fn categories(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Value>> {
    let categories = pos(&state)?.list_categories().await?;
    Ok(success(json!({ "categories": categories })))
}

/// GET /api/pos/mirrors
///
/// Item and modifier groups as last pulled.
pub async fn mirrors(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Value>> {
    let repo = PosMirrorRepository::new(state.pool());
    let item_groups = repo.list_item_groups().await?;
    let modifier_groups = repo.list_modifier_groups().await?;
    Ok(success(json!({
        "item_groups": item_groups,
        "modifier_groups": modifier_groups,
    })))
}
