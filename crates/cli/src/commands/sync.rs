//! One-off POS reconciliation.
//!
//! ```bash
//! corner-shop sync pull
//! ```
//!
//! Needs `DATABASE_URL`, `POS_API_TOKEN` and `POS_MERCHANT_ID`.

use corner_shop_api::config::{ConfigError, PosConfig};
use corner_shop_api::events::EventHub;
use corner_shop_api::pos::{HttpPosClient, PosError};
use corner_shop_api::services::pull_and_notify;
use corner_shop_api::sync::SyncReport;
use thiserror::Error;

use super::{ConnectError, connect};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("POS credentials are not configured (POS_API_TOKEN, POS_MERCHANT_ID)")]
    NotConfigured,

    #[error(transparent)]
    Pos(#[from] PosError),

    #[error("Could not encode report: {0}")]
    Report(#[from] serde_json::Error),
}

/// Pull the POS catalog into the database once and log the report.
///
/// Restock notifications are stored for waitlisted users; there are no live
/// subscribers in this process.
///
/// # Errors
///
/// Returns `SyncError` if configuration is missing or the database is
/// unreachable. Per-record failures are in the report, not errors.
pub async fn pull() -> Result<SyncReport, SyncError> {
    let pool = connect().await?;
    let pos_config = PosConfig::from_env()?.ok_or(SyncError::NotConfigured)?;
    let pos = HttpPosClient::new(&pos_config)?;

    tracing::info!(environment = ?pos_config.environment, "Pulling POS catalog...");
    let report = pull_and_notify(&pool, &pos, &EventHub::new()).await;

    tracing::info!(report = %serde_json::to_string(&report)?, "Sync finished");
    if report.failed() > 0 {
        tracing::warn!(failed = report.failed(), "Some records failed to sync");
    }
    Ok(report)
}
