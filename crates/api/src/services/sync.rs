//! Pull sync with its storefront side effects.

use sqlx::PgPool;
use tracing::{info, instrument, warn};

use crate::db::PgCatalog;
use crate::events::EventHub;
use crate::pos::PosClient;
use crate::services::notifications::NotificationService;
use crate::sync::{PullSync, SyncReport};

/// Run one pull reconciliation, then notify waitlists for restocked
/// products and announce every product the run created or changed.
///
/// Never fails; notification problems are added to the report.
#[instrument(skip_all)]
pub async fn pull_and_notify(pool: &PgPool, pos: &dyn PosClient, events: &EventHub) -> SyncReport {
    let store = PgCatalog::new(pool.clone());
    let mut report = PullSync::new(pos, &store).run().await;

    let notifications = NotificationService::new(pool, events);
    match notifications.notify_restocked(&report.restocked).await {
        Ok(notified) if notified > 0 => info!(notified, "Waitlists notified after sync"),
        Ok(_) => {}
        Err(e) => {
            warn!(error = %e, "Restock notifications failed after sync");
            report.errors.push(format!("restock notifications: {e}"));
        }
    }

    for event in report.catalog_events() {
        events.broadcast(event);
    }
    report
}
