//! Outcome of a pull sync run.

use serde::Serialize;

use corner_shop_core::ProductId;

use crate::events::EventKind;

/// What happened to one record during an upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
    Unchanged,
}

/// Per-collection counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CollectionReport {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl CollectionReport {
    pub fn record(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Created => self.created += 1,
            UpsertOutcome::Updated => self.updated += 1,
            UpsertOutcome::Unchanged => self.unchanged += 1,
        }
    }

    /// Records written (created or updated).
    #[must_use]
    pub const fn written(&self) -> usize {
        self.created + self.updated
    }
}

/// Summary of a pull run. Failures are counted, never fatal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub categories: CollectionReport,
    pub item_groups: CollectionReport,
    pub modifier_groups: CollectionReport,
    pub products: CollectionReport,
    pub orders: CollectionReport,
    pub errors: Vec<String>,
    pub created_products: Vec<ProductId>,
    pub updated_products: Vec<ProductId>,
    /// Products that went from zero to positive stock.
    pub restocked: Vec<ProductId>,
}

impl SyncReport {
    pub(crate) fn record_product(&mut self, outcome: UpsertOutcome, id: ProductId, restocked: bool) {
        self.products.record(outcome);
        match outcome {
            UpsertOutcome::Created => self.created_products.push(id),
            UpsertOutcome::Updated => self.updated_products.push(id),
            UpsertOutcome::Unchanged => {}
        }
        if restocked {
            self.restocked.push(id);
        }
    }

    /// Storefront events for every product the run created or changed.
    #[must_use]
    pub fn catalog_events(&self) -> Vec<EventKind> {
        let created = self
            .created_products
            .iter()
            .map(|&product_id| EventKind::ProductCreated { product_id });
        let updated = self
            .updated_products
            .iter()
            .map(|&product_id| EventKind::ProductUpdated { product_id });
        created.chain(updated).collect()
    }

    pub(crate) fn error(&mut self, message: String) {
        tracing::warn!(error = %message, "POS sync error");
        self.errors.push(message);
    }

    /// Total number of failed records.
    #[must_use]
    pub const fn failed(&self) -> usize {
        self.categories.failed
            + self.item_groups.failed
            + self.modifier_groups.failed
            + self.products.failed
            + self.orders.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_events_cover_created_and_updated() {
        let mut report = SyncReport::default();
        report.record_product(UpsertOutcome::Created, ProductId::new(1), false);
        report.record_product(UpsertOutcome::Updated, ProductId::new(2), true);
        report.record_product(UpsertOutcome::Unchanged, ProductId::new(3), false);

        assert_eq!(
            report.catalog_events(),
            vec![
                EventKind::ProductCreated {
                    product_id: ProductId::new(1)
                },
                EventKind::ProductUpdated {
                    product_id: ProductId::new(2)
                },
            ]
        );
        assert_eq!(report.restocked, vec![ProductId::new(2)]);
        assert_eq!(report.products.unchanged, 1);
    }

    #[test]
    fn test_record_and_totals() {
        let mut report = SyncReport::default();
        report.products.record(UpsertOutcome::Created);
        report.products.record(UpsertOutcome::Updated);
        report.products.record(UpsertOutcome::Unchanged);
        report.orders.failed += 2;
        report.categories.failed += 1;

        assert_eq!(report.products.written(), 2);
        assert_eq!(report.products.unchanged, 1);
        assert_eq!(report.failed(), 3);
    }
}
