//! Catalog product documents with embedded variants.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use corner_shop_core::ProductId;

/// Stock errors raised when adjusting a product's quantities.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StockError {
    #[error("variant {0} not found")]
    UnknownVariant(String),
    #[error("only {available} left in stock")]
    Insufficient { available: i32 },
}

/// A size/flavor SKU under a parent product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub label: String,
    pub price: Decimal,
    pub quantity: i32,
    #[serde(default)]
    pub sku: Option<String>,
    /// POS item backing this variant.
    #[serde(default)]
    pub pos_item_id: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub stock_count: i32,
    pub images: Vec<String>,
    pub categories: Vec<String>,
    pub variants: Vec<Variant>,
    /// POS item for a standalone (non-grouped) product.
    pub pos_item_id: Option<String>,
    /// POS item group when the variants are grouped remotely.
    pub pos_group_id: Option<String>,
    pub hidden: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Product fields without identity or timestamps, used for inserts and
/// admin edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProductDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub stock_count: i32,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub pos_item_id: Option<String>,
    #[serde(default)]
    pub pos_group_id: Option<String>,
    #[serde(default)]
    pub hidden: bool,
}

/// Sum of variant quantities, or `None` when there are no variants.
#[must_use]
pub fn aggregate_stock(variants: &[Variant]) -> Option<i32> {
    if variants.is_empty() {
        None
    } else {
        Some(variants.iter().map(|v| v.quantity.max(0)).sum())
    }
}

impl ProductDraft {
    /// Bring `stock_count` in line with the variants.
    pub fn recompute_stock(&mut self) {
        if let Some(total) = aggregate_stock(&self.variants) {
            self.stock_count = total;
        }
    }
}

impl Product {
    /// True when the product has more than one variant.
    #[must_use]
    pub fn is_multi_variant(&self) -> bool {
        self.variants.len() > 1
    }

    /// Bring `stock_count` in line with the variants.
    pub fn recompute_stock(&mut self) {
        if let Some(total) = aggregate_stock(&self.variants) {
            self.stock_count = total;
        }
    }

    /// Whether the product is linked to anything on the POS side.
    #[must_use]
    pub fn has_pos_link(&self) -> bool {
        self.pos_item_id.is_some()
            || self.pos_group_id.is_some()
            || self.variants.iter().any(|v| v.pos_item_id.is_some())
    }

    /// Find a variant by SKU.
    #[must_use]
    pub fn variant(&self, sku: &str) -> Option<&Variant> {
        self.variants
            .iter()
            .find(|v| v.sku.as_deref() == Some(sku))
    }

    /// The variant a cart or order line refers to.
    ///
    /// A line without a SKU on a single-variant product means that variant,
    /// so its stock is the variant's quantity. Without a SKU on a product
    /// with no variants (or several) the line is for the product itself.
    ///
    /// # Errors
    ///
    /// Returns `StockError::UnknownVariant` if the SKU doesn't exist.
    pub fn line_variant(&self, sku: Option<&str>) -> Result<Option<&Variant>, StockError> {
        match sku {
            Some(sku) => self
                .variant(sku)
                .map(Some)
                .ok_or_else(|| StockError::UnknownVariant(sku.to_owned())),
            None => match self.variants.as_slice() {
                [only] => Ok(Some(only)),
                _ => Ok(None),
            },
        }
    }

    /// Quantity available for a line's variant or for the whole product.
    ///
    /// # Errors
    ///
    /// Returns `StockError::UnknownVariant` if the SKU doesn't exist.
    pub fn available(&self, sku: Option<&str>) -> Result<i32, StockError> {
        Ok(self
            .line_variant(sku)?
            .map_or(self.stock_count, |v| v.quantity))
    }

    /// Unit price for a line's variant or the product.
    ///
    /// # Errors
    ///
    /// Returns `StockError::UnknownVariant` if the SKU doesn't exist.
    pub fn unit_price(&self, sku: Option<&str>) -> Result<Decimal, StockError> {
        Ok(self.line_variant(sku)?.map_or(self.price, |v| v.price))
    }

    /// Apply a stock delta to a line's variant or to the product.
    ///
    /// Negative deltas that would take stock below zero are rejected.
    /// The parent aggregate is recomputed after a variant changes.
    ///
    /// # Errors
    ///
    /// Returns `StockError::UnknownVariant` or `StockError::Insufficient`.
    pub fn adjust_stock(&mut self, sku: Option<&str>, delta: i32) -> Result<(), StockError> {
        let on_variant = sku.is_some() || self.variants.len() == 1;
        let slot = match sku {
            Some(sku) => {
                &mut self
                    .variants
                    .iter_mut()
                    .find(|v| v.sku.as_deref() == Some(sku))
                    .ok_or_else(|| StockError::UnknownVariant(sku.to_owned()))?
                    .quantity
            }
            None => match self.variants.as_mut_slice() {
                [only] => &mut only.quantity,
                _ => &mut self.stock_count,
            },
        };

        let next = slot.saturating_add(delta);
        if next < 0 {
            return Err(StockError::Insufficient { available: *slot });
        }
        *slot = next;

        if on_variant {
            self.recompute_stock();
        }
        Ok(())
    }

    /// Overwrite the editable fields from an admin draft.
    ///
    /// POS linkage is kept from the stored product; drafts can't unlink it.
    pub fn apply_draft(&mut self, draft: ProductDraft) {
        self.name = draft.name;
        self.description = draft.description;
        self.price = draft.price;
        self.stock_count = draft.stock_count;
        self.images = draft.images;
        self.categories = draft.categories;
        self.variants = draft.variants;
        self.hidden = draft.hidden;
        self.recompute_stock();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn variant(label: &str, sku: &str, price: i64, quantity: i32) -> Variant {
        Variant {
            label: label.to_string(),
            price: Decimal::new(price, 2),
            quantity,
            sku: Some(sku.to_string()),
            pos_item_id: None,
            images: vec![],
        }
    }

    pub(crate) fn product(variants: Vec<Variant>) -> Product {
        let mut product = Product {
            id: ProductId::new(1),
            name: "Cold Brew".to_string(),
            description: String::new(),
            price: Decimal::new(500, 2),
            stock_count: 10,
            images: vec![],
            categories: vec![],
            variants,
            pos_item_id: None,
            pos_group_id: None,
            hidden: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        product.recompute_stock();
        product
    }

    #[test]
    fn test_stock_count_is_sum_of_variants() {
        let product = product(vec![variant("S", "CB-S", 500, 3), variant("L", "CB-L", 700, 4)]);
        assert_eq!(product.stock_count, 7);
    }

    #[test]
    fn test_standalone_stock_is_left_alone() {
        let product = product(vec![]);
        assert_eq!(product.stock_count, 10);
        assert_eq!(product.available(None).unwrap(), 10);
    }

    #[test]
    fn test_adjust_variant_stock_updates_aggregate() {
        let mut product =
            product(vec![variant("S", "CB-S", 500, 3), variant("L", "CB-L", 700, 4)]);
        product.adjust_stock(Some("CB-L"), -2).unwrap();
        assert_eq!(product.variant("CB-L").unwrap().quantity, 2);
        assert_eq!(product.stock_count, 5);

        product.adjust_stock(Some("CB-L"), 2).unwrap();
        assert_eq!(product.stock_count, 7);
    }

    #[test]
    fn test_adjust_rejects_overdraw() {
        let mut product = product(vec![variant("S", "CB-S", 500, 1)]);
        assert_eq!(
            product.adjust_stock(Some("CB-S"), -2),
            Err(StockError::Insufficient { available: 1 })
        );
        assert_eq!(product.stock_count, 1);
    }

    #[test]
    fn test_unknown_variant() {
        let mut product = product(vec![variant("S", "CB-S", 500, 1)]);
        assert!(matches!(
            product.adjust_stock(Some("NOPE"), 1),
            Err(StockError::UnknownVariant(_))
        ));
        assert!(product.unit_price(Some("NOPE")).is_err());
    }

    #[test]
    fn test_line_without_sku_targets_sole_variant() {
        let mut product = product(vec![variant("Default", "MUG-DEFAULT", 1200, 5)]);
        assert_eq!(product.available(None).unwrap(), 5);
        assert_eq!(product.unit_price(None).unwrap(), Decimal::new(1200, 2));

        product.adjust_stock(None, -2).unwrap();
        assert_eq!(product.variants[0].quantity, 3);
        assert_eq!(product.stock_count, 3);

        product.recompute_stock();
        assert_eq!(product.stock_count, 3);
    }

    #[test]
    fn test_line_without_sku_on_multi_variant_is_product_level() {
        let product = product(vec![variant("S", "CB-S", 500, 3), variant("L", "CB-L", 700, 4)]);
        assert!(product.line_variant(None).unwrap().is_none());
        assert_eq!(product.available(None).unwrap(), 7);
    }

    #[test]
    fn test_apply_draft_keeps_pos_links() {
        let mut product = product(vec![]);
        product.pos_item_id = Some("ITEM1".to_string());
        product.apply_draft(ProductDraft {
            name: "Iced Latte".to_string(),
            price: Decimal::new(650, 2),
            stock_count: 4,
            ..ProductDraft::default()
        });
        assert_eq!(product.name, "Iced Latte");
        assert_eq!(product.pos_item_id.as_deref(), Some("ITEM1"));
        assert_eq!(product.stock_count, 4);
    }
}
