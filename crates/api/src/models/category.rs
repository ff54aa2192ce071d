//! Catalog categories.

use serde::{Deserialize, Serialize};

use corner_shop_core::CategoryId;

/// A product category, optionally mirrored from the POS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub pos_category_id: Option<String>,
}

/// Admin input for creating or renaming a category.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub name: String,
}
