//! Local mirrors of POS-side objects that have no storefront meaning of
//! their own.

use serde::{Deserialize, Serialize};

use corner_shop_core::{ItemGroupId, ModifierGroupId};

/// Mirror of a POS item group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemGroup {
    pub id: ItemGroupId,
    pub pos_group_id: String,
    pub name: String,
    pub pos_item_ids: Vec<String>,
}

/// One option inside a modifier group (e.g. "oat milk").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifier {
    pub pos_modifier_id: String,
    pub name: String,
    pub price: rust_decimal::Decimal,
}

/// Mirror of a POS modifier group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModifierGroup {
    pub id: ModifierGroupId,
    pub pos_group_id: String,
    pub name: String,
    pub modifiers: Vec<Modifier>,
}
