//! Store-wide settings document.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Single settings document for the shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub store_name: String,
    pub currency: String,
    /// Flat fee added to every storefront order.
    pub shipping_fee: Decimal,
    /// Whether local catalog edits are mirrored to the POS.
    pub pos_sync_enabled: bool,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            store_name: "Corner Shop".to_string(),
            currency: "USD".to_string(),
            shipping_fee: Decimal::ZERO,
            pos_sync_enabled: true,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings: StoreSettings =
            serde_json::from_str(r#"{"store_name":"Bodega"}"#).unwrap();
        assert_eq!(settings.store_name, "Bodega");
        assert_eq!(settings.currency, "USD");
        assert!(settings.pos_sync_enabled);
    }
}
