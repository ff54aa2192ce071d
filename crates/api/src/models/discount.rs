//! Discount codes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use corner_shop_core::DiscountCodeId;

/// Reasons a discount code can't be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DiscountError {
    #[error("discount code not found")]
    NotFound,
    #[error("discount code is inactive")]
    Inactive,
    #[error("discount code is not active yet")]
    NotStarted,
    #[error("discount code has expired")]
    Expired,
    #[error("discount code has reached its usage limit")]
    UsageExhausted,
}

/// A stored discount code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscountCode {
    pub id: DiscountCodeId,
    pub code: String,
    pub percent_off: i32,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub max_usage: Option<i32>,
    pub usage_count: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Admin input for creating or editing a code.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscountInput {
    pub code: String,
    pub percent_off: i32,
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub max_usage: Option<i32>,
    #[serde(default = "default_active")]
    pub active: bool,
}

const fn default_active() -> bool {
    true
}

/// Codes are matched case-insensitively and stored uppercase.
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

impl DiscountCode {
    /// Check whether the code is usable at `now`.
    ///
    /// The window is inclusive on both ends.
    ///
    /// # Errors
    ///
    /// Returns the first reason the code can't be used.
    pub fn check(&self, now: DateTime<Utc>) -> Result<(), DiscountError> {
        if !self.active {
            return Err(DiscountError::Inactive);
        }
        if self.starts_at.is_some_and(|start| now < start) {
            return Err(DiscountError::NotStarted);
        }
        if self.ends_at.is_some_and(|end| now > end) {
            return Err(DiscountError::Expired);
        }
        if self.max_usage.is_some_and(|max| self.usage_count >= max) {
            return Err(DiscountError::UsageExhausted);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn code() -> DiscountCode {
        DiscountCode {
            id: DiscountCodeId::new(1),
            code: "SPRING10".to_string(),
            percent_off: 10,
            starts_at: None,
            ends_at: None,
            max_usage: None,
            usage_count: 0,
            active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_open_ended_code_is_valid() {
        assert_eq!(code().check(Utc::now()), Ok(()));
    }

    #[test]
    fn test_window_bounds() {
        let now = Utc::now();
        let mut c = code();
        c.starts_at = Some(now + Duration::hours(1));
        assert_eq!(c.check(now), Err(DiscountError::NotStarted));

        c.starts_at = Some(now - Duration::hours(2));
        c.ends_at = Some(now - Duration::hours(1));
        assert_eq!(c.check(now), Err(DiscountError::Expired));

        c.ends_at = Some(now);
        assert_eq!(c.check(now), Ok(()));
    }

    #[test]
    fn test_usage_limit() {
        let mut c = code();
        c.max_usage = Some(3);
        c.usage_count = 2;
        assert_eq!(c.check(Utc::now()), Ok(()));
        c.usage_count = 3;
        assert_eq!(c.check(Utc::now()), Err(DiscountError::UsageExhausted));
    }

    #[test]
    fn test_inactive_wins() {
        let mut c = code();
        c.active = false;
        c.usage_count = 99;
        c.max_usage = Some(1);
        assert_eq!(c.check(Utc::now()), Err(DiscountError::Inactive));
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  spring10 "), "SPRING10");
    }
}
