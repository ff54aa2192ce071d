//! Discount code validation and back office management.

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;

use corner_shop_core::DiscountCodeId;

use crate::db::DiscountRepository;
use crate::error::{AppError, Result};
use crate::models::discount::normalize_code;
use crate::models::{DiscountCode, DiscountError, DiscountInput};

/// Amount taken off `subtotal`, rounded to cents.
#[must_use]
pub fn discount_amount(subtotal: Decimal, percent_off: i32) -> Decimal {
    (subtotal * Decimal::from(percent_off) / Decimal::ONE_HUNDRED).round_dp(2)
}

fn validate_input(mut input: DiscountInput) -> Result<DiscountInput> {
    input.code = normalize_code(&input.code);
    if input.code.is_empty() {
        return Err(AppError::BadRequest("code is required".to_string()));
    }
    if !(1..=100).contains(&input.percent_off) {
        return Err(AppError::BadRequest(
            "percent off must be between 1 and 100".to_string(),
        ));
    }
    if let (Some(start), Some(end)) = (input.starts_at, input.ends_at)
        && end < start
    {
        return Err(AppError::BadRequest(
            "end date is before start date".to_string(),
        ));
    }
    if input.max_usage.is_some_and(|max| max < 1) {
        return Err(AppError::BadRequest(
            "max usage must be positive".to_string(),
        ));
    }
    Ok(input)
}

/// Discount code service.
pub struct DiscountService<'a> {
    codes: DiscountRepository<'a>,
}

impl<'a> DiscountService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            codes: DiscountRepository::new(pool),
        }
    }

    /// Look up a code and check it can be used right now.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Discount` describing why the code is unusable.
    pub async fn validate(&self, code: &str) -> Result<DiscountCode> {
        let code = self
            .codes
            .get_by_code(&normalize_code(code))
            .await?
            .ok_or(DiscountError::NotFound)?;
        code.check(Utc::now())?;
        Ok(code)
    }

    /// Count one use of a code.
    ///
    /// # Errors
    ///
    /// Returns `DiscountError::UsageExhausted` if the limit was hit meanwhile.
    pub async fn redeem(&self, code: &DiscountCode) -> Result<()> {
        if self.codes.increment_usage(code.id).await? {
            Ok(())
        } else {
            Err(DiscountError::UsageExhausted.into())
        }
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<DiscountCode>> {
        Ok(self.codes.list().await?)
    }

    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for invalid input and a conflict for
    /// duplicate codes.
    pub async fn create(&self, input: DiscountInput) -> Result<DiscountCode> {
        let input = validate_input(input)?;
        Ok(self.codes.create(&input).await?)
    }

    /// # Errors
    ///
    /// Same as [`Self::create`], plus not found.
    pub async fn update(&self, id: DiscountCodeId, input: DiscountInput) -> Result<DiscountCode> {
        let input = validate_input(input)?;
        Ok(self.codes.update(id, &input).await?)
    }

    /// # Errors
    ///
    /// Returns not found for unknown codes.
    pub async fn delete(&self, id: DiscountCodeId) -> Result<()> {
        Ok(self.codes.delete(id).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn input(code: &str, percent_off: i32) -> DiscountInput {
        DiscountInput {
            code: code.to_string(),
            percent_off,
            starts_at: None,
            ends_at: None,
            max_usage: None,
            active: true,
        }
    }

    #[test]
    fn test_amount_rounds_to_cents() {
        assert_eq!(
            discount_amount(Decimal::new(1999, 2), 15),
            Decimal::new(300, 2)
        );
        assert_eq!(
            discount_amount(Decimal::new(1000, 2), 100),
            Decimal::new(1000, 2)
        );
    }

    #[test]
    fn test_input_is_normalized() {
        let input = validate_input(input("  summer10 ", 10)).unwrap();
        assert_eq!(input.code, "SUMMER10");
    }

    #[test]
    fn test_percent_range() {
        assert!(validate_input(input("A", 0)).is_err());
        assert!(validate_input(input("A", 101)).is_err());
        assert!(validate_input(input("A", 100)).is_ok());
    }

    #[test]
    fn test_window_must_be_ordered() {
        let mut bad = input("A", 10);
        let now = Utc::now();
        bad.starts_at = Some(now);
        bad.ends_at = Some(now - Duration::days(1));
        assert!(validate_input(bad).is_err());
    }
}
