//! Money amounts as stored in `NUMERIC(14,2)` columns.

use rust_decimal::Decimal;

use crate::errors::AppError;

/// Decimal places a stored amount keeps.
pub const AMOUNT_SCALE: u32 = 2;
/// Smallest amount that no longer fits in 12 integer digits.
const AMOUNT_LIMIT: i64 = 1_000_000_000_000;

/// Reject amounts the column would round or overflow on.
pub fn ensure_storable(amount: Decimal) -> Result<(), AppError> {
    if amount.normalize().scale() > AMOUNT_SCALE {
        return Err(AppError::Validation(format!(
            "amount can have at most {AMOUNT_SCALE} decimal places"
        )));
    }
    if amount.abs() >= Decimal::from(AMOUNT_LIMIT) {
        return Err(AppError::Validation(format!(
            "amount must be less than {AMOUNT_LIMIT}"
        )));
    }
    Ok(())
}
