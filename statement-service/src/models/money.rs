//! Money representation shared by the engine, requests and storage.
//!
//! Amounts are persisted as `NUMERIC(19, 4)`: at most four fractional
//! digits and an absolute value below 10^15.

use rust_decimal::{Decimal, RoundingStrategy};

/// Fractional digits kept for every stored amount.
pub const MONEY_SCALE: u32 = 4;

/// Exclusive upper bound for the absolute value of a stored amount.
pub fn amount_limit() -> Decimal {
    Decimal::new(1_000_000_000_000_000, 0)
}

/// Round to the storage scale, halves away from zero.
pub fn to_storage_scale(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Whether `value` can be stored without rounding or overflow.
pub fn fits_storage(value: Decimal) -> bool {
    value.scale() <= MONEY_SCALE && value.abs() < amount_limit()
}
