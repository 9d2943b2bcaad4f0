//! Derived-field computation for a single statement.
//!
//! The office's surplus or deficit for the period is netted against the
//! balance carried from the previous statement, then expenses, cash paid
//! and cash received are applied in that order. Each adjustment that
//! exceeds the balance it draws from spills onto the opposite side, so
//! receivable and payable never go negative and at most one is nonzero.

use rust_decimal::Decimal;

use crate::error::LedgerError;
use crate::models::{
    amount_limit, to_storage_scale, CarriedBalance, CommissionRates, DerivedFields,
};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Everything the computation reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputeInput {
    pub rates: CommissionRates,
    pub gross: Decimal,
    pub wins: Decimal,
    pub expenses: Decimal,
    pub cash_received: Decimal,
    pub cash_paid: Decimal,
    /// Predecessor's ending balances, zero when there is none.
    pub previous: CarriedBalance,
}

/// Pure statement computation; no I/O.
///
/// Commission amounts are rounded to the storage scale before they feed the
/// waterfall, so recomputing from stored rows reproduces stored rows.
#[derive(Debug, Clone)]
pub struct StatementComputer;

impl StatementComputer {
    pub fn compute(input: &ComputeInput) -> Result<DerivedFields, LedgerError> {
        let kept_share = Decimal::ONE - input.rates.gross_commission_pct / HUNDRED;
        let net = to_storage_scale(in_range(input.gross.checked_mul(kept_share), "net")?);
        let wins_commission_total = to_storage_scale(in_range(
            input.wins.checked_mul(input.rates.wins_commission_per_unit),
            "wins_commission_total",
        )?);

        let raw_office = in_range(net.checked_sub(wins_commission_total), "balance_office")?;
        let (balance_office, balance_client) = if raw_office < Decimal::ZERO {
            (Decimal::ZERO, -raw_office)
        } else {
            (raw_office, Decimal::ZERO)
        };

        let diff = in_range(
            input
                .previous
                .receivable
                .checked_sub(input.previous.payable)
                .and_then(|d| d.checked_add(balance_office))
                .and_then(|d| d.checked_sub(balance_client)),
            "carried balance",
        )?;
        let receivable = diff.max(Decimal::ZERO);
        let payable = (-diff).max(Decimal::ZERO);

        let (receivable, payable) =
            in_range(settle(input.expenses, receivable, payable), "expenses")?;
        let (payable, receivable) =
            in_range(settle(input.cash_paid, payable, receivable), "cash_paid")?;
        let (final_receivable, final_payable) =
            in_range(settle(input.cash_received, receivable, payable), "cash_received")?;

        let derived = DerivedFields {
            net,
            wins_commission_total,
            balance_office,
            balance_client,
            prev_balance_office: input.previous.receivable,
            prev_balance_client: input.previous.payable,
            final_receivable: to_storage_scale(final_receivable),
            final_payable: to_storage_scale(final_payable),
        };
        ensure_storable(&derived)?;
        Ok(derived)
    }
}

/// Draw `amount` from `source`; whatever `source` cannot cover is added to
/// `overflow`. Returns the new `(source, overflow)`, or `None` on overflow.
fn settle(amount: Decimal, source: Decimal, overflow: Decimal) -> Option<(Decimal, Decimal)> {
    if amount <= source {
        Some((source.checked_sub(amount)?, overflow))
    } else {
        Some((Decimal::ZERO, overflow.checked_add(amount.checked_sub(source)?)?))
    }
}

fn in_range<T>(value: Option<T>, field: &str) -> Result<T, LedgerError> {
    value.ok_or_else(|| out_of_range(field))
}

fn out_of_range(field: &str) -> LedgerError {
    LedgerError::validation(format!(
        "{} is outside the supported amount range",
        field
    ))
}

fn ensure_storable(derived: &DerivedFields) -> Result<(), LedgerError> {
    let limit = amount_limit();
    for (field, value) in [
        ("net", derived.net),
        ("wins_commission_total", derived.wins_commission_total),
        ("balance_office", derived.balance_office),
        ("balance_client", derived.balance_client),
        ("final_receivable", derived.final_receivable),
        ("final_payable", derived.final_payable),
    ] {
        if value.abs() >= limit {
            return Err(out_of_range(field));
        }
    }
    Ok(())
}
