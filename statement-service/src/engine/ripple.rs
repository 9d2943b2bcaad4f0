//! Sequential recomputation of a ledger after an insert, edit or delete.
//!
//! Each statement opens with the freshly recomputed closing balance of the
//! one before it, so the walk is strictly ordered and always runs to the end
//! of the ledger. Results are applied to the in-memory [`Ledger`] only; the
//! caller commits them as one unit.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{ComputeInput, Ledger, LedgerSequencer, StatementComputer};
use crate::error::LedgerError;
use crate::models::{CommissionRates, DailySales, Statement};

#[derive(Debug, Clone)]
pub struct RippleRecalculator;

impl RippleRecalculator {
    /// Recompute `statement_id` against its predecessor, then every statement
    /// after it. Returns the updated statements in ledger order.
    pub fn recalculate_from(
        ledger: &mut Ledger,
        rates: &CommissionRates,
        statement_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Vec<Statement>, LedgerError> {
        let start = ledger
            .position(statement_id)
            .ok_or(LedgerError::StatementNotFound(statement_id))?;
        Self::walk(ledger, rates, start, at)
    }

    /// Recompute every statement keyed on or after `anchor`.
    pub fn recalculate_since(
        ledger: &mut Ledger,
        rates: &CommissionRates,
        anchor: NaiveDate,
        at: DateTime<Utc>,
    ) -> Result<Vec<Statement>, LedgerError> {
        let start = ledger.first_on_or_after(anchor);
        Self::walk(ledger, rates, start, at)
    }

    #[instrument(skip(ledger, rates, at), fields(client_id = %ledger.client_id(), statements = ledger.len()))]
    fn walk(
        ledger: &mut Ledger,
        rates: &CommissionRates,
        start: usize,
        at: DateTime<Utc>,
    ) -> Result<Vec<Statement>, LedgerError> {
        let Some(first) = ledger.statements().get(start) else {
            return Ok(Vec::new());
        };
        let mut previous = LedgerSequencer::opening_balance(
            ledger,
            first.ledger_key(),
            Some(first.statement_id),
        );

        let client_id = ledger.client_id();
        let mut updated = Vec::with_capacity(ledger.len() - start);

        for index in start..ledger.len() {
            let statement_id = ledger.statements()[index].statement_id;
            let daily_gross = ledger.daily_sales(statement_id).map(DailySales::total);

            let statement = ledger.statement_mut(index).ok_or_else(|| {
                LedgerError::inconsistent(client_id, format!("lost statement at {}", index))
            })?;

            if let Some(gross) = daily_gross {
                statement.gross = gross;
            }

            let derived = StatementComputer::compute(&ComputeInput {
                rates: *rates,
                gross: statement.gross,
                wins: statement.wins,
                expenses: statement.expenses,
                cash_received: statement.cash_received,
                cash_paid: statement.cash_paid,
                previous,
            })?;
            statement.apply_derived(&derived);
            statement.updated_utc = at;
            previous = statement.closing_balance();

            debug!(
                statement_id = %statement.statement_id,
                due_date = %statement.due_date,
                final_receivable = %statement.final_receivable,
                final_payable = %statement.final_payable,
                "Statement recomputed"
            );

            updated.push(statement.clone());
        }

        ledger.verify_chain_from(start)?;

        Ok(updated)
    }
}
