//! Predecessor lookup within a client's ledger.

use chrono::NaiveDate;
use uuid::Uuid;

use super::Ledger;
use crate::models::{CarriedBalance, Statement};

#[derive(Debug, Clone)]
pub struct LedgerSequencer;

impl LedgerSequencer {
    /// Latest statement whose ledger key is strictly before `reference_date`,
    /// skipping `exclude_id` (the statement being recomputed).
    pub fn find_predecessor(
        ledger: &Ledger,
        reference_date: NaiveDate,
        exclude_id: Option<Uuid>,
    ) -> Option<&Statement> {
        let end = ledger.first_on_or_after(reference_date);
        ledger.statements()[..end]
            .iter()
            .rev()
            .find(|s| Some(s.statement_id) != exclude_id)
    }

    /// Ending balances of the predecessor, or zero when there is none.
    pub fn opening_balance(
        ledger: &Ledger,
        reference_date: NaiveDate,
        exclude_id: Option<Uuid>,
    ) -> CarriedBalance {
        Self::find_predecessor(ledger, reference_date, exclude_id)
            .map(Statement::closing_balance)
            .unwrap_or(CarriedBalance::ZERO)
    }
}
