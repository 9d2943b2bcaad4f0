//! In-memory view of one client's ledger.
//!
//! Statements are kept sorted by ledger key (`due_date`) and keys are unique
//! within a client. All recomputation happens on this view; nothing is
//! written back until the caller commits the resulting change set.

use chrono::NaiveDate;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::LedgerError;
use crate::models::{CarriedBalance, DailySales, Statement};

#[derive(Debug, Clone)]
pub struct Ledger {
    client_id: Uuid,
    statements: Vec<Statement>,
    daily_sales: HashMap<Uuid, DailySales>,
}

impl Ledger {
    /// Build the view from stored rows. Duplicate keys or foreign rows mean
    /// storage already violates the ledger's invariants.
    pub fn new(
        client_id: Uuid,
        mut statements: Vec<Statement>,
        daily_sales: Vec<DailySales>,
    ) -> Result<Self, LedgerError> {
        if let Some(foreign) = statements.iter().find(|s| s.client_id != client_id) {
            return Err(LedgerError::inconsistent(
                client_id,
                format!("statement {} belongs to another client", foreign.statement_id),
            ));
        }

        statements.sort_by_key(|s| s.ledger_key());
        if let Some(pair) = statements
            .windows(2)
            .find(|w| w[0].ledger_key() == w[1].ledger_key())
        {
            return Err(LedgerError::inconsistent(
                client_id,
                format!(
                    "statements {} and {} share due date {}",
                    pair[0].statement_id,
                    pair[1].statement_id,
                    pair[0].ledger_key()
                ),
            ));
        }

        let daily_sales = daily_sales
            .into_iter()
            .map(|d| (d.statement_id, d))
            .collect();

        Ok(Self {
            client_id,
            statements,
            daily_sales,
        })
    }

    pub fn client_id(&self) -> Uuid {
        self.client_id
    }

    /// Statements in ascending ledger-key order.
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn get(&self, statement_id: Uuid) -> Option<&Statement> {
        self.statements
            .iter()
            .find(|s| s.statement_id == statement_id)
    }

    pub fn position(&self, statement_id: Uuid) -> Option<usize> {
        self.statements
            .iter()
            .position(|s| s.statement_id == statement_id)
    }

    pub(crate) fn statement_mut(&mut self, index: usize) -> Option<&mut Statement> {
        self.statements.get_mut(index)
    }

    pub fn daily_sales(&self, statement_id: Uuid) -> Option<&DailySales> {
        self.daily_sales.get(&statement_id)
    }

    /// Index of the first statement whose key is on or after `date`.
    pub fn first_on_or_after(&self, date: NaiveDate) -> usize {
        self.statements.partition_point(|s| s.ledger_key() < date)
    }

    /// Reject a due date already used by another statement of this client.
    pub fn ensure_key_available(
        &self,
        due_date: NaiveDate,
        exclude_id: Option<Uuid>,
    ) -> Result<(), LedgerError> {
        let taken = self
            .statements
            .iter()
            .any(|s| s.ledger_key() == due_date && Some(s.statement_id) != exclude_id);
        if taken {
            return Err(LedgerError::validation(format!(
                "Client already has a statement due on {}",
                due_date
            )));
        }
        Ok(())
    }

    /// Add a new statement in key order.
    pub fn insert(
        &mut self,
        statement: Statement,
        daily_sales: Option<DailySales>,
    ) -> Result<(), LedgerError> {
        if statement.client_id != self.client_id {
            return Err(LedgerError::validation(
                "Statement belongs to a different client",
            ));
        }
        self.ensure_key_available(statement.ledger_key(), None)?;

        let index = self.first_on_or_after(statement.ledger_key());
        match daily_sales {
            Some(daily) => {
                self.daily_sales.insert(statement.statement_id, daily);
            }
            None => {
                self.daily_sales.remove(&statement.statement_id);
            }
        }
        self.statements.insert(index, statement);
        Ok(())
    }

    /// Swap in a new version of an existing statement, moving it if its key
    /// changed. Returns the previous version.
    pub fn replace(
        &mut self,
        statement: Statement,
        daily_sales: Option<DailySales>,
    ) -> Result<Statement, LedgerError> {
        let index = self
            .position(statement.statement_id)
            .ok_or(LedgerError::StatementNotFound(statement.statement_id))?;
        if statement.client_id != self.client_id {
            return Err(LedgerError::validation(
                "Statement cannot move to a different client",
            ));
        }
        self.ensure_key_available(statement.ledger_key(), Some(statement.statement_id))?;

        let previous = self.statements.remove(index);
        self.insert(statement, daily_sales)?;
        Ok(previous)
    }

    /// Drop a statement and its daily breakdown.
    pub fn remove(&mut self, statement_id: Uuid) -> Option<(Statement, Option<DailySales>)> {
        let index = self.position(statement_id)?;
        let statement = self.statements.remove(index);
        let daily = self.daily_sales.remove(&statement_id);
        Some((statement, daily))
    }

    /// Closing balance of the statement at `index`, or zero before the first.
    pub fn closing_before(&self, index: usize) -> CarriedBalance {
        index
            .checked_sub(1)
            .and_then(|i| self.statements.get(i))
            .map(Statement::closing_balance)
            .unwrap_or(CarriedBalance::ZERO)
    }

    /// Check that every statement from `start` on opens with its
    /// predecessor's closing balance.
    pub fn verify_chain_from(&self, start: usize) -> Result<(), LedgerError> {
        for index in start..self.statements.len() {
            let statement = &self.statements[index];
            let expected = self.closing_before(index);
            if statement.opening_balance() != expected {
                return Err(LedgerError::inconsistent(
                    self.client_id,
                    format!(
                        "statement {} opens with {}/{} but predecessor closed with {}/{}",
                        statement.statement_id,
                        statement.prev_balance_office,
                        statement.prev_balance_client,
                        expected.receivable,
                        expected.payable
                    ),
                ));
            }
        }
        Ok(())
    }
}
