//! Statement model: one settlement period of a client's ledger.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::DailySales;

/// Ending balances carried from one statement into the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CarriedBalance {
    pub receivable: Decimal,
    pub payable: Decimal,
}

impl CarriedBalance {
    pub const ZERO: Self = Self {
        receivable: Decimal::ZERO,
        payable: Decimal::ZERO,
    };

    pub fn new(receivable: Decimal, payable: Decimal) -> Self {
        Self {
            receivable,
            payable,
        }
    }
}

/// Fields computed from raw inputs and the predecessor's ending balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DerivedFields {
    pub net: Decimal,
    pub wins_commission_total: Decimal,
    pub balance_office: Decimal,
    pub balance_client: Decimal,
    pub prev_balance_office: Decimal,
    pub prev_balance_client: Decimal,
    pub final_receivable: Decimal,
    pub final_payable: Decimal,
}

/// Persisted statement.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Statement {
    pub statement_id: Uuid,
    pub client_id: Uuid,
    pub start_date: NaiveDate,
    /// Ledger key: statements of a client are ordered by this date.
    pub due_date: NaiveDate,
    // Raw inputs
    pub gross: Decimal,
    pub wins: Decimal,
    pub expenses: Decimal,
    pub cash_received: Decimal,
    pub cash_paid: Decimal,
    // Derived
    pub net: Decimal,
    pub wins_commission_total: Decimal,
    pub balance_office: Decimal,
    pub balance_client: Decimal,
    pub prev_balance_office: Decimal,
    pub prev_balance_client: Decimal,
    pub final_receivable: Decimal,
    pub final_payable: Decimal,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Statement {
    /// Date used for predecessor lookup and ripple ordering.
    pub fn ledger_key(&self) -> NaiveDate {
        self.due_date
    }

    /// Balances the next statement opens with.
    pub fn closing_balance(&self) -> CarriedBalance {
        CarriedBalance::new(self.final_receivable, self.final_payable)
    }

    /// Balances this statement opened with.
    pub fn opening_balance(&self) -> CarriedBalance {
        CarriedBalance::new(self.prev_balance_office, self.prev_balance_client)
    }

    pub fn derived(&self) -> DerivedFields {
        DerivedFields {
            net: self.net,
            wins_commission_total: self.wins_commission_total,
            balance_office: self.balance_office,
            balance_client: self.balance_client,
            prev_balance_office: self.prev_balance_office,
            prev_balance_client: self.prev_balance_client,
            final_receivable: self.final_receivable,
            final_payable: self.final_payable,
        }
    }

    pub fn apply_derived(&mut self, derived: &DerivedFields) {
        self.net = derived.net;
        self.wins_commission_total = derived.wins_commission_total;
        self.balance_office = derived.balance_office;
        self.balance_client = derived.balance_client;
        self.prev_balance_office = derived.prev_balance_office;
        self.prev_balance_client = derived.prev_balance_client;
        self.final_receivable = derived.final_receivable;
        self.final_payable = derived.final_payable;
    }
}

/// Statement together with its daily breakdown, if it has one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementRecord {
    pub statement: Statement,
    pub daily_sales: Option<DailySales>,
}
