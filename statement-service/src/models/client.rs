//! Client model: the party a statement ledger belongs to.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::LedgerError;

/// Client with its commission terms.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Client {
    pub client_id: Uuid,
    pub name: String,
    /// Percentage of gross kept as commission (0-100).
    pub gross_commission_pct: Decimal,
    pub wins_commission_per_unit: Decimal,
    pub active: bool,
    pub created_utc: DateTime<Utc>,
}

impl Client {
    pub fn new(
        name: impl Into<String>,
        gross_commission_pct: Decimal,
        wins_commission_per_unit: Decimal,
    ) -> Self {
        Self {
            client_id: Uuid::new_v4(),
            name: name.into(),
            gross_commission_pct,
            wins_commission_per_unit,
            active: true,
            created_utc: Utc::now(),
        }
    }

    /// Commission terms, read-only for the duration of a recomputation.
    pub fn rates(&self) -> CommissionRates {
        CommissionRates {
            gross_commission_pct: self.gross_commission_pct,
            wins_commission_per_unit: self.wins_commission_per_unit,
        }
    }

    /// Rates must be usable before any statement is computed with them.
    pub fn validate_rates(&self) -> Result<(), LedgerError> {
        if self.gross_commission_pct < Decimal::ZERO
            || self.gross_commission_pct > Decimal::ONE_HUNDRED
        {
            return Err(LedgerError::validation(format!(
                "gross_commission_pct must be between 0 and 100, got {}",
                self.gross_commission_pct
            )));
        }
        if self.wins_commission_per_unit < Decimal::ZERO {
            return Err(LedgerError::validation(format!(
                "wins_commission_per_unit cannot be negative, got {}",
                self.wins_commission_per_unit
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionRates {
    pub gross_commission_pct: Decimal,
    pub wins_commission_per_unit: Decimal,
}
