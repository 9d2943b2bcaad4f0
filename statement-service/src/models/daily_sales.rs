//! Per-weekday sales breakdown owned by a statement.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Seven day buckets whose sum is the owning statement's gross.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct DailySales {
    pub statement_id: Uuid,
    pub client_id: Uuid,
    pub monday: Decimal,
    pub tuesday: Decimal,
    pub wednesday: Decimal,
    pub thursday: Decimal,
    pub friday: Decimal,
    pub saturday: Decimal,
    pub sunday: Decimal,
    pub created_utc: DateTime<Utc>,
}

impl DailySales {
    pub fn buckets(&self) -> [Decimal; 7] {
        [
            self.monday,
            self.tuesday,
            self.wednesday,
            self.thursday,
            self.friday,
            self.saturday,
            self.sunday,
        ]
    }

    /// Sum of all seven buckets.
    pub fn total(&self) -> Decimal {
        self.buckets().iter().copied().sum()
    }
}
