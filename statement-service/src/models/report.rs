//! Period report snapshot.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Reporting period granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Monthly,
    Yearly,
}

impl PeriodType {
    /// Get string representation for database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "monthly" => Some(Self::Monthly),
            "yearly" => Some(Self::Yearly),
            _ => None,
        }
    }
}

impl std::fmt::Display for PeriodType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Sums over the statements of one period.
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
pub struct PeriodTotals {
    pub total_gross: Decimal,
    pub total_wins: Decimal,
    pub total_net: Decimal,
    pub total_wins_commission: Decimal,
    pub total_balance_office: Decimal,
    pub total_balance_client: Decimal,
    pub statement_count: i64,
}

/// Generated report. Never updated; delete and regenerate instead.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Report {
    pub report_id: Uuid,
    pub client_id: Uuid,
    pub period_type: String,
    pub period: String,
    pub notes: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub totals: PeriodTotals,
    pub generated_utc: DateTime<Utc>,
}

impl Report {
    pub fn new(
        client_id: Uuid,
        period_type: PeriodType,
        period: impl Into<String>,
        notes: impl Into<String>,
        totals: PeriodTotals,
    ) -> Self {
        Self {
            report_id: Uuid::new_v4(),
            client_id,
            period_type: period_type.as_str().to_string(),
            period: period.into(),
            notes: notes.into(),
            totals,
            generated_utc: Utc::now(),
        }
    }

    /// Get parsed period type.
    pub fn parsed_period_type(&self) -> Option<PeriodType> {
        PeriodType::parse(&self.period_type)
    }
}
