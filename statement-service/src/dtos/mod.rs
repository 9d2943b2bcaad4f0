//! Validated request bodies for the statement operations.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::LedgerError;
use crate::models::{fits_storage, DailySales, PeriodType, Statement, MONEY_SCALE};

/// Per-weekday sales as submitted by the caller. Missing days count as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailySalesInput {
    #[serde(default)]
    pub monday: Decimal,
    #[serde(default)]
    pub tuesday: Decimal,
    #[serde(default)]
    pub wednesday: Decimal,
    #[serde(default)]
    pub thursday: Decimal,
    #[serde(default)]
    pub friday: Decimal,
    #[serde(default)]
    pub saturday: Decimal,
    #[serde(default)]
    pub sunday: Decimal,
}

impl DailySalesInput {
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

    /// Sum of the buckets, `None` if it overflows.
    pub fn checked_total(&self) -> Option<Decimal> {
        self.buckets()
            .iter()
            .try_fold(Decimal::ZERO, |acc, day| acc.checked_add(*day))
    }

    pub fn to_row(
        &self,
        statement_id: Uuid,
        client_id: Uuid,
        created_utc: DateTime<Utc>,
    ) -> DailySales {
        DailySales {
            statement_id,
            client_id,
            monday: self.monday,
            tuesday: self.tuesday,
            wednesday: self.wednesday,
            thursday: self.thursday,
            friday: self.friday,
            saturday: self.saturday,
            sunday: self.sunday,
            created_utc,
        }
    }
}

/// Raw statement inputs shared by create and update.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_statement_fields"))]
pub struct StatementFields {
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    /// Gross sales. Derived from `daily_sales` when omitted.
    pub gross: Option<Decimal>,
    pub daily_sales: Option<DailySalesInput>,
    #[serde(default)]
    #[validate(custom(function = "validate_amount"))]
    pub wins: Decimal,
    #[serde(default)]
    #[validate(custom(function = "validate_amount"))]
    pub expenses: Decimal,
    #[serde(default)]
    #[validate(custom(function = "validate_amount"))]
    pub cash_received: Decimal,
    #[serde(default)]
    #[validate(custom(function = "validate_amount"))]
    pub cash_paid: Decimal,
}

/// Fully specified inputs, produced only from validated fields.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementInputs {
    pub start_date: NaiveDate,
    pub due_date: NaiveDate,
    pub gross: Decimal,
    pub daily_sales: Option<DailySalesInput>,
    pub wins: Decimal,
    pub expenses: Decimal,
    pub cash_received: Decimal,
    pub cash_paid: Decimal,
}

impl StatementFields {
    /// Validate and convert into [`StatementInputs`].
    pub fn resolve(self) -> Result<StatementInputs, LedgerError> {
        self.validate()?;

        let (Some(start_date), Some(due_date)) = (self.start_date, self.due_date) else {
            return Err(LedgerError::validation(
                "Both start_date and due_date are required",
            ));
        };

        let gross = match (&self.gross, &self.daily_sales) {
            (_, Some(daily)) => daily
                .checked_total()
                .ok_or_else(|| LedgerError::validation("daily_sales total is out of range"))?,
            (Some(gross), None) => *gross,
            (None, None) => {
                return Err(LedgerError::validation(
                    "Either gross or daily_sales is required",
                ))
            }
        };

        Ok(StatementInputs {
            start_date,
            due_date,
            gross,
            daily_sales: self.daily_sales,
            wins: self.wins,
            expenses: self.expenses,
            cash_received: self.cash_received,
            cash_paid: self.cash_paid,
        })
    }
}

impl StatementInputs {
    /// Statement carrying these raw inputs. Derived fields start at zero and
    /// are filled in by the ledger engine.
    pub fn to_statement(
        &self,
        statement_id: Uuid,
        client_id: Uuid,
        created_utc: DateTime<Utc>,
        updated_utc: DateTime<Utc>,
    ) -> Statement {
        Statement {
            statement_id,
            client_id,
            start_date: self.start_date,
            due_date: self.due_date,
            gross: self.gross,
            wins: self.wins,
            expenses: self.expenses,
            cash_received: self.cash_received,
            cash_paid: self.cash_paid,
            net: Decimal::ZERO,
            wins_commission_total: Decimal::ZERO,
            balance_office: Decimal::ZERO,
            balance_client: Decimal::ZERO,
            prev_balance_office: Decimal::ZERO,
            prev_balance_client: Decimal::ZERO,
            final_receivable: Decimal::ZERO,
            final_payable: Decimal::ZERO,
            created_utc,
            updated_utc,
        }
    }
}

fn rule(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

/// Amounts are non-negative and must fit a `NUMERIC(19, 4)` column.
fn validate_amount(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(rule("non_negative", "Monetary amounts cannot be negative"));
    }
    if value.scale() > MONEY_SCALE {
        return Err(rule(
            "scale",
            "Monetary amounts have at most four decimal places",
        ));
    }
    if !fits_storage(*value) {
        return Err(rule("range", "Monetary amount is too large"));
    }
    Ok(())
}

fn validate_statement_fields(fields: &StatementFields) -> Result<(), ValidationError> {
    let (Some(start), Some(due)) = (fields.start_date, fields.due_date) else {
        return Err(rule(
            "dates_required",
            "Both start_date and due_date are required",
        ));
    };
    if due < start {
        return Err(rule(
            "due_before_start",
            "due_date cannot be earlier than start_date",
        ));
    }

    match (&fields.gross, &fields.daily_sales) {
        (None, None) => Err(rule(
            "gross_required",
            "Either gross or daily_sales is required",
        )),
        (gross, Some(daily)) => {
            for day in daily.buckets() {
                validate_amount(&day)?;
            }
            let total = daily
                .checked_total()
                .filter(|t| fits_storage(*t))
                .ok_or_else(|| rule("range", "Sum of daily_sales is too large"))?;
            match gross {
                Some(g) if *g != total => Err(rule(
                    "gross_mismatch",
                    "gross must equal the sum of daily_sales",
                )),
                _ => Ok(()),
            }
        }
        (Some(gross), None) => validate_amount(gross),
    }
}

/// Create a statement for a client.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateStatementRequest {
    pub client_id: Uuid,
    #[serde(flatten)]
    #[validate(nested)]
    pub fields: StatementFields,
}

/// Replace a statement's raw inputs.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateStatementRequest {
    #[serde(flatten)]
    #[validate(nested)]
    pub fields: StatementFields,
}

/// Generate a period report for a client.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GenerateReportRequest {
    pub client_id: Uuid,
    pub period_type: PeriodType,
    #[validate(length(min = 4, max = 7, message = "period must be YYYY or YYYY-MM"))]
    pub period: String,
    #[serde(default)]
    #[validate(length(max = 2000, message = "notes cannot exceed 2000 characters"))]
    pub notes: String,
}
