//! Period totals for reports.

use chrono::NaiveDate;

use crate::error::LedgerError;
use crate::models::{PeriodTotals, PeriodType, Statement};

/// Half-open date range `[start, end)` named by a period string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Period {
    pub period_type: PeriodType,
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    /// Parse `"YYYY-MM"` (monthly) or `"YYYY"` (yearly).
    pub fn parse(period_type: PeriodType, period: &str) -> Result<Self, LedgerError> {
        let invalid = || {
            LedgerError::validation(format!(
                "Invalid {} period '{}'",
                period_type.as_str(),
                period
            ))
        };

        let (start, end) = match period_type {
            PeriodType::Monthly => {
                let (year, month) = period.split_once('-').ok_or_else(invalid)?;
                if !is_digits(year, 4) || !is_digits(month, 2) {
                    return Err(invalid());
                }
                let year: i32 = year.parse().map_err(|_| invalid())?;
                let month: u32 = month.parse().map_err(|_| invalid())?;
                let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
                let end = if month == 12 {
                    NaiveDate::from_ymd_opt(year + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(year, month + 1, 1)
                }
                .ok_or_else(invalid)?;
                (start, end)
            }
            PeriodType::Yearly => {
                if !is_digits(period, 4) {
                    return Err(invalid());
                }
                let year: i32 = period.parse().map_err(|_| invalid())?;
                let start = NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(invalid)?;
                let end = NaiveDate::from_ymd_opt(year + 1, 1, 1).ok_or_else(invalid)?;
                (start, end)
            }
        };

        Ok(Self {
            period_type,
            label: period.to_string(),
            start,
            end,
        })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    /// Inclusive last day, for storage range queries.
    pub fn last_day(&self) -> NaiveDate {
        self.end.pred_opt().unwrap_or(self.end)
    }
}

/// Exactly `len` ASCII digits, no sign.
fn is_digits(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_digit())
}

#[derive(Debug, Clone)]
pub struct PeriodAggregator;

impl PeriodAggregator {
    /// Sum the statements whose ledger key falls inside `period`. `None` when
    /// nothing matches.
    pub fn aggregate(statements: &[Statement], period: &Period) -> Option<PeriodTotals> {
        let totals = statements
            .iter()
            .filter(|s| period.contains(s.ledger_key()))
            .fold(PeriodTotals::default(), |mut acc, s| {
                acc.total_gross += s.gross;
                acc.total_wins += s.wins;
                acc.total_net += s.net;
                acc.total_wins_commission += s.wins_commission_total;
                acc.total_balance_office += s.balance_office;
                acc.total_balance_client += s.balance_client;
                acc.statement_count += 1;
                acc
            });

        (totals.statement_count > 0).then_some(totals)
    }
}
