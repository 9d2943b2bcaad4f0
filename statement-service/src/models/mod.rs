//! Domain models for statement-service.

mod client;
mod daily_sales;
mod money;
mod report;
mod statement;

pub use client::{Client, CommissionRates};
pub use daily_sales::DailySales;
pub use money::{amount_limit, fits_storage, to_storage_scale, MONEY_SCALE};
pub use report::{PeriodTotals, PeriodType, Report};
pub use statement::{CarriedBalance, DerivedFields, Statement, StatementRecord};
