//! Errors raised by the statement ledger engine.

use service_core::error::AppError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Client {0} not found")]
    ClientNotFound(Uuid),

    #[error("Statement {0} not found")]
    StatementNotFound(Uuid),

    #[error("Report {0} not found")]
    ReportNotFound(Uuid),

    #[error("Invalid input: {0}")]
    Validation(String),

    /// Aggregation selected nothing. A normal outcome for the caller, not a
    /// system failure.
    #[error("No statements found for {period_type} period {period}")]
    NoDataForPeriod { period_type: String, period: String },

    /// A ripple pass could not be applied, or stored statements violate the
    /// chain. Requires operator attention.
    #[error("Ledger for client {client_id} is inconsistent: {reason}")]
    InconsistentLedger { client_id: Uuid, reason: String },

    #[error(transparent)]
    Storage(#[from] AppError),
}

impl LedgerError {
    pub fn validation(message: impl Into<String>) -> Self {
        LedgerError::Validation(message.into())
    }

    pub fn inconsistent(client_id: Uuid, reason: impl Into<String>) -> Self {
        LedgerError::InconsistentLedger {
            client_id,
            reason: reason.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, LedgerError::InconsistentLedger { .. })
    }

    /// Short label used for error metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::ClientNotFound(_) => "client_not_found",
            LedgerError::StatementNotFound(_) => "statement_not_found",
            LedgerError::ReportNotFound(_) => "report_not_found",
            LedgerError::Validation(_) => "validation_error",
            LedgerError::NoDataForPeriod { .. } => "no_data_for_period",
            LedgerError::InconsistentLedger { .. } => "inconsistent_ledger",
            LedgerError::Storage(err) => err.kind(),
        }
    }
}

impl From<validator::ValidationErrors> for LedgerError {
    fn from(errors: validator::ValidationErrors) -> Self {
        LedgerError::Validation(errors.to_string())
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::ClientNotFound(_)
            | LedgerError::StatementNotFound(_)
            | LedgerError::ReportNotFound(_)
            | LedgerError::NoDataForPeriod { .. } => AppError::NotFound(anyhow::anyhow!(err)),
            LedgerError::Validation(_) => AppError::BadRequest(anyhow::anyhow!(err)),
            LedgerError::InconsistentLedger { .. } => AppError::InternalError(anyhow::anyhow!(err)),
            LedgerError::Storage(inner) => inner,
        }
    }
}
