//! Storage boundary for the statement ledger.

use async_trait::async_trait;
use chrono::NaiveDate;
use service_core::error::AppError;
use uuid::Uuid;

use crate::models::{Client, DailySales, Report, Statement};

/// Every write produced by one operation on one client's ledger.
///
/// Applying a change set is idempotent: statements and daily sales are
/// upserted by id and deletes of missing rows are no-ops.
#[derive(Debug, Clone, Default)]
pub struct LedgerChangeSet {
    pub client_id: Uuid,
    pub upsert_statements: Vec<Statement>,
    pub upsert_daily_sales: Vec<DailySales>,
    /// Daily breakdowns to drop while keeping their statement.
    pub delete_daily_sales: Vec<Uuid>,
    /// Statements to drop together with their daily breakdown.
    pub delete_statements: Vec<Uuid>,
}

impl LedgerChangeSet {
    pub fn new(client_id: Uuid) -> Self {
        Self {
            client_id,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.upsert_statements.is_empty()
            && self.upsert_daily_sales.is_empty()
            && self.delete_daily_sales.is_empty()
            && self.delete_statements.is_empty()
    }
}

#[async_trait]
pub trait StatementStore: Send + Sync + 'static {
    async fn get_client(&self, client_id: Uuid) -> Result<Option<Client>, AppError>;

    /// Insert or update a client. Client management itself lives elsewhere;
    /// this exists so rates can be seeded.
    async fn save_client(&self, client: &Client) -> Result<(), AppError>;

    async fn get_statement(&self, statement_id: Uuid) -> Result<Option<Statement>, AppError>;

    async fn get_daily_sales(&self, statement_id: Uuid) -> Result<Option<DailySales>, AppError>;

    /// All statements of a client, ascending by `due_date`.
    async fn list_statements(&self, client_id: Uuid) -> Result<Vec<Statement>, AppError>;

    /// Statements with `start <= due_date <= end`, ascending by `due_date`.
    async fn list_statements_between(
        &self,
        client_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Statement>, AppError>;

    async fn list_daily_sales(&self, client_id: Uuid) -> Result<Vec<DailySales>, AppError>;

    /// Apply all changes or none of them.
    async fn commit(&self, changes: &LedgerChangeSet) -> Result<(), AppError>;

    async fn insert_report(&self, report: &Report) -> Result<(), AppError>;

    async fn get_report(&self, report_id: Uuid) -> Result<Option<Report>, AppError>;

    /// Reports, newest first, optionally for one client.
    async fn list_reports(&self, client_id: Option<Uuid>) -> Result<Vec<Report>, AppError>;

    /// Returns whether a report was removed.
    async fn delete_report(&self, report_id: Uuid) -> Result<bool, AppError>;

    async fn health_check(&self) -> Result<(), AppError>;
}
