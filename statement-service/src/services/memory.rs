//! In-process store. Backs tests and local runs without PostgreSQL.

use async_trait::async_trait;
use chrono::NaiveDate;
use service_core::error::AppError;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::store::{LedgerChangeSet, StatementStore};
use crate::models::{Client, DailySales, Report, Statement};

#[derive(Debug, Clone, Default)]
struct Tables {
    clients: HashMap<Uuid, Client>,
    statements: HashMap<Uuid, Statement>,
    daily_sales: HashMap<Uuid, DailySales>,
    reports: HashMap<Uuid, Report>,
}

impl Tables {
    /// Same constraint as the `statements_client_due_date_key` index.
    fn check_unique_due_dates(&self, client_id: Uuid) -> Result<(), AppError> {
        let mut seen = HashSet::new();
        for statement in self.statements.values().filter(|s| s.client_id == client_id) {
            if !seen.insert(statement.due_date) {
                return Err(AppError::Conflict(anyhow::anyhow!(
                    "Client {} already has a statement due on {}",
                    client_id,
                    statement.due_date
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    failing_commits: AtomicU32,
    commits: AtomicU32,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` commits fail with a transient database error
    /// before touching any data.
    pub fn fail_next_commits(&self, count: u32) {
        self.failing_commits.store(count, Ordering::SeqCst);
    }

    /// Number of successful commits so far.
    pub fn commit_count(&self) -> u32 {
        self.commits.load(Ordering::SeqCst)
    }

    fn take_injected_failure(&self) -> bool {
        self.failing_commits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

fn sorted_by_due_date(mut statements: Vec<Statement>) -> Vec<Statement> {
    statements.sort_by_key(|s| s.due_date);
    statements
}

#[async_trait]
impl StatementStore for InMemoryStore {
    async fn get_client(&self, client_id: Uuid) -> Result<Option<Client>, AppError> {
        Ok(self.tables.read().await.clients.get(&client_id).cloned())
    }

    async fn save_client(&self, client: &Client) -> Result<(), AppError> {
        self.tables
            .write()
            .await
            .clients
            .insert(client.client_id, client.clone());
        Ok(())
    }

    async fn get_statement(&self, statement_id: Uuid) -> Result<Option<Statement>, AppError> {
        Ok(self
            .tables
            .read()
            .await
            .statements
            .get(&statement_id)
            .cloned())
    }

    async fn get_daily_sales(&self, statement_id: Uuid) -> Result<Option<DailySales>, AppError> {
        Ok(self
            .tables
            .read()
            .await
            .daily_sales
            .get(&statement_id)
            .cloned())
    }

    async fn list_statements(&self, client_id: Uuid) -> Result<Vec<Statement>, AppError> {
        let tables = self.tables.read().await;
        Ok(sorted_by_due_date(
            tables
                .statements
                .values()
                .filter(|s| s.client_id == client_id)
                .cloned()
                .collect(),
        ))
    }

    async fn list_statements_between(
        &self,
        client_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Statement>, AppError> {
        let tables = self.tables.read().await;
        Ok(sorted_by_due_date(
            tables
                .statements
                .values()
                .filter(|s| s.client_id == client_id && s.due_date >= start && s.due_date <= end)
                .cloned()
                .collect(),
        ))
    }

    async fn list_daily_sales(&self, client_id: Uuid) -> Result<Vec<DailySales>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .daily_sales
            .values()
            .filter(|d| d.client_id == client_id)
            .cloned()
            .collect())
    }

    #[instrument(skip(self, changes), fields(client_id = %changes.client_id))]
    async fn commit(&self, changes: &LedgerChangeSet) -> Result<(), AppError> {
        if self.take_injected_failure() {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "Injected commit failure"
            )));
        }

        let mut tables = self.tables.write().await;

        // Stage on a copy so a constraint violation leaves nothing behind.
        let mut staged = tables.clone();
        for statement_id in &changes.delete_statements {
            staged.statements.remove(statement_id);
            staged.daily_sales.remove(statement_id);
        }
        for statement_id in &changes.delete_daily_sales {
            staged.daily_sales.remove(statement_id);
        }
        for statement in &changes.upsert_statements {
            staged
                .statements
                .insert(statement.statement_id, statement.clone());
        }
        for daily in &changes.upsert_daily_sales {
            if !staged.statements.contains_key(&daily.statement_id) {
                return Err(AppError::Conflict(anyhow::anyhow!(
                    "Daily sales reference missing statement {}",
                    daily.statement_id
                )));
            }
            staged.daily_sales.insert(daily.statement_id, daily.clone());
        }
        staged.check_unique_due_dates(changes.client_id)?;

        *tables = staged;
        self.commits.fetch_add(1, Ordering::SeqCst);

        debug!(
            upserted = changes.upsert_statements.len(),
            deleted = changes.delete_statements.len(),
            "Ledger changes committed"
        );

        Ok(())
    }

    async fn insert_report(&self, report: &Report) -> Result<(), AppError> {
        self.tables
            .write()
            .await
            .reports
            .insert(report.report_id, report.clone());
        Ok(())
    }

    async fn get_report(&self, report_id: Uuid) -> Result<Option<Report>, AppError> {
        Ok(self.tables.read().await.reports.get(&report_id).cloned())
    }

    async fn list_reports(&self, client_id: Option<Uuid>) -> Result<Vec<Report>, AppError> {
        let tables = self.tables.read().await;
        let mut reports: Vec<Report> = tables
            .reports
            .values()
            .filter(|r| client_id.is_none_or(|id| r.client_id == id))
            .cloned()
            .collect();
        reports.sort_by(|a, b| b.generated_utc.cmp(&a.generated_utc));
        Ok(reports)
    }

    async fn delete_report(&self, report_id: Uuid) -> Result<bool, AppError> {
        Ok(self
            .tables
            .write()
            .await
            .reports
            .remove(&report_id)
            .is_some())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}
