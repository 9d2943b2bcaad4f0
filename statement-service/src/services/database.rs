//! PostgreSQL store for statement-service.

use crate::models::{Client, DailySales, Report, Statement};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::store::{LedgerChangeSet, StatementStore};
use async_trait::async_trait;
use chrono::NaiveDate;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

const STATEMENT_COLUMNS: &str = "statement_id, client_id, start_date, due_date, gross, wins, \
    expenses, cash_received, cash_paid, net, wins_commission_total, balance_office, \
    balance_client, prev_balance_office, prev_balance_client, final_receivable, final_payable, \
    created_utc, updated_utc";

const DAILY_SALES_COLUMNS: &str = "statement_id, client_id, monday, tuesday, wednesday, \
    thursday, friday, saturday, sunday, created_utc";

const REPORT_COLUMNS: &str = "report_id, client_id, period_type, period, notes, total_gross, \
    total_wins, total_net, total_wins_commission, total_balance_office, total_balance_client, \
    statement_count, generated_utc";

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "statement-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    async fn write_changes(&self, changes: &LedgerChangeSet) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        if !changes.delete_statements.is_empty() {
            // daily_sales rows go with their statement (ON DELETE CASCADE)
            sqlx::query("DELETE FROM statements WHERE client_id = $1 AND statement_id = ANY($2)")
                .bind(changes.client_id)
                .bind(&changes.delete_statements)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to delete statements: {}", e))
                })?;
        }

        if !changes.delete_daily_sales.is_empty() {
            sqlx::query("DELETE FROM daily_sales WHERE client_id = $1 AND statement_id = ANY($2)")
                .bind(changes.client_id)
                .bind(&changes.delete_daily_sales)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to delete daily sales: {}", e))
                })?;
        }

        for s in &changes.upsert_statements {
            sqlx::query(
                r#"
                INSERT INTO statements (statement_id, client_id, start_date, due_date, gross, wins,
                    expenses, cash_received, cash_paid, net, wins_commission_total, balance_office,
                    balance_client, prev_balance_office, prev_balance_client, final_receivable,
                    final_payable, created_utc, updated_utc)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
                ON CONFLICT (statement_id) DO UPDATE SET
                    start_date = EXCLUDED.start_date,
                    due_date = EXCLUDED.due_date,
                    gross = EXCLUDED.gross,
                    wins = EXCLUDED.wins,
                    expenses = EXCLUDED.expenses,
                    cash_received = EXCLUDED.cash_received,
                    cash_paid = EXCLUDED.cash_paid,
                    net = EXCLUDED.net,
                    wins_commission_total = EXCLUDED.wins_commission_total,
                    balance_office = EXCLUDED.balance_office,
                    balance_client = EXCLUDED.balance_client,
                    prev_balance_office = EXCLUDED.prev_balance_office,
                    prev_balance_client = EXCLUDED.prev_balance_client,
                    final_receivable = EXCLUDED.final_receivable,
                    final_payable = EXCLUDED.final_payable,
                    updated_utc = EXCLUDED.updated_utc
                WHERE statements.client_id = EXCLUDED.client_id
                "#,
            )
            .bind(s.statement_id)
            .bind(s.client_id)
            .bind(s.start_date)
            .bind(s.due_date)
            .bind(s.gross)
            .bind(s.wins)
            .bind(s.expenses)
            .bind(s.cash_received)
            .bind(s.cash_paid)
            .bind(s.net)
            .bind(s.wins_commission_total)
            .bind(s.balance_office)
            .bind(s.balance_client)
            .bind(s.prev_balance_office)
            .bind(s.prev_balance_client)
            .bind(s.final_receivable)
            .bind(s.final_payable)
            .bind(s.created_utc)
            .bind(s.updated_utc)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!(
                    "Failed to upsert statement {}: {}",
                    s.statement_id,
                    e
                ))
            })?;
        }

        for d in &changes.upsert_daily_sales {
            sqlx::query(
                r#"
                INSERT INTO daily_sales (statement_id, client_id, monday, tuesday, wednesday,
                    thursday, friday, saturday, sunday, created_utc)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (statement_id) DO UPDATE SET
                    monday = EXCLUDED.monday,
                    tuesday = EXCLUDED.tuesday,
                    wednesday = EXCLUDED.wednesday,
                    thursday = EXCLUDED.thursday,
                    friday = EXCLUDED.friday,
                    saturday = EXCLUDED.saturday,
                    sunday = EXCLUDED.sunday
                "#,
            )
            .bind(d.statement_id)
            .bind(d.client_id)
            .bind(d.monday)
            .bind(d.tuesday)
            .bind(d.wednesday)
            .bind(d.thursday)
            .bind(d.friday)
            .bind(d.saturday)
            .bind(d.sunday)
            .bind(d.created_utc)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!(
                    "Failed to upsert daily sales {}: {}",
                    d.statement_id,
                    e
                ))
            })?;
        }

        // The (client_id, due_date) constraint is deferred, so a violation
        // surfaces here rather than on the individual upsert.
        tx.commit().await.map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "Client {} already has a statement on one of these due dates",
                    changes.client_id
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e)),
        })?;

        Ok(())
    }
}

#[async_trait]
impl StatementStore for Database {
    #[instrument(skip(self), fields(client_id = %client_id))]
    async fn get_client(&self, client_id: Uuid) -> Result<Option<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_client"])
            .start_timer();

        let client = sqlx::query_as::<_, Client>(
            r#"
            SELECT client_id, name, gross_commission_pct, wins_commission_per_unit, active, created_utc
            FROM clients
            WHERE client_id = $1
            "#,
        )
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get client: {}", e)))?;

        timer.observe_duration();

        Ok(client)
    }

    #[instrument(skip(self, client), fields(client_id = %client.client_id))]
    async fn save_client(&self, client: &Client) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["save_client"])
            .start_timer();

        sqlx::query(
            r#"
            INSERT INTO clients (client_id, name, gross_commission_pct, wins_commission_per_unit, active, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (client_id) DO UPDATE SET
                name = EXCLUDED.name,
                gross_commission_pct = EXCLUDED.gross_commission_pct,
                wins_commission_per_unit = EXCLUDED.wins_commission_per_unit,
                active = EXCLUDED.active
            "#,
        )
        .bind(client.client_id)
        .bind(&client.name)
        .bind(client.gross_commission_pct)
        .bind(client.wins_commission_per_unit)
        .bind(client.active)
        .bind(client.created_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to save client: {}", e)))?;

        timer.observe_duration();

        Ok(())
    }

    #[instrument(skip(self), fields(statement_id = %statement_id))]
    async fn get_statement(&self, statement_id: Uuid) -> Result<Option<Statement>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_statement"])
            .start_timer();

        let sql = format!(
            "SELECT {} FROM statements WHERE statement_id = $1",
            STATEMENT_COLUMNS
        );
        let statement = sqlx::query_as::<_, Statement>(&sql)
            .bind(statement_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to get statement: {}", e))
            })?;

        timer.observe_duration();

        Ok(statement)
    }

    #[instrument(skip(self), fields(statement_id = %statement_id))]
    async fn get_daily_sales(&self, statement_id: Uuid) -> Result<Option<DailySales>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_daily_sales"])
            .start_timer();

        let sql = format!(
            "SELECT {} FROM daily_sales WHERE statement_id = $1",
            DAILY_SALES_COLUMNS
        );
        let daily = sqlx::query_as::<_, DailySales>(&sql)
            .bind(statement_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to get daily sales: {}", e))
            })?;

        timer.observe_duration();

        Ok(daily)
    }

    #[instrument(skip(self), fields(client_id = %client_id))]
    async fn list_statements(&self, client_id: Uuid) -> Result<Vec<Statement>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_statements"])
            .start_timer();

        let sql = format!(
            "SELECT {} FROM statements WHERE client_id = $1 ORDER BY due_date ASC",
            STATEMENT_COLUMNS
        );
        let statements = sqlx::query_as::<_, Statement>(&sql)
            .bind(client_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to list statements: {}", e))
            })?;

        timer.observe_duration();

        Ok(statements)
    }

    #[instrument(skip(self), fields(client_id = %client_id, start = %start, end = %end))]
    async fn list_statements_between(
        &self,
        client_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Statement>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_statements_between"])
            .start_timer();

        let sql = format!(
            r#"
            SELECT {} FROM statements
            WHERE client_id = $1 AND due_date >= $2 AND due_date <= $3
            ORDER BY due_date ASC
            "#,
            STATEMENT_COLUMNS
        );
        let statements = sqlx::query_as::<_, Statement>(&sql)
            .bind(client_id)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to list statements: {}", e))
            })?;

        timer.observe_duration();

        Ok(statements)
    }

    #[instrument(skip(self), fields(client_id = %client_id))]
    async fn list_daily_sales(&self, client_id: Uuid) -> Result<Vec<DailySales>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_daily_sales"])
            .start_timer();

        let sql = format!(
            "SELECT {} FROM daily_sales WHERE client_id = $1",
            DAILY_SALES_COLUMNS
        );
        let daily = sqlx::query_as::<_, DailySales>(&sql)
            .bind(client_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to list daily sales: {}", e))
            })?;

        timer.observe_duration();

        Ok(daily)
    }

    #[instrument(skip(self, changes), fields(
        client_id = %changes.client_id,
        upserts = changes.upsert_statements.len(),
        deletes = changes.delete_statements.len()
    ))]
    async fn commit(&self, changes: &LedgerChangeSet) -> Result<(), AppError> {
        if changes.is_empty() {
            return Ok(());
        }

        let timer = DB_QUERY_DURATION
            .with_label_values(&["commit_ledger"])
            .start_timer();

        self.write_changes(changes).await?;

        timer.observe_duration();

        info!("Ledger changes committed");

        Ok(())
    }

    #[instrument(skip(self, report), fields(report_id = %report.report_id, client_id = %report.client_id))]
    async fn insert_report(&self, report: &Report) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_report"])
            .start_timer();

        sqlx::query(
            r#"
            INSERT INTO reports (report_id, client_id, period_type, period, notes, total_gross,
                total_wins, total_net, total_wins_commission, total_balance_office,
                total_balance_client, statement_count, generated_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(report.report_id)
        .bind(report.client_id)
        .bind(&report.period_type)
        .bind(&report.period)
        .bind(&report.notes)
        .bind(report.totals.total_gross)
        .bind(report.totals.total_wins)
        .bind(report.totals.total_net)
        .bind(report.totals.total_wins_commission)
        .bind(report.totals.total_balance_office)
        .bind(report.totals.total_balance_client)
        .bind(report.totals.statement_count)
        .bind(report.generated_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to insert report: {}", e)))?;

        timer.observe_duration();

        Ok(())
    }

    #[instrument(skip(self), fields(report_id = %report_id))]
    async fn get_report(&self, report_id: Uuid) -> Result<Option<Report>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_report"])
            .start_timer();

        let sql = format!("SELECT {} FROM reports WHERE report_id = $1", REPORT_COLUMNS);
        let report = sqlx::query_as::<_, Report>(&sql)
            .bind(report_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get report: {}", e)))?;

        timer.observe_duration();

        Ok(report)
    }

    #[instrument(skip(self))]
    async fn list_reports(&self, client_id: Option<Uuid>) -> Result<Vec<Report>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_reports"])
            .start_timer();

        let sql = format!(
            r#"
            SELECT {} FROM reports
            WHERE ($1::uuid IS NULL OR client_id = $1)
            ORDER BY generated_utc DESC
            "#,
            REPORT_COLUMNS
        );
        let reports = sqlx::query_as::<_, Report>(&sql)
            .bind(client_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to list reports: {}", e))
            })?;

        timer.observe_duration();

        Ok(reports)
    }

    #[instrument(skip(self), fields(report_id = %report_id))]
    async fn delete_report(&self, report_id: Uuid) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_report"])
            .start_timer();

        let result = sqlx::query("DELETE FROM reports WHERE report_id = $1")
            .bind(report_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete report: {}", e))
            })?;

        timer.observe_duration();

        Ok(result.rows_affected() > 0)
    }

    /// Check database health.
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }
}
