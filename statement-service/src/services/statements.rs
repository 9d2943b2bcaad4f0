//! Statement ledger operations.
//!
//! Each mutating operation takes the client's lock, loads the client's whole
//! ledger into a [`Ledger`], runs the engine over it and commits every
//! resulting write as one [`LedgerChangeSet`].

use chrono::Utc;
use serde::Serialize;
use service_core::error::AppError;
use service_core::utils::retry_storage_call;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use super::locks::ClientLocks;
use super::metrics::{
    ERRORS_TOTAL, REPORTS_GENERATED, RIPPLE_LENGTH, RIPPLE_PASSES_TOTAL, STATEMENTS_COMPUTED,
};
use super::store::{LedgerChangeSet, StatementStore};
use crate::config::LedgerSettings;
use crate::dtos::{CreateStatementRequest, GenerateReportRequest, UpdateStatementRequest};
use crate::engine::{Ledger, Period, PeriodAggregator, RippleRecalculator};
use crate::error::LedgerError;
use crate::models::{Client, DailySales, Report, Statement, StatementRecord};

/// Result of an edit: the edited statement and every other statement the
/// ripple pass rewrote, in ledger order.
#[derive(Debug, Clone, Serialize)]
pub struct RippleOutcome {
    pub statement: Statement,
    pub daily_sales: Option<DailySales>,
    pub rippled: Vec<Statement>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteOutcome {
    pub deleted: Statement,
    /// Empty unless `ripple_on_delete` is enabled.
    pub rippled: Vec<Statement>,
}

pub struct StatementService<S: StatementStore> {
    store: Arc<S>,
    locks: ClientLocks,
    settings: LedgerSettings,
}

impl<S: StatementStore> Clone for StatementService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            locks: self.locks.clone(),
            settings: self.settings.clone(),
        }
    }
}

impl<S: StatementStore> StatementService<S> {
    pub fn new(store: Arc<S>, settings: LedgerSettings) -> Self {
        Self {
            store,
            locks: ClientLocks::new(),
            settings,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    // -------------------------------------------------------------------------
    // Ledger mutations
    // -------------------------------------------------------------------------

    /// Compute a new statement against its predecessor and save it. Later
    /// statements, if any, are rippled in the same commit.
    #[instrument(skip(self, request), fields(client_id = %request.client_id))]
    pub async fn compute_and_save_statement(
        &self,
        request: CreateStatementRequest,
    ) -> Result<StatementRecord, LedgerError> {
        observe("compute_and_save_statement", self.create(request).await)
    }

    /// Replace a statement's raw inputs, then recompute it and everything
    /// after it.
    #[instrument(skip(self, request), fields(statement_id = %statement_id))]
    pub async fn edit_statement_and_ripple(
        &self,
        statement_id: Uuid,
        request: UpdateStatementRequest,
    ) -> Result<RippleOutcome, LedgerError> {
        observe(
            "edit_statement_and_ripple",
            self.edit(statement_id, request).await,
        )
    }

    #[instrument(skip(self), fields(statement_id = %statement_id))]
    pub async fn delete_statement(&self, statement_id: Uuid) -> Result<DeleteOutcome, LedgerError> {
        observe("delete_statement", self.delete(statement_id).await)
    }

    async fn create(&self, request: CreateStatementRequest) -> Result<StatementRecord, LedgerError> {
        request.validate()?;
        let client_id = request.client_id;
        let inputs = request.fields.resolve()?;

        let _guard = self.locks.acquire(client_id).await;

        let client = self.load_client(client_id).await?;
        let mut ledger = self.load_ledger(client_id).await?;
        ledger.ensure_key_available(inputs.due_date, None)?;

        let now = Utc::now();
        let statement_id = Uuid::new_v4();
        let daily_sales = inputs
            .daily_sales
            .as_ref()
            .map(|d| d.to_row(statement_id, client_id, now));
        ledger.insert(
            inputs.to_statement(statement_id, client_id, now, now),
            daily_sales.clone(),
        )?;

        let mut pass =
            RippleRecalculator::recalculate_from(&mut ledger, &client.rates(), statement_id, now)?
                .into_iter();
        let statement = pass.next().ok_or_else(|| {
            LedgerError::inconsistent(client_id, "new statement missing from its own pass")
        })?;
        let rippled: Vec<Statement> = pass.collect();

        let mut changes = LedgerChangeSet::new(client_id);
        changes.upsert_statements.push(statement.clone());
        changes.upsert_statements.extend(rippled.iter().cloned());
        changes.upsert_daily_sales.extend(daily_sales.clone());
        self.commit_pass(&changes, rippled.len()).await?;

        STATEMENTS_COMPUTED.with_label_values(&["create"]).inc();
        info!(
            statement_id = %statement.statement_id,
            due_date = %statement.due_date,
            final_receivable = %statement.final_receivable,
            final_payable = %statement.final_payable,
            rippled = rippled.len(),
            "Statement created"
        );

        Ok(StatementRecord {
            statement,
            daily_sales,
        })
    }

    async fn edit(
        &self,
        statement_id: Uuid,
        request: UpdateStatementRequest,
    ) -> Result<RippleOutcome, LedgerError> {
        request.validate()?;
        let inputs = request.fields.resolve()?;

        let client_id = self.fetch_statement(statement_id).await?.client_id;
        let _guard = self.locks.acquire(client_id).await;

        // Work from the ledger as loaded under the lock, not the copy read above.
        let client = self.load_client(client_id).await?;
        let mut ledger = self.load_ledger(client_id).await?;
        let current = ledger
            .get(statement_id)
            .cloned()
            .ok_or(LedgerError::StatementNotFound(statement_id))?;
        ledger.ensure_key_available(inputs.due_date, Some(statement_id))?;

        let now = Utc::now();
        let had_daily_sales = ledger.daily_sales(statement_id).is_some();
        let daily_created = ledger
            .daily_sales(statement_id)
            .map(|d| d.created_utc)
            .unwrap_or(now);
        let daily_sales = inputs
            .daily_sales
            .as_ref()
            .map(|d| d.to_row(statement_id, client_id, daily_created));

        ledger.replace(
            inputs.to_statement(statement_id, client_id, current.created_utc, now),
            daily_sales.clone(),
        )?;

        // A moved statement leaves a gap at its old date; start from whichever
        // date comes first so both neighbourhoods are recomputed.
        let anchor = current.due_date.min(inputs.due_date);
        let pass = RippleRecalculator::recalculate_since(&mut ledger, &client.rates(), anchor, now)?;

        let statement = ledger
            .get(statement_id)
            .cloned()
            .ok_or(LedgerError::StatementNotFound(statement_id))?;
        let rippled: Vec<Statement> = pass
            .iter()
            .filter(|s| s.statement_id != statement_id)
            .cloned()
            .collect();

        let mut changes = LedgerChangeSet::new(client_id);
        changes.upsert_statements = pass;
        match &daily_sales {
            Some(daily) => changes.upsert_daily_sales.push(daily.clone()),
            None if had_daily_sales => changes.delete_daily_sales.push(statement_id),
            None => {}
        }
        self.commit_pass(&changes, rippled.len()).await?;

        STATEMENTS_COMPUTED.with_label_values(&["edit"]).inc();
        info!(
            client_id = %client_id,
            old_due_date = %current.due_date,
            new_due_date = %statement.due_date,
            rippled = rippled.len(),
            "Statement edited"
        );

        Ok(RippleOutcome {
            statement,
            daily_sales,
            rippled,
        })
    }

    async fn delete(&self, statement_id: Uuid) -> Result<DeleteOutcome, LedgerError> {
        let client_id = self.fetch_statement(statement_id).await?.client_id;
        let _guard = self.locks.acquire(client_id).await;

        let mut ledger = self.load_ledger(client_id).await?;
        let (deleted, _) = ledger
            .remove(statement_id)
            .ok_or(LedgerError::StatementNotFound(statement_id))?;

        let mut changes = LedgerChangeSet::new(client_id);
        changes.delete_statements.push(statement_id);

        let rippled = if self.settings.ripple_on_delete {
            let client = self.load_client(client_id).await?;
            RippleRecalculator::recalculate_since(
                &mut ledger,
                &client.rates(),
                deleted.due_date,
                Utc::now(),
            )?
        } else {
            let later = ledger.len() - ledger.first_on_or_after(deleted.due_date);
            if later > 0 {
                warn!(
                    client_id = %client_id,
                    later_statements = later,
                    "Later statements keep the opening balance of the deleted statement"
                );
            }
            Vec::new()
        };
        changes.upsert_statements.extend(rippled.iter().cloned());

        self.commit_pass(&changes, rippled.len()).await?;

        info!(
            client_id = %client_id,
            due_date = %deleted.due_date,
            rippled = rippled.len(),
            "Statement deleted"
        );

        Ok(DeleteOutcome { deleted, rippled })
    }

    // -------------------------------------------------------------------------
    // Reports
    // -------------------------------------------------------------------------

    /// Sum the client's statements in a calendar period and store the result.
    #[instrument(skip(self, request), fields(client_id = %request.client_id, period = %request.period))]
    pub async fn aggregate_report(&self, request: GenerateReportRequest) -> Result<Report, LedgerError> {
        observe("aggregate_report", self.generate_report(request).await)
    }

    async fn generate_report(&self, request: GenerateReportRequest) -> Result<Report, LedgerError> {
        request.validate()?;
        let period = Period::parse(request.period_type, &request.period)?;

        let client = self.load_client(request.client_id).await?;
        let statements = retry_storage_call(&self.settings.retry, "list_statements_between", || {
            self.store
                .list_statements_between(client.client_id, period.start, period.last_day())
        })
        .await?;

        let totals = PeriodAggregator::aggregate(&statements, &period).ok_or_else(|| {
            LedgerError::NoDataForPeriod {
                period_type: period.period_type.as_str().to_string(),
                period: period.label.clone(),
            }
        })?;

        let report = Report::new(
            client.client_id,
            period.period_type,
            period.label,
            request.notes,
            totals,
        );
        self.store.insert_report(&report).await?;

        REPORTS_GENERATED.inc();
        info!(
            report_id = %report.report_id,
            statement_count = report.totals.statement_count,
            "Report generated"
        );

        Ok(report)
    }

    #[instrument(skip(self), fields(report_id = %report_id))]
    pub async fn get_report(&self, report_id: Uuid) -> Result<Report, LedgerError> {
        observe(
            "get_report",
            retry_storage_call(&self.settings.retry, "get_report", || {
                self.store.get_report(report_id)
            })
            .await
            .map_err(LedgerError::from)
            .and_then(|r| r.ok_or(LedgerError::ReportNotFound(report_id))),
        )
    }

    /// Reports newest first, optionally for a single client.
    #[instrument(skip(self))]
    pub async fn list_reports(&self, client_id: Option<Uuid>) -> Result<Vec<Report>, LedgerError> {
        observe(
            "list_reports",
            retry_storage_call(&self.settings.retry, "list_reports", || {
                self.store.list_reports(client_id)
            })
            .await
            .map_err(LedgerError::from),
        )
    }

    #[instrument(skip(self), fields(report_id = %report_id))]
    pub async fn delete_report(&self, report_id: Uuid) -> Result<(), LedgerError> {
        let result = match self.store.delete_report(report_id).await {
            Ok(true) => {
                info!("Report deleted");
                Ok(())
            }
            Ok(false) => Err(LedgerError::ReportNotFound(report_id)),
            Err(e) => Err(e.into()),
        };
        observe("delete_report", result)
    }

    // -------------------------------------------------------------------------
    // Statement reads
    // -------------------------------------------------------------------------

    /// A statement together with its daily breakdown.
    #[instrument(skip(self), fields(statement_id = %statement_id))]
    pub async fn get_statement(&self, statement_id: Uuid) -> Result<StatementRecord, LedgerError> {
        let result = async {
            let statement = self.fetch_statement(statement_id).await?;
            let daily_sales = retry_storage_call(&self.settings.retry, "get_daily_sales", || {
                self.store.get_daily_sales(statement_id)
            })
            .await?;
            Ok::<_, LedgerError>(StatementRecord {
                statement,
                daily_sales,
            })
        }
        .await;
        observe("get_statement", result)
    }

    /// All statements of a client, newest due date first.
    #[instrument(skip(self), fields(client_id = %client_id))]
    pub async fn list_client_statements(
        &self,
        client_id: Uuid,
    ) -> Result<Vec<Statement>, LedgerError> {
        let result = async {
            self.fetch_client(client_id).await?;
            let mut statements =
                retry_storage_call(&self.settings.retry, "list_statements", || {
                    self.store.list_statements(client_id)
                })
                .await?;
            statements.reverse();
            Ok::<_, LedgerError>(statements)
        }
        .await;
        observe("list_client_statements", result)
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    async fn fetch_client(&self, client_id: Uuid) -> Result<Client, LedgerError> {
        retry_storage_call(&self.settings.retry, "get_client", || {
            self.store.get_client(client_id)
        })
        .await?
        .ok_or(LedgerError::ClientNotFound(client_id))
    }

    /// Client whose rates are about to be used for computation.
    async fn load_client(&self, client_id: Uuid) -> Result<Client, LedgerError> {
        let client = self.fetch_client(client_id).await?;
        client.validate_rates()?;
        Ok(client)
    }

    async fn fetch_statement(&self, statement_id: Uuid) -> Result<Statement, LedgerError> {
        retry_storage_call(&self.settings.retry, "get_statement", || {
            self.store.get_statement(statement_id)
        })
        .await?
        .ok_or(LedgerError::StatementNotFound(statement_id))
    }

    async fn load_ledger(&self, client_id: Uuid) -> Result<Ledger, LedgerError> {
        let statements = retry_storage_call(&self.settings.retry, "list_statements", || {
            self.store.list_statements(client_id)
        })
        .await?;
        let daily_sales = retry_storage_call(&self.settings.retry, "list_daily_sales", || {
            self.store.list_daily_sales(client_id)
        })
        .await?;
        Ledger::new(client_id, statements, daily_sales)
    }

    /// Commit one pass. Retrying is safe because a change set only upserts
    /// by id. Once statements beyond the target were rewritten, a failed
    /// commit is reported as an inconsistent ledger: the store rolled the
    /// whole pass back and the caller must not assume any of it landed.
    async fn commit_pass(&self, changes: &LedgerChangeSet, rippled: usize) -> Result<(), LedgerError> {
        let result = retry_storage_call(&self.settings.retry, "commit_ledger", || {
            self.store.commit(changes)
        })
        .await;

        match result {
            Ok(()) => {
                RIPPLE_PASSES_TOTAL.with_label_values(&["ok"]).inc();
                RIPPLE_LENGTH.observe(rippled as f64);
                Ok(())
            }
            Err(err) => {
                RIPPLE_PASSES_TOTAL.with_label_values(&["error"]).inc();
                Err(pass_failure(changes.client_id, rippled, err))
            }
        }
    }
}

fn pass_failure(client_id: Uuid, rippled: usize, err: AppError) -> LedgerError {
    if rippled > 0 && err.is_transient() {
        LedgerError::inconsistent(
            client_id,
            format!(
                "ripple pass over {} later statements was rolled back: {}",
                rippled, err
            ),
        )
    } else {
        LedgerError::Storage(err)
    }
}

/// Count and log a failed operation.
fn observe<T>(operation: &'static str, result: Result<T, LedgerError>) -> Result<T, LedgerError> {
    if let Err(err) = &result {
        ERRORS_TOTAL.with_label_values(&[err.kind()]).inc();
        if err.is_fatal() {
            error!(operation, error = %err, "Ledger operation failed");
        } else {
            warn!(operation, error = %err, "Ledger operation rejected");
        }
    }
    result
}
