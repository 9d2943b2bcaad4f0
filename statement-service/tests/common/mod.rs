//! Common test utilities for statement-service integration tests.

#![allow(dead_code)]

use chrono::NaiveDate;
use rust_decimal::Decimal;
use service_core::utils::RetryConfig;
use statement_service::config::LedgerSettings;
use statement_service::dtos::{CreateStatementRequest, StatementFields, UpdateStatementRequest};
use statement_service::models::{Client, Statement};
use statement_service::services::{Database, InMemoryStore, StatementService, StatementStore};
use std::sync::{Arc, Once};
use std::time::Duration;
use uuid::Uuid;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,statement_service=debug,sqlx=warn")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub struct TestApp<S: StatementStore = InMemoryStore> {
    pub service: StatementService<S>,
    pub store: Arc<S>,
    /// Client with 10% gross commission and 2 per win.
    pub client: Client,
}

/// Retries that finish in a few milliseconds.
pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_retries: 2,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(5),
        backoff_multiplier: 2.0,
        add_jitter: false,
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(LedgerSettings {
        ripple_on_delete: false,
        retry: fast_retry(),
    })
    .await
}

pub async fn spawn_app_with(settings: LedgerSettings) -> TestApp {
    init_tracing();
    seed(Arc::new(InMemoryStore::new()), settings).await
}

/// Application over PostgreSQL at `TEST_DATABASE_URL`, or `None` when the
/// variable is unset so database tests are skipped.
pub async fn spawn_database_app(settings: LedgerSettings) -> Option<TestApp<Database>> {
    init_tracing();

    let Ok(database_url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping PostgreSQL test");
        return None;
    };

    let db = Database::new(&database_url, 2, 1)
        .await
        .expect("Failed to connect to test database");
    db.run_migrations()
        .await
        .expect("Failed to run migrations");

    Some(seed(Arc::new(db), settings).await)
}

/// Seed a fresh client so tests sharing a database never see each other's rows.
async fn seed<S: StatementStore>(store: Arc<S>, settings: LedgerSettings) -> TestApp<S> {
    let client = Client::new("Test Client", dec("10"), dec("2"));
    store
        .save_client(&client)
        .await
        .expect("Failed to seed client");

    TestApp {
        service: StatementService::new(store.clone(), settings),
        store,
        client,
    }
}

pub fn dec(s: &str) -> Decimal {
    s.parse().expect("invalid decimal literal")
}

pub fn date(s: &str) -> NaiveDate {
    s.parse().expect("invalid date literal")
}

/// Raw inputs for a week ending on `due`.
pub fn fields(
    due: &str,
    gross: &str,
    wins: &str,
    expenses: &str,
    cash_received: &str,
) -> StatementFields {
    let due_date = date(due);
    StatementFields {
        start_date: Some(due_date - chrono::Days::new(6)),
        due_date: Some(due_date),
        gross: Some(dec(gross)),
        daily_sales: None,
        wins: dec(wins),
        expenses: dec(expenses),
        cash_received: dec(cash_received),
        cash_paid: Decimal::ZERO,
    }
}

pub fn create_request(
    client_id: Uuid,
    due: &str,
    gross: &str,
    wins: &str,
    expenses: &str,
    cash_received: &str,
) -> CreateStatementRequest {
    CreateStatementRequest {
        client_id,
        fields: fields(due, gross, wins, expenses, cash_received),
    }
}

/// Update request that resubmits a statement's current raw inputs.
pub fn resubmit(statement: &Statement) -> UpdateStatementRequest {
    UpdateStatementRequest {
        fields: StatementFields {
            start_date: Some(statement.start_date),
            due_date: Some(statement.due_date),
            gross: Some(statement.gross),
            daily_sales: None,
            wins: statement.wins,
            expenses: statement.expenses,
            cash_received: statement.cash_received,
            cash_paid: statement.cash_paid,
        },
    }
}

/// Statement 1 of the worked example: closes with 500 receivable.
pub async fn create_first_example<S: StatementStore>(app: &TestApp<S>) -> Statement {
    app.service
        .compute_and_save_statement(create_request(
            app.client.client_id,
            "2025-04-07",
            "1000",
            "50",
            "100",
            "200",
        ))
        .await
        .expect("Failed to create first statement")
        .statement
}

/// Statement 2 of the worked example: closes with 350 receivable after the first.
pub async fn create_second_example<S: StatementStore>(app: &TestApp<S>) -> Statement {
    app.service
        .compute_and_save_statement(create_request(
            app.client.client_id,
            "2025-04-14",
            "500",
            "300",
            "0",
            "0",
        ))
        .await
        .expect("Failed to create second statement")
        .statement
}

/// Assert every stored statement of the client opens with its predecessor's
/// closing balance.
pub async fn assert_chain<S: StatementStore>(app: &TestApp<S>) {
    let statements = app
        .store
        .list_statements(app.client.client_id)
        .await
        .expect("Failed to list statements");

    let mut receivable = Decimal::ZERO;
    let mut payable = Decimal::ZERO;
    for statement in &statements {
        assert_eq!(
            (statement.prev_balance_office, statement.prev_balance_client),
            (receivable, payable),
            "statement due {} does not open with its predecessor's balance",
            statement.due_date
        );
        assert!(statement.final_receivable.is_zero() || statement.final_payable.is_zero());
        assert!(statement.balance_office.is_zero() || statement.balance_client.is_zero());
        receivable = statement.final_receivable;
        payable = statement.final_payable;
    }
}
