//! Ledger operations against PostgreSQL.
//!
//! Runs only when `TEST_DATABASE_URL` points at a database the tests may
//! migrate; every test seeds its own client.

mod common;

use common::{
    assert_chain, create_first_example, create_request, create_second_example, dec, fast_retry,
    resubmit, spawn_database_app,
};
use rust_decimal::Decimal;
use service_core::error::AppError;
use statement_service::config::LedgerSettings;
use statement_service::dtos::{DailySalesInput, GenerateReportRequest};
use statement_service::models::{Client, PeriodType};
use statement_service::services::{LedgerChangeSet, StatementStore};
use uuid::Uuid;

fn settings(ripple_on_delete: bool) -> LedgerSettings {
    LedgerSettings {
        ripple_on_delete,
        retry: fast_retry(),
    }
}

#[tokio::test]
async fn create_edit_and_delete_ripple_through_postgres() {
    let Some(app) = spawn_database_app(settings(true)).await else {
        return;
    };
    let first = create_first_example(&app).await;
    let second = create_second_example(&app).await;
    assert_eq!(second.final_receivable, dec("350"));

    let mut request = resubmit(&first);
    request.fields.expenses = dec("900");
    let outcome = app
        .service
        .edit_statement_and_ripple(first.statement_id, request)
        .await
        .unwrap();
    assert_eq!(outcome.statement.final_payable, dec("300"));

    let stored_second = app
        .store
        .get_statement(second.statement_id)
        .await
        .unwrap()
        .expect("second statement stored");
    assert_eq!(stored_second.prev_balance_client, dec("300"));
    assert_eq!(stored_second.final_payable, dec("450"));
    assert_chain(&app).await;

    // With the first gone, the second opens at zero: 450 net - 600 wins -> 150 payable.
    let deleted = app.service.delete_statement(first.statement_id).await.unwrap();
    assert_eq!(deleted.rippled.len(), 1);
    assert!(app.store.get_statement(first.statement_id).await.unwrap().is_none());

    let remaining = app.store.list_statements(app.client.client_id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].prev_balance_client, Decimal::ZERO);
    assert_eq!(remaining[0].final_payable, dec("150"));
    assert_chain(&app).await;
}

#[tokio::test]
async fn daily_sales_follow_their_statement() {
    let Some(app) = spawn_database_app(settings(false)).await else {
        return;
    };

    let mut request = create_request(app.client.client_id, "2025-04-07", "0", "50", "100", "200");
    request.fields.gross = None;
    request.fields.daily_sales = Some(DailySalesInput {
        monday: dec("600"),
        tuesday: dec("400"),
        ..Default::default()
    });
    let created = app.service.compute_and_save_statement(request).await.unwrap();
    let statement_id = created.statement.statement_id;

    let daily = app.store.get_daily_sales(statement_id).await.unwrap().unwrap();
    assert_eq!(daily.total(), dec("1000"));

    // An update without a breakdown drops the stored one.
    app.service
        .edit_statement_and_ripple(statement_id, resubmit(&created.statement))
        .await
        .unwrap();
    assert!(app.store.get_daily_sales(statement_id).await.unwrap().is_none());

    // Deleting the statement takes a re-added breakdown with it.
    let mut request = resubmit(&created.statement);
    request.fields.gross = None;
    request.fields.daily_sales = Some(DailySalesInput {
        friday: dec("1000"),
        ..Default::default()
    });
    app.service
        .edit_statement_and_ripple(statement_id, request)
        .await
        .unwrap();
    assert!(app.store.get_daily_sales(statement_id).await.unwrap().is_some());

    app.service.delete_statement(statement_id).await.unwrap();
    assert!(app.store.get_daily_sales(statement_id).await.unwrap().is_none());
    assert!(app
        .store
        .list_daily_sales(app.client.client_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn duplicate_due_date_commit_is_a_conflict() {
    let Some(app) = spawn_database_app(settings(false)).await else {
        return;
    };
    let first = create_first_example(&app).await;

    let mut clash = first.clone();
    clash.statement_id = Uuid::new_v4();
    let mut changes = LedgerChangeSet::new(app.client.client_id);
    changes.upsert_statements.push(clash);

    let err = app.store.commit(&changes).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert!(!err.is_transient());

    let stored = app.store.list_statements(app.client.client_id).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].statement_id, first.statement_id);
}

#[tokio::test]
async fn stored_values_are_stable_under_recomputation() {
    let Some(app) = spawn_database_app(settings(false)).await else {
        return;
    };
    let client = Client::new("Fractional", dec("12.5"), dec("0.75"));
    app.store.save_client(&client).await.unwrap();

    for due in ["2025-04-07", "2025-04-14"] {
        app.service
            .compute_and_save_statement(create_request(client.client_id, due, "333.33", "4", "0", "0"))
            .await
            .unwrap();
    }
    let stored = app.store.list_statements(client.client_id).await.unwrap();
    assert_eq!(stored[1].final_receivable, dec("577.3276"));

    app.service
        .edit_statement_and_ripple(stored[0].statement_id, resubmit(&stored[0]))
        .await
        .unwrap();

    let reloaded = app.store.list_statements(client.client_id).await.unwrap();
    for (before, after) in stored.iter().zip(&reloaded) {
        assert_eq!(before.derived(), after.derived());
    }
}

#[tokio::test]
async fn reports_are_filtered_by_client() {
    let Some(app) = spawn_database_app(settings(false)).await else {
        return;
    };
    create_first_example(&app).await;

    let other = Client::new("Other Client", dec("5"), dec("1"));
    app.store.save_client(&other).await.unwrap();
    app.service
        .compute_and_save_statement(create_request(other.client_id, "2025-04-07", "100", "0", "0", "0"))
        .await
        .unwrap();

    let mut report_ids = Vec::new();
    for client_id in [app.client.client_id, other.client_id] {
        let report = app
            .service
            .aggregate_report(GenerateReportRequest {
                client_id,
                period_type: PeriodType::Monthly,
                period: "2025-04".to_string(),
                notes: String::new(),
            })
            .await
            .unwrap();
        report_ids.push(report.report_id);
    }

    let mine = app
        .service
        .list_reports(Some(app.client.client_id))
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].report_id, report_ids[0]);
    assert_eq!(mine[0].totals.total_net, dec("900"));
    assert_eq!(mine[0].totals.statement_count, 1);

    let all = app.service.list_reports(None).await.unwrap();
    assert!(report_ids
        .iter()
        .all(|id| all.iter().any(|r| r.report_id == *id)));

    app.service.delete_report(report_ids[1]).await.unwrap();
    assert!(app.store.get_report(report_ids[1]).await.unwrap().is_none());
}
