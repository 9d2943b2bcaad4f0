//! Statement create, edit and delete over the in-memory store.

mod common;

use common::{
    assert_chain, create_first_example, create_request, create_second_example, date, dec,
    resubmit, spawn_app, spawn_app_with, fast_retry,
};
use rust_decimal::Decimal;
use statement_service::config::LedgerSettings;
use statement_service::dtos::{CreateStatementRequest, DailySalesInput, StatementFields};
use statement_service::error::LedgerError;
use statement_service::models::{CarriedBalance, Client};
use statement_service::services::StatementStore;
use uuid::Uuid;

#[tokio::test]
async fn first_statement_opens_with_zero_balance() {
    let app = spawn_app().await;

    let first = create_first_example(&app).await;

    assert_eq!(first.net, dec("900"));
    assert_eq!(first.wins_commission_total, dec("100"));
    assert_eq!(first.balance_office, dec("800"));
    assert_eq!(first.balance_client, Decimal::ZERO);
    assert_eq!(first.opening_balance(), CarriedBalance::ZERO);
    assert_eq!(first.final_receivable, dec("500"));
    assert_eq!(first.final_payable, Decimal::ZERO);

    let stored = app.store.get_statement(first.statement_id).await.unwrap();
    assert_eq!(stored, Some(first));
}

#[tokio::test]
async fn second_statement_carries_predecessor_balance() {
    let app = spawn_app().await;
    create_first_example(&app).await;

    let second = create_second_example(&app).await;

    assert_eq!(second.net, dec("450"));
    assert_eq!(second.wins_commission_total, dec("600"));
    assert_eq!(second.balance_office, Decimal::ZERO);
    assert_eq!(second.balance_client, dec("150"));
    assert_eq!(second.opening_balance(), CarriedBalance::new(dec("500"), Decimal::ZERO));
    assert_eq!(second.final_receivable, dec("350"));
    assert_eq!(second.final_payable, Decimal::ZERO);
    assert_chain(&app).await;
}

#[tokio::test]
async fn editing_earlier_statement_ripples_forward() {
    let app = spawn_app().await;
    let first = create_first_example(&app).await;
    let second = create_second_example(&app).await;

    let mut request = resubmit(&first);
    request.fields.expenses = dec("900");
    let outcome = app
        .service
        .edit_statement_and_ripple(first.statement_id, request)
        .await
        .unwrap();

    // 800 office - 900 expenses leaves 100 payable; 200 received adds to it.
    assert_eq!(outcome.statement.final_receivable, Decimal::ZERO);
    assert_eq!(outcome.statement.final_payable, dec("300"));

    assert_eq!(outcome.rippled.len(), 1);
    let rippled = &outcome.rippled[0];
    assert_eq!(rippled.statement_id, second.statement_id);
    assert_eq!(rippled.opening_balance(), CarriedBalance::new(Decimal::ZERO, dec("300")));
    assert_eq!(rippled.final_receivable, Decimal::ZERO);
    assert_eq!(rippled.final_payable, dec("450"));

    let stored = app
        .store
        .get_statement(second.statement_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.final_payable, dec("450"));
    assert_chain(&app).await;
}

#[tokio::test]
async fn resubmitting_unchanged_inputs_is_idempotent() {
    let app = spawn_app().await;
    let first = create_first_example(&app).await;
    create_second_example(&app).await;

    let once = app
        .service
        .edit_statement_and_ripple(first.statement_id, resubmit(&first))
        .await
        .unwrap();
    let twice = app
        .service
        .edit_statement_and_ripple(first.statement_id, resubmit(&once.statement))
        .await
        .unwrap();

    assert_eq!(once.statement.derived(), twice.statement.derived());
    assert_eq!(once.rippled[0].derived(), twice.rippled[0].derived());
}

#[tokio::test]
async fn inserting_before_existing_statement_ripples_it() {
    let app = spawn_app().await;

    let later = create_second_example(&app).await;
    // Alone, the second statement's office deficit is owed to the client.
    assert_eq!(later.final_payable, dec("150"));

    let created = app
        .service
        .compute_and_save_statement(create_request(
            app.client.client_id,
            "2025-04-07",
            "1000",
            "50",
            "100",
            "200",
        ))
        .await
        .unwrap();
    assert_eq!(created.statement.final_receivable, dec("500"));

    let later = app
        .store
        .get_statement(later.statement_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(later.prev_balance_office, dec("500"));
    assert_eq!(later.final_receivable, dec("350"));
    assert_eq!(later.final_payable, Decimal::ZERO);
    assert_chain(&app).await;
}

#[tokio::test]
async fn moving_statement_later_recomputes_both_neighbourhoods() {
    let app = spawn_app().await;
    let first = create_first_example(&app).await;
    let second = create_second_example(&app).await;
    let third = app
        .service
        .compute_and_save_statement(create_request(
            app.client.client_id,
            "2025-04-21",
            "100",
            "0",
            "0",
            "0",
        ))
        .await
        .unwrap()
        .statement;
    assert_eq!(third.final_receivable, dec("440"));

    let mut request = resubmit(&first);
    request.fields.start_date = Some(date("2025-04-22"));
    request.fields.due_date = Some(date("2025-04-28"));
    let outcome = app
        .service
        .edit_statement_and_ripple(first.statement_id, request)
        .await
        .unwrap();

    let rippled_ids: Vec<Uuid> = outcome.rippled.iter().map(|s| s.statement_id).collect();
    assert_eq!(rippled_ids, vec![second.statement_id, third.statement_id]);

    // The old second statement now opens the ledger.
    assert_eq!(outcome.rippled[0].opening_balance(), CarriedBalance::ZERO);
    assert_eq!(outcome.rippled[0].final_payable, dec("150"));
    assert_eq!(outcome.rippled[1].final_payable, dec("60"));
    assert_eq!(outcome.statement.prev_balance_client, dec("60"));
    assert_eq!(outcome.statement.final_receivable, dec("440"));
    assert_chain(&app).await;
}

#[tokio::test]
async fn duplicate_due_date_is_rejected() {
    let app = spawn_app().await;
    create_first_example(&app).await;
    let commits = app.store.commit_count();

    let result = app
        .service
        .compute_and_save_statement(create_request(
            app.client.client_id,
            "2025-04-07",
            "10",
            "0",
            "0",
            "0",
        ))
        .await;

    assert!(matches!(result, Err(LedgerError::Validation(_))));
    assert_eq!(app.store.commit_count(), commits);
}

#[tokio::test]
async fn invalid_inputs_never_reach_storage() {
    let app = spawn_app().await;

    let mut request = create_request(app.client.client_id, "2025-04-07", "1000", "0", "0", "0");
    request.fields.cash_received = dec("-1");
    let result = app.service.compute_and_save_statement(request).await;
    assert!(matches!(result, Err(LedgerError::Validation(_))));

    let request = CreateStatementRequest {
        client_id: app.client.client_id,
        fields: StatementFields {
            due_date: Some(date("2025-04-07")),
            gross: Some(dec("1000")),
            ..Default::default()
        },
    };
    let result = app.service.compute_and_save_statement(request).await;
    assert!(matches!(result, Err(LedgerError::Validation(_))));

    assert_eq!(app.store.commit_count(), 0);
}

#[tokio::test]
async fn unknown_client_is_reported() {
    let app = spawn_app().await;
    let missing = Uuid::new_v4();

    let result = app
        .service
        .compute_and_save_statement(create_request(missing, "2025-04-07", "1", "0", "0", "0"))
        .await;

    assert!(matches!(result, Err(LedgerError::ClientNotFound(id)) if id == missing));
}

#[tokio::test]
async fn client_with_invalid_rates_is_rejected() {
    let app = spawn_app().await;
    let client = Client::new("Broken", dec("150"), dec("2"));
    app.store.save_client(&client).await.unwrap();

    let result = app
        .service
        .compute_and_save_statement(create_request(
            client.client_id,
            "2025-04-07",
            "1",
            "0",
            "0",
            "0",
        ))
        .await;

    assert!(matches!(result, Err(LedgerError::Validation(_))));
}

#[tokio::test]
async fn unknown_statement_cannot_be_edited_or_deleted() {
    let app = spawn_app().await;
    let first = create_first_example(&app).await;
    let missing = Uuid::new_v4();

    let edit = app
        .service
        .edit_statement_and_ripple(missing, resubmit(&first))
        .await;
    assert!(matches!(edit, Err(LedgerError::StatementNotFound(_))));

    let delete = app.service.delete_statement(missing).await;
    assert!(matches!(delete, Err(LedgerError::StatementNotFound(_))));
}

#[tokio::test]
async fn daily_sales_drive_gross_and_can_be_dropped() {
    let app = spawn_app().await;

    let mut request = create_request(app.client.client_id, "2025-04-07", "0", "50", "100", "200");
    request.fields.gross = None;
    request.fields.daily_sales = Some(DailySalesInput {
        monday: dec("600"),
        tuesday: dec("400"),
        ..Default::default()
    });
    let created = app.service.compute_and_save_statement(request).await.unwrap();

    assert_eq!(created.statement.gross, dec("1000"));
    assert_eq!(created.statement.final_receivable, dec("500"));
    let daily = created.daily_sales.expect("daily sales stored");
    assert_eq!(daily.total(), dec("1000"));

    let record = app
        .service
        .get_statement(created.statement.statement_id)
        .await
        .unwrap();
    assert_eq!(record.daily_sales.map(|d| d.monday), Some(dec("600")));

    let mut update = resubmit(&created.statement);
    update.fields.gross = Some(dec("2000"));
    let outcome = app
        .service
        .edit_statement_and_ripple(created.statement.statement_id, update)
        .await
        .unwrap();
    assert!(outcome.daily_sales.is_none());
    // 1800 net - 100 commission - 100 expenses - 200 received
    assert_eq!(outcome.statement.final_receivable, dec("1400"));

    let record = app
        .service
        .get_statement(created.statement.statement_id)
        .await
        .unwrap();
    assert!(record.daily_sales.is_none());
}

#[tokio::test]
async fn delete_leaves_successors_untouched_by_default() {
    let app = spawn_app().await;
    let first = create_first_example(&app).await;
    let second = create_second_example(&app).await;

    let outcome = app.service.delete_statement(first.statement_id).await.unwrap();

    assert_eq!(outcome.deleted.statement_id, first.statement_id);
    assert!(outcome.rippled.is_empty());
    assert!(app
        .store
        .get_statement(first.statement_id)
        .await
        .unwrap()
        .is_none());

    let stored = app
        .store
        .get_statement(second.statement_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, second);
}

#[tokio::test]
async fn delete_ripples_when_enabled() {
    let app = spawn_app_with(LedgerSettings {
        ripple_on_delete: true,
        retry: fast_retry(),
    })
    .await;
    let first = create_first_example(&app).await;
    let second = create_second_example(&app).await;

    let outcome = app.service.delete_statement(first.statement_id).await.unwrap();

    assert_eq!(outcome.rippled.len(), 1);
    assert_eq!(outcome.rippled[0].statement_id, second.statement_id);
    assert_eq!(outcome.rippled[0].opening_balance(), CarriedBalance::ZERO);
    assert_eq!(outcome.rippled[0].final_payable, dec("150"));
    assert_chain(&app).await;
}

#[tokio::test]
async fn client_statements_are_listed_newest_first() {
    let app = spawn_app().await;
    let first = create_first_example(&app).await;
    let second = create_second_example(&app).await;

    let listed = app
        .service
        .list_client_statements(app.client.client_id)
        .await
        .unwrap();
    let ids: Vec<Uuid> = listed.iter().map(|s| s.statement_id).collect();
    assert_eq!(ids, vec![second.statement_id, first.statement_id]);

    let missing = app.service.list_client_statements(Uuid::new_v4()).await;
    assert!(matches!(missing, Err(LedgerError::ClientNotFound(_))));
}

#[tokio::test]
async fn out_of_range_amounts_are_rejected_without_commit() {
    let app = spawn_app().await;
    let commits = app.store.commit_count();

    let mut huge_wins = create_request(app.client.client_id, "2025-04-07", "1000", "0", "0", "0");
    huge_wins.fields.wins = Decimal::MAX;
    let result = app.service.compute_and_save_statement(huge_wins).await;
    assert!(matches!(result, Err(LedgerError::Validation(_))));

    let mut huge_week = create_request(app.client.client_id, "2025-04-07", "0", "0", "0", "0");
    huge_week.fields.gross = None;
    huge_week.fields.daily_sales = Some(DailySalesInput {
        monday: Decimal::MAX,
        tuesday: Decimal::MAX,
        ..Default::default()
    });
    let result = app.service.compute_and_save_statement(huge_week).await;
    assert!(matches!(result, Err(LedgerError::Validation(_))));

    // Valid on its own, but wins commission at 2 per win leaves the column range.
    let overflowing = create_request(
        app.client.client_id,
        "2025-04-07",
        "0",
        "999999999999999",
        "0",
        "0",
    );
    let result = app.service.compute_and_save_statement(overflowing).await;
    assert!(matches!(result, Err(LedgerError::Validation(_))));

    assert_eq!(app.store.commit_count(), commits);
}

#[tokio::test]
async fn amounts_with_more_than_four_decimals_are_rejected() {
    let app = spawn_app().await;

    let result = app
        .service
        .compute_and_save_statement(create_request(
            app.client.client_id,
            "2025-04-07",
            "0.00001",
            "0",
            "0",
            "0",
        ))
        .await;

    assert!(matches!(result, Err(LedgerError::Validation(_))));
}

#[tokio::test]
async fn fractional_rates_produce_stable_stored_values() {
    let app = spawn_app().await;
    let client = Client::new("Fractional", dec("12.5"), dec("0.75"));
    app.store.save_client(&client).await.unwrap();

    let mut created = Vec::new();
    for due in ["2025-04-07", "2025-04-14"] {
        let record = app
            .service
            .compute_and_save_statement(create_request(client.client_id, due, "333.33", "4", "0", "0"))
            .await
            .unwrap();
        created.push(record.statement);
    }
    assert_eq!(created[0].final_receivable, dec("288.6638"));
    assert_eq!(created[1].final_receivable, dec("577.3276"));

    // Resubmitting unchanged inputs must leave every stored value as it was.
    let outcome = app
        .service
        .edit_statement_and_ripple(created[0].statement_id, resubmit(&created[0]))
        .await
        .unwrap();
    assert_eq!(outcome.statement.derived(), created[0].derived());
    assert_eq!(outcome.rippled[0].derived(), created[1].derived());
}
