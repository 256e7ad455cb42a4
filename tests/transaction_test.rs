//! Integration tests for transactional dispatch over a SQLite store.
//!
//! Tests verify that:
//! - multi-statement payloads commit atomically
//! - a failing statement rolls back every earlier statement
//! - isolation metadata is resolved before any statement executes
//! - a transaction ending in a SELECT returns that statement's rows

use sql_bridge::config::StoreConfig;
use sql_bridge::dispatch::RequestDispatcher;
use sql_bridge::error::EngineError;
use sql_bridge::types::{METADATA_ISOLATION_LEVEL, METADATA_METHOD, Request};
use std::time::Duration;
use tempfile::NamedTempFile;

async fn setup_dispatcher() -> RequestDispatcher {
    let temp_file = NamedTempFile::new().unwrap();
    // Keep the temp file alive - prevent deletion when function returns
    let db_path = temp_file
        .into_temp_path()
        .keep()
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();

    let config = StoreConfig {
        connection: format!("sqlite:{}", db_path),
        max_idle_connections: 1,
        max_open_connections: 5,
        connection_max_lifetime_secs: 3600,
    };

    let dispatcher =
        RequestDispatcher::connect(&config, Duration::from_secs(10), Duration::from_secs(10))
            .await
            .unwrap();

    let create = transaction_request(
        "CREATE TABLE account (id INTEGER PRIMARY KEY, balance INTEGER NOT NULL)",
    );
    dispatcher.dispatch(&create).await.unwrap();

    dispatcher
}

fn transaction_request(sql: &str) -> Request {
    Request::new()
        .with_metadata(METADATA_METHOD, "transaction")
        .with_data(sql)
}

async fn count_rows(dispatcher: &RequestDispatcher) -> i64 {
    let query = Request::new()
        .with_metadata(METADATA_METHOD, "query")
        .with_data("SELECT COUNT(*) AS n FROM account");
    let resp = dispatcher.dispatch(&query).await.unwrap();
    let rows: serde_json::Value = serde_json::from_slice(&resp.data.unwrap()).unwrap();
    rows[0]["n"].as_i64().unwrap()
}

#[tokio::test]
async fn test_multi_statement_commit() {
    let dispatcher = setup_dispatcher().await;

    let resp = dispatcher
        .dispatch(&transaction_request(
            "INSERT INTO account (id, balance) VALUES (1, 100);\n\
             INSERT INTO account (id, balance) VALUES (2, 250);\n\
             UPDATE account SET balance = balance - 50 WHERE id = 2;",
        ))
        .await
        .unwrap();
    assert!(resp.is_ok());
    // Pure side-effect transaction carries no row data
    assert!(resp.data.is_none());

    assert_eq!(count_rows(&dispatcher).await, 2);

    dispatcher.close().await;
}

#[tokio::test]
async fn test_failing_statement_rolls_back_everything() {
    let dispatcher = setup_dispatcher().await;

    let err = dispatcher
        .dispatch(&transaction_request(
            "INSERT INTO account (id, balance) VALUES (1, 100);\n\
             INSERT INTO account (id, balance) VALUES (2, 250);\n\
             INSERT INTO no_such_table VALUES (1);",
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Execution { .. }));

    // The earlier inserts must not have been applied
    assert_eq!(count_rows(&dispatcher).await, 0);

    dispatcher.close().await;
}

#[tokio::test]
async fn test_trailing_select_returns_rows() {
    let dispatcher = setup_dispatcher().await;

    let resp = dispatcher
        .dispatch(&transaction_request(
            "INSERT INTO account (id, balance) VALUES (1, 100);\n\
             SELECT id, balance FROM account ORDER BY id;",
        ))
        .await
        .unwrap();
    assert!(resp.is_ok());

    let rows: serde_json::Value = serde_json::from_slice(&resp.data.unwrap()).unwrap();
    assert_eq!(rows[0]["id"], 1);
    assert_eq!(rows[0]["balance"], 100);

    dispatcher.close().await;
}

#[tokio::test]
async fn test_trailing_zero_row_select_returns_plain_ack() {
    let dispatcher = setup_dispatcher().await;

    let resp = dispatcher
        .dispatch(&transaction_request(
            "INSERT INTO account (id, balance) VALUES (1, 100);\n\
             SELECT id FROM account WHERE id = 99;",
        ))
        .await
        .unwrap();
    // A final statement yielding no rows takes the ack form, same as DML
    assert!(resp.is_ok());
    assert!(resp.data.is_none());
    assert_eq!(count_rows(&dispatcher).await, 1);

    dispatcher.close().await;
}

#[tokio::test]
async fn test_unrecognized_isolation_level_fails_before_executing() {
    let dispatcher = setup_dispatcher().await;

    let err = dispatcher
        .dispatch(
            &transaction_request("INSERT INTO account (id, balance) VALUES (1, 100)")
                .with_metadata(METADATA_ISOLATION_LEVEL, "bad_level"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Configuration { .. }));
    assert!(err.to_string().contains("bad_level"));

    // Resolved before any statement ran
    assert_eq!(count_rows(&dispatcher).await, 0);

    dispatcher.close().await;
}

#[tokio::test]
async fn test_explicit_isolation_rejected_on_sqlite() {
    let dispatcher = setup_dispatcher().await;

    let err = dispatcher
        .dispatch(
            &transaction_request("INSERT INTO account (id, balance) VALUES (1, 100)")
                .with_metadata(METADATA_ISOLATION_LEVEL, "serializable"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Configuration { .. }));

    assert_eq!(count_rows(&dispatcher).await, 0);

    dispatcher.close().await;
}

#[tokio::test]
async fn test_comment_only_payload_is_validation_error() {
    let dispatcher = setup_dispatcher().await;

    let err = dispatcher
        .dispatch(&transaction_request("-- nothing to do\n/* still nothing */;"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation { .. }));

    dispatcher.close().await;
}

#[tokio::test]
async fn test_statement_splitting_respects_quoted_semicolons() {
    let dispatcher = setup_dispatcher().await;

    let create = transaction_request("CREATE TABLE note (id INTEGER PRIMARY KEY, body TEXT)");
    dispatcher.dispatch(&create).await.unwrap();

    let resp = dispatcher
        .dispatch(&transaction_request(
            "INSERT INTO note (id, body) VALUES (1, 'a; b; c');\n\
             SELECT body FROM note WHERE id = 1;",
        ))
        .await
        .unwrap();
    let rows: serde_json::Value = serde_json::from_slice(&resp.data.unwrap()).unwrap();
    assert_eq!(rows[0]["body"], "a; b; c");

    dispatcher.close().await;
}
