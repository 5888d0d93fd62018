//! Connection lifecycle tests over the in-memory transport.

use super::helpers::{TestContext, context, context_with_retries, descriptor, server};
use rstest::rstest;
use switchboard::tool_server::services::ConnectError;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn connecting_twice_keeps_a_single_connection(context: TestContext) {
    context
        .service
        .connect(descriptor("github"))
        .await
        .expect("first connect should succeed");
    context
        .service
        .connect(descriptor("github"))
        .await
        .expect("second connect should be a no-op");

    let connected: Vec<String> = context
        .service
        .list_connected()
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(connected, vec!["github".to_owned()]);
    assert_eq!(context.transport.open_count("github"), 1);
    assert_eq!(context.transport.live_handle_count(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_connect_leaves_no_entry(context: TestContext) {
    context
        .transport
        .push_open_failure(server("slack"), "spawn slack-mcp ENOENT");

    let result = context.service.connect(descriptor("slack")).await;

    assert!(matches!(result, Err(ConnectError::Handshake { .. })));
    assert!(context.service.stats().is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn connect_with_retry_recovers_from_transient_failures(context: TestContext) {
    context
        .transport
        .push_open_failure(server("github"), "connect ECONNREFUSED");
    context
        .transport
        .push_open_failure(server("github"), "connect ECONNREFUSED");

    context
        .service
        .connect_with_retry(descriptor("github"))
        .await
        .expect("third attempt should succeed");

    assert_eq!(context.transport.open_count("github"), 3);
    assert_eq!(context.service.list_connected().len(), 1);
}

#[rstest]
#[case(0, 1)]
#[case(2, 3)]
#[case(4, 5)]
#[tokio::test(flavor = "multi_thread")]
async fn connect_with_retry_makes_at_most_max_retries_plus_one_attempts(
    #[case] max_retries: u32,
    #[case] expected_attempts: usize,
) {
    let context = context_with_retries(max_retries);
    context
        .transport
        .set_unreachable(server("browser"), "connect ECONNREFUSED");

    let result = context.service.connect_with_retry(descriptor("browser")).await;

    assert!(matches!(
        result,
        Err(ConnectError::RetriesExhausted { attempts, .. }) if attempts == max_retries + 1
    ));
    assert_eq!(context.transport.open_count("browser"), expected_attempts);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn connect_all_reports_each_server(context: TestContext) {
    context
        .transport
        .set_unreachable(server("browser"), "connect ECONNREFUSED");

    let results = context
        .service
        .connect_all(vec![descriptor("github"), descriptor("browser"), descriptor("slack")])
        .await;

    assert_eq!(results.len(), 3);
    assert!(results.get("github").is_some_and(Result::is_ok));
    assert!(results.get("slack").is_some_and(Result::is_ok));
    assert!(results.get("browser").is_some_and(Result::is_err));
    assert_eq!(context.service.list_connected().len(), 2);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn disconnect_unknown_server_is_a_no_op(context: TestContext) {
    context.service.disconnect("never-connected").await;

    assert!(context.service.stats().is_empty());
    assert_eq!(context.transport.close_count("never-connected"), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn disconnect_removes_entry_even_when_close_fails(context: TestContext) {
    context
        .service
        .connect(descriptor("github"))
        .await
        .expect("connect should succeed");
    context
        .transport
        .fail_close(server("github"), "process already reaped");

    context.service.disconnect("github").await;

    assert!(context.service.stats().is_empty());
    assert_eq!(context.transport.close_count("github"), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn disconnect_all_clears_every_connection(context: TestContext) {
    context
        .service
        .connect(descriptor("github"))
        .await
        .expect("connect should succeed");
    context
        .service
        .connect(descriptor("slack"))
        .await
        .expect("connect should succeed");
    context
        .transport
        .fail_close(server("github"), "process already reaped");

    context.service.disconnect_all().await;

    assert!(context.service.list_connected().is_empty());
    assert!(context.service.stats().is_empty());
    assert_eq!(context.transport.live_handle_count(), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn reconnecting_a_dead_entry_replaces_it(context: TestContext) {
    context
        .service
        .connect(descriptor("browser"))
        .await
        .expect("connect should succeed");
    context.transport.sever(&server("browser"));
    let outcome = context
        .service
        .invoke("browser", "navigate", &serde_json::json!({}))
        .await;
    assert!(!outcome.is_success());
    assert!(context.service.list_connected().is_empty());

    context
        .service
        .connect(descriptor("browser"))
        .await
        .expect("reconnect should succeed");

    assert_eq!(context.service.list_connected().len(), 1);
    assert_eq!(context.transport.open_count("browser"), 2);
    assert_eq!(context.transport.close_count("browser"), 1);
}
