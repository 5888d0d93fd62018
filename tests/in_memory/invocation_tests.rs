//! Tool invocation and retry tests over the in-memory transport.

use super::helpers::{TestContext, context, context_with_retries, descriptor, server};
use rstest::rstest;
use serde_json::json;
use switchboard::tool_server::domain::InvocationOutcome;

async fn connected(context: &TestContext, name: &str) {
    context
        .service
        .connect(descriptor(name))
        .await
        .expect("connect should succeed");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn invoke_unknown_server_reports_not_connected(context: TestContext) {
    let outcome = context
        .service
        .invoke("github", "create_issue", &json!({"title": "Bug"}))
        .await;

    assert_eq!(outcome.error(), Some("github not connected"));
    assert_eq!(context.transport.call_count("github"), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn invoke_returns_raw_payload(context: TestContext) {
    connected(&context, "github").await;
    let payload = json!({"content": [{"type": "text", "text": "Issue #42 created"}]});
    context
        .transport
        .push_call_results(server("github"), "create_issue", [Ok(payload.clone())]);

    let outcome = context
        .service
        .invoke("github", "create_issue", &json!({"title": "Bug"}))
        .await;

    assert_eq!(outcome, InvocationOutcome::Success(payload));
    let stats = context.service.stats();
    let github = stats.get("github").expect("github stats should exist");
    assert_eq!(github.retry_count, 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn successful_call_resets_retry_count(context: TestContext) {
    connected(&context, "slack").await;
    context.transport.push_call_results(
        server("slack"),
        "post_message",
        [Err("ETIMEDOUT".to_owned()), Err("ETIMEDOUT".to_owned())],
    );
    for _ in 0..2 {
        context
            .service
            .invoke("slack", "post_message", &json!({}))
            .await;
    }
    let failing = context.service.stats();
    assert_eq!(failing.get("slack").map(|stats| stats.retry_count), Some(2));

    let outcome = context
        .service
        .invoke("slack", "post_message", &json!({}))
        .await;

    assert!(outcome.is_success());
    let recovered = context.service.stats();
    assert_eq!(recovered.get("slack").map(|stats| stats.retry_count), Some(0));
}

#[rstest]
#[case(0)]
#[case(3)]
#[case(5)]
#[tokio::test(flavor = "multi_thread")]
async fn non_retryable_failure_stops_after_one_attempt(#[case] max_retries: u32) {
    let context = context_with_retries(max_retries);
    connected(&context, "github").await;
    context.transport.push_call_results(
        server("github"),
        "create_issue",
        (0..6).map(|_| Err("Invalid argument: title is required".to_owned())),
    );

    let outcome = context
        .service
        .invoke_with_retry("github", "create_issue", &json!({}))
        .await;

    assert_eq!(outcome.error(), Some("Invalid argument: title is required"));
    assert_eq!(context.transport.call_count("github"), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn retryable_failure_returns_first_success(context: TestContext) {
    connected(&context, "slack").await;
    context.transport.push_call_results(
        server("slack"),
        "post_message",
        [
            Err("ETIMEDOUT".to_owned()),
            Err("socket hang up: ECONNRESET".to_owned()),
            Ok(json!({"ts": "1700000000.000100"})),
        ],
    );

    let outcome = context
        .service
        .invoke_with_retry("slack", "post_message", &json!({"text": "hi"}))
        .await;

    assert_eq!(
        outcome,
        InvocationOutcome::Success(json!({"ts": "1700000000.000100"}))
    );
    assert_eq!(context.transport.call_count("slack"), 3);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn exhausted_retries_report_attempts_and_last_error(context: TestContext) {
    connected(&context, "slack").await;
    context.transport.push_call_results(
        server("slack"),
        "post_message",
        [
            Err("ETIMEDOUT".to_owned()),
            Err("ETIMEDOUT".to_owned()),
            Err("ETIMEDOUT".to_owned()),
            Err("Service Unavailable".to_owned()),
        ],
    );

    let outcome = context
        .service
        .invoke_with_retry("slack", "post_message", &json!({}))
        .await;

    assert_eq!(
        outcome.error(),
        Some("post_message on slack failed after 4 attempts: Service Unavailable")
    );
    assert_eq!(context.transport.call_count("slack"), 4);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn retry_reconnects_a_lost_connection(context: TestContext) {
    connected(&context, "browser").await;
    context.transport.sever(&server("browser"));
    context.transport.push_call_results(
        server("browser"),
        "navigate",
        [Ok(json!({"url": "https://example.com"}))],
    );

    let outcome = context
        .service
        .invoke_with_retry("browser", "navigate", &json!({"url": "https://example.com"}))
        .await;

    assert!(outcome.is_success());
    assert_eq!(context.transport.open_count("browser"), 2);
    assert_eq!(context.service.list_connected().len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_reconnects_keep_retrying_until_exhausted(context: TestContext) {
    connected(&context, "browser").await;
    context.transport.sever(&server("browser"));
    context
        .transport
        .set_unreachable(server("browser"), "spawn browser-mcp ENOENT");

    let outcome = context
        .service
        .invoke_with_retry("browser", "navigate", &json!({}))
        .await;

    let error = outcome.error().expect("invocation should fail");
    assert!(error.starts_with("navigate on browser failed after 4 attempts: "));
    assert!(error.contains("spawn browser-mcp ENOENT"));
    assert_eq!(context.transport.call_count("browser"), 1);
    assert_eq!(context.transport.open_count("browser"), 4);
    let stats = context.service.stats();
    let browser = stats.get("browser").expect("browser entry should remain");
    assert!(!browser.connected);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn retry_recovers_after_one_failed_reconnect(context: TestContext) {
    connected(&context, "browser").await;
    context.transport.sever(&server("browser"));
    context
        .transport
        .push_open_failure(server("browser"), "spawn browser-mcp EAGAIN");
    context.transport.push_call_results(
        server("browser"),
        "navigate",
        [Ok(json!({"url": "https://example.com"}))],
    );

    let outcome = context
        .service
        .invoke_with_retry("browser", "navigate", &json!({"url": "https://example.com"}))
        .await;

    assert_eq!(
        outcome,
        InvocationOutcome::Success(json!({"url": "https://example.com"}))
    );
    assert_eq!(context.transport.call_count("browser"), 2);
    assert_eq!(context.transport.open_count("browser"), 3);
    assert_eq!(context.service.list_connected().len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn aborted_operation_is_not_retried(context: TestContext) {
    connected(&context, "github").await;
    context.transport.push_call_results(
        server("github"),
        "merge_pr",
        [
            Err("Merge aborted: branch protection rule violated".to_owned()),
            Ok(json!({"merged": true})),
        ],
    );

    let outcome = context
        .service
        .invoke_with_retry("github", "merge_pr", &json!({"number": 7}))
        .await;

    assert_eq!(
        outcome.error(),
        Some("Merge aborted: branch protection rule violated")
    );
    assert_eq!(context.transport.call_count("github"), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_invocations_share_one_connection(context: TestContext) {
    connected(&context, "github").await;

    let calls = (0..8).map(|index| {
        let service = &context.service;
        async move {
            service
                .invoke("github", "get_issue", &json!({"number": index}))
                .await
        }
    });
    let outcomes = futures::future::join_all(calls).await;

    assert!(outcomes.iter().all(InvocationOutcome::is_success));
    assert_eq!(context.transport.call_count("github"), 8);
    assert_eq!(context.transport.open_count("github"), 1);
}
