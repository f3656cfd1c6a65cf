//! Run lifecycle through `generate` against a scripted capability.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use property_stock_report::agents::{
    generate, GenerationError, GenerationPolicy, RunStatus, ENGLISH_REPORT, MALAY_REPORT,
};

mod common;

use common::{ScriptedCapability, ENGLISH_TEXT};

fn fast_policy() -> GenerationPolicy {
    GenerationPolicy {
        poll_interval: Duration::from_millis(1),
        max_poll_interval: Duration::from_millis(4),
        backoff_factor: 2.0,
        timeout: Duration::from_secs(5),
        max_retries: 2,
    }
}

#[tokio::test]
async fn test_completed_run_returns_text() {
    let capability = ScriptedCapability::new().polls_before_done(3);
    let input = json!({ "period": "Jan-Mar 2025" });

    let text = generate(
        &capability,
        &ENGLISH_REPORT,
        &input,
        &fast_policy(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(text, ENGLISH_TEXT);
    let submissions = capability.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].0, "eng-report-agent");
    assert_eq!(submissions[0].1["input"], input);
    assert_eq!(submissions[0].1["hint"], ENGLISH_REPORT.hint);
}

#[tokio::test]
async fn test_failed_run_carries_service_message() {
    let capability = ScriptedCapability::new().fail_agent(
        "malay-report-agent",
        RunStatus::Failed,
        "rate_limit_exceeded: try again later",
    );

    let err = generate(
        &capability,
        &MALAY_REPORT,
        &json!({ "english_report_text": ENGLISH_TEXT }),
        &fast_policy(),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    match err {
        GenerationError::RunFailed { status, message } => {
            assert_eq!(status, RunStatus::Failed);
            assert!(message.contains("rate_limit_exceeded"));
        }
        other => panic!("expected RunFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_expired_run_is_a_failure() {
    let capability = ScriptedCapability::new().fail_agent("eng-report-agent", RunStatus::Expired, "expired");

    let err = generate(
        &capability,
        &ENGLISH_REPORT,
        &json!({}),
        &fast_policy(),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, GenerationError::RunFailed { status: RunStatus::Expired, .. }));
}

#[tokio::test]
async fn test_run_that_never_finishes_times_out() {
    let capability = ScriptedCapability::new().never_finishes();
    let policy = GenerationPolicy {
        timeout: Duration::from_millis(50),
        ..fast_policy()
    };

    let err = generate(&capability, &ENGLISH_REPORT, &json!({}), &policy, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, GenerationError::Timeout(t) if t == Duration::from_millis(50)));
}

#[tokio::test]
async fn test_cancellation_stops_polling() {
    let capability = Arc::new(ScriptedCapability::new().never_finishes());
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let err = generate(capability.as_ref(), &ENGLISH_REPORT, &json!({}), &fast_policy(), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, GenerationError::Cancelled));
}

#[tokio::test]
async fn test_already_cancelled_token_never_submits() {
    let capability = ScriptedCapability::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = generate(&capability, &ENGLISH_REPORT, &json!({}), &fast_policy(), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, GenerationError::Cancelled));
    assert!(capability.submissions().is_empty());
}

#[tokio::test]
async fn test_transient_submit_failures_are_retried() {
    let capability = ScriptedCapability::new().flaky_submits(2);

    let text = generate(
        &capability,
        &ENGLISH_REPORT,
        &json!({}),
        &fast_policy(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(text, ENGLISH_TEXT);
    assert_eq!(capability.submissions().len(), 1);
}

#[tokio::test]
async fn test_retries_are_bounded() {
    let capability = ScriptedCapability::new().flaky_submits(3);

    let err = generate(
        &capability,
        &ENGLISH_REPORT,
        &json!({}),
        &fast_policy(),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, GenerationError::Submit(_)));
    assert!(capability.submissions().is_empty());
}

#[tokio::test]
async fn test_rejected_request_is_not_retried() {
    let capability = ScriptedCapability::new().reject_threads();

    let err = generate(
        &capability,
        &ENGLISH_REPORT,
        &json!({}),
        &fast_policy(),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, GenerationError::Rejected(_)));
    assert_eq!(capability.thread_attempts(), 1);
    assert!(capability.submissions().is_empty());
}

#[tokio::test]
async fn test_auth_failure_is_not_retried() {
    let capability = ScriptedCapability::new().auth_failures(1);

    let err = generate(
        &capability,
        &ENGLISH_REPORT,
        &json!({}),
        &fast_policy(),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert!(err.is_auth_failure());
    assert_eq!(capability.thread_attempts(), 1);
}

#[tokio::test]
async fn test_lost_run_response_resumes_existing_run() {
    let capability = ScriptedCapability::new().lose_run_responses(1);

    let text = generate(
        &capability,
        &ENGLISH_REPORT,
        &json!({ "period": "Jan-Mar 2025" }),
        &fast_policy(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(text, ENGLISH_TEXT);
    // one thread, one run: the retry picked up the run already created
    assert_eq!(capability.threads_created(), 1);
    assert_eq!(capability.submissions().len(), 1);
}

#[tokio::test]
async fn test_thread_retry_does_not_duplicate_runs() {
    let capability = ScriptedCapability::new().flaky_submits(1);

    generate(
        &capability,
        &ENGLISH_REPORT,
        &json!({}),
        &fast_policy(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(capability.thread_attempts(), 2);
    assert_eq!(capability.threads_created(), 1);
    assert_eq!(capability.submissions().len(), 1);
}
