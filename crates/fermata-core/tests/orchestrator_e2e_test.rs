// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! End-to-end orchestration tests: the full invoke → suspend → resume
//! protocol over a tempfile-backed store and an in-process platform.

mod common;

use serde_json::{Value, json};

use common::{TestContext, exploding_machine, straight_through_machine, unknown_resource_machine};
use fermata_core::error::OrchestrationError;
use fermata_core::orchestrator::Invocation;
use fermata_store::ContinuationToken;

#[tokio::test]
async fn test_straight_through_completes_with_37() {
    let ctx = TestContext::new();
    let orchestrator = ctx.orchestrator();

    let response = orchestrator
        .invoke(
            Invocation::post()
                .with_input(5)
                .with_machine(straight_through_machine()),
        )
        .await
        .unwrap();

    // 5 +1 -> 6, squared -> 36, +1 -> 37
    assert_eq!(response.status, 200);
    assert_eq!(response.body["values"]["value"], json!(37));
    assert!(response.body["elapsed_msec"].is_i64());
    assert!(
        response.body["constants"]["run_name"]
            .as_str()
            .unwrap()
            .starts_with("M-")
    );
}

#[tokio::test]
async fn test_demo_suspends_then_resumes_to_37() {
    let ctx = TestContext::new();
    let orchestrator = ctx.orchestrator();

    // First invocation: the default demo machine suspends after squaring.
    let suspended = orchestrator
        .invoke(Invocation::post().with_input(5))
        .await
        .unwrap();

    assert_eq!(suspended.status, 202);
    assert_eq!(suspended.body["values"]["value"], json!(36));
    let token = suspended.body["continuation"]
        .as_str()
        .expect("suspended response carries no continuation token")
        .to_string();

    // The stored snapshot resumes exactly at the suspending state's Next.
    let store = ctx.open_store().await;
    let snapshot = store
        .get(&ContinuationToken::from(token.as_str()))
        .await
        .unwrap()
        .expect("snapshot missing from store");
    assert_eq!(snapshot.resume_at, "C");
    assert_eq!(snapshot.machine.start_at, "C");
    assert_eq!(snapshot.data["values"]["value"], json!(36));
    // The snapshot was captured before the token was attached.
    assert!(snapshot.data.get("continuation").is_none());
    store.close().await;

    // Second invocation: resume from the token.
    let completed = orchestrator
        .invoke(Invocation::post().with_continuation(token.clone()))
        .await
        .unwrap();

    assert_eq!(completed.status, 200);
    assert_eq!(completed.body["values"]["value"], json!(37));
    assert_eq!(completed.body["constants"]["restarted_from"], json!(token));

    // The resumed run got a fresh name.
    assert_ne!(
        completed.body["constants"]["run_name"],
        suspended.body["constants"]["run_name"]
    );
}

#[tokio::test]
async fn test_resume_works_across_orchestrators() {
    let ctx = TestContext::new();

    let token = {
        let orchestrator = ctx.orchestrator();
        let suspended = orchestrator
            .invoke(Invocation::post().with_input(5))
            .await
            .unwrap();
        suspended.body["continuation"].as_str().unwrap().to_string()
    };

    // A separately constructed orchestrator sharing only the store.
    let other = ctx.orchestrator();
    let completed = other
        .invoke(Invocation::post().with_continuation(token))
        .await
        .unwrap();

    assert_eq!(completed.status, 200);
    assert_eq!(completed.body["values"]["value"], json!(37));
}

#[tokio::test]
async fn test_wrong_method_rejected_without_store_connection() {
    let ctx = TestContext::new();
    let orchestrator = ctx.orchestrator();

    let mut invocation = Invocation::post().with_input(5);
    invocation.method = "get".to_string();

    let err = orchestrator.invoke(invocation).await.unwrap_err();

    assert!(matches!(err, OrchestrationError::Validation { .. }));
    assert_eq!(err.status(), 405);
    assert_eq!(err.error_code(), "VALIDATION_ERROR");

    // The rejection happened before step 2: no store database was created.
    assert!(
        !ctx.store_path().exists(),
        "store connection was opened for a rejected method"
    );
}

#[tokio::test]
async fn test_unknown_token_rejection_names_the_token() {
    let ctx = TestContext::new();
    let orchestrator = ctx.orchestrator();

    let err = orchestrator
        .invoke(Invocation::post().with_continuation("0d9e4c6f-missing"))
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestrationError::ContinuationNotFound { .. }));
    assert_eq!(err.status(), 404);
    assert!(err.to_string().contains("0d9e4c6f-missing"));

    let rejection = err.to_rejection();
    assert_eq!(rejection["error"], json!("CONTINUATION_NOT_FOUND"));
    assert!(
        rejection["message"]
            .as_str()
            .unwrap()
            .contains("0d9e4c6f-missing")
    );
}

#[tokio::test]
async fn test_concurrent_invocations_are_isolated() {
    let ctx = TestContext::new();
    let orchestrator = ctx.orchestrator();

    let (first, second) = tokio::join!(
        orchestrator.invoke(
            Invocation::post()
                .with_input(5)
                .with_machine(straight_through_machine()),
        ),
        orchestrator.invoke(
            Invocation::post()
                .with_input(10)
                .with_machine(straight_through_machine()),
        ),
    );

    let first = first.unwrap();
    let second = second.unwrap();

    // 5 -> 37 and 10 -> 122, each through its own run.
    assert_eq!(first.body["values"]["value"], json!(37));
    assert_eq!(second.body["values"]["value"], json!(122));
    assert_ne!(
        first.body["constants"]["run_name"],
        second.body["constants"]["run_name"]
    );
}

#[tokio::test]
async fn test_discovery_failure_rejects_invocation() {
    let ctx = TestContext::new();
    let orchestrator = ctx.orchestrator_with_broken_platform();

    let err = orchestrator
        .invoke(Invocation::post().with_input(5))
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestrationError::RegistryDiscovery { .. }));
    assert_eq!(err.status(), 502);
    assert!(err.to_string().contains("connection refused"));
}

#[tokio::test]
async fn test_unknown_resource_fails_the_run() {
    let ctx = TestContext::new();
    let orchestrator = ctx.orchestrator();

    let err = orchestrator
        .invoke(
            Invocation::post()
                .with_input(5)
                .with_machine(unknown_resource_machine()),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestrationError::RunFailed { .. }));
    assert!(err.to_string().contains("not-deployed-anywhere"));
}

#[tokio::test]
async fn test_remote_action_failure_surfaces_as_such() {
    let ctx = TestContext::new();
    let orchestrator = ctx.orchestrator();

    let err = orchestrator
        .invoke(
            Invocation::post()
                .with_input(5)
                .with_machine(exploding_machine()),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestrationError::RemoteAction { .. }));
    assert_eq!(err.status(), 502);
    assert!(err.to_string().contains("deliberate test failure"));
}

#[tokio::test]
async fn test_default_input_is_one() {
    let ctx = TestContext::new();
    let orchestrator = ctx.orchestrator();

    let response = orchestrator
        .invoke(Invocation::post().with_machine(straight_through_machine()))
        .await
        .unwrap();

    // 1 +1 -> 2, squared -> 4, +1 -> 5
    assert_eq!(response.body["values"]["value"], json!(5));
}

#[tokio::test]
async fn test_invalid_inline_machine_is_an_interpreter_start_error() {
    let ctx = TestContext::new();
    let orchestrator = ctx.orchestrator();

    let mut machine = straight_through_machine();
    machine.start_at = "Nowhere".to_string();

    let err = orchestrator
        .invoke(Invocation::post().with_machine(machine))
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestrationError::InterpreterStart { .. }));
    assert_eq!(err.status(), 500);
}

#[tokio::test]
async fn test_suspended_token_resolves_exactly_one_snapshot() {
    let ctx = TestContext::new();
    let orchestrator = ctx.orchestrator();

    let first = orchestrator
        .invoke(Invocation::post().with_input(2))
        .await
        .unwrap();
    let second = orchestrator
        .invoke(Invocation::post().with_input(3))
        .await
        .unwrap();

    let first_token = first.body["continuation"].as_str().unwrap();
    let second_token = second.body["continuation"].as_str().unwrap();
    assert_ne!(first_token, second_token);

    // Each token resumes its own run: (2+1)^2 = 9 -> 10, (3+1)^2 = 16 -> 17.
    let first_resumed = orchestrator
        .invoke(Invocation::post().with_continuation(first_token))
        .await
        .unwrap();
    let second_resumed = orchestrator
        .invoke(Invocation::post().with_continuation(second_token))
        .await
        .unwrap();

    assert_eq!(first_resumed.body["values"]["value"], json!(10));
    assert_eq!(second_resumed.body["values"]["value"], json!(17));
}

#[tokio::test]
async fn test_completed_body_shape() {
    let ctx = TestContext::new();
    let orchestrator = ctx.orchestrator();

    let response = orchestrator
        .invoke(
            Invocation::post()
                .with_input(5)
                .with_machine(straight_through_machine()),
        )
        .await
        .unwrap();

    let body: &Value = &response.body;
    assert!(body["constants"]["version"].is_string());
    assert!(body["constants"]["start_time"].is_string());
    assert!(body.get("continuation").is_none());
}
