//! Test: Orphan cleanup and existing-id resolution

use crate::helpers::*;
use deckhand::client::ClientError;
use deckhand::execution::RetryPolicy;
use deckhand::{PipelineReconciler, ReconcileError};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

fn declared() -> BTreeSet<String> {
    ["us-east-1", "us-west-2"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn seeded() -> MockControlPlane {
    MockControlPlane::new().with_configs(&[
        ("1", "checkout [us-east-1]"),
        ("2", "checkout [eu-west-1]"),
        ("3", "checkout (onetime-dev)"),
        ("4", "hand made pipeline"),
        ("5", "other [eu-west-1]"),
        ("6", "checkout canary [ap-south-1]"),
    ])
}

#[tokio::test]
async fn test_clean_orphans_deletes_only_managed_orphans() {
    let client = Arc::new(seeded());
    let reconciler = PipelineReconciler::new(client.clone(), "checkout");

    let deleted = reconciler.clean_orphans(&declared()).await.unwrap();

    assert_eq!(deleted, vec!["checkout [eu-west-1]", "checkout (onetime-dev)"]);
    assert_eq!(
        client.config_names(),
        vec![
            "checkout [us-east-1]",
            "checkout canary [ap-south-1]",
            "hand made pipeline",
            "other [eu-west-1]",
        ]
    );
}

#[tokio::test]
async fn test_clean_orphans_is_idempotent() {
    let client = Arc::new(seeded());
    let reconciler = PipelineReconciler::new(client.clone(), "checkout");

    reconciler.clean_orphans(&declared()).await.unwrap();
    let remaining = client.config_names();

    let second = reconciler.clean_orphans(&declared()).await.unwrap();

    assert!(second.is_empty());
    assert_eq!(client.config_names(), remaining);
    assert_eq!(client.deleted().len(), 2);
}

#[tokio::test]
async fn test_orphan_with_path_characters_is_deleted_by_its_real_name() {
    let client = Arc::new(MockControlPlane::new().with_configs(&[
        ("1", "checkout [us-east-1]"),
        ("9", "team/checkout (onetime-dev)"),
        ("10", "checkout?v=2 (onetime-stage)"),
    ]));
    let reconciler = PipelineReconciler::new(client.clone(), "checkout");

    let deleted = reconciler.clean_orphans(&declared()).await.unwrap();

    assert_eq!(
        deleted,
        vec!["team/checkout (onetime-dev)", "checkout?v=2 (onetime-stage)"]
    );
    assert_eq!(client.config_names(), vec!["checkout [us-east-1]"]);
}

#[tokio::test]
async fn test_delete_of_absent_pipeline_succeeds() {
    let client = Arc::new(
        MockControlPlane::new()
            .with_configs(&[("2", "checkout [eu-west-1]")])
            .with_delete_status("checkout [eu-west-1]", 404),
    );
    let reconciler = PipelineReconciler::new(client.clone(), "checkout");

    let deleted = reconciler.clean_orphans(&declared()).await.unwrap();

    assert!(deleted.is_empty());
}

#[tokio::test]
async fn test_rejected_delete_is_an_error() {
    let client = Arc::new(
        MockControlPlane::new()
            .with_configs(&[("2", "checkout [eu-west-1]")])
            .with_delete_status("checkout [eu-west-1]", 500),
    );
    let reconciler = PipelineReconciler::new(client, "checkout");

    let result = reconciler.clean_orphans(&declared()).await;

    match result {
        Err(ReconcileError::DeletionFailed { app, name, reason }) => {
            assert_eq!(app, "checkout");
            assert_eq!(name, "checkout [eu-west-1]");
            assert!(reason.contains("500"));
        }
        other => panic!("Expected DeletionFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_resolve_existing_id_is_stable() {
    let client = Arc::new(seeded());
    let reconciler = PipelineReconciler::new(client, "checkout");

    let first = reconciler.resolve_existing_id("us-east-1", false).await.unwrap();
    let second = reconciler.resolve_existing_id("us-east-1", false).await.unwrap();

    assert_eq!(first, Some("1".to_string()));
    assert_eq!(first, second);
    assert_eq!(
        reconciler.resolve_existing_id("us-west-2", false).await.unwrap(),
        None
    );
}

#[tokio::test]
async fn test_resolve_onetime_matches_env_tag() {
    let client = Arc::new(seeded());

    let dev = PipelineReconciler::new(client.clone(), "checkout").with_onetime_env("dev");
    assert_eq!(
        dev.resolve_existing_id("us-east-1", true).await.unwrap(),
        Some("3".to_string())
    );

    let prod = PipelineReconciler::new(client, "checkout").with_onetime_env("prod");
    assert_eq!(prod.resolve_existing_id("us-east-1", true).await.unwrap(), None);
}

#[tokio::test]
async fn test_listing_retries_transient_failures() {
    let client = Arc::new(seeded().with_list_failures(2));
    let reconciler = PipelineReconciler::new(client.clone(), "checkout")
        .with_list_retry(RetryPolicy::fixed(3, Duration::ZERO));

    let id = reconciler.resolve_existing_id("us-east-1", false).await.unwrap();

    assert_eq!(id, Some("1".to_string()));
    assert_eq!(client.list_calls(), 3);
}

#[tokio::test]
async fn test_listing_without_retry_surfaces_error() {
    let client = Arc::new(seeded().with_list_failures(1));
    let reconciler = PipelineReconciler::new(client.clone(), "checkout");

    let result = reconciler.clean_orphans(&declared()).await;

    assert!(matches!(
        result,
        Err(ReconcileError::Client(ClientError::Api { status: 503, .. }))
    ));
    assert_eq!(client.list_calls(), 1);
    assert!(client.deleted().is_empty());
}
