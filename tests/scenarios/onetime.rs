//! Test: One-shot pipelines for a single environment

use crate::helpers::*;
use deckhand::core::config::AppConfig;
use deckhand::execution::DeployError;
use std::sync::Arc;

#[tokio::test]
async fn test_onetime_covers_every_region_of_the_env() {
    let client = Arc::new(MockControlPlane::new());
    let config = checkout_config();
    let deployer = deployer_for(client.clone(), &config);

    let report = deployer.deploy_onetime(&config, "dev").await.unwrap();

    assert_eq!(report.saved.len(), 1);
    assert_eq!(report.saved[0].name, "checkout (onetime-dev)");
    assert!(report.deleted.is_empty());

    let document = &client.saved()[0];
    assert_eq!(ref_ids(document), vec!["1", "2", "200", "3", "4", "400"]);
    assert!(document.triggers.is_empty());

    let json = document.to_json().unwrap();
    assert_eq!(json["stages"][0]["parameters"]["REGION"], "us-east-1");
    assert_eq!(json["stages"][3]["parameters"]["REGION"], "us-west-2");
    assert_eq!(json["stages"][3]["parameters"]["PREVIOUS_ENV"], "");
}

#[tokio::test]
async fn test_onetime_replaces_existing_one_shot() {
    let client = Arc::new(
        MockControlPlane::new().with_configs(&[("ot-1", "checkout (onetime-dev)")]),
    );
    let config = checkout_config();
    let deployer = deployer_for(client.clone(), &config);

    let report = deployer.deploy_onetime(&config, "dev").await.unwrap();

    assert_eq!(report.saved[0].existing_id.as_deref(), Some("ot-1"));
    assert_eq!(client.saved()[0].id.as_deref(), Some("ot-1"));
    assert_eq!(client.config_names(), vec!["checkout (onetime-dev)"]);
}

#[tokio::test]
async fn test_onetime_uses_pipeline_name() {
    let config = AppConfig::from_yaml(
        r#"
app: checkout
kind: s3
pipeline:
  name: checkout-hotfix
  env: [dev, prod]
envs:
  dev:
    regions: [us-east-1]
  prod:
    regions: [us-east-1]
"#,
    )
    .unwrap();
    let client = Arc::new(MockControlPlane::new());
    let deployer = deployer_for(client, &config);

    let document = deployer.assemble_onetime(&config, "prod").await.unwrap();

    assert_eq!(document.name, "checkout-hotfix (onetime-prod)");
    assert_eq!(document.application, "checkout");
    assert_eq!(ref_ids(&document), vec!["1"]);
}

#[tokio::test]
async fn test_onetime_rejects_undeclared_env() {
    let client = Arc::new(MockControlPlane::new());
    let config = checkout_config();
    let deployer = deployer_for(client.clone(), &config);

    let result = deployer.deploy_onetime(&config, "qa").await;

    assert!(matches!(result, Err(DeployError::UnknownEnvironment(env)) if env == "qa"));
    assert!(client.saved().is_empty());
}
