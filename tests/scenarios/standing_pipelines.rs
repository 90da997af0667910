//! Test: Standing pipelines - one document per declared region

use crate::helpers::*;
use deckhand::assembly::{BuildError, GraphError};
use deckhand::core::{config::AppConfig, TaskStatus};
use deckhand::execution::DeployError;
use deckhand::{ConfigInventory, Deployer};
use std::sync::Arc;

#[tokio::test]
async fn test_deploy_creates_one_pipeline_per_region() {
    let client = Arc::new(MockControlPlane::new());
    let config = checkout_config();
    let deployer = deployer_for(client.clone(), &config);

    let report = deployer.deploy_standing(&config).await.unwrap();

    assert!(report.deleted.is_empty());
    let names: Vec<_> = report.saved.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["checkout [us-east-1]", "checkout [us-west-2]"]);
    assert!(report.saved.iter().all(|s| s.existing_id.is_none()));

    let saved = client.saved();
    assert_eq!(saved.len(), 2);
    assert!(saved.iter().all(|d| d.application == "checkout"));
    assert!(saved.iter().all(|d| d.triggers == config.triggers));
    assert_eq!(
        client.config_names(),
        vec!["checkout [us-east-1]", "checkout [us-west-2]"]
    );
}

#[tokio::test]
async fn test_stage_graph_spans_the_promotion_chain() {
    let client = Arc::new(MockControlPlane::new());
    let config = checkout_config();
    let deployer = deployer_for(client, &config);

    let pipelines = deployer.assemble_standing(&config).await.unwrap();
    let east = &pipelines[0].document;

    // Lambda blocks are master, master, branch; one per env
    assert_eq!(
        ref_ids(east),
        vec!["1", "2", "200", "3", "4", "400", "5", "6", "600"]
    );
    assert_eq!(
        requisites(east),
        vec![
            vec![],
            vec!["1".to_string()],
            vec!["2".to_string()],
            vec!["2".to_string()],
            vec!["3".to_string()],
            vec!["4".to_string()],
            vec!["4".to_string()],
            vec!["5".to_string()],
            vec!["6".to_string()],
        ]
    );
}

#[tokio::test]
async fn test_region_without_middle_env_links_across_it() {
    let client = Arc::new(MockControlPlane::new());
    let config = checkout_config();
    let deployer = deployer_for(client, &config);

    let pipelines = deployer.assemble_standing(&config).await.unwrap();
    let west = &pipelines[1];
    assert_eq!(west.region, "us-west-2");

    let json = west.document.to_json().unwrap();
    let stages = json["stages"].as_array().unwrap();
    assert_eq!(stages.len(), 6);
    assert_eq!(stages[0]["name"], "Infrastructure dev");
    assert_eq!(stages[0]["parameters"]["PREVIOUS_ENV"], "");
    assert_eq!(stages[3]["name"], "Infrastructure prod");
    assert_eq!(stages[3]["parameters"]["PREVIOUS_ENV"], "dev");
    assert_eq!(stages[3]["parameters"]["REGION"], "us-west-2");
}

#[tokio::test]
async fn test_ec2_pipeline_renders_every_placeholder() {
    let config = AppConfig::from_yaml(
        r#"
app: storefront
kind: ec2
pipeline:
  env: [dev, prod]
envs:
  dev:
    regions: [us-east-1]
    subnets:
      us-east-1: [subnet-a]
    availability_zones:
      us-east-1: [us-east-1a]
  prod:
    regions: [us-east-1]
    variables:
      instance_type: m5.large
"#,
    )
    .unwrap();
    let client = Arc::new(MockControlPlane::new());
    let deployer = deployer_for(client, &config);

    let pipelines = deployer.assemble_standing(&config).await.unwrap();
    let json = pipelines[0].document.to_json().unwrap();
    let body = json.to_string();

    assert!(!body.contains("{{"), "unrendered placeholder in {}", body);
    let stages = json["stages"].as_array().unwrap();
    assert_eq!(stages[1]["clusters"][0]["instanceType"], "t3.micro");
    assert_eq!(stages[1]["clusters"][0]["subnetType"], "subnet-a");
    assert_eq!(stages[5]["clusters"][0]["instanceType"], "m5.large");
}

#[tokio::test]
async fn test_redeploy_updates_by_id() {
    let client = Arc::new(MockControlPlane::new());
    let config = checkout_config();
    let deployer = deployer_for(client.clone(), &config);

    deployer.deploy_standing(&config).await.unwrap();
    let report = deployer.deploy_standing(&config).await.unwrap();

    assert!(report.saved.iter().all(|s| s.existing_id.is_some()));
    assert_eq!(client.config_names().len(), 2);

    let second_pass = &client.saved()[2..];
    assert_eq!(second_pass[0].id.as_deref(), Some("pipeline-1"));
    assert_eq!(second_pass[1].id.as_deref(), Some("pipeline-2"));
}

#[tokio::test]
async fn test_deploy_removes_dropped_region() {
    let client = Arc::new(
        MockControlPlane::new().with_configs(&[("old", "checkout [eu-west-1]")]),
    );
    let config = checkout_config();
    let deployer = deployer_for(client.clone(), &config);

    let report = deployer.deploy_standing(&config).await.unwrap();

    assert_eq!(report.deleted, vec!["checkout [eu-west-1]"]);
    assert_eq!(
        client.config_names(),
        vec!["checkout [us-east-1]", "checkout [us-west-2]"]
    );
}

#[tokio::test]
async fn test_assemble_does_not_touch_control_plane() {
    let client = Arc::new(MockControlPlane::new());
    let config = checkout_config();
    let deployer = deployer_for(client.clone(), &config);

    let pipelines = deployer.assemble_standing(&config).await.unwrap();

    assert_eq!(pipelines.len(), 2);
    assert!(client.saved().is_empty());
    assert!(client.deleted().is_empty());
    assert!(client.submitted().is_empty());
    assert_eq!(client.list_calls(), 0);
    assert_eq!(client.polls(), 0);
}

#[tokio::test]
async fn test_merge_lane_fails_assembly() {
    let client = Arc::new(MockControlPlane::new());
    let config = checkout_config();
    let deployer = Deployer::new(
        client.clone(),
        fast_settings(),
        Arc::new(StaticRenderer::new(r#"[{"refId": "master"}, {"refId": "merge"}]"#)),
        Arc::new(ConfigInventory::from_config(&config)),
    );

    let result = deployer.deploy_standing(&config).await;

    assert!(matches!(
        result,
        Err(DeployError::Build(BuildError::Graph(
            GraphError::MergeUnsupported { position: 1 }
        )))
    ));
    assert!(client.saved().is_empty());
}

#[tokio::test]
async fn test_ensure_application_submits_update_job() {
    let client = Arc::new(MockControlPlane::new().with_statuses(&["SUCCEEDED"]));
    let config = checkout_config();
    let deployer = deployer_for(client.clone(), &config);

    let task = deployer.ensure_application(&config).await.unwrap();

    assert_eq!(task.status, TaskStatus::Succeeded);
    assert_eq!(task.application, "checkout");
    assert_eq!(task.job_type, "updateApplication");

    let submitted = client.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0]["job"][0]["application"]["email"], "payments@example.com");
}
