//! Test: Success Chain - every command exits 0

use crate::helpers::*;
use stageline::core::{PipelineConfig, StageStatus};
use stageline::report::Reporter;

#[tokio::test]
async fn test_two_stages_succeed() {
    let definition = definition(&[("build", &["make"]), ("test", &["make test"])]);
    let provisioner = MockProvisioner::new();
    let journal = provisioner.journal();

    let outcome = run_with_mock(&definition, provisioner).await.unwrap();

    assert_pipeline_succeeded(&outcome);
    assert_statuses(&outcome, &[StageStatus::Succeeded, StageStatus::Succeeded]);
    assert!(outcome.failed_stage().is_none());
    assert_released_once(&journal);
}

#[tokio::test]
async fn test_every_command_runs_in_declared_order() {
    let definition = definition(&[
        ("build", &["cargo build", "cargo build --release"]),
        ("test", &["cargo test"]),
        ("lint", &["cargo clippy", "cargo fmt -- --check"]),
    ]);
    let provisioner = MockProvisioner::new();
    let journal = provisioner.journal();

    let outcome = run_with_mock(&definition, provisioner).await.unwrap();

    assert_pipeline_succeeded(&outcome);
    assert_eq!(
        journal.invoked(),
        [
            "cargo build",
            "cargo build --release",
            "cargo test",
            "cargo clippy",
            "cargo fmt -- --check"
        ]
    );
    assert_eq!(outcome.count(|s| *s == StageStatus::Succeeded), 3);
    assert_eq!(outcome.results()[2].commands[1].stdout, "ran cargo fmt -- --check");
}

#[tokio::test]
async fn test_template_pipeline_runs_all_stages() {
    let config = PipelineConfig::from_yaml(stageline::core::config::RUST_CI_TEMPLATE).unwrap();
    let definition = config.to_definition().unwrap();

    let outcome = run_with_mock(&definition, MockProvisioner::new()).await.unwrap();

    assert_pipeline_succeeded(&outcome);
    assert_eq!(
        Reporter::render(&outcome),
        "build: SUCCEEDED\ntest: SUCCEEDED\nlint: SUCCEEDED\nformat: SUCCEEDED\npipeline rust-ci: SUCCEEDED\n"
    );
}
