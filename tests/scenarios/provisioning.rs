//! Test: Provisioning - configuration and environment errors

use crate::helpers::*;
use stageline::core::{
    ConfigurationError, PipelineConfig, PipelineDefinition, PipelineError, ProvisioningError,
};

#[test]
fn test_empty_definition_is_rejected_before_provisioning() {
    let result = PipelineDefinition::new("empty", Vec::new());
    assert_eq!(result.unwrap_err(), ConfigurationError::NoStages);
}

#[test]
fn test_empty_yaml_pipeline_is_rejected() {
    let yaml = r#"
name: "nothing to do"
stages: []
"#;
    let err = PipelineConfig::from_yaml(yaml).unwrap_err();
    assert_eq!(err, ConfigurationError::NoStages);
}

#[tokio::test]
async fn test_acquire_failure_produces_no_results_and_no_release() {
    let definition = definition(&[("build", &["make"])]);
    let provisioner = MockProvisioner::new().failing_acquire();
    let journal = provisioner.journal();

    let result = run_with_mock(&definition, provisioner).await;

    match result {
        Err(PipelineError::Provisioning(ProvisioningError::StartFailed(_))) => {}
        other => panic!("Expected provisioning error, got {:?}", other),
    }
    assert_eq!(journal.acquires(), 1);
    assert_eq!(journal.releases(), 0);
    assert!(journal.invoked().is_empty());
}

#[tokio::test]
async fn test_release_once_on_every_exit_path() {
    let definition = definition(&[("a", &["x"]), ("b", &["y"])]);

    let succeeded = MockProvisioner::new();
    let failed = MockProvisioner::new().exits("x", 1);

    for provisioner in [succeeded, failed] {
        let journal = provisioner.journal();
        run_with_mock(&definition, provisioner).await.unwrap();
        assert_released_once(&journal);
    }
}
