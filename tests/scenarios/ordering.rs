//! Test: Ordering - declared order decides the failing stage; runs repeat exactly

use crate::helpers::*;
use stageline::core::StageStatus;

#[tokio::test]
async fn test_permuting_stages_changes_the_failing_stage() {
    let provisioner = || MockProvisioner::new().exits("check-x", 1).exits("check-y", 2);

    let forward = definition(&[("x", &["check-x"]), ("y", &["check-y"])]);
    let reversed = definition(&[("y", &["check-y"]), ("x", &["check-x"])]);

    let forward = run_with_mock(&forward, provisioner()).await.unwrap();
    let reversed = run_with_mock(&reversed, provisioner()).await.unwrap();

    assert_stage_failed(&forward, "x", 1, 0);
    assert_stage_failed(&reversed, "y", 2, 0);
    assert_eq!(forward.statuses()[1], StageStatus::Skipped);
    assert_eq!(reversed.statuses()[1], StageStatus::Skipped);
}

#[tokio::test]
async fn test_permuting_commands_changes_the_failing_index() {
    let provisioner = || MockProvisioner::new().exits("bad", 9);

    let early = definition(&[("s", &["bad", "good"])]);
    let late = definition(&[("s", &["good", "bad"])]);

    let early = run_with_mock(&early, provisioner()).await.unwrap();
    let late = run_with_mock(&late, provisioner()).await.unwrap();

    assert_stage_failed(&early, "s", 9, 0);
    assert_stage_failed(&late, "s", 9, 1);
}

#[tokio::test]
async fn test_identical_environments_give_identical_outcomes() {
    let definition = definition(&[
        ("build", &["make"]),
        ("test", &["make test", "make check"]),
        ("deploy", &["make deploy"]),
    ]);
    let provisioner = || MockProvisioner::new().exits("make check", 3);

    let first = run_with_mock(&definition, provisioner()).await.unwrap();
    let second = run_with_mock(&definition, provisioner()).await.unwrap();

    assert!(first.same_result_as(&second));
    assert_ne!(first.run_id(), second.run_id());
}

#[tokio::test]
async fn test_different_exit_codes_are_different_outcomes() {
    let definition = definition(&[("build", &["make"])]);

    let first = run_with_mock(&definition, MockProvisioner::new().exits("make", 1))
        .await
        .unwrap();
    let second = run_with_mock(&definition, MockProvisioner::new().exits("make", 2))
        .await
        .unwrap();

    assert!(!first.same_result_as(&second));
}
