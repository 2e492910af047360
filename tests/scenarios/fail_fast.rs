//! Test: Fail Fast - the first non-zero exit ends the run

use crate::helpers::*;
use stageline::core::StageStatus;
use stageline::report::Reporter;

#[tokio::test]
async fn test_second_command_of_middle_stage_fails() {
    let definition = definition(&[
        ("build", &["make"]),
        ("test", &["make test", "make check"]),
        ("deploy", &["make deploy"]),
    ]);
    let provisioner = MockProvisioner::new().exits("make check", 1);
    let journal = provisioner.journal();

    let outcome = run_with_mock(&definition, provisioner).await.unwrap();

    assert_pipeline_failed(&outcome);
    assert_statuses(
        &outcome,
        &[
            StageStatus::Succeeded,
            StageStatus::Failed {
                exit_code: 1,
                command_index: 1,
            },
            StageStatus::Skipped,
        ],
    );
    assert_eq!(journal.invoked(), ["make", "make test", "make check"]);
    assert_released_once(&journal);

    assert_eq!(
        Reporter::render(&outcome),
        "build: SUCCEEDED\ntest: FAILED (exit code 1 at command 1)\ndeploy: SKIPPED\npipeline scenario: FAILED\n"
    );
}

#[tokio::test]
async fn test_nothing_after_the_failing_command_runs() {
    let definition = definition(&[
        ("one", &["a", "b", "c"]),
        ("two", &["d"]),
        ("three", &["e", "f"]),
    ]);
    let provisioner = MockProvisioner::new().exits("b", 42).exits("e", 7);
    let journal = provisioner.journal();

    let outcome = run_with_mock(&definition, provisioner).await.unwrap();

    assert_stage_failed(&outcome, "one", 42, 1);
    assert_eq!(journal.invoked(), ["a", "b"]);
    assert_eq!(outcome.count(|s| *s == StageStatus::Skipped), 2);
    assert_eq!(outcome.failed_stage().map(|r| r.stage_name.as_str()), Some("one"));
    // Skipped stages carry no command records
    assert!(outcome.results()[1].commands.is_empty());
    assert!(outcome.results()[2].commands.is_empty());
}

#[tokio::test]
async fn test_at_most_one_failed_stage_and_it_is_the_first_failure() {
    // Every stage has a failing command; only the first one may be reported
    let definition = definition(&[("a", &["fail-a"]), ("b", &["fail-b"]), ("c", &["fail-c"])]);
    let provisioner = MockProvisioner::new()
        .exits("fail-a", 2)
        .exits("fail-b", 3)
        .exits("fail-c", 4);

    let outcome = run_with_mock(&definition, provisioner).await.unwrap();

    let failed = outcome
        .results()
        .iter()
        .filter(|r| matches!(r.status, StageStatus::Failed { .. }))
        .count();
    assert_eq!(failed, 1);
    assert_stage_failed(&outcome, "a", 2, 0);
    assert_eq!(outcome.count(|s| *s == StageStatus::Skipped), 2);
}

#[tokio::test]
async fn test_negative_exit_code_counts_as_failure() {
    let definition = definition(&[("build", &["killed"]), ("test", &["t"])]);
    let provisioner = MockProvisioner::new().exits("killed", -1);

    let outcome = run_with_mock(&definition, provisioner).await.unwrap();

    assert_pipeline_failed(&outcome);
    assert_stage_failed(&outcome, "build", -1, 0);
}
