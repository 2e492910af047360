//! Test utility functions for stageline scenarios

use async_trait::async_trait;
use stageline::core::{
    Command, OutcomeStatus, PipelineDefinition, PipelineError, PipelineOutcome, ProvisioningError,
    Stage, StageStatus,
};
use stageline::environment::{CommandOutput, ExecutionContext, Provisioner};
use stageline::execution::{CancellationFlag, Runner};

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Everything the mock environment observed during a run
#[derive(Debug, Default)]
pub struct Journal {
    pub acquires: AtomicUsize,
    pub releases: AtomicUsize,
    pub invoked: Mutex<Vec<String>>,
}

impl Journal {
    pub fn acquires(&self) -> usize {
        self.acquires.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn invoked(&self) -> Vec<String> {
        self.invoked.lock().unwrap().clone()
    }
}

/// Mock provisioner whose commands exit with predefined codes
///
/// Any command line not in the script exits 0.
#[derive(Clone, Default)]
pub struct MockProvisioner {
    exit_codes: Arc<HashMap<String, i32>>,
    fail_acquire: bool,
    cancel_after: Option<(usize, CancellationFlag)>,
    journal: Arc<Journal>,
}

impl MockProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the exit code of a command line
    pub fn exits(mut self, run: &str, code: i32) -> Self {
        Arc::make_mut(&mut self.exit_codes).insert(run.to_string(), code);
        self
    }

    pub fn failing_acquire(mut self) -> Self {
        self.fail_acquire = true;
        self
    }

    /// Raise `flag` as soon as `count` commands have finished
    pub fn cancel_after(mut self, count: usize, flag: CancellationFlag) -> Self {
        self.cancel_after = Some((count, flag));
        self
    }

    pub fn journal(&self) -> Arc<Journal> {
        self.journal.clone()
    }
}

pub struct MockContext {
    provisioner: MockProvisioner,
}

#[async_trait]
impl ExecutionContext for MockContext {
    fn id(&self) -> &str {
        "mock"
    }

    async fn execute(&self, command: &Command, _env: &HashMap<String, String>) -> CommandOutput {
        let journal = &self.provisioner.journal;
        let finished = {
            let mut invoked = journal.invoked.lock().unwrap();
            invoked.push(command.run.clone());
            invoked.len()
        };

        if let Some((count, flag)) = &self.provisioner.cancel_after {
            if finished >= *count {
                flag.cancel();
            }
        }

        CommandOutput {
            exit_code: self
                .provisioner
                .exit_codes
                .get(&command.run)
                .copied()
                .unwrap_or(0),
            stdout: format!("ran {}", command.run),
            ..Default::default()
        }
    }
}

#[async_trait]
impl Provisioner for MockProvisioner {
    type Context = MockContext;

    async fn acquire(&self) -> Result<MockContext, ProvisioningError> {
        self.journal.acquires.fetch_add(1, Ordering::SeqCst);
        if self.fail_acquire {
            return Err(ProvisioningError::StartFailed(
                "image pulled but container exited".to_string(),
            ));
        }
        Ok(MockContext {
            provisioner: self.clone(),
        })
    }

    async fn release(&self, _context: MockContext) {
        self.journal.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Build a definition from `(stage, [commands])` pairs
pub fn definition(stages: &[(&str, &[&str])]) -> PipelineDefinition {
    PipelineDefinition::new(
        "scenario",
        stages
            .iter()
            .map(|(name, lines)| Stage::shell(*name, lines.iter().copied()))
            .collect(),
    )
    .unwrap()
}

/// Run a definition against a mock provisioner
pub async fn run_with_mock(
    definition: &PipelineDefinition,
    provisioner: MockProvisioner,
) -> Result<PipelineOutcome, PipelineError> {
    Runner::new(provisioner).run(definition).await
}

/// Run with a cancellation flag wired into both the runner and the mock
pub async fn run_with_cancellation(
    definition: &PipelineDefinition,
    provisioner: MockProvisioner,
    flag: CancellationFlag,
) -> PipelineOutcome {
    Runner::new(provisioner)
        .with_cancellation(flag)
        .run(definition)
        .await
        .unwrap()
}

// Assertion helpers

pub fn assert_pipeline_succeeded(outcome: &PipelineOutcome) {
    assert_eq!(
        outcome.overall(),
        OutcomeStatus::Succeeded,
        "Expected pipeline to succeed, got {:?}",
        outcome.statuses()
    );
}

pub fn assert_pipeline_failed(outcome: &PipelineOutcome) {
    assert_eq!(
        outcome.overall(),
        OutcomeStatus::Failed,
        "Expected pipeline to fail, got {:?}",
        outcome.statuses()
    );
}

pub fn assert_stage_failed(outcome: &PipelineOutcome, stage: &str, exit_code: i32, index: usize) {
    let result = outcome
        .results()
        .iter()
        .find(|r| r.stage_name == stage)
        .unwrap_or_else(|| panic!("Stage '{}' not in outcome", stage));
    assert_eq!(
        result.status,
        StageStatus::Failed {
            exit_code,
            command_index: index
        },
        "Stage '{}' status mismatch",
        stage
    );
}

pub fn assert_statuses(outcome: &PipelineOutcome, expected: &[StageStatus]) {
    assert_eq!(outcome.statuses(), expected, "Stage statuses mismatch");
}

pub fn assert_released_once(journal: &Journal) {
    assert_eq!(journal.acquires(), 1, "Expected exactly one acquire");
    assert_eq!(journal.releases(), 1, "Expected exactly one release");
}
