//! Run results: per-stage records and the final outcome

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Final status of a single stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageStatus {
    /// Every command exited zero
    Succeeded,
    /// The command at `command_index` exited non-zero; later commands never ran
    Failed { exit_code: i32, command_index: usize },
    /// The stage never completed because the run stopped earlier
    Skipped,
}

impl StageStatus {
    pub fn label(&self) -> &'static str {
        match self {
            StageStatus::Succeeded => "SUCCEEDED",
            StageStatus::Failed { .. } => "FAILED",
            StageStatus::Skipped => "SKIPPED",
        }
    }
}

/// What happened to one command that actually ran
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRecord {
    /// Position within the stage
    pub index: usize,

    /// The shell line as declared
    pub run: String,

    pub exit_code: i32,

    pub duration_ms: u64,

    #[serde(default)]
    pub timed_out: bool,

    #[serde(default)]
    pub stdout: String,

    #[serde(default)]
    pub stderr: String,
}

impl CommandRecord {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Result of a single stage, in declaration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageResult {
    pub stage_name: String,

    #[serde(flatten)]
    pub status: StageStatus,

    /// Commands that ran, in order (empty for skipped stages that never started)
    #[serde(default)]
    pub commands: Vec<CommandRecord>,
}

impl StageResult {
    pub fn succeeded(stage_name: impl Into<String>, commands: Vec<CommandRecord>) -> Self {
        Self {
            stage_name: stage_name.into(),
            status: StageStatus::Succeeded,
            commands,
        }
    }

    pub fn failed(
        stage_name: impl Into<String>,
        exit_code: i32,
        command_index: usize,
        commands: Vec<CommandRecord>,
    ) -> Self {
        Self {
            stage_name: stage_name.into(),
            status: StageStatus::Failed {
                exit_code,
                command_index,
            },
            commands,
        }
    }

    pub fn skipped(stage_name: impl Into<String>) -> Self {
        Self {
            stage_name: stage_name.into(),
            status: StageStatus::Skipped,
            commands: Vec::new(),
        }
    }
}

/// Overall status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Succeeded,
    Failed,
    Cancelled,
}

impl OutcomeStatus {
    pub fn label(&self) -> &'static str {
        match self {
            OutcomeStatus::Succeeded => "SUCCEEDED",
            OutcomeStatus::Failed => "FAILED",
            OutcomeStatus::Cancelled => "CANCELLED",
        }
    }
}

/// Complete record of a run; built once when the run ends
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutcome {
    run_id: Uuid,
    pipeline_name: String,
    results: Vec<StageResult>,
    overall: OutcomeStatus,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

impl PipelineOutcome {
    pub(crate) fn new(
        run_id: Uuid,
        pipeline_name: String,
        results: Vec<StageResult>,
        overall: OutcomeStatus,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            run_id,
            pipeline_name,
            results,
            overall,
            started_at,
            finished_at: Utc::now(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn pipeline_name(&self) -> &str {
        &self.pipeline_name
    }

    pub fn results(&self) -> &[StageResult] {
        &self.results
    }

    pub fn overall(&self) -> OutcomeStatus {
        self.overall
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    pub fn is_success(&self) -> bool {
        self.overall == OutcomeStatus::Succeeded
    }

    /// The stage that stopped the run, if a command failed
    pub fn failed_stage(&self) -> Option<&StageResult> {
        self.results
            .iter()
            .find(|r| matches!(r.status, StageStatus::Failed { .. }))
    }

    pub fn statuses(&self) -> Vec<StageStatus> {
        self.results.iter().map(|r| r.status).collect()
    }

    /// Compare the parts of two outcomes that depend only on command results
    ///
    /// Run id, timestamps, durations and captured output are ignored.
    pub fn same_result_as(&self, other: &PipelineOutcome) -> bool {
        self.overall == other.overall
            && self.results.len() == other.results.len()
            && self
                .results
                .iter()
                .zip(&other.results)
                .all(|(a, b)| a.stage_name == b.stage_name && a.status == b.status)
    }

    pub fn count(&self, predicate: impl Fn(&StageStatus) -> bool) -> usize {
        self.results.iter().filter(|r| predicate(&r.status)).count()
    }
}
