//! Sequential runner - provisions one context and runs every stage in order

use crate::{
    core::{
        CommandRecord, OutcomeStatus, PipelineDefinition, PipelineError, PipelineOutcome, Stage,
        StageResult,
    },
    environment::{ExecutionContext, Provisioner, UNKNOWN_EXIT_CODE},
    execution::CancellationFlag,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Events that can occur during a pipeline run
#[derive(Debug, Clone)]
pub enum RunEvent {
    PipelineStarted {
        run_id: Uuid,
        pipeline_name: String,
        stage_count: usize,
    },
    EnvironmentReady {
        context_id: String,
    },
    StageStarted {
        stage_index: usize,
        stage_name: String,
        command_count: usize,
    },
    CommandStarted {
        stage_name: String,
        command_index: usize,
        run: String,
    },
    CommandFinished {
        stage_name: String,
        record: CommandRecord,
    },
    StageFinished {
        result: StageResult,
    },
    Cancelled {
        stage_name: String,
        command_index: usize,
    },
    PipelineFinished {
        run_id: Uuid,
        overall: OutcomeStatus,
    },
}

/// Exit code of a shell whose foreground command was stopped by SIGINT
const INTERRUPT_EXIT_CODE: i32 = 130;

/// How long a failed command waits for a pending interrupt to raise the flag
const INTERRUPT_GRACE: Duration = Duration::from_millis(100);

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(RunEvent) + Send + Sync>;

/// How a single stage ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StageEnd {
    Completed,
    Failed,
    Cancelled,
}

/// Runs a pipeline definition inside contexts handed out by `P`
///
/// Stages run strictly in declaration order and commands strictly in order
/// within a stage. The first non-zero exit stops the run; everything after it
/// is reported as skipped. The context is released exactly once per run that
/// acquired one.
pub struct Runner<P> {
    provisioner: P,
    cancellation: CancellationFlag,
    event_handlers: Arc<Mutex<Vec<EventHandler>>>,
}

impl<P: Provisioner> Runner<P> {
    pub fn new(provisioner: P) -> Self {
        Self {
            provisioner,
            cancellation: CancellationFlag::new(),
            event_handlers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Use an externally controlled cancellation flag
    pub fn with_cancellation(mut self, cancellation: CancellationFlag) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn provisioner(&self) -> &P {
        &self.provisioner
    }

    /// Add an event handler
    pub async fn add_event_handler<F>(&self, handler: F)
    where
        F: Fn(RunEvent) + Send + Sync + 'static,
    {
        self.event_handlers.lock().await.push(Arc::new(handler));
    }

    /// Emit an event to all handlers
    async fn emit_event(&self, event: RunEvent) {
        let handlers = self.event_handlers.lock().await;
        for handler in handlers.iter() {
            handler(event.clone());
        }
    }

    /// Run the whole pipeline
    ///
    /// Returns `Err` only when no stage could run because provisioning
    /// failed. Stage failures and cancellation come back as an outcome.
    pub async fn run(
        &self,
        definition: &PipelineDefinition,
    ) -> Result<PipelineOutcome, PipelineError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let stages = definition.stages();

        info!("Starting pipeline {} ({})", definition.name(), run_id);
        self.emit_event(RunEvent::PipelineStarted {
            run_id,
            pipeline_name: definition.name().to_string(),
            stage_count: stages.len(),
        })
        .await;

        let context = match self.provisioner.acquire().await {
            Ok(context) => context,
            Err(e) => {
                error!("Failed to provision execution environment: {}", e);
                return Err(e.into());
            }
        };

        self.emit_event(RunEvent::EnvironmentReady {
            context_id: context.id().to_string(),
        })
        .await;

        let (results, overall) = self.run_stages(&context, definition).await;

        debug!("Releasing context {}", context.id());
        self.provisioner.release(context).await;

        info!("Pipeline {} finished: {:?}", definition.name(), overall);
        self.emit_event(RunEvent::PipelineFinished { run_id, overall }).await;

        Ok(PipelineOutcome::new(
            run_id,
            definition.name().to_string(),
            results,
            overall,
            started_at,
        ))
    }

    async fn run_stages(
        &self,
        context: &P::Context,
        definition: &PipelineDefinition,
    ) -> (Vec<StageResult>, OutcomeStatus) {
        let stages = definition.stages();
        let mut results = Vec::with_capacity(stages.len());
        let mut overall = OutcomeStatus::Succeeded;

        for (stage_index, stage) in stages.iter().enumerate() {
            let result = if overall != OutcomeStatus::Succeeded {
                debug!("Skipping stage {}", stage.name);
                StageResult::skipped(stage.name.clone())
            } else if self.cancellation.is_cancelled() {
                // Never announce a stage that will not run
                warn!("Cancelled before stage {}", stage.name);
                self.emit_event(RunEvent::Cancelled {
                    stage_name: stage.name.clone(),
                    command_index: 0,
                })
                .await;
                overall = OutcomeStatus::Cancelled;
                StageResult::skipped(stage.name.clone())
            } else {
                info!("Stage {}/{}: {}", stage_index + 1, stages.len(), stage.name);
                self.emit_event(RunEvent::StageStarted {
                    stage_index,
                    stage_name: stage.name.clone(),
                    command_count: stage.commands.len(),
                })
                .await;

                let (result, end) = self.run_stage(context, stage, definition.env()).await;
                overall = match end {
                    StageEnd::Completed => OutcomeStatus::Succeeded,
                    StageEnd::Failed => OutcomeStatus::Failed,
                    StageEnd::Cancelled => OutcomeStatus::Cancelled,
                };
                result
            };

            self.emit_event(RunEvent::StageFinished {
                result: result.clone(),
            })
            .await;
            results.push(result);
        }

        (results, overall)
    }

    /// Whether a failed command was most likely stopped by cancellation
    ///
    /// A terminal Ctrl-C reaches the child and the signal task at the same
    /// time, so an exit that looks like an interrupt may be observed before
    /// the flag is set. Give the flag a short grace period in that case.
    async fn interrupted(&self, exit_code: i32) -> bool {
        if self.cancellation.is_cancelled() {
            return true;
        }
        if exit_code != INTERRUPT_EXIT_CODE && exit_code != UNKNOWN_EXIT_CODE {
            return false;
        }
        tokio::time::sleep(INTERRUPT_GRACE).await;
        self.cancellation.is_cancelled()
    }

    async fn run_stage(
        &self,
        context: &P::Context,
        stage: &Stage,
        env: &HashMap<String, String>,
    ) -> (StageResult, StageEnd) {
        let mut records = Vec::with_capacity(stage.commands.len());

        for (index, command) in stage.commands.iter().enumerate() {
            if self.cancellation.is_cancelled() {
                warn!("Cancelled before {} command {}", stage.name, index);
                self.emit_event(RunEvent::Cancelled {
                    stage_name: stage.name.clone(),
                    command_index: index,
                })
                .await;

                let mut result = StageResult::skipped(stage.name.clone());
                result.commands = records;
                return (result, StageEnd::Cancelled);
            }

            self.emit_event(RunEvent::CommandStarted {
                stage_name: stage.name.clone(),
                command_index: index,
                run: command.run.clone(),
            })
            .await;

            let output = context.execute(command, env).await;
            let record = CommandRecord {
                index,
                run: command.run.clone(),
                exit_code: output.exit_code,
                duration_ms: output.duration.as_millis() as u64,
                timed_out: output.timed_out,
                stdout: output.stdout,
                stderr: output.stderr,
            };

            self.emit_event(RunEvent::CommandFinished {
                stage_name: stage.name.clone(),
                record: record.clone(),
            })
            .await;

            let exit_code = record.exit_code;
            records.push(record);

            if exit_code != 0 {
                error!(
                    "Stage {} command {} exited with {}: {}",
                    stage.name, index, exit_code, command.run
                );
                // An interrupt usually kills the running command too
                let end = if self.interrupted(exit_code).await {
                    StageEnd::Cancelled
                } else {
                    StageEnd::Failed
                };
                return (
                    StageResult::failed(stage.name.clone(), exit_code, index, records),
                    end,
                );
            }

            debug!("Stage {} command {} succeeded", stage.name, index);
        }

        (StageResult::succeeded(stage.name.clone(), records), StageEnd::Completed)
    }
}
