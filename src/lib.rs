//! stageline - a sequential CI pipeline runner
//!
//! Runs named stages of shell commands, strictly in order, inside a single
//! provisioned environment (host shell or container) and stops at the first
//! failing command.

pub mod cli;
pub mod core;
pub mod environment;
pub mod execution;
pub mod report;

// Re-export commonly used types
pub use core::{
    Command, ConfigurationError, OutcomeStatus, PipelineConfig, PipelineDefinition, PipelineError,
    PipelineOutcome, ProvisioningError, Stage, StageResult, StageStatus,
};
pub use environment::{CommandOutput, ExecutionContext, Provisioner};
pub use execution::{CancellationFlag, RunEvent, Runner};
pub use report::Reporter;
