//! Core domain models for stageline

pub mod config;
pub mod error;
pub mod pipeline;
pub mod state;

pub use config::{EnvironmentConfig, PipelineConfig, PullPolicy};
pub use error::{ConfigurationError, PipelineError, ProvisioningError};
pub use pipeline::{Command, PipelineDefinition, Stage};
pub use state::{CommandRecord, OutcomeStatus, PipelineOutcome, StageResult, StageStatus};
