//! Error taxonomy for loading and running pipelines

use thiserror::Error;

/// The pipeline definition is unusable; raised before anything is provisioned
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Pipeline has no stages")]
    NoStages,

    #[error("Stage '{0}' has no commands")]
    EmptyStage(String),

    /// Positions are 0-based, like command indices
    #[error("Stage at index {0} has a blank name")]
    BlankStageName(usize),

    #[error("Stage '{stage}' command {index} is blank")]
    BlankCommand { stage: String, index: usize },

    #[error("Stage '{stage}' command {index} has a zero timeout")]
    ZeroTimeout { stage: String, index: usize },

    #[error("Container environment requires an image")]
    MissingImage,

    #[error("Invalid environment variable name: '{0}'")]
    InvalidVariableName(String),

    #[error("Failed to read pipeline file: {0}")]
    Io(String),

    #[error("Failed to parse pipeline YAML: {0}")]
    Parse(String),
}

/// The execution environment could not be made available
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProvisioningError {
    #[error("Docker is not available: {0}")]
    DockerNotAvailable(String),

    #[error("Failed to pull image {image}: {reason}")]
    PullFailed { image: String, reason: String },

    #[error("Failed to create container: {0}")]
    CreateFailed(String),

    #[error("Failed to start container: {0}")]
    StartFailed(String),

    #[error("Working directory does not exist: {0}")]
    MissingRoot(String),

    #[error("Provisioning failed: {0}")]
    Other(String),
}

/// Errors surfaced by `Runner::run`
///
/// Stage failures and cancellation are not errors: they produce a complete
/// `PipelineOutcome`. Only conditions that prevent any stage from running end
/// up here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Provisioning(#[from] ProvisioningError),
}
