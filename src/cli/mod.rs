//! Command-line interface

pub mod commands;
pub mod output;

use crate::core::{ConfigurationError, OutcomeStatus, PipelineError, ProvisioningError};
use clap::{Parser, Subcommand};
use commands::{InitCommand, RunCommand, ValidateCommand};
use std::ffi::OsString;

/// Process exit codes, one per outcome category
pub mod exit {
    pub const SUCCESS: u8 = 0;
    pub const STAGE_FAILURE: u8 = 1;
    pub const CONFIGURATION: u8 = 2;
    pub const PROVISIONING: u8 = 3;
    pub const INTERNAL: u8 = 4;
    pub const CANCELLED: u8 = 130;
}

/// Sequential CI pipeline runner
#[derive(Debug, Parser, Clone)]
#[command(name = "stageline")]
#[command(version)]
#[command(about = "Run CI stages in order inside one provisioned environment", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run a pipeline
    Run(RunCommand),

    /// Validate a pipeline configuration
    Validate(ValidateCommand),

    /// Write a starter pipeline for a Rust project
    Init(InitCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}

/// Exit code for a run that produced an outcome
pub fn outcome_exit_code(status: OutcomeStatus) -> u8 {
    match status {
        OutcomeStatus::Succeeded => exit::SUCCESS,
        OutcomeStatus::Failed => exit::STAGE_FAILURE,
        OutcomeStatus::Cancelled => exit::CANCELLED,
    }
}

/// Exit code for a run that never produced an outcome
pub fn error_exit_code(err: &anyhow::Error) -> u8 {
    if err.downcast_ref::<ConfigurationError>().is_some() {
        return exit::CONFIGURATION;
    }
    if err.downcast_ref::<ProvisioningError>().is_some() {
        return exit::PROVISIONING;
    }
    match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::Configuration(_)) => exit::CONFIGURATION,
        Some(PipelineError::Provisioning(_)) => exit::PROVISIONING,
        None => exit::INTERNAL,
    }
}
