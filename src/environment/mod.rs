//! Execution environments - where pipeline commands actually run
//!
//! The runner only sees the [`Provisioner`] and [`ExecutionContext`] traits.
//! A provisioner hands out one context per run and takes it back by value,
//! so a context cannot be released twice or used after release.

pub mod docker;
pub mod local;

use crate::core::{Command, ProvisioningError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tracing::debug;

pub use docker::{DockerConfig, DockerContext, DockerProvisioner};
pub use local::{LocalContext, LocalProvisioner};

/// Exit code reported for a command killed by its timeout (same as coreutils `timeout`)
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Exit code reported when no real exit code exists (spawn failure, killed by signal)
pub const UNKNOWN_EXIT_CODE: i32 = -1;

/// Result of one command invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Output for a command that never produced an exit code
    pub fn spawn_failure(message: impl Into<String>, duration: Duration) -> Self {
        Self {
            exit_code: UNKNOWN_EXIT_CODE,
            stderr: message.into(),
            duration,
            ..Default::default()
        }
    }
}

/// A provisioned environment that can run commands
#[async_trait]
pub trait ExecutionContext: Send + Sync {
    /// Identifier used in logs (container name, root directory, ...)
    fn id(&self) -> &str;

    /// Run one command to completion
    ///
    /// Never fails: problems launching the command are reported as a
    /// non-zero exit code so the runner treats them like any other failure.
    async fn execute(&self, command: &Command, env: &HashMap<String, String>) -> CommandOutput;
}

/// Creates and tears down execution contexts
#[async_trait]
pub trait Provisioner: Send + Sync {
    type Context: ExecutionContext + 'static;

    /// Provision a fresh context; may block while the environment comes up
    async fn acquire(&self) -> Result<Self::Context, ProvisioningError>;

    /// Tear the context down. Cleanup problems are logged, never returned.
    async fn release(&self, context: Self::Context);
}

/// Run a prepared process, capturing output and enforcing an optional timeout
pub(crate) async fn run_process(
    mut process: tokio::process::Command,
    timeout: Option<Duration>,
) -> CommandOutput {
    process
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let start = Instant::now();
    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, process.output()).await {
            Ok(result) => result,
            Err(_) => {
                debug!("Command timed out after {}s", limit.as_secs());
                return CommandOutput {
                    exit_code: TIMEOUT_EXIT_CODE,
                    stderr: format!("Timed out after {} seconds", limit.as_secs()),
                    duration: start.elapsed(),
                    timed_out: true,
                    ..Default::default()
                };
            }
        },
        None => process.output().await,
    };

    match result {
        Ok(output) => CommandOutput {
            exit_code: output.status.code().unwrap_or(UNKNOWN_EXIT_CODE),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            duration: start.elapsed(),
            timed_out: false,
        },
        Err(e) => CommandOutput::spawn_failure(
            format!("Failed to spawn command: {}", e),
            start.elapsed(),
        ),
    }
}
