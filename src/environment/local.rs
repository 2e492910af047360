//! Host shell environment - commands run as `sh -c` under a root directory

use crate::core::{Command, ProvisioningError};
use crate::environment::{run_process, CommandOutput, ExecutionContext, Provisioner};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Provisions contexts rooted at a directory on the host
#[derive(Debug, Clone)]
pub struct LocalProvisioner {
    root: PathBuf,
}

impl LocalProvisioner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// A host directory plus the shell used to run commands in it
#[derive(Debug)]
pub struct LocalContext {
    root: PathBuf,
    id: String,
}

impl LocalContext {
    fn resolve_dir(&self, command: &Command) -> PathBuf {
        match &command.working_dir {
            Some(dir) => self.root.join(dir),
            None => self.root.clone(),
        }
    }
}

#[async_trait]
impl Provisioner for LocalProvisioner {
    type Context = LocalContext;

    async fn acquire(&self) -> Result<LocalContext, ProvisioningError> {
        let root = tokio::fs::canonicalize(&self.root).await.map_err(|e| {
            ProvisioningError::MissingRoot(format!("{}: {}", self.root.display(), e))
        })?;

        if !root.is_dir() {
            return Err(ProvisioningError::MissingRoot(root.display().to_string()));
        }

        debug!("Local context ready at {}", root.display());
        Ok(LocalContext {
            id: root.display().to_string(),
            root,
        })
    }

    async fn release(&self, context: LocalContext) {
        debug!("Released local context {}", context.id);
    }
}

#[async_trait]
impl ExecutionContext for LocalContext {
    fn id(&self) -> &str {
        &self.id
    }

    async fn execute(&self, command: &Command, env: &HashMap<String, String>) -> CommandOutput {
        let dir = self.resolve_dir(command);
        debug!("Running `{}` in {}", command.run, dir.display());

        let mut process = tokio::process::Command::new("sh");
        process
            .arg("-c")
            .arg(&command.run)
            .current_dir(&dir)
            .envs(env);

        run_process(process, command.timeout()).await
    }
}
