//! Container environment driven through the `docker` CLI
//!
//! One container per run: created from the configured image with the host
//! directory bind-mounted, kept alive with `tail -f /dev/null`, and every
//! command runs through `docker exec`.

use crate::core::{Command, PullPolicy, ProvisioningError};
use crate::environment::{run_process, CommandOutput, ExecutionContext, Provisioner};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Configuration for container execution
#[derive(Debug, Clone)]
pub struct DockerConfig {
    /// Image reference, e.g. `rust:latest`
    pub image: String,

    pub pull: PullPolicy,

    /// Mount point (and default working directory) inside the container
    pub workdir: String,

    /// Host directory bind-mounted at `workdir`
    pub mount: PathBuf,

    /// Docker executable
    pub docker_bin: String,
}

impl DockerConfig {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            pull: PullPolicy::default(),
            workdir: "/workspace".to_string(),
            mount: PathBuf::from("."),
            docker_bin: "docker".to_string(),
        }
    }

    pub fn with_pull(mut self, pull: PullPolicy) -> Self {
        self.pull = pull;
        self
    }

    pub fn with_workdir(mut self, workdir: impl Into<String>) -> Self {
        self.workdir = workdir.into();
        self
    }

    pub fn with_mount(mut self, mount: impl Into<PathBuf>) -> Self {
        self.mount = mount.into();
        self
    }
}

/// Provisions one container per pipeline run
#[derive(Debug, Clone)]
pub struct DockerProvisioner {
    config: DockerConfig,
}

/// A running container owned by a single pipeline run
#[derive(Debug)]
pub struct DockerContext {
    name: String,
    workdir: String,
    docker_bin: String,
}

impl DockerProvisioner {
    pub fn new(config: DockerConfig) -> Self {
        Self { config }
    }

    fn docker(&self) -> tokio::process::Command {
        tokio::process::Command::new(&self.config.docker_bin)
    }

    async fn docker_output(
        &self,
        args: &[String],
    ) -> Result<std::process::Output, ProvisioningError> {
        self.docker()
            .args(args)
            .output()
            .await
            .map_err(|e| ProvisioningError::DockerNotAvailable(e.to_string()))
    }

    async fn check_available(&self) -> Result<(), ProvisioningError> {
        let output = self
            .docker_output(&[
                "version".to_string(),
                "--format".to_string(),
                "{{.Server.Version}}".to_string(),
            ])
            .await?;

        if !output.status.success() {
            return Err(ProvisioningError::DockerNotAvailable(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(())
    }

    async fn pull_if_needed(&self) -> Result<(), ProvisioningError> {
        let image = &self.config.image;
        let needs_pull = match self.config.pull {
            PullPolicy::Never => false,
            PullPolicy::Always => true,
            PullPolicy::IfNotPresent => {
                let output = self
                    .docker_output(&["image".to_string(), "inspect".to_string(), image.clone()])
                    .await?;
                !output.status.success()
            }
        };

        if !needs_pull {
            return Ok(());
        }

        info!("Pulling image {}", image);
        let output = self
            .docker_output(&["pull".to_string(), image.clone()])
            .await?;

        if !output.status.success() {
            return Err(ProvisioningError::PullFailed {
                image: image.clone(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    fn create_args(&self, name: &str, mount: &std::path::Path) -> Vec<String> {
        vec![
            "create".to_string(),
            "--name".to_string(),
            name.to_string(),
            "-w".to_string(),
            self.config.workdir.clone(),
            "-v".to_string(),
            format!("{}:{}", mount.display(), self.config.workdir),
            self.config.image.clone(),
            "tail".to_string(),
            "-f".to_string(),
            "/dev/null".to_string(),
        ]
    }

    /// Force-remove a container; problems are logged only
    async fn remove(&self, name: &str) {
        match self
            .docker_output(&["rm".to_string(), "-f".to_string(), name.to_string()])
            .await
        {
            Ok(output) if output.status.success() => debug!("Removed container {}", name),
            Ok(output) => warn!(
                "Failed to remove container {}: {}",
                name,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
            Err(e) => warn!("Failed to remove container {}: {}", name, e),
        }
    }
}

#[async_trait]
impl Provisioner for DockerProvisioner {
    type Context = DockerContext;

    async fn acquire(&self) -> Result<DockerContext, ProvisioningError> {
        self.check_available().await?;
        self.pull_if_needed().await?;

        let mount = tokio::fs::canonicalize(&self.config.mount).await.map_err(|e| {
            ProvisioningError::MissingRoot(format!("{}: {}", self.config.mount.display(), e))
        })?;

        let name = format!("stageline-{}", Uuid::new_v4().simple());
        let output = self.docker_output(&self.create_args(&name, &mount)).await?;
        if !output.status.success() {
            return Err(ProvisioningError::CreateFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let output = self
            .docker_output(&["start".to_string(), name.clone()])
            .await;
        let start_error = match output {
            Ok(output) if output.status.success() => None,
            Ok(output) => Some(String::from_utf8_lossy(&output.stderr).trim().to_string()),
            Err(e) => Some(e.to_string()),
        };

        // Created but not started still counts as a provisioning failure
        if let Some(reason) = start_error {
            self.remove(&name).await;
            return Err(ProvisioningError::StartFailed(reason));
        }

        info!("Container {} started from {}", name, self.config.image);
        Ok(DockerContext {
            name,
            workdir: self.config.workdir.clone(),
            docker_bin: self.config.docker_bin.clone(),
        })
    }

    async fn release(&self, context: DockerContext) {
        self.remove(&context.name).await;
    }
}

impl DockerContext {
    fn exec_args(&self, command: &Command, env: &HashMap<String, String>) -> Vec<String> {
        let dir = match &command.working_dir {
            Some(dir) if dir.starts_with('/') => dir.clone(),
            Some(dir) => format!("{}/{}", self.workdir.trim_end_matches('/'), dir),
            None => self.workdir.clone(),
        };

        let mut args = vec!["exec".to_string(), "-w".to_string(), dir];

        let mut keys: Vec<_> = env.keys().collect();
        keys.sort();
        for key in keys {
            args.push("-e".to_string());
            args.push(format!("{}={}", key, env[key]));
        }

        args.push(self.name.clone());
        args.push("sh".to_string());
        args.push("-c".to_string());
        args.push(command.run.clone());
        args
    }
}

#[async_trait]
impl ExecutionContext for DockerContext {
    fn id(&self) -> &str {
        &self.name
    }

    async fn execute(&self, command: &Command, env: &HashMap<String, String>) -> CommandOutput {
        debug!("docker exec in {}: {}", self.name, command.run);

        let mut process = tokio::process::Command::new(&self.docker_bin);
        process.args(self.exec_args(command, env));

        // A timeout kills the docker client; the process inside goes with the container
        run_process(process, command.timeout()).await
    }
}
