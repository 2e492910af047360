//! Pipeline configuration from YAML

use crate::core::{
    error::ConfigurationError,
    pipeline::{Command, PipelineDefinition, Stage},
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

/// Top-level pipeline configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name
    pub name: String,

    /// Where commands run
    #[serde(default)]
    pub environment: EnvironmentConfig,

    /// Variables passed through to every command
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Stages, in execution order
    #[serde(default)]
    pub stages: Vec<StageConfig>,
}

/// Stage configuration as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    pub name: String,

    #[serde(default)]
    pub commands: Vec<CommandConfig>,
}

/// A command is either a bare shell line or a mapping with options
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum CommandConfig {
    Line(String),
    Detailed {
        run: String,
        #[serde(default)]
        working_dir: Option<String>,
        #[serde(default)]
        timeout_secs: Option<u64>,
    },
}

impl CommandConfig {
    fn to_command(&self) -> Command {
        match self {
            CommandConfig::Line(line) => Command::new(line.clone()),
            CommandConfig::Detailed {
                run,
                working_dir,
                timeout_secs,
            } => Command {
                run: run.clone(),
                working_dir: working_dir.clone(),
                timeout_secs: *timeout_secs,
            },
        }
    }
}

/// Execution environment specifier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EnvironmentConfig {
    /// Run commands on the host through `sh -c`
    Local {
        /// Root directory (default: current directory)
        #[serde(default)]
        root: Option<String>,
    },
    /// Run commands inside a throwaway container
    Container {
        #[serde(default)]
        image: String,

        #[serde(default)]
        pull: PullPolicy,

        /// Mount point inside the container
        #[serde(default = "default_workdir")]
        workdir: String,

        /// Host directory mounted at `workdir`
        #[serde(default = "default_mount")]
        mount: String,
    },
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        EnvironmentConfig::Local { root: None }
    }
}

fn default_workdir() -> String {
    "/workspace".to_string()
}

fn default_mount() -> String {
    ".".to_string()
}

/// When to pull the container image
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PullPolicy {
    Always,
    #[default]
    IfNotPresent,
    Never,
}

fn variable_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex"))
}

impl PipelineConfig {
    /// Load pipeline configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml(&content)
    }

    /// Parse pipeline configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigurationError> {
        let config: PipelineConfig =
            serde_yaml::from_str(yaml).map_err(|e| ConfigurationError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the pipeline configuration
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if let EnvironmentConfig::Container { image, .. } = &self.environment {
            if image.trim().is_empty() {
                return Err(ConfigurationError::MissingImage);
            }
        }

        for key in self.env.keys() {
            if !variable_name_pattern().is_match(key) {
                return Err(ConfigurationError::InvalidVariableName(key.clone()));
            }
        }

        // Structural rules (non-empty, no blank commands) live with the definition
        PipelineDefinition::check_stages(&self.build_stages())
    }

    /// Merge `KEY=VALUE` overrides from the command line
    pub fn apply_env_overrides(
        &mut self,
        overrides: &[(String, String)],
    ) -> Result<(), ConfigurationError> {
        for (key, value) in overrides {
            if !variable_name_pattern().is_match(key) {
                return Err(ConfigurationError::InvalidVariableName(key.clone()));
            }
            self.env.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    /// Convert config to the immutable definition the runner consumes
    pub fn to_definition(&self) -> Result<PipelineDefinition, ConfigurationError> {
        let definition = PipelineDefinition::new(self.name.clone(), self.build_stages())?;
        Ok(definition.with_env(self.env.clone()))
    }

    fn build_stages(&self) -> Vec<Stage> {
        self.stages
            .iter()
            .map(|stage| {
                Stage::new(
                    stage.name.clone(),
                    stage.commands.iter().map(CommandConfig::to_command).collect(),
                )
            })
            .collect()
    }
}

/// The CI pipeline for a Rust project: build, test, lint, format check
pub const RUST_CI_TEMPLATE: &str = r#"name: "rust-ci"

environment:
  type: container
  image: "rust:latest"
  pull: if-not-present

env:
  CARGO_TERM_COLOR: always

stages:
  - name: build
    commands:
      - cargo build --verbose

  - name: test
    commands:
      - cargo test --verbose

  - name: lint
    commands:
      - rustup component add clippy
      - cargo clippy -- -D warnings

  - name: format
    commands:
      - rustup component add rustfmt
      - cargo fmt -- --check
"#;
