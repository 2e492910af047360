//! Pipeline domain model

use crate::core::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::warn;

/// A single shell line run inside the execution context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Shell line, passed verbatim to `sh -c`
    pub run: String,

    /// Directory relative to the context root (None = the root itself)
    pub working_dir: Option<String>,

    /// Per-command timeout
    pub timeout_secs: Option<u64>,
}

impl Command {
    pub fn new(run: impl Into<String>) -> Self {
        Self {
            run: run.into(),
            working_dir: None,
            timeout_secs: None,
        }
    }

    pub fn in_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// A named, ordered group of commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    pub commands: Vec<Command>,
}

impl Stage {
    pub fn new(name: impl Into<String>, commands: Vec<Command>) -> Self {
        Self {
            name: name.into(),
            commands,
        }
    }

    /// Shorthand for a stage made only of plain shell lines
    pub fn shell<I, S>(name: impl Into<String>, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(name, lines.into_iter().map(Command::new).collect())
    }
}

/// An immutable, validated, ordered list of stages
///
/// The only way to obtain one is through [`PipelineDefinition::new`] (or the
/// config loader, which calls it), so every instance is non-empty and every
/// stage has at least one command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineDefinition {
    name: String,
    stages: Vec<Stage>,
    env: HashMap<String, String>,
}

impl PipelineDefinition {
    /// Build a definition, rejecting empty pipelines and empty stages
    pub fn new(name: impl Into<String>, stages: Vec<Stage>) -> Result<Self, ConfigurationError> {
        Self::check_stages(&stages)?;
        Self::warn_duplicate_names(&stages);

        Ok(Self {
            name: name.into(),
            stages,
            env: HashMap::new(),
        })
    }

    /// Attach variables that are passed through to every command
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn env(&self) -> &HashMap<String, String> {
        &self.env
    }

    pub fn command_count(&self) -> usize {
        self.stages.iter().map(|s| s.commands.len()).sum()
    }

    /// Structural rules shared by every way of building a definition
    pub(crate) fn check_stages(stages: &[Stage]) -> Result<(), ConfigurationError> {
        if stages.is_empty() {
            return Err(ConfigurationError::NoStages);
        }

        for (index, stage) in stages.iter().enumerate() {
            if stage.name.trim().is_empty() {
                return Err(ConfigurationError::BlankStageName(index));
            }
            if stage.commands.is_empty() {
                return Err(ConfigurationError::EmptyStage(stage.name.clone()));
            }
            for (index, command) in stage.commands.iter().enumerate() {
                if command.run.trim().is_empty() {
                    return Err(ConfigurationError::BlankCommand {
                        stage: stage.name.clone(),
                        index,
                    });
                }
                if command.timeout_secs == Some(0) {
                    return Err(ConfigurationError::ZeroTimeout {
                        stage: stage.name.clone(),
                        index,
                    });
                }
            }
        }

        Ok(())
    }

    // Allowed, but the report gets ambiguous
    fn warn_duplicate_names(stages: &[Stage]) {
        let mut seen = HashSet::new();
        for stage in stages {
            if !seen.insert(stage.name.as_str()) {
                warn!("Duplicate stage name: {}", stage.name);
            }
        }
    }
}
