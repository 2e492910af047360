//! Result reporting - plain text summaries and JSON documents of a run

use crate::core::{PipelineOutcome, StageResult, StageStatus};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// Renders a `PipelineOutcome` without touching it
pub struct Reporter;

impl Reporter {
    /// One line per stage in declaration order, then the overall line
    ///
    /// The rendering depends only on stage names and statuses, so two runs
    /// with the same command results render identically.
    pub fn render(outcome: &PipelineOutcome) -> String {
        let mut out = String::new();
        for result in outcome.results() {
            out.push_str(&Self::stage_line(result));
            out.push('\n');
        }
        out.push_str(&format!(
            "pipeline {}: {}\n",
            outcome.pipeline_name(),
            outcome.overall().label()
        ));
        out
    }

    /// Summary line for a single stage
    pub fn stage_line(result: &StageResult) -> String {
        match result.status {
            StageStatus::Failed {
                exit_code,
                command_index,
            } => format!(
                "{}: {} (exit code {} at command {})",
                result.stage_name,
                result.status.label(),
                exit_code,
                command_index
            ),
            _ => format!("{}: {}", result.stage_name, result.status.label()),
        }
    }

    /// Write the text summary to a sink
    pub fn write_to<W: Write>(outcome: &PipelineOutcome, sink: &mut W) -> std::io::Result<()> {
        sink.write_all(Self::render(outcome).as_bytes())?;
        sink.flush()
    }

    /// The outcome as a pretty-printed JSON document
    pub fn to_json(outcome: &PipelineOutcome) -> Result<String> {
        serde_json::to_string_pretty(outcome).context("Failed to serialize pipeline outcome")
    }

    /// Persist the JSON document to a file
    pub fn save_json<P: AsRef<Path>>(outcome: &PipelineOutcome, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = Self::to_json(outcome)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))
    }
}
