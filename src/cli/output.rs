//! CLI output formatting

use crate::{
    core::{OutcomeStatus, PipelineOutcome, StageStatus},
    execution::RunEvent,
    report::Reporter,
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");
pub static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "- ");

/// Spinner shown while a command runs
pub fn create_spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Print the run summary: the reporter's text, then the elapsed time
///
/// The summary lines come straight from [`Reporter::write_to`] so they stay
/// identical between runs with the same results; timing goes on its own line.
pub fn write_outcome<W: Write>(outcome: &PipelineOutcome, sink: &mut W) -> io::Result<()> {
    Reporter::write_to(outcome, sink)?;
    writeln!(sink, "{}", format_elapsed(outcome))?;
    sink.flush()
}

/// Styled timing line shown after the summary
pub fn format_elapsed(outcome: &PipelineOutcome) -> String {
    let icon = match outcome.overall() {
        OutcomeStatus::Succeeded => CHECK,
        OutcomeStatus::Failed => CROSS,
        OutcomeStatus::Cancelled => WARN,
    };
    let elapsed = outcome
        .finished_at()
        .signed_duration_since(outcome.started_at())
        .to_std()
        .unwrap_or_default();
    format!(
        "{}Finished in {}",
        icon,
        style(format_duration(elapsed)).dim()
    )
}

/// Format a run event for display; `None` for events with nothing to show
pub fn format_run_event(event: &RunEvent, stream: bool) -> Option<String> {
    match event {
        RunEvent::PipelineStarted {
            run_id,
            pipeline_name,
            stage_count,
        } => Some(format!(
            "{} Starting pipeline {} ({} stages, {})",
            ROCKET,
            style(pipeline_name).bold(),
            stage_count,
            style(&run_id.to_string()[..8]).dim()
        )),
        RunEvent::EnvironmentReady { context_id } => Some(format!(
            "{} Environment ready: {}",
            INFO,
            style(context_id).dim()
        )),
        RunEvent::StageStarted {
            stage_index,
            stage_name,
            ..
        } => Some(format!(
            "\n{} {} {}",
            SPINNER,
            style(format!("[{}]", stage_index + 1)).dim(),
            style(stage_name).cyan().bold()
        )),
        RunEvent::CommandStarted { .. } => None,
        RunEvent::CommandFinished { record, .. } => {
            let icon = if record.succeeded() { CHECK } else { CROSS };
            let mut line = format!(
                "  {}{} {}",
                icon,
                record.run,
                style(format!("({}ms)", record.duration_ms)).dim()
            );
            if record.timed_out {
                line.push_str(&format!(" {}", style("timed out").red()));
            }
            // Always show what went wrong; show everything when streaming
            let max_lines = if stream {
                usize::MAX
            } else if record.succeeded() {
                0
            } else {
                20
            };
            for text in [&record.stdout, &record.stderr] {
                if max_lines > 0 && !text.trim().is_empty() {
                    line.push('\n');
                    line.push_str(&indent(&format_output(text.trim_end(), max_lines), "    "));
                }
            }
            Some(line)
        }
        RunEvent::StageFinished { result } => match result.status {
            StageStatus::Skipped => Some(format!(
                "{} {} {}",
                SKIP,
                style(&result.stage_name).dim(),
                style("skipped").dim()
            )),
            _ => None,
        },
        RunEvent::Cancelled {
            stage_name,
            command_index,
        } => Some(format!(
            "{} Cancelled before {} command {}",
            WARN,
            style(stage_name).yellow(),
            command_index
        )),
        RunEvent::PipelineFinished { .. } => None,
    }
}

/// Format command output with truncation (keeps the tail, where errors are)
pub fn format_output(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output.lines().collect();

    if lines.len() <= max_lines {
        output.to_string()
    } else {
        let kept = lines[lines.len() - max_lines..].join("\n");
        format!(
            "{}... ({} earlier lines)\n{}",
            style("[truncated]").dim(),
            lines.len() - max_lines,
            kept
        )
    }
}

fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| format!("{}{}", prefix, line))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{}.{}s", secs, duration.subsec_millis() / 100)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
