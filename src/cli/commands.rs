//! CLI command definitions

use clap::Args;

/// Run a pipeline
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Path to pipeline YAML file
    #[arg(short, long)]
    pub file: String,

    /// Environment variable overrides passed to every command (KEY=VALUE)
    #[arg(long, value_parser = parse_key_value)]
    pub env: Vec<(String, String)>,

    /// Run on the host shell even if the file asks for a container
    #[arg(long)]
    pub local: bool,

    /// Print each command's output as it finishes
    #[arg(short, long)]
    pub stream: bool,

    /// Print the outcome as JSON instead of the text summary
    #[arg(long)]
    pub json: bool,

    /// Also write the outcome as JSON to this path
    #[arg(long)]
    pub report: Option<String>,
}

/// Validate a pipeline configuration
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to pipeline YAML file
    #[arg(short, long)]
    pub file: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Write the default Rust CI pipeline
#[derive(Debug, Args, Clone)]
pub struct InitCommand {
    /// Where to write the pipeline file
    #[arg(short, long, default_value = "stageline.yaml")]
    pub output: String,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

/// Parse key=value pairs
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let parts: Vec<&str> = s.splitn(2, '=').collect();
    if parts.len() != 2 || parts[0].is_empty() {
        return Err(format!("Invalid key=value pair: {}", s));
    }
    Ok((parts[0].to_string(), parts[1].to_string()))
}
