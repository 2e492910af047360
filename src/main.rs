use anyhow::{Context, Result};
use indicatif::ProgressBar;
use stageline::cli::commands::{InitCommand, RunCommand, ValidateCommand};
use stageline::cli::output::*;
use stageline::cli::{error_exit_code, exit, outcome_exit_code, Cli, Command};
use stageline::core::config::RUST_CI_TEMPLATE;
use stageline::core::{EnvironmentConfig, PipelineConfig, PipelineDefinition, PipelineOutcome};
use stageline::environment::{DockerConfig, DockerProvisioner, LocalProvisioner, Provisioner};
use stageline::execution::{CancellationFlag, RunEvent, Runner};
use stageline::report::Reporter;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use tracing::error;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::from_args();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("{} {:#}", WARN, e);
    }

    let result = match &cli.command {
        Command::Run(cmd) => run_pipeline(cmd).await,
        Command::Validate(cmd) => validate_pipeline(cmd),
        Command::Init(cmd) => init_pipeline(cmd),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("{} {:#}", CROSS, style(&e).red());
            ExitCode::from(error_exit_code(&e))
        }
    }
}

/// RUST_LOG wins; otherwise --verbose selects debug and the default stays quiet
fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")
}

async fn run_pipeline(cmd: &RunCommand) -> Result<u8> {
    let mut config =
        PipelineConfig::from_file(&cmd.file).context("Failed to load pipeline config")?;
    config
        .apply_env_overrides(&cmd.env)
        .context("Invalid --env override")?;
    let definition = config.to_definition()?;

    if !cmd.json {
        println!("{} Loaded pipeline: {}", INFO, style(definition.name()).bold());
        for (key, value) in &cmd.env {
            println!(
                "{} Variable override: {} = {}",
                INFO,
                style(key).cyan(),
                style(value).dim()
            );
        }
    }

    let cancellation = CancellationFlag::new();
    cancellation.cancel_on_ctrl_c();

    let environment = if cmd.local {
        EnvironmentConfig::Local { root: None }
    } else {
        config.environment.clone()
    };

    let outcome = match environment {
        EnvironmentConfig::Local { root } => {
            let provisioner = LocalProvisioner::new(root.unwrap_or_else(|| ".".to_string()));
            let runner = Runner::new(provisioner).with_cancellation(cancellation);
            execute(runner, &definition, cmd).await?
        }
        EnvironmentConfig::Container {
            image,
            pull,
            workdir,
            mount,
        } => {
            let docker = DockerConfig::new(image)
                .with_pull(pull)
                .with_workdir(workdir)
                .with_mount(mount);
            let runner =
                Runner::new(DockerProvisioner::new(docker)).with_cancellation(cancellation);
            execute(runner, &definition, cmd).await?
        }
    };

    if let Some(path) = &cmd.report {
        Reporter::save_json(&outcome, path)?;
        if !cmd.json {
            println!("{} Report written to {}", INFO, style(path).dim());
        }
    }

    if cmd.json {
        println!("{}", Reporter::to_json(&outcome)?);
    } else {
        println!();
        write_outcome(&outcome, &mut std::io::stdout().lock())
            .context("Failed to print run summary")?;
    }

    Ok(outcome_exit_code(outcome.overall()))
}

async fn execute<P: Provisioner>(
    runner: Runner<P>,
    definition: &PipelineDefinition,
    cmd: &RunCommand,
) -> Result<PipelineOutcome> {
    if !cmd.json {
        let stream = cmd.stream;
        let interactive = console::Term::stdout().is_term();
        let spinner: Arc<Mutex<Option<ProgressBar>>> = Arc::default();

        runner
            .add_event_handler(move |event| {
                let mut current = spinner.lock().unwrap_or_else(|e| e.into_inner());
                if let Some(bar) = current.take() {
                    bar.finish_and_clear();
                }
                if let RunEvent::CommandStarted { run, .. } = &event {
                    if interactive {
                        *current = Some(create_spinner(run.clone()));
                    }
                }
                if let Some(line) = format_run_event(&event, stream) {
                    println!("{}", line);
                }
            })
            .await;
    }

    Ok(runner.run(definition).await?)
}

fn validate_pipeline(cmd: &ValidateCommand) -> Result<u8> {
    println!("{} Validating pipeline...", INFO);

    match PipelineConfig::from_file(&cmd.file) {
        Ok(config) => {
            let definition = config.to_definition()?;
            println!("{} Pipeline configuration is valid!", CHECK);
            println!("  Name: {}", style(definition.name()).bold());
            println!("  Stages: {}", style(definition.stages().len()).cyan());
            println!("  Commands: {}", style(definition.command_count()).cyan());
            for (index, stage) in definition.stages().iter().enumerate() {
                println!(
                    "    {}. {} ({} commands)",
                    index + 1,
                    style(&stage.name).bold(),
                    stage.commands.len()
                );
            }

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(exit::SUCCESS)
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(&e).red());
            Ok(exit::CONFIGURATION)
        }
    }
}

fn init_pipeline(cmd: &InitCommand) -> Result<u8> {
    let path = std::path::Path::new(&cmd.output);
    if path.exists() && !cmd.force {
        println!(
            "{} {} already exists (use --force to overwrite)",
            WARN,
            style(path.display()).bold()
        );
        return Ok(exit::CONFIGURATION);
    }

    std::fs::write(path, RUST_CI_TEMPLATE)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!(
        "{} Wrote Rust CI pipeline to {}",
        CHECK,
        style(path.display()).bold()
    );
    Ok(exit::SUCCESS)
}
