//! Scout command line
//!
//! Loads a configuration directory and lists, checks or runs its sequences.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use scout_config::{ScoutConfig, DEFAULT_CONFIG_FILE};
use scout_sequence::SequenceExecutor;

mod dry_run;

use dry_run::DryRunLeafActions;

#[derive(Parser)]
#[command(name = "scout")]
#[command(about = "Run desktop game automation sequences")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(long, global = true, default_value = ".")]
    config_dir: PathBuf,

    /// Root file inside the configuration directory
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    file: PathBuf,

    /// Log filter, e.g. `debug` or `scout_sequence=trace` (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the configured sequences
    List,

    /// Validate every sequence and report problems
    Check,

    /// Run a sequence
    Run {
        /// Sequence name
        sequence: String,

        /// Simulate instead of executing
        #[arg(long)]
        simulate: bool,

        /// Restart the sequence after every successful pass
        #[arg(long = "loop")]
        loop_enabled: bool,
    },
}

fn init_tracing(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level)
            .with_context(|| format!("invalid log level '{}'", level))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref())?;

    let config = ScoutConfig::load(&cli.config_dir, &cli.file).with_context(|| {
        format!(
            "failed to load {}",
            cli.config_dir.join(&cli.file).display()
        )
    })?;

    match cli.command {
        Commands::List => cmd_list(&config),
        Commands::Check => cmd_check(&config),
        Commands::Run {
            sequence,
            simulate,
            loop_enabled,
        } => cmd_run(config, &sequence, simulate, loop_enabled).await,
    }
}

fn cmd_list(config: &ScoutConfig) -> Result<()> {
    if config.library.is_empty() {
        println!("No sequences in {}", config.source.display());
        return Ok(());
    }

    for sequence in config.library.iter() {
        match &sequence.description {
            Some(description) => println!(
                "{} ({} actions): {}",
                sequence.name,
                sequence.node_count(),
                description
            ),
            None => println!("{} ({} actions)", sequence.name, sequence.node_count()),
        }
    }
    Ok(())
}

fn cmd_check(config: &ScoutConfig) -> Result<()> {
    let issues = config.library.check();
    for issue in &issues {
        println!("{}", issue);
    }

    if !issues.is_empty() {
        bail!("{} problem(s) found", issues.len());
    }
    println!("{} sequence(s) OK", config.library.len());
    Ok(())
}

async fn cmd_run(
    config: ScoutConfig,
    name: &str,
    simulate: bool,
    loop_enabled: bool,
) -> Result<()> {
    if !config.library.contains(name) {
        bail!("unknown sequence '{}'", name);
    }
    for issue in config.library.check() {
        warn!("{}", issue);
    }

    let simulate = simulate || config.settings.simulate;
    let mut ctx = config
        .settings
        .context()
        .with_loop(loop_enabled || config.settings.loop_enabled)
        .with_log_sink(|line: &str| println!("{}", line));

    let control = ctx.control().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping run");
            control.stop();
        }
    });

    let executor =
        SequenceExecutor::new(Arc::new(DryRunLeafActions)).with_library(config.library);

    info!(sequence = name, simulate, "Running sequence");
    if executor.run_sequence(name, &mut ctx, simulate).await {
        Ok(())
    } else {
        bail!("sequence '{}' failed: {}", name, ctx.last_message)
    }
}
