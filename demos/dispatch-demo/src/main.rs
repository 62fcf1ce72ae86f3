//! Command-line front end for hal-dispatch over the in-memory service.
//!
//! ```text
//! dispatch-demo save-account --token demo
//! dispatch-demo backends
//! dispatch-demo run --items 250 --shots 1000
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

use hal_dispatch::memory::Circuit;
use hal_dispatch::{
    BackendChoice, CredentialStore, Credentials, DispatchConfig, Dispatcher, ResultFormat,
    ResultWriter,
};

mod chooser;
mod service;

use chooser::TerminalChooser;

/// Dispatch batches of circuits to a backend and collect their results
#[derive(Parser)]
#[command(name = "dispatch-demo")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// JSON config file
    #[arg(long, global = true, env = "HAL_DISPATCH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List backends visible to the saved account
    Backends,

    /// Save an account token for later runs
    SaveAccount {
        /// Account token
        #[arg(long)]
        token: String,

        /// Replace an existing saved token
        #[arg(long)]
        overwrite: bool,
    },

    /// Submit a batch and write its results
    Run {
        /// Number of circuits in the batch
        #[arg(short, long, default_value = "10")]
        items: usize,

        /// Shots per circuit (backend default if omitted)
        #[arg(short, long)]
        shots: Option<u32>,

        /// Backend to use instead of prompting
        #[arg(short, long)]
        backend: Option<String>,

        /// Offer simulators in the prompt
        #[arg(long)]
        show_simulated: bool,

        /// Directory for result files
        #[arg(long)]
        results_dir: Option<PathBuf>,

        /// Write one JSON value per line
        #[arg(long)]
        lines: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match load_config(cli.config.as_deref()) {
        Ok(config) => match cli.command {
            Commands::Backends => backends(config).await,
            Commands::SaveAccount { token, overwrite } => save_account(&config, &token, overwrite),
            Commands::Run {
                items,
                shots,
                backend,
                show_simulated,
                results_dir,
                lines,
            } => {
                let mut config = config;
                if backend.is_some() {
                    config.backend = backend;
                }
                if show_simulated {
                    config.hide_simulated = false;
                }
                if let Some(dir) = results_dir {
                    config.results_dir = dir;
                }
                let format = if lines {
                    ResultFormat::Lines
                } else {
                    ResultFormat::Array
                };
                run(config, items, shots, format).await
            }
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<DispatchConfig> {
    let base = match path {
        Some(path) => DispatchConfig::from_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => DispatchConfig::default(),
    };
    Ok(base.with_overrides(|key| std::env::var(key).ok())?)
}

fn credential_store(config: &DispatchConfig) -> anyhow::Result<CredentialStore> {
    match &config.credentials_path {
        Some(path) => Ok(CredentialStore::new(path)),
        None => Ok(CredentialStore::at_default_location()?),
    }
}

fn dispatcher(config: DispatchConfig) -> anyhow::Result<Dispatcher<Circuit>> {
    let store = credential_store(&config)?;
    let authenticator = Arc::new(service::demo_service(store));
    Ok(Dispatcher::new(
        authenticator,
        config,
        Arc::new(TerminalChooser::stdout()),
    ))
}

async fn backends(config: DispatchConfig) -> anyhow::Result<()> {
    let dispatcher = dispatcher(config)?;
    let directory = dispatcher.list_backends().await?;

    println!("\n{} Available backends:\n", style("hal-dispatch").cyan().bold());
    for descriptor in &directory {
        let marker = if descriptor.is_simulated() {
            style("○").yellow()
        } else {
            style("●").green()
        };
        println!(
            "  {} {} ({} queued)",
            marker,
            style(&descriptor.name).bold(),
            descriptor.pending_jobs
        );
        for line in descriptor.capability_summary.lines() {
            println!("    {line}");
        }
        println!();
    }
    Ok(())
}

fn save_account(config: &DispatchConfig, token: &str, overwrite: bool) -> anyhow::Result<()> {
    let store = credential_store(config)?;
    store.save(&Credentials::new(token), overwrite)?;
    println!(
        "{} Account saved to {}",
        style("✓").green().bold(),
        style(store.path().display()).yellow()
    );
    Ok(())
}

async fn run(
    config: DispatchConfig,
    items: usize,
    shots: Option<u32>,
    format: ResultFormat,
) -> anyhow::Result<()> {
    let writer = ResultWriter::new(&config.results_dir).with_format(format);
    let choice: BackendChoice = config.backend_choice();
    let dispatcher = dispatcher(config)?;

    let circuits = service::workload(items);
    let (batch, records) = dispatcher.run(circuits.clone(), choice, shots).await?;

    let path = writer.write(batch.backend(), &records)?;
    writer.write_diagrams(&path, &circuits)?;

    let unavailable = records.iter().filter(|r| r.is_unavailable()).count();
    println!(
        "\n{} {} items in {} job(s) on {}",
        style("✓").green().bold(),
        records.len(),
        batch.job_count(),
        style(batch.backend()).cyan()
    );
    if unavailable > 0 {
        println!("  {} items had no result data", style(unavailable).yellow());
    }
    println!("  Results: {}", style(path.display()).yellow());
    Ok(())
}
