//! ecr-agent - registry credential helper for ECR.
//!
//! One-shot mode fetches a credential batch and prints one login command
//! per registry. `--renew` keeps the process in the foreground,
//! re-authenticating the container runtime before each credential set
//! expires and reporting readiness to the process supervisor.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ecr_agent::config::Config;
use ecr_agent::fetcher::{CredentialSource, EcrFetcher};
use ecr_agent::login::DockerCli;
use ecr_agent::notify::SystemdNotifier;
use ecr_agent::output;
use ecr_agent::renewer::Renewer;

/// Registry credential helper for ECR.
#[derive(Debug, Parser)]
#[command(name = "ecr-agent")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Stay in the foreground and renew credentials before they expire.
    ///
    /// Requires access to the docker socket and binary.
    #[arg(long)]
    renew: bool,

    /// One-shot output format (lines or json).
    #[arg(long, default_value = "lines")]
    output: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout is reserved for one-shot output.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::from_env()?;

    if cli.renew {
        run_renewal(config).await
    } else {
        run_once(&cli.output, config).await
    }
}

/// Fetch one batch and print a login command per credential.
async fn run_once(output: &str, config: Config) -> Result<()> {
    let format = output::parse_format(output)?;
    let fetcher = EcrFetcher::connect(&config).await?;
    let batch = fetcher.fetch().await?;
    print!("{}", output::render(&batch, &config, format)?);
    Ok(())
}

/// Run the renewal loop until a fatal error or ctrl-c.
async fn run_renewal(config: Config) -> Result<()> {
    let fetcher = EcrFetcher::connect(&config).await?;
    let renewer = Renewer::new(
        Arc::new(fetcher),
        Arc::new(DockerCli::new(&config)),
        Arc::new(SystemdNotifier),
        Duration::from_secs(config.margin_secs),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut handle = tokio::spawn(async move { renewer.run(shutdown_rx).await });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            let _ = shutdown_tx.send(true);
        }
        result = &mut handle => {
            return Ok(result??);
        }
    }

    // Shutdown was requested; wait for the loop to finish its cycle.
    handle.await??;
    Ok(())
}
