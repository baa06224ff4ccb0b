use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use filakiosk::config::Config;
use filakiosk::error::{Error as KioskError, KioskErrorTrait};

mod commands;

#[derive(Parser)]
#[command(
    name = "filakiosk",
    version,
    about = "Kiosk display driver: queue view and availability-aware ad rotation",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML config file (defaults to FILAKIOSK_* environment variables)
    #[arg(short, long, global = true, env = "FILAKIOSK_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); defaults to [logging] in the config
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the kiosk, reading operator commands from stdin
    Run {
        /// Page URL; `kiosk=true` in its query enters kiosk mode at start
        #[arg(long)]
        page_url: Option<String>,

        /// Enter kiosk mode at start
        #[arg(long, default_value = "false")]
        kiosk: bool,

        /// Print Prometheus metrics on exit
        #[arg(long, default_value = "false")]
        metrics: bool,
    },

    /// Probe the static ad slots and print their availability
    Probe,

    /// Fetch the ads manifest and print it as JSON
    Manifest,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    // Initialize tracing/logging
    let format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&format, &config.logging.level, cli.verbose)?;

    tracing::info!(mode = %config.kiosk.mode, "filakiosk starting");

    let result = match cli.command {
        Commands::Run {
            page_url,
            kiosk,
            metrics,
        } => {
            tracing::info!(
                page_url = ?page_url,
                kiosk = %kiosk,
                metrics = %metrics,
                "Starting run command"
            );
            commands::run(
                &config,
                commands::RunParams {
                    page_url,
                    kiosk,
                    metrics,
                },
            )
            .await
        }

        Commands::Probe => {
            tracing::info!(slots = config.kiosk.static_slots.len(), "Starting probe command");
            commands::probe(&config).await
        }

        Commands::Manifest => {
            tracing::info!(slug = %config.api.shop_slug, "Starting manifest command");
            commands::manifest(&config).await
        }
    };

    if let Err(e) = &result {
        match e.downcast_ref::<KioskError>() {
            Some(kiosk) => tracing::error!(
                error = %e,
                category = kiosk.category().as_str(),
                recoverable = kiosk.is_recoverable(),
                "Command failed"
            ),
            None => tracing::error!(error = %e, "Command failed"),
        }
    }

    tracing::info!("filakiosk stopped");
    result
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("filakiosk=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_new(format!("filakiosk={level},warn"))
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("filakiosk=info,warn"))
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
