use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use aria_relay::{Config, RelayServer};

/// Aria - real-time voice assistant relay
#[derive(Parser)]
#[command(name = "aria", version, about)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "ARIA_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(long, env = "ARIA_PORT", global = true)]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the relay server (the default)
    Serve,
    /// Run the relay under a restart-on-exit watchdog
    Supervise {
        /// Seconds to wait before restarting an exited relay
        #[arg(long, default_value = "5")]
        restart_delay: u64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,aria_relay=info",
        1 => "info,aria_relay=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(Command::Supervise { restart_delay }) = cli.command {
        let mut args = Vec::new();
        if let Some(config) = &cli.config {
            args.push("--config".to_string());
            args.push(config.display().to_string());
        }
        if let Some(port) = cli.port {
            args.push("--port".to_string());
            args.push(port.to_string());
        }
        aria_relay::watchdog::supervise(Duration::from_secs(restart_delay), &args).await?;
        return Ok(());
    }

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.port = port;
    }

    tracing::info!(
        host = %config.host,
        port = config.port,
        sample_rate = config.sample_rate,
        chunk_size = config.chunk_size,
        "starting aria relay"
    );

    let server = RelayServer::from_config(config)?;
    server.run().await?;

    Ok(())
}
