//! promised — the promise gateway daemon.
//!
//! Serves the promise HTTP API over the default in-process engine.
//!
//! # Usage
//!
//! ```text
//! promised serve --config promised.toml --port 8001 --data-dir /var/lib/promised
//! promised config --config promised.toml --port 9000
//! ```

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use promise_api::Gateway;
use promise_core::GatewayConfig;
use promise_core::config::{LogConfig, LogFormat};

#[derive(Parser)]
#[command(name = "promised", about = "Durable promise gateway daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API until interrupted.
    Serve(ConfigArgs),
    /// Print the effective configuration as TOML.
    Config(ConfigArgs),
}

/// Config file plus command-line overrides.
#[derive(Args)]
struct ConfigArgs {
    /// Path to promised.toml.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to bind.
    #[arg(long)]
    host: Option<IpAddr>,

    /// Port to listen on.
    #[arg(long)]
    port: Option<u16>,

    /// Data directory for the engine store. In-memory when unset.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log output format.
    #[arg(long, value_enum)]
    log_format: Option<LogFormatArg>,
}

impl ConfigArgs {
    /// Load the file (or defaults) and apply the flags on top.
    fn resolve(self) -> anyhow::Result<GatewayConfig> {
        let mut config = match self.config {
            Some(path) => GatewayConfig::from_file(&path)?,
            None => GatewayConfig::default(),
        };
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(dir) = self.data_dir {
            config.engine.data_dir = Some(dir);
        }
        if let Some(format) = self.log_format {
            config.log.format = format.into();
        }
        Ok(config)
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Text,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => {
            let config = args.resolve()?;
            init_tracing(&config.log)?;
            serve(config).await
        }
        Command::Config(args) => {
            print!("{}", args.resolve()?.to_toml_string()?);
            Ok(())
        }
    }
}

/// `RUST_LOG` takes precedence over the configured filter.
fn init_tracing(log: &LogConfig) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&log.filter)?,
    };
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match log.format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
    Ok(())
}

async fn serve(config: GatewayConfig) -> anyhow::Result<()> {
    info!("promise gateway starting");

    let mut gateway = Gateway::with_local_engine(&config)?;
    let addr = gateway.start().await?;
    info!(%addr, "promise gateway ready");

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    gateway.stop().await;
    info!("promise gateway stopped");
    Ok(())
}
