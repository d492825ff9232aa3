//! Order management server.
//!
//! Configuration is layered:
//! 1. compiled defaults
//! 2. `--config` YAML file
//! 3. `ORDERS__*` environment variables
//! 4. CLI overrides (`--listen`, `-v`)

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use order_bootstrap::{cancel_on_shutdown, init_logging, render};
use order_management::OrderManagementModule;
use order_transport_grpc::server::{bind_tcp, serve_routes};

use crate::config::AppConfig;

/// Order management gRPC server
#[derive(Parser)]
#[command(name = "order-server")]
#[command(about = "Order management gRPC server: unary, server-, client- and bidirectional streaming")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address override (overrides config)
    #[arg(short, long)]
    listen: Option<String>,

    /// Print effective configuration (JSON) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Validate configuration and exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(listen) = cli.listen {
        config.server.listen_addr = listen;
    }

    if cli.print_config {
        println!("Effective configuration:\n{}", render(&config)?);
        return Ok(());
    }

    init_logging(&config.logging, cli.verbose)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(&config),
    }
}

fn check_config(config: &AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");
    config
        .server
        .listen_addr
        .parse::<std::net::SocketAddr>()
        .with_context(|| format!("invalid listen_addr '{}'", config.server.listen_addr))?;
    println!("Configuration is valid");
    println!("{}", render(config)?);
    Ok(())
}

async fn run_server(config: AppConfig) -> Result<()> {
    tracing::info!(listen_addr = %config.server.listen_addr, "order server starting");

    let shutdown = CancellationToken::new();
    let _signal_watch = cancel_on_shutdown(shutdown.clone());

    let module = OrderManagementModule::from_config(config.orders, &config.catalog);
    let listener = bind_tcp(&config.server.listen_addr).await?;
    serve_routes(listener, module.routes(shutdown.clone()), shutdown).await?;

    tracing::info!("order server stopped");
    Ok(())
}
