//! Bayeux engine CLI binary.
//!
//! # Commands
//!
//! - `serve` - Start the HTTP long-polling endpoint
//! - `route` - Validate a channel path and test wildcard matches
//! - `config` - Print the effective configuration

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use bayeux::{
    config::Config,
    meta::MetaCommand,
    protocol::Route,
    server::HttpServer,
    VERSION,
};

#[derive(Parser)]
#[command(name = "bayeux")]
#[command(version = VERSION)]
#[command(about = "Bayeux protocol engine - publish/subscribe over long-polling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP endpoint
    Serve {
        /// Config file (default: <config dir>/bayeux/config.toml if present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Listen host
        #[arg(long)]
        host: Option<String>,

        /// Listen port
        #[arg(short, long)]
        port: Option<u16>,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate a channel path
    Route {
        /// Channel path, e.g. /chat/room or /chat/*
        path: String,

        /// Check whether the path matches these concrete channels
        #[arg(short, long)]
        matches: Vec<String>,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            host,
            port,
            verbose,
        } => cmd_serve(config, host, port, verbose),

        Commands::Route { path, matches } => cmd_route(&path, &matches),

        Commands::Config { config } => cmd_config(config),
    }
}

fn cmd_serve(
    config: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    verbose: bool,
) -> anyhow::Result<()> {
    // Initialize logging
    let log_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let mut config = Config::load(config).context("Failed to load configuration")?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    for protocol in &config.protocols {
        tracing::info!(
            "Protocol {}: transports {:?}, long-polling {}",
            protocol.name,
            protocol.transport_names,
            protocol.long_polling
        );
    }

    let server = HttpServer::new(config)?;
    let shutdown = server.shutdown_token();

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown requested");
            }
            shutdown.cancel();
        });

        server.run().await?;
        Ok::<_, anyhow::Error>(())
    })
}

fn cmd_route(path: &str, targets: &[String]) -> anyhow::Result<()> {
    let route = Route::parse(path).with_context(|| format!("Invalid channel path '{path}'"))?;

    let operation = match MetaCommand::from_path(Some(route.path())) {
        Ok(command) => command.name().to_string(),
        Err(e) => format!("rejected ({e})"),
    };

    let wildcard = if route.is_deep_wild() {
        "deep (**)"
    } else if route.is_wild() {
        "single (*)"
    } else {
        "none"
    };

    println!("Path:      {}", route.path());
    println!("Segments:  {}", route.segments().join(", "));
    println!("Wildcard:  {wildcard}");
    println!("Meta:      {}", route.is_meta());
    println!("Operation: {operation}");

    for target in targets {
        let verdict = match Route::parse(target) {
            Ok(target_route) if route.matches(&target_route) => "matches".to_string(),
            Ok(_) => "no match".to_string(),
            Err(e) => format!("invalid ({e})"),
        };
        println!("  {target}: {verdict}");
    }

    Ok(())
}

fn cmd_config(config: Option<PathBuf>) -> anyhow::Result<()> {
    let config = Config::load(config)?;
    config.validate()?;
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
