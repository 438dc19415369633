//! DirIndex Daemon
//!
//! Serves a directory subtree as a plain-text or HTML index.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use server::config::{default_config_path, Config};
use server::listing::ClientMode;
use server::{AppState, Endpoint, RequestHandler, SourceRefresher};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// DirIndex - serve a directory as a plain-text or HTML index.
#[derive(Parser, Debug)]
#[command(name = "dirindex")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory to expose (overrides config and environment)
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Address to listen on (overrides config and environment)
    #[arg(long, global = true, value_name = "ADDR")]
    pub bind: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the HTTP server
    Serve,

    /// Print a listing of the root or a subdirectory
    List {
        /// Directory relative to the root
        path: Option<String>,

        /// List every descendant instead of immediate children
        #[arg(long, short)]
        recursive: bool,

        /// Render the HTML index instead of plain text
        #[arg(long)]
        html: bool,
    },

    /// Run the source refresh (git status + git pull) once
    Update,

    /// Write a default configuration file
    InitConfig {
        /// Output file (defaults to the standard config path)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::InitConfig { output, force } = &cli.command {
        return init_config(output.as_deref(), *force);
    }

    // Load configuration
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    // Environment first, then command-line flags
    config.apply_env_overrides();
    if let Some(root) = &cli.root {
        config.server.root = root.clone();
    }
    if let Some(bind) = &cli.bind {
        config.server.bind = bind.clone();
    }

    config.validate()?;

    let _guard = init_tracing(&config, cli.verbose)?;
    tracing::debug!(
        root = %config.server.root.display(),
        bind = %config.server.bind,
        update = config.update.enabled,
        "Configuration loaded"
    );

    match cli.command {
        Commands::Serve => run_server(&config).await?,
        Commands::List {
            path,
            recursive,
            html,
        } => {
            let handler = RequestHandler::from_config(&config).with_context(|| {
                format!("Failed to open root directory: {}", config.server.root.display())
            })?;

            let endpoint = if recursive {
                Endpoint::Tree
            } else {
                Endpoint::Index
            };
            let mode = if html {
                ClientMode::Interactive
            } else {
                ClientMode::Automated
            };

            let response = handler.handle_with_mode(endpoint, path.as_deref(), mode);
            print!("{}", response.body);
            if !response.status.is_success() {
                std::process::exit(1);
            }
        }
        Commands::Update => {
            let refresher = SourceRefresher::new(config.update_repo_dir());
            let output = refresher.refresh().await?;

            println!("Status:");
            print!("{}", output.status);
            println!();
            println!("Pull:");
            print!("{}", output.pull);

            if !output.pull_succeeded {
                std::process::exit(1);
            }
        }
        Commands::InitConfig { output, force } => init_config(output.as_deref(), force)?,
    }

    Ok(())
}

/// Start the HTTP server and run until Ctrl-C.
async fn run_server(config: &Config) -> anyhow::Result<()> {
    let state = Arc::new(AppState::from_config(config)?);
    let addr = config.bind_addr()?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    server::router::serve(listener, state, shutdown_signal()).await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Initialize tracing to stderr and, if configured, a daily rolling file.
///
/// The returned guard flushes the file writer and must live until exit.
fn init_tracing(config: &Config, verbose: bool) -> anyhow::Result<Option<WorkerGuard>> {
    let level = if verbose {
        "debug".to_string()
    } else {
        config.log.level.to_lowercase()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (file_layer, guard) = match &config.log.file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let file_name = path
                .file_name()
                .with_context(|| format!("log.file has no file name: {}", path.display()))?;

            let appender = tracing_appender::rolling::daily(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(guard)
}

fn init_config(output: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path);

    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {} (use --force to overwrite)",
            path.display()
        );
    }

    Config::default().save(&path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
