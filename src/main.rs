//! full-autorest CLI entrypoint
//! Parses command-line arguments and starts the generation server.
#![deny(unsafe_code)]

// Internal imports (std, crate)
use full_autorest::{
    AppState, ServerConfig,
    api::create_router,
    config::{DEFAULT_GENERATION_TIMEOUT, DEFAULT_PORT},
    infrastructure::DEFAULT_PROGRAM,
};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

// External imports (alphabetized)
use anyhow::Context;
use clap::Parser;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "full-autorest")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server that runs AutoRest on `/generate`
    Start {
        /// The port that should be used to listen for requests
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
        /// Address to bind
        #[arg(long, default_value = "0.0.0.0")]
        host: IpAddr,
        /// Generator executable, looked up on PATH
        #[arg(long, default_value = DEFAULT_PROGRAM)]
        generator: String,
        /// Maximum run time of a single generation, in seconds
        #[arg(long, default_value_t = DEFAULT_GENERATION_TIMEOUT.as_secs())]
        timeout_secs: u64,
        /// Directory for per-request output directories (default: system temp)
        #[arg(long)]
        output_root: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with default level INFO
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Start {
            port,
            host,
            generator,
            timeout_secs,
            output_root,
        } => {
            let config = ServerConfig {
                host,
                port,
                generator_program: generator,
                generation_timeout: Duration::from_secs(timeout_secs),
                output_root,
                ..Default::default()
            };
            run_server(config).await?
        }
    }
    Ok(())
}

async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    config
        .validate()
        .context("Invalid server configuration")?;

    let addr = config.socket_addr();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        generator = %config.generator_program,
        timeout_secs = config.generation_timeout.as_secs(),
        "Starting full-autorest server on port {}",
        config.port
    );

    let state = AppState::new(config);
    let shutdown = state.shutdown.clone();
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind TCP listener on {addr}"))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Stop in-flight generations so their directories get cleaned up
            shutdown.cancel();
        })
        .await
        .context("Server terminated unexpectedly")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let sigint = tokio::signal::ctrl_c();
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = sigint => info!("SIGINT received, starting graceful shutdown..."),
                _ = sigterm.recv() => info!("SIGTERM received, starting graceful shutdown..."),
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install SIGTERM handler, waiting for SIGINT only");
            let _ = sigint.await;
            info!("SIGINT received, starting graceful shutdown...");
        }
    }
}

/// Wait for shutdown signal (SIGINT only on non-Unix platforms)
#[cfg(not(unix))]
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for CTRL+C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, starting graceful shutdown...");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_defaults() {
        let cli = Cli::try_parse_from(["full-autorest", "start"]).unwrap();
        let Commands::Start {
            port,
            host,
            generator,
            timeout_secs,
            output_root,
        } = cli.command;

        assert_eq!(port, 80);
        assert_eq!(host.to_string(), "0.0.0.0");
        assert_eq!(generator, "autorest");
        assert_eq!(timeout_secs, 300);
        assert_eq!(output_root, None);
    }

    #[test]
    fn test_start_output_root_flag() {
        let cli = Cli::try_parse_from(["full-autorest", "start", "--output-root", "/srv/gen"])
            .unwrap();
        let Commands::Start { output_root, .. } = cli.command;
        assert_eq!(output_root, Some(PathBuf::from("/srv/gen")));
    }

    #[test]
    fn test_start_port_flag() {
        let cli = Cli::try_parse_from(["full-autorest", "start", "-p", "8080"]).unwrap();
        let Commands::Start { port, .. } = cli.command;
        assert_eq!(port, 8080);

        let cli = Cli::try_parse_from(["full-autorest", "start", "--port", "9090"]).unwrap();
        let Commands::Start { port, .. } = cli.command;
        assert_eq!(port, 9090);
    }

    #[test]
    fn test_start_rejects_positional_args() {
        assert!(Cli::try_parse_from(["full-autorest", "start", "extra"]).is_err());
    }
}
