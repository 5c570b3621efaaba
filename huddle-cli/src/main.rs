use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use huddle_server::{CoordinatorConfig, build_state, router};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "huddle")]
#[command(about = "Signaling coordinator for peer-mesh video rooms")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the coordinator until Ctrl-C.
    Serve {
        #[command(flatten)]
        overrides: Overrides,

        /// Used when RUST_LOG is unset.
        #[arg(long, default_value = "info")]
        log_level: String,
    },
    /// Print the effective configuration and exit.
    Config {
        #[command(flatten)]
        overrides: Overrides,
    },
}

/// Flags take precedence over `HUDDLE_*` variables.
#[derive(clap::Args)]
struct Overrides {
    #[arg(long)]
    addr: Option<SocketAddr>,

    #[arg(long)]
    room_capacity: Option<usize>,

    #[arg(long)]
    negotiation_timeout_secs: Option<u64>,
}

impl Overrides {
    fn resolve(self) -> Result<CoordinatorConfig> {
        let mut config =
            CoordinatorConfig::from_env().context("Invalid HUDDLE_* environment")?;

        if let Some(addr) = self.addr {
            config.bind_addr = addr;
        }
        if let Some(capacity) = self.room_capacity {
            anyhow::ensure!(capacity > 0, "--room-capacity must be at least 1");
            config.room_capacity = capacity;
        }
        if let Some(secs) = self.negotiation_timeout_secs {
            config.negotiation_timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    match Cli::parse().command {
        Commands::Serve {
            overrides,
            log_level,
        } => {
            init_tracing(&log_level)?;
            serve(overrides.resolve()?).await
        }
        Commands::Config { overrides } => {
            print_config(&overrides.resolve()?);
            Ok(())
        }
    }
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .with_context(|| format!("Invalid log level {log_level:?}"))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

async fn serve(config: CoordinatorConfig) -> Result<()> {
    let state = build_state(&config);
    let app = router(state.clone());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    println!(
        "{} {}",
        "📡 Huddle coordinator listening on".green().bold(),
        format!("ws://{}/ws", config.bind_addr).cyan()
    );
    info!(
        "room capacity {}, negotiation timeout {:?}",
        config.room_capacity, config.negotiation_timeout
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server terminated unexpectedly")?;

    state.rooms.shutdown().await;
    println!("{}", "✨ Coordinator stopped".green().bold());
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested"),
        Err(e) => {
            warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

fn print_config(config: &CoordinatorConfig) {
    println!("{}", "Huddle configuration".cyan().bold());
    println!("   bind address:          {}", config.bind_addr);
    println!("   room capacity:         {}", config.room_capacity);
    println!(
        "   negotiation timeout:   {}s",
        config.negotiation_timeout.as_secs()
    );
    println!(
        "   connection attempts:   {}",
        config.max_connection_attempts
    );
    for server in &config.ice_servers {
        let auth = if server.username.is_some() {
            " (authenticated)"
        } else {
            ""
        };
        println!("   ice server:            {}{}", server.urls.join(", "), auth);
    }
}
