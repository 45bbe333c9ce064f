mod log_level;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tether::server::{
    AccessTokenIdentity, AppState, GatewayConfig, HUB_PATH, MembershipPolicy, RelayConfig,
    signaling_router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt, reload};

use crate::log_level::{LOG_LEVEL_PATH, LogControl, log_level_router};

const DEFAULT_FILTER: &str = "info";

#[derive(Parser)]
#[command(name = "tether", version, about = "WebRTC signaling relay")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs the signaling relay.
    Serve(ServeArgs),
}

#[derive(clap::Args)]
struct ServeArgs {
    #[arg(long, env = "TETHER_BIND", default_value = "0.0.0.0:3000")]
    bind: SocketAddr,

    /// Reject room joins that carry no password.
    #[arg(long, env = "TETHER_REQUIRE_PASSWORD")]
    require_password: bool,

    #[arg(long, env = "TETHER_ANSWER_TIMEOUT_SECS", default_value_t = 30)]
    answer_timeout_secs: u64,

    /// Keep users registered after they leave their last room.
    #[arg(long, env = "TETHER_RETAIN_IDLE_USERS")]
    retain_idle_users: bool,

    /// Take the client address from `X-Forwarded-For`.
    #[arg(long, env = "TETHER_TRUST_FORWARDED_FOR")]
    trust_forwarded_for: bool,
}

impl ServeArgs {
    fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            require_password: self.require_password,
            answer_timeout: Duration::from_secs(self.answer_timeout_secs),
            membership: if self.retain_idle_users {
                MembershipPolicy::RetainWhileConnected
            } else {
                MembershipPolicy::ReleaseOnLastLeave
            },
        }
    }

    fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            trust_forwarded_for: self.trust_forwarded_for,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    match Cli::parse().command {
        Commands::Serve(args) => serve(args).await,
    }
}

/// Installs the subscriber; its filter stays swappable through the returned control.
fn init_tracing() -> Result<Arc<LogControl>> {
    let base = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_else(|_| DEFAULT_FILTER.to_owned());
    let filter = EnvFilter::try_new(&base).context("Invalid RUST_LOG filter")?;
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(Arc::new(LogControl::new(base, handle)))
}

async fn serve(args: ServeArgs) -> Result<()> {
    let log_control = init_tracing()?;

    let relay_config = args.relay_config();
    info!(?relay_config, trust_forwarded_for = args.trust_forwarded_for, "Initializing relay...");

    let state = AppState::new(
        relay_config,
        args.gateway_config(),
        Arc::new(AccessTokenIdentity),
    );

    // Browser clients connect from other origins.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = signaling_router(state)
        .merge(log_level_router(log_control))
        .layer(cors);

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("Failed to bind {}", args.bind))?;
    let addr = listener.local_addr()?;

    println!("{}", "📡 Tether signaling relay".green().bold());
    println!("   🔌 Hub:       ws://{}{}", addr, HUB_PATH);
    println!("   🎚  Log level: http://{}{}", addr, LOG_LEVEL_PATH);
    info!("Signaling server listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Signaling server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => println!("{}", "Shutting down...".yellow()),
        Err(e) => {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
