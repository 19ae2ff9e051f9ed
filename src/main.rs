use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio::signal;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mailgate::config::{MailgateConfig, ProviderConfig};
use mailgate::http::{HttpServer, Mailer};
use mailgate::mailer::{EmailProvider, EmailThrottle, HostedAuthProvider, LogProvider};
use mailgate::ratelimit::{spawn_sweeper, Clock, SystemClock};

#[derive(Parser, Debug)]
#[command(name = "mailgate", version, about = "Throttled auth email dispatch")]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to serve HTTP on, overriding the configuration
    #[arg(long)]
    http_addr: Option<SocketAddr>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    info!("Starting Mailgate");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = match &args.config {
        Some(path) => MailgateConfig::from_file(path)?,
        None => MailgateConfig::default(),
    };
    config.apply_env()?;
    if let Some(addr) = args.http_addr {
        config.server.http_addr = addr;
    }
    config.validate()?;
    info!(http_addr = %config.server.http_addr, "Configuration loaded");

    let limits = &config.rate_limiting;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let throttle = EmailThrottle::with_clock(limits.confirmation, limits.password_reset, clock);
    info!(
        confirmation_max = limits.confirmation.max_requests,
        confirmation_window_ms = limits.confirmation.window_ms,
        password_reset_max = limits.password_reset.max_requests,
        password_reset_window_ms = limits.password_reset.window_ms,
        "Rate limiters initialized"
    );

    let (sweep_tx, sweep_rx) = watch::channel(false);
    let sweeper = spawn_sweeper(throttle.sweep_targets(), limits.cleanup_interval(), sweep_rx);

    let provider = build_provider(&config.provider)?;
    let mailer = Arc::new(
        Mailer::new(provider, throttle).with_redirect(config.provider.redirect_to.clone()),
    );

    HttpServer::new(config.server.http_addr, mailer)
        .serve_with_shutdown(shutdown_signal())
        .await?;

    let _ = sweep_tx.send(true);
    sweeper.await?;

    info!("Mailgate stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Pick the hosted provider when one is configured, else log emails.
fn build_provider(config: &ProviderConfig) -> anyhow::Result<Arc<dyn EmailProvider>> {
    match (&config.base_url, &config.api_key) {
        (Some(base_url), Some(api_key)) => {
            info!(base_url = %base_url, "Using hosted auth provider");
            Ok(Arc::new(HostedAuthProvider::new(base_url, api_key.clone())?))
        }
        _ => {
            info!("No provider configured, emails will only be logged");
            Ok(Arc::new(LogProvider))
        }
    }
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
