use std::sync::Arc;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{Builder, Rotation};

use car_price_ai::catalog::Catalog;
use car_price_ai::channels::CliChannel;
use car_price_ai::config::{GatewayConfig, HostConfig, PacingConfig};
use car_price_ai::error::HostError;
use car_price_ai::gateway::HttpGateway;
use car_price_ai::web::wizard_routes;
use car_price_ai::wizard::WizardSession;

enum Mode {
    Cli,
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mode = match std::env::args().nth(1).as_deref() {
        None => Mode::Cli,
        Some("serve") => Mode::Serve,
        Some(other) => {
            eprintln!("Unknown command: {other}");
            eprintln!("  usage: car-price-ai [serve]");
            std::process::exit(2);
        }
    };

    let host_config = HostConfig::from_env();
    // Held for the life of the process so buffered log lines get flushed.
    let _log_guard = init_tracing(&mode, &host_config)?;

    let gateway_config = GatewayConfig::from_env()?;
    let pacing = PacingConfig::from_env();
    let gateway = Arc::new(HttpGateway::new(gateway_config)?);
    let session = WizardSession::new(Arc::new(Catalog::vehicle()), gateway.clone(), pacing);

    eprintln!("🚗 Car Price AI v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Valuation service: {}", gateway.base_url());

    match mode {
        Mode::Cli => {
            eprintln!("   Logs: {}", host_config.log_dir.display());
            eprintln!("   Answer each question and press Enter. /help for commands.\n");
            CliChannel::new(session, Some(gateway)).run().await?;
        }
        Mode::Serve => {
            let addr = format!("0.0.0.0:{}", host_config.port);
            eprintln!("   Wizard API: http://{addr}/api/wizard");
            eprintln!("   Wizard WS: ws://{addr}/ws\n");

            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .map_err(|source| HostError::Bind {
                    addr: addr.clone(),
                    source,
                })?;
            tracing::info!(port = host_config.port, "Wizard server started");

            let starter = Arc::clone(&session);
            tokio::spawn(async move { starter.start().await });

            axum::serve(listener, wizard_routes(session))
                .await
                .map_err(HostError::Io)?;
        }
    }

    Ok(())
}

/// CLI mode writes logs to a file so they don't interleave with the chat;
/// `serve` logs to stderr.
fn init_tracing(mode: &Mode, host: &HostConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match mode {
        Mode::Cli => {
            std::fs::create_dir_all(&host.log_dir).with_context(|| {
                format!("Failed to create log directory {}", host.log_dir.display())
            })?;
            let appender = Builder::new()
                .rotation(Rotation::NEVER)
                .filename_prefix("car-price-ai.log")
                .build(&host.log_dir)
                .context("Failed to open log file")?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer)
                .init();
            Ok(Some(guard))
        }
        Mode::Serve => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .init();
            Ok(None)
        }
    }
}
