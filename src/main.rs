//! pos-server entry point.
//!
//! Advertises the service over mDNS, serves WebSocket order updates, and
//! shuts down cleanly on SIGINT or SIGTERM.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use pos_server::config::{LogFormat, ServerConfig};
use pos_server::discovery::{Advertiser, InMemoryAdvertiser, MdnsAdvertiser};
use pos_server::error::ServerError;
use pos_server::server::Server;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = ServerConfig::from_env().map_err(|e| ServerError::Config(e.to_string()))?;

    // Initialize tracing
    init_tracing(config.log_format);
    tracing::info!(addr = %config.listen_addr, "starting pos-server");

    // Build the advertiser
    let advertiser: Arc<dyn Advertiser> = if config.mdns_enabled {
        Arc::new(MdnsAdvertiser::new(config.withdraw_timeout)?)
    } else {
        tracing::warn!("mdns disabled, advertisement kept in memory only");
        Arc::new(InMemoryAdvertiser::new())
    };

    // Bind and advertise
    let server = Server::bind(&config, advertiser).await?;
    tracing::info!(fqdn = server.fqdn(), addr = %server.local_addr(), "pos-server ready");

    // Serve until SIGINT/SIGTERM
    server.run_until(shutdown_signal()).await?;

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

/// Resolves on Ctrl+C (SIGINT) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received SIGINT"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
