//! Server lifecycle: bind, advertise, serve, and ordered shutdown.
//!
//! Shutdown is driven by a future handed to [`Server::run_until`], so the
//! same sequence runs whether the trigger is an OS signal or a test.

use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::api;
use crate::app_state::AppState;
use crate::broadcast::SessionBroadcaster;
use crate::config::ServerConfig;
use crate::discovery::{Advertisement, Advertiser};
use crate::error::ServerError;

/// What the shutdown sequence did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Emitters cancelled by shutdown (sessions still open at the time).
    pub timers_cancelled: usize,
    /// Whether the advertisement was withdrawn without error.
    pub advertisement_withdrawn: bool,
    /// Whether the listener closed within the shutdown timeout.
    pub listener_closed: bool,
}

/// A bound, advertised server that has not started serving yet.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    advertiser: Arc<dyn Advertiser>,
    advertisement: Advertisement,
    broadcaster: Arc<SessionBroadcaster>,
    shutdown_timeout: Duration,
}

impl Server {
    /// Binds the listener and publishes the advertisement for the bound
    /// port.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound and
    /// [`ServerError::Discovery`] if the advertisement cannot be published.
    /// Both are fatal.
    pub async fn bind(
        config: &ServerConfig,
        advertiser: Arc<dyn Advertiser>,
    ) -> Result<Self, ServerError> {
        let addr = config.listen_addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { addr, source })?;

        let advertisement = advertiser.publish(&config.service_record(local_addr.port()))?;
        tracing::info!(fqdn = advertisement.fqdn(), "service advertised");

        let broadcaster = Arc::new(SessionBroadcaster::new(
            config.emit_interval,
            config.update_queue_capacity,
        ));

        Ok(Self {
            listener,
            local_addr,
            advertiser,
            advertisement,
            broadcaster,
            shutdown_timeout: config.shutdown_timeout,
        })
    }

    /// Address the listener is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Fully-qualified name of the advertisement.
    #[must_use]
    pub fn fqdn(&self) -> &str {
        self.advertisement.fqdn()
    }

    /// The broadcaster that will own every session.
    #[must_use]
    pub fn broadcaster(&self) -> Arc<SessionBroadcaster> {
        Arc::clone(&self.broadcaster)
    }

    /// Serves until `shutdown` resolves, then shuts down in order:
    ///
    /// 1. cancel every session emitter and clear the registry,
    /// 2. withdraw the advertisement,
    /// 3. close the listener, waiting at most the configured timeout.
    ///
    /// If the listener does not close in time the serve task is aborted;
    /// this never waits unboundedly.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Serve`] if the HTTP server fails before
    /// `shutdown` resolves. The cleanup steps still run.
    pub async fn run_until<F>(self, shutdown: F) -> Result<ShutdownReport, ServerError>
    where
        F: Future<Output = ()>,
    {
        let Self {
            listener,
            local_addr,
            advertiser,
            advertisement,
            broadcaster,
            shutdown_timeout,
        } = self;

        let state = AppState {
            broadcaster: Arc::clone(&broadcaster),
            advertised_as: Arc::from(advertisement.fqdn()),
            started_at: Instant::now(),
        };
        let app = api::build_router(state);

        let close = CancellationToken::new();
        let mut serve = tokio::spawn(
            axum::serve(listener, app)
                .with_graceful_shutdown(close.clone().cancelled_owned())
                .into_future(),
        );
        tracing::info!(addr = %local_addr, "server listening");

        let failed = tokio::select! {
            () = shutdown => None,
            joined = &mut serve => Some(joined),
        };
        tracing::info!("shutting down gracefully");

        let timers_cancelled = broadcaster.shutdown();

        let withdrawal = tokio::task::spawn_blocking(move || advertiser.withdraw(advertisement));
        let advertisement_withdrawn = match withdrawal.await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "failed to withdraw advertisement");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "advertisement withdrawal task failed");
                false
            }
        };

        close.cancel();

        if let Some(joined) = failed {
            return match joined {
                Ok(Ok(())) => Ok(ShutdownReport {
                    timers_cancelled,
                    advertisement_withdrawn,
                    listener_closed: true,
                }),
                Ok(Err(e)) => Err(ServerError::Serve(e)),
                Err(e) => Err(ServerError::Internal(e.to_string())),
            };
        }

        let listener_closed = match tokio::time::timeout(shutdown_timeout, &mut serve).await {
            Ok(Ok(Ok(()))) => true,
            Ok(Ok(Err(e))) => {
                tracing::warn!(error = %e, "server loop failed while closing");
                false
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "server task failed while closing");
                false
            }
            Err(_) => {
                tracing::warn!(
                    timeout = ?shutdown_timeout,
                    "listener did not close in time, aborting"
                );
                serve.abort();
                false
            }
        };

        let report = ShutdownReport {
            timers_cancelled,
            advertisement_withdrawn,
            listener_closed,
        };
        tracing::info!(?report, "server closed");
        Ok(report)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::discovery::InMemoryAdvertiser;

    fn local_config() -> ServerConfig {
        ServerConfig {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            shutdown_timeout: Duration::from_secs(2),
            ..ServerConfig::default()
        }
    }

    #[tokio::test]
    async fn publishes_the_bound_port() {
        let advertiser = Arc::new(InMemoryAdvertiser::new());
        let shared = Arc::<InMemoryAdvertiser>::clone(&advertiser);
        let Ok(server) = Server::bind(&local_config(), shared).await else {
            panic!("bind should succeed");
        };
        assert_ne!(server.local_addr().port(), 0);
        assert_eq!(server.fqdn(), "pos-server._pos-server._tcp.local.");
        assert_eq!(advertiser.published().len(), 1);
    }

    #[tokio::test]
    async fn publish_failure_is_fatal() {
        let advertiser = Arc::new(InMemoryAdvertiser::failing());
        let result = Server::bind(&local_config(), advertiser).await;
        assert!(matches!(result, Err(ServerError::Discovery(_))));
    }

    #[tokio::test]
    async fn bind_failure_is_fatal_and_publishes_nothing() {
        let Ok(taken) = std::net::TcpListener::bind("127.0.0.1:0") else {
            panic!("could not reserve a port");
        };
        let Ok(addr) = taken.local_addr() else {
            panic!("no local addr");
        };
        let config = ServerConfig {
            listen_addr: addr,
            ..local_config()
        };
        let advertiser = Arc::new(InMemoryAdvertiser::new());

        let shared = Arc::<InMemoryAdvertiser>::clone(&advertiser);
        let result = Server::bind(&config, shared).await;
        assert!(matches!(result, Err(ServerError::Bind { .. })));
        assert!(advertiser.published().is_empty());
    }

    #[tokio::test]
    async fn idle_shutdown_withdraws_once() {
        let advertiser = Arc::new(InMemoryAdvertiser::new());
        let shared = Arc::<InMemoryAdvertiser>::clone(&advertiser);
        let Ok(server) = Server::bind(&local_config(), shared).await else {
            panic!("bind should succeed");
        };
        let broadcaster = server.broadcaster();

        let Ok(report) = server.run_until(async {}).await else {
            panic!("shutdown should succeed");
        };
        assert_eq!(report.timers_cancelled, 0);
        assert!(report.advertisement_withdrawn);
        assert!(report.listener_closed);
        assert_eq!(advertiser.withdrawals(), 1);
        assert!(!broadcaster.is_accepting());
    }
}
