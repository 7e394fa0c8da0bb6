use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::http::{Request, Response};
use crate::routing::Router;
use hyper::service::{make_service_fn, service_fn};
use hyper::Server as HyperServer;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Default bound on how long in-flight requests may drain after a shutdown signal
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Server {
    router: Arc<Router>,
    shutdown_timeout: Duration,
}

impl Server {
    /// Take ownership of a fully registered router
    pub fn new(router: Router) -> Self {
        Self {
            router: Arc::new(router),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    pub fn from_config(router: Router, config: &ServerConfig) -> Self {
        Self::new(router).with_shutdown_timeout(Duration::from_secs(config.shutdown_timeout))
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Serve until SIGINT or SIGTERM (Ctrl+C off unix)
    pub async fn serve(self, addr: &str) -> Result<()> {
        let addr: SocketAddr = addr
            .parse()
            .map_err(|e| Error::config(format!("Invalid address '{}': {}", addr, e)))?;

        let (local_addr, server) = self.bind_with_shutdown(addr, shutdown_signal())?;
        log::info!("nex server listening on {}", local_addr);
        server.await
    }

    /// Bind `addr` and return the bound address plus the future that runs the
    /// server until `signal` resolves. Binding to port 0 picks a free port.
    pub fn bind_with_shutdown<F>(
        self,
        addr: SocketAddr,
        signal: F,
    ) -> Result<(SocketAddr, impl Future<Output = Result<()>>)>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.router.log_routes();

        let router = Arc::clone(&self.router);
        let make_svc = make_service_fn(move |_conn| {
            let router = Arc::clone(&router);
            async move {
                Ok::<_, Infallible>(service_fn(move |req| {
                    let router = Arc::clone(&router);
                    async move { Ok::<_, Infallible>(dispatch(&router, req).await) }
                }))
            }
        });

        let builder = HyperServer::try_bind(&addr)
            .map_err(|e| Error::config(format!("Failed to bind {}: {}", addr, e)))?;
        let server = builder.serve(make_svc);
        let local_addr = server.local_addr();

        let shutdown_timeout = self.shutdown_timeout;
        let (drain_tx, drain_rx) = tokio::sync::oneshot::channel::<()>();
        let graceful = server.with_graceful_shutdown(async {
            drain_rx.await.ok();
        });

        let run = async move {
            tokio::pin!(graceful);
            tokio::pin!(signal);

            tokio::select! {
                result = &mut graceful => {
                    return result.map_err(Error::from);
                }
                _ = &mut signal => {
                    log::info!(
                        "Shutdown requested, draining in-flight requests (up to {:?})",
                        shutdown_timeout
                    );
                    let _ = drain_tx.send(());
                }
            }

            match tokio::time::timeout(shutdown_timeout, graceful).await {
                Ok(result) => {
                    log::info!("Server stopped");
                    result.map_err(Error::from)
                }
                Err(_) => {
                    log::warn!(
                        "Shutdown timeout of {:?} elapsed, abandoning open connections",
                        shutdown_timeout
                    );
                    Ok(())
                }
            }
        };

        Ok((local_addr, run))
    }
}

async fn dispatch(router: &Router, req: hyper::Request<hyper::Body>) -> hyper::Response<hyper::Body> {
    match Request::from_hyper(req).await {
        Ok(request) => router.handle(request).await.into_hyper(),
        Err(e) => {
            log::warn!("Failed to read request: {}", e);
            Response::text("Bad Request")
                .with_status(hyper::StatusCode::BAD_REQUEST)
                .into_hyper()
        }
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sig) => sig,
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                return std::future::pending().await;
            }
        };

        let mut sigint = match signal(SignalKind::interrupt()) {
            Ok(sig) => sig,
            Err(e) => {
                log::error!("Failed to install SIGINT handler: {}", e);
                return std::future::pending().await;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                log::info!("Received SIGTERM signal - initiating graceful shutdown");
            }
            _ = sigint.recv() => {
                log::info!("Received SIGINT signal (Ctrl+C) - initiating graceful shutdown");
            }
        }
    }

    #[cfg(not(unix))]
    {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                log::info!("Received Ctrl+C signal - initiating graceful shutdown");
            }
            Err(e) => {
                log::error!("Failed to listen for Ctrl+C signal: {}", e);
                std::future::pending::<()>().await;
            }
        }
    }
}
