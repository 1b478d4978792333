//! Gateway — owns the HTTP listener and the engine handle.
//!
//! Lifecycle: `Stopped → Starting → Running → Stopping → Stopped`, published
//! on a watch channel (see [`Gateway::subscribe_status`]).
//! [`Gateway::stop`] closes the listener before stopping the engine, so no
//! request is admitted while the engine shuts down. Requests still waiting on
//! the engine get the shutdown grace period to finish; whatever is left is
//! answered by the engine's own stop.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use promise_core::config::ServerConfig;
use promise_core::{EngineError, GatewayConfig};
use promise_engine::{Engine, LocalEngine};

use crate::build_router;

/// Transport-level failures.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("gateway is already running on {0}")]
    AlreadyRunning(SocketAddr),

    #[error("failed to construct engine: {0}")]
    Engine(#[from] EngineError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayStatus {
    Stopped,
    Starting,
    Running,
    Stopping,
}

struct Listening {
    addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    server: JoinHandle<std::io::Result<()>>,
}

/// HTTP front end for one engine.
pub struct Gateway {
    engine: Arc<dyn Engine>,
    config: ServerConfig,
    status: watch::Sender<GatewayStatus>,
    listening: Option<Listening>,
}

impl Gateway {
    /// Gateway over an already constructed engine.
    pub fn new(engine: Arc<dyn Engine>, config: ServerConfig) -> Self {
        Self {
            engine,
            config,
            status: watch::Sender::new(GatewayStatus::Stopped),
            listening: None,
        }
    }

    /// Gateway over the default in-process engine described by `config`.
    pub fn with_local_engine(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let engine = LocalEngine::from_config(&config.engine)?;
        info!(data_dir = ?config.engine.data_dir, "local engine ready");
        Ok(Self::new(Arc::new(engine), config.server.clone()))
    }

    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }

    pub fn status(&self) -> GatewayStatus {
        *self.status.borrow()
    }

    /// Follow status transitions, including the ones `start` and `stop`
    /// pass through while they run.
    pub fn subscribe_status(&self) -> watch::Receiver<GatewayStatus> {
        self.status.subscribe()
    }

    fn set_status(&self, status: GatewayStatus) {
        self.status.send_replace(status);
    }

    /// Address the listener is bound to, while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listening.as_ref().map(|l| l.addr)
    }

    /// Bind the listener and start serving. Returns the bound address.
    pub async fn start(&mut self) -> Result<SocketAddr, GatewayError> {
        if let Some(listening) = &self.listening {
            return Err(GatewayError::AlreadyRunning(listening.addr));
        }
        self.set_status(GatewayStatus::Starting);

        let addr = self.config.bind_addr();
        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(source) => {
                self.set_status(GatewayStatus::Stopped);
                return Err(GatewayError::Bind { addr, source });
            }
        };
        let addr = match listener.local_addr() {
            Ok(bound) => bound,
            Err(source) => {
                self.set_status(GatewayStatus::Stopped);
                return Err(GatewayError::Bind { addr, source });
            }
        };

        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let router = build_router(self.engine.clone());
        let server = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.wait_for(|stop| *stop).await;
                })
                .await
        });

        self.listening = Some(Listening {
            addr,
            shutdown,
            server,
        });
        self.set_status(GatewayStatus::Running);
        info!(%addr, "gateway listening");
        Ok(addr)
    }

    /// Close the listener, then stop the engine. Safe to call at any time.
    ///
    /// In-flight requests get the configured shutdown grace to drain. The
    /// engine is stopped after that even if some are still waiting on it, so
    /// they are answered with its stop error instead of holding `stop` open.
    pub async fn stop(&mut self) {
        self.set_status(GatewayStatus::Stopping);
        let grace = self.config.shutdown_grace();

        let Some(Listening {
            addr,
            shutdown,
            mut server,
        }) = self.listening.take()
        else {
            self.engine.stop();
            self.set_status(GatewayStatus::Stopped);
            info!("gateway stopped");
            return;
        };

        // The accept loop exits as soon as the signal is seen.
        let _ = shutdown.send(true);
        let drained = match tokio::time::timeout(grace, &mut server).await {
            Ok(joined) => {
                log_server_exit(addr, joined);
                true
            }
            Err(_) => {
                warn!(%addr, ?grace, "requests still in flight, stopping engine under them");
                false
            }
        };

        self.engine.stop();

        if !drained {
            match tokio::time::timeout(grace, &mut server).await {
                Ok(joined) => log_server_exit(addr, joined),
                Err(_) => {
                    warn!(%addr, "connections outlived the engine, aborting server");
                    server.abort();
                }
            }
        }

        self.set_status(GatewayStatus::Stopped);
        info!("gateway stopped");
    }
}

fn log_server_exit(
    addr: SocketAddr,
    joined: Result<std::io::Result<()>, tokio::task::JoinError>,
) {
    match joined {
        Ok(Ok(())) => info!(%addr, "listener closed"),
        Ok(Err(e)) => warn!(error = %e, "server exited with error"),
        Err(e) => warn!(error = %e, "server task failed"),
    }
}
