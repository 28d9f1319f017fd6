//! Frame server listener
//!
//! Handles the TCP accept loop and spawns one session per connection.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use crate::error::Result;
use crate::server::config::ServerConfig;
use crate::server::session::Session;
use crate::store::{AccessCoordinator, FrameStore, StoreConfig};

/// Ingestion, query and subscription server
pub struct FrameServer {
    config: ServerConfig,
    coordinator: AccessCoordinator,
    next_session_id: AtomicU64,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl FrameServer {
    /// Create a new server with the given configuration and a fresh store
    pub fn new(config: ServerConfig) -> Self {
        Self::with_store_config(config, StoreConfig::default())
    }

    /// Create a new server with custom store configuration
    pub fn with_store_config(config: ServerConfig, store_config: StoreConfig) -> Self {
        let coordinator = AccessCoordinator::new(FrameStore::with_config(store_config));
        Self::with_coordinator(config, coordinator)
    }

    /// Create a server around an existing store
    pub fn with_coordinator(config: ServerConfig, coordinator: AccessCoordinator) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            config,
            coordinator,
            next_session_id: AtomicU64::new(1),
            connection_semaphore,
        }
    }

    /// Run the server
    ///
    /// This method blocks until the accept loop fails.
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "Frame server listening");

        self.accept_loop(&listener).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve_until(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` completes
    pub async fn serve_until<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        tracing::info!(addr = %listener.local_addr()?, "Frame server listening");

        tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.accept_loop(&listener) => result,
        }
    }

    async fn accept_loop(&self, listener: &TcpListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        // Check connection limit
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            session_id = session_id,
            peer = %peer_addr,
            "New connection"
        );

        if let Err(e) = socket.set_nodelay(true) {
            tracing::error!(error = %e, "Failed to configure socket");
            return;
        }

        let session = Session::new(
            session_id,
            peer_addr,
            self.config.clone(),
            self.coordinator.clone(),
        );

        tokio::spawn(async move {
            let _permit = permit;

            if let Err(e) = session.run(socket).await {
                tracing::debug!(
                    session_id = session_id,
                    error = %e,
                    "Connection error"
                );
            }

            tracing::debug!(session_id = session_id, "Connection closed");
        });
    }
}
