//! `BeaconServer` builder and server loop.
//!
//! Ties the layers together: WebSocket transport, JSON codec, the
//! presence service and its reaper.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use beacon_presence::{PresenceConfig, PresenceService, Reaper};
use beacon_protocol::{Codec, JsonCodec};
use beacon_store::{RecordStore, RoomDirectory};
use beacon_transport::{Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{BeaconError, ServerConfig};

/// Shared state handed to each connection task.
pub(crate) struct ServerState<S, C: Codec> {
    pub(crate) service: Arc<PresenceService<S>>,
    pub(crate) codec: C,
    pub(crate) idle_timeout: Duration,
}

/// Builder for configuring and starting a Beacon server.
///
/// # Example
///
/// ```rust,ignore
/// use beacon::prelude::*;
///
/// let server = BeaconServerBuilder::new()
///     .bind("0.0.0.0:5000")
///     .presence_config(PresenceConfig { heartbeat_timeout_secs: 30, ..Default::default() })
///     .build(FileStore::open("data")?)
///     .await?;
/// server.run().await
/// ```
pub struct BeaconServerBuilder {
    bind_addr: String,
    presence: PresenceConfig,
    idle_timeout: Duration,
}

impl BeaconServerBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".to_string(),
            presence: PresenceConfig::default(),
            idle_timeout: Duration::from_secs(60),
        }
    }

    /// Creates a builder from a loaded [`ServerConfig`].
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new()
            .bind(&config.bind)
            .presence_config(config.presence.clone())
            .idle_timeout(config.idle_timeout())
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the heartbeat timeout and reaper timing.
    pub fn presence_config(mut self, config: PresenceConfig) -> Self {
        self.presence = config;
        self
    }

    /// Closes connections that send nothing for this long.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Binds the listener and wraps `store` in a presence service.
    ///
    /// Nothing is served until [`BeaconServer::run`] is called.
    pub async fn build<S>(self, store: S) -> Result<BeaconServer<S>, BeaconError>
    where
        S: RecordStore + RoomDirectory,
    {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            service: Arc::new(PresenceService::new(store, self.presence)),
            codec: JsonCodec,
            idle_timeout: self.idle_timeout,
        });

        Ok(BeaconServer { transport, state })
    }
}

impl Default for BeaconServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Beacon server.
///
/// Call [`run()`](Self::run) to start the reaper and accept connections.
pub struct BeaconServer<S: RecordStore + RoomDirectory> {
    transport: WebSocketTransport,
    state: Arc<ServerState<S, JsonCodec>>,
}

impl<S> BeaconServer<S>
where
    S: RecordStore + RoomDirectory,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, BeaconError> {
        Ok(self.transport.local_addr()?)
    }

    /// The presence service behind this server.
    pub fn service(&self) -> Arc<PresenceService<S>> {
        Arc::clone(&self.state.service)
    }

    /// Runs until the process is terminated.
    pub async fn run(self) -> Result<(), BeaconError> {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Runs the reaper and the accept loop until `shutdown` completes,
    /// then stops the reaper.
    ///
    /// Connections already being served keep their tasks; they end when
    /// the client disconnects or goes idle.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), BeaconError> {
        let reaper = Reaper::spawn(Arc::clone(&self.state.service));
        tracing::info!("Beacon server running");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => break,
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }

        tracing::info!("Beacon server shutting down");
        reaper.shutdown().await;
        Ok(())
    }
}
