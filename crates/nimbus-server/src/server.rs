//! `NimbusServer`: Axum HTTP, push-stream and socket server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use nimbus_auth::CredentialAuthority;
use nimbus_rpc::{HandlerRegistry, RpcContext};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::protocol::ProtocolServer;
use crate::routes::{self, AppState};
use crate::shutdown::ShutdownCoordinator;

/// The main nimbus server.
#[derive(Debug)]
pub struct NimbusServer {
    config: Arc<ServerConfig>,
    protocol: ProtocolServer,
    authority: Arc<CredentialAuthority>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
}

impl NimbusServer {
    /// Create a new server.
    pub fn new(
        config: ServerConfig,
        authority: Arc<CredentialAuthority>,
        handlers: Arc<HandlerRegistry>,
        ctx: RpcContext,
    ) -> Self {
        Self {
            config: Arc::new(config),
            protocol: ProtocolServer::new(handlers, ctx),
            authority,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
        }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        routes::router(AppState {
            protocol: self.protocol.clone(),
            authority: self.authority.clone(),
            config: self.config.clone(),
            start_time: self.start_time,
        })
    }

    /// Bind and serve in a background task.
    ///
    /// Returns the bound address (useful with port 0) and the serve task.
    /// When the shutdown token fires every live session is closed, which
    /// ends open event streams and sockets so the server can drain.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = TcpListener::bind(self.config.bind_addr()).await?;
        let addr = listener.local_addr()?;
        let app = self.router();
        let token = self.shutdown.token();
        let protocol = self.protocol.clone();

        info!(%addr, "nimbus server listening");

        let handle = tokio::spawn(async move {
            let shutdown = async move {
                token.cancelled().await;
                let closed = protocol.close_all();
                info!(closed, "closed live sessions");
            };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!(error = %e, "server error");
            }
            info!("server stopped");
        });

        Ok((addr, handle))
    }

    /// The protocol server.
    pub fn protocol(&self) -> &ProtocolServer {
        &self.protocol
    }

    /// The credential authority.
    pub fn authority(&self) -> &Arc<CredentialAuthority> {
        &self.authority
    }

    /// The shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// The server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
