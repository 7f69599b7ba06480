mod handlers;
mod routes;

pub use routes::create_router;

use crate::app_state::AppState;
use crate::error::ServerError;
use crate::prelude::*;
use axum_server::Handle;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub async fn run_server(app_state: Arc<AppState>, addr: SocketAddr, handle: Handle) -> Result<()> {
    let app: axum::Router = routes::create_router(app_state);

    tracing::info!("Listening on {}", addr);
    axum_server::bind(addr)
        .handle(handle)
        .serve(app.into_make_service())
        .await
        .map_err(ServerError::Serve)?;

    Ok(())
}

/// The HTTP listener running in the background.
pub struct HttpServer {
    handle: Handle,
    task: JoinHandle<Result<()>>,
}

impl HttpServer {
    pub fn spawn(app_state: Arc<AppState>, addr: SocketAddr) -> Self {
        let handle = Handle::new();
        let task = tokio::spawn(run_server(app_state, addr, handle.clone()));
        Self { handle, task }
    }

    /// The bound address, once the listener is up. `None` if binding failed.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.handle.listening().await
    }

    /// Stops accepting connections and waits up to `grace` for in-flight
    /// requests before the listener exits.
    pub async fn shutdown(self, grace: Duration) -> Result<()> {
        self.handle.graceful_shutdown(Some(grace));
        self.task
            .await
            .map_err(|e| ServerError::Task(e.to_string()))?
    }
}
