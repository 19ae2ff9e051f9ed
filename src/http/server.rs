//! HTTP server implementation.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};

use super::handlers::router;
use super::Mailer;
use crate::error::{MailgateError, Result};

/// HTTP server for the auth email routes.
pub struct HttpServer {
    /// Address to bind to
    addr: SocketAddr,
    mailer: Arc<Mailer>,
}

impl HttpServer {
    pub fn new(addr: SocketAddr, mailer: Arc<Mailer>) -> Self {
        Self { addr, mailer }
    }

    /// Bind and serve until `signal` resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.addr).await?;
        Self::serve_listener(listener, self.mailer, signal).await
    }

    /// Serve on an already bound listener until `signal` resolves.
    pub async fn serve_listener<F>(listener: TcpListener, mailer: Arc<Mailer>, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        info!(addr = %addr, "Starting HTTP server with graceful shutdown");

        axum::serve(listener, router(mailer))
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP server failed");
                MailgateError::Server(e.to_string())
            })
    }
}
