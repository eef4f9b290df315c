// Web module - HTTP API and WebSocket feed for browser clients
//
// The router only parses requests into client events for the controller and
// hands each WebSocket a notifier subscription. It never touches the canvas.

mod error;
mod handlers;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;

use crate::events::ClientHandle;
use crate::notifier::Notifier;

/// Shared state for the web handlers
#[derive(Clone)]
pub struct WebState {
    pub(crate) notifier: Arc<Notifier>,
    pub(crate) client: ClientHandle,
    /// Payloads buffered per WebSocket before the client counts as too slow
    pub(crate) subscriber_buffer: usize,
}

impl WebState {
    pub fn new(notifier: Arc<Notifier>, client: ClientHandle, subscriber_buffer: usize) -> Self {
        Self {
            notifier,
            client,
            subscriber_buffer: subscriber_buffer.max(1),
        }
    }
}

/// Build the router; unlisted methods on known paths answer 405
pub fn router(state: WebState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/canvas/register", get(handlers::register))
        .route("/api/canvas/color", post(handlers::set_color))
        .route("/api/canvas/tool", post(handlers::set_tool))
        .route("/api/canvas/reset", post(handlers::reset))
        .route("/api/canvas/undo", post(handlers::undo))
        .route("/api/canvas/download", get(handlers::download))
        .with_state(state)
}

/// Serve until `shutdown` resolves
pub async fn start_server<F>(bind_addr: SocketAddr, state: WebState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(state);

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;

    tracing::info!("Web server listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error")?;

    tracing::info!("Web server shut down gracefully");
    Ok(())
}
