//! Development backend speaking the same HTTP contract as the production API.
//!
//! Provides:
//! - CSRF cookie issuing and double-submit checks
//! - Session login, logout, registration and current user
//! - Robots, their opening messages and PDFs
//! - A chat endpoint with configurable latency

pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{DEFAULT_PORT, MockConfig, MockState};

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

fn app(state: Arc<MockState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Serve on an already bound listener until `shutdown_signal` completes.
///
/// # Errors
/// Returns an error if the listener fails.
pub async fn serve<F>(
    listener: TcpListener,
    state: Arc<MockState>,
    shutdown_signal: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Sidrex mock backend listening on http://{}", addr);
    }
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal)
        .await
}

/// Bind `0.0.0.0:port` and serve until `shutdown_signal` completes.
///
/// # Errors
/// Returns an error if the port cannot be bound or the server fails.
pub async fn run_with_shutdown<F>(
    state: Arc<MockState>,
    port: u16,
    shutdown_signal: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    serve(listener, state, shutdown_signal).await
}
