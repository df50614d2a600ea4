//! Startup helpers for the development backend.

use std::process::ExitCode;

use crate::mock_backend::{self, MockConfig, MockState};
use crate::telemetry;

/// Run the backend until Ctrl+C (used by the `sidrex-mock-backend` binary).
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    telemetry::init_tracing();
    tracing::info!("Starting Sidrex mock backend v{}", env!("CARGO_PKG_VERSION"));

    let config = MockConfig::from_env();
    tracing::info!(
        port = config.port,
        chat_delay_ms = u64::try_from(config.chat_delay.as_millis()).unwrap_or(u64::MAX),
        "configuration loaded"
    );
    let port = config.port;
    let state = MockState::new(config);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(mock_backend::run_with_shutdown(state, port, shutdown_signal())) {
        tracing::error!("Server error: {e}");
        return ExitCode::from(1);
    }

    tracing::info!("Mock backend stopped");
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}
