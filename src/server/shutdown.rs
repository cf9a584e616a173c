//! Serving with a shared shutdown signal.
//!
//! On shutdown the HTTP server stops accepting connections and drains
//! in-flight requests, while the capability session is released at once.
//! Runs still in progress lose their connection and fail with
//! `ConnectionNotReady` on their next tool call.

use std::future::Future;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::session::MaintenanceHandle;

/// Serve `app` until `signal` resolves, then stop the maintenance task
/// without waiting for outstanding requests.
pub async fn serve_until<F>(
    listener: TcpListener,
    app: Router,
    maintenance: MaintenanceHandle,
    signal: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (stop_tx, stop_rx) = watch::channel(false);
    let mut server_rx = stop_rx.clone();
    let mut session_rx = stop_rx;

    let signal_task = tokio::spawn(async move {
        signal.await;
        let _ = stop_tx.send(true);
    });
    let release_task = tokio::spawn(async move {
        // Also resolves when the sender is dropped, i.e. the server exited.
        let _ = session_rx.wait_for(|stop| *stop).await;
        tracing::info!("Shutting down capability session...");
        maintenance.shutdown().await;
    });

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = server_rx.wait_for(|stop| *stop).await;
        })
        .await;

    signal_task.abort();
    if let Err(e) = release_task.await {
        tracing::error!("Capability session shutdown task failed: {}", e);
    }
    served
}
