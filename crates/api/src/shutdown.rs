//! Termination signals that drain the server.
//!
//! Cloud Run stops instances with SIGTERM; Ctrl-C covers local runs. A
//! signal whose handler cannot be installed never fires, so the server keeps
//! serving rather than exiting at startup.

use std::future::Future;

/// The signal that started a graceful shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
}

/// Resolve once the process is asked to stop.
pub async fn shutdown_signal() {
    let signal = first_signal(interrupt(), terminate()).await;
    tracing::info!(?signal, "Draining in-flight triggers before shutdown");
}

/// Report whichever of the two signal futures completes first.
pub async fn first_signal<I, T>(interrupt: I, terminate: T) -> ShutdownSignal
where
    I: Future<Output = ()>,
    T: Future<Output = ()>,
{
    tokio::select! {
        () = interrupt => ShutdownSignal::Interrupt,
        () = terminate => ShutdownSignal::Terminate,
    }
}

async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Ctrl-C handler unavailable");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
