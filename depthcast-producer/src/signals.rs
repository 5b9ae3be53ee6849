//! Process signal handling.
//!
//! SIGINT, SIGTERM and SIGQUIT (Ctrl-C on non-Unix targets) request a
//! shutdown of the capture loop. The listener task does nothing else:
//! it sets the flag and exits.

use tokio::task::JoinHandle;
use tracing::info;

use depthcast_core::ShutdownHandle;

/// Install the listeners and return the task watching them.
#[cfg(unix)]
pub fn spawn_shutdown_listener(shutdown: ShutdownHandle) -> std::io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut quit = signal(SignalKind::quit())?;

    Ok(tokio::spawn(async move {
        let name = tokio::select! {
            _ = interrupt.recv() => "SIGINT",
            _ = terminate.recv() => "SIGTERM",
            _ = quit.recv() => "SIGQUIT",
        };
        info!("{name} received; shutting down after the current frame");
        shutdown.request();
    }))
}

/// Install the listeners and return the task watching them.
#[cfg(not(unix))]
pub fn spawn_shutdown_listener(shutdown: ShutdownHandle) -> std::io::Result<JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received; shutting down after the current frame");
            shutdown.request();
        }
    }))
}
