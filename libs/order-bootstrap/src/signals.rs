//! Process termination signals.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// Ctrl+C / SIGINT.
    Interrupt,
    /// SIGTERM.
    Terminate,
}

impl ShutdownSignal {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Interrupt => "interrupt",
            Self::Terminate => "terminate",
        }
    }
}

/// Resolves with the first termination signal the process receives.
///
/// # Errors
/// Returns an error if a signal listener cannot be installed.
pub async fn wait_for_shutdown() -> std::io::Result<ShutdownSignal> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            interrupted = tokio::signal::ctrl_c() => interrupted.map(|()| ShutdownSignal::Interrupt),
            _ = terminate.recv() => Ok(ShutdownSignal::Terminate),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .map(|()| ShutdownSignal::Interrupt)
    }
}

/// Cancel `token` on the first termination signal.
///
/// The watcher also ends, without doing anything, once `token` is cancelled by
/// someone else. If no signal listener can be installed the process keeps
/// running and only an explicit cancel stops it.
pub fn cancel_on_shutdown(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            () = token.cancelled() => {}
            outcome = wait_for_shutdown() => match outcome {
                Ok(signal) => {
                    tracing::info!(signal = signal.as_str(), "shutdown requested");
                    token.cancel();
                }
                Err(e) => {
                    tracing::error!(error = %e, "cannot listen for termination signals");
                }
            },
        }
    })
}
