//! Track command: feeds editor events from stdin into a live tracker.
//!
//! Events arrive as one JSON object per line, e.g.
//! `{"type":"text_change","file_path":"/ws/app/src/main.rs"}`. The loop ends
//! when the input closes or on SIGINT/SIGTERM (Ctrl-C elsewhere); either way
//! the open session is closed and the final snapshot written.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use ft_core::{ActivityEvent, SessionStore, SessionTracker, SystemClock};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

use crate::Config;
use crate::context::TrackerContext;
use crate::lock::WriterLock;

pub fn run(config: &Config, roots: &[PathBuf]) -> Result<()> {
    let _lock = WriterLock::acquire(&config.database_path)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let result = runtime.block_on(async {
        let mut signals = ShutdownSignals::new()?;
        let context = TrackerContext::start(config, roots, Arc::new(SystemClock))?;
        tracing::info!(
            database = %config.database_path.display(),
            "tracking, reading events from stdin"
        );

        let shutdown = async {
            let signal = signals.recv().await;
            tracing::info!(signal, "shutting down");
        };
        let pumped = pump_events(context.tracker(), tokio::io::stdin(), shutdown).await;
        context.shutdown()?;

        let handled = pumped?;
        tracing::info!(handled, "tracker stopped");
        Ok::<_, anyhow::Error>(())
    });

    // The stdin reader sits on a blocking thread that cannot be interrupted;
    // don't wait for it once the final snapshot is written.
    runtime.shutdown_background();
    result
}

/// Process signals that end a tracking run.
///
/// Handlers are installed on construction, so a signal delivered any time
/// afterwards takes the clean shutdown path.
struct ShutdownSignals {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl ShutdownSignals {
    #[cfg(unix)]
    fn new() -> Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())
                .context("failed to install SIGINT handler")?,
            terminate: signal(SignalKind::terminate())
                .context("failed to install SIGTERM handler")?,
        })
    }

    #[cfg(not(unix))]
    #[expect(clippy::unnecessary_wraps, reason = "matches the unix constructor")]
    const fn new() -> Result<Self> {
        Ok(Self {})
    }

    /// Waits for the next shutdown signal and returns its name.
    #[cfg(unix)]
    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        }
    }

    #[cfg(not(unix))]
    async fn recv(&mut self) -> &'static str {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
        "Ctrl-C"
    }
}

/// Dispatches JSON-line events from `input` until it closes or `shutdown` completes.
///
/// Malformed lines are logged and skipped. Returns the number of events handled.
pub async fn pump_events<S, R, F>(tracker: &SessionTracker<S>, input: R, shutdown: F) -> Result<u64>
where
    S: SessionStore,
    R: AsyncRead + Unpin,
    F: Future<Output = ()>,
{
    let mut lines = BufReader::new(input).lines();
    tokio::pin!(shutdown);

    let mut handled = 0;
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read events")? else {
                    tracing::debug!("input closed");
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<ActivityEvent>(line) {
                    Ok(event) => {
                        tracker.handle_event(&event);
                        handled += 1;
                    }
                    Err(err) => tracing::warn!(error = %err, line, "skipping malformed event"),
                }
            }
            () = &mut shutdown => break,
        }
    }

    Ok(handled)
}
