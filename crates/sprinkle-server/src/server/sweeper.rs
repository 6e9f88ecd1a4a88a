//! Periodic archival sweep.
//!
//! The sweep itself is blocking (it takes per-allocation locks), so each run
//! goes to Tokio's blocking pool. Runs never overlap: the next tick is only
//! awaited once the previous run has returned, and ticks missed meanwhile are
//! delayed rather than burst.

use core::time::Duration;
use sprinkle::{ArchiveStore, Engine, LiveStore, RandSource, TimeSource};
use std::sync::Arc;
use tokio::{
    task::{JoinHandle, spawn_blocking},
    time::{MissedTickBehavior, interval},
};
use tokio_util::sync::CancellationToken;

/// Spawns the sweep loop. It runs once immediately, then every `period`,
/// until `shutdown` is cancelled.
pub fn spawn_sweeper<S, A, C, R>(
    engine: Arc<Engine<S, A, C, R>>,
    period: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()>
where
    S: LiveStore + 'static,
    A: ArchiveStore + 'static,
    C: TimeSource + Send + Sync + 'static,
    R: RandSource + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let engine = Arc::clone(&engine);
            match spawn_blocking(move || engine.run_archival_sweep()).await {
                Ok(report) if !report.is_clean() => {
                    tracing::warn!(
                        failed = report.failed.len(),
                        "Some expired allocations stay live until the next sweep"
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!("Archival sweep task failed: {e}");
                }
            }
        }

        tracing::info!("Archival sweeper stopped");
    })
}
