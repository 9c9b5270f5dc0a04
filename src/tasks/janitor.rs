//! TTL Janitor Task
//!
//! Background task that periodically reclaims expired cache entries.

use std::sync::Weak;
use std::time::{Duration, Instant};

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheCore;
use crate::error::Result;

// == Janitor Handle ==
/// Owner side of a running janitor.
///
/// Dropping the handle closes the shutdown channel, which also stops the task.
#[derive(Debug)]
pub(crate) struct JanitorHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl JanitorHandle {
    /// Signals the janitor to stop and waits for it to exit.
    pub(crate) async fn stop(self) -> Result<()> {
        // Err only means the task already exited and dropped its receiver
        let _ = self.shutdown.send(true);
        self.task.await?;
        Ok(())
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Spawns a background task that periodically removes expired entries.
///
/// The task sleeps for `interval`, then runs one sweep through the same
/// removal path as explicit deletes, reporting each reclaimed entry to the
/// eviction callback. It exits when signalled through the returned handle,
/// when the handle is dropped, or when the cache itself is gone.
///
/// # Arguments
/// * `cache` - Weak reference to the shared cache state
/// * `interval` - Period between sweeps
/// * `runtime` - Runtime the task is spawned on
pub(crate) fn spawn_janitor<V: Send + 'static>(
    cache: Weak<CacheCore<V>>,
    interval: Duration,
    runtime: &Handle,
) -> JanitorHandle {
    let (shutdown, mut shutdown_rx) = watch::channel(false);

    let task = runtime.spawn(async move {
        info!("Starting janitor with interval of {:?}", interval);

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                // Fires on an explicit stop and when the sender is dropped
                _ = shutdown_rx.changed() => break,
            }

            let Some(cache) = cache.upgrade() else {
                break;
            };

            let started = Instant::now();
            let removed = cache.sweep_expired();
            drop(cache);

            if removed > 0 {
                info!(
                    "Janitor: removed {} expired entries in {:?}",
                    removed,
                    started.elapsed()
                );
            } else {
                debug!("Janitor: no expired entries found");
            }
        }

        info!("Janitor stopped");
    });

    JanitorHandle { shutdown, task }
}
