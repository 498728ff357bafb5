//! Bounded-concurrency driver over a work list of video paths (spec §4.11),
//! grounded on the teacher's `JobExecutor`: a `Semaphore` for concurrency,
//! a `watch` channel for cooperative cancellation, one spawned task per
//! video. Concurrency is resized by `ResourceMonitor` ticks instead of
//! fixed at construction time.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{error, info, warn};
use videx_store::{FolderStore, GlobalStore, SyncEngine};

use crate::config::IndexerConfig;
use crate::error::IndexerResult;
use crate::layered_indexer::{index_video, CancellationToken, Engines};
use crate::progress::Outcome;
use crate::resource_monitor::ResourceMonitor;
use crate::result::IndexResult;

pub struct Scheduler {
    permits: Arc<Semaphore>,
    target_permits: AtomicUsize,
    shutdown: tokio::sync::watch::Sender<bool>,
}

struct WatchCancellation(tokio::sync::watch::Receiver<bool>);

impl CancellationToken for WatchCancellation {
    fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }
}

impl Scheduler {
    pub fn new(initial_concurrency: usize) -> Self {
        let initial_concurrency = initial_concurrency.max(1);
        Self {
            permits: Arc::new(Semaphore::new(initial_concurrency)),
            target_permits: AtomicUsize::new(initial_concurrency),
            shutdown: tokio::sync::watch::channel(false).0,
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Applies a new concurrency cap from a `ResourceMonitor` sample: grows
    /// the semaphore with `add_permits`, shrinks it with `forget_permits`
    /// applied to whatever permits are currently idle (in-flight work is
    /// never preempted, only future admission is throttled).
    pub fn apply_concurrency(&self, recommended: usize) {
        let recommended = recommended.max(1);
        let previous = self.target_permits.swap(recommended, Ordering::SeqCst);
        if recommended > previous {
            self.permits.add_permits(recommended - previous);
        } else if recommended < previous {
            let to_forget = previous - recommended;
            let available = self.permits.available_permits();
            self.permits.forget_permits(to_forget.min(available));
        }
    }

    /// Runs `index_video` for every path in `work_list`, bounded by the
    /// current semaphore capacity, calling `on_outcome` once per video.
    /// Runs one consolidated forced sync at the end if any child result
    /// required it (spec §4.11).
    pub async fn run<'e>(
        &self,
        work_list: Vec<String>,
        folder_path: &str,
        folder_store: &FolderStore,
        global_store: Option<&GlobalStore>,
        config: &IndexerConfig,
        engines: &Engines<'e>,
        on_outcome: impl Fn(&str, Outcome) + Send + Sync,
    ) -> IndexerResult<()> {
        let mut requires_force_sync = false;

        for video_path in work_list {
            if *self.shutdown.subscribe().borrow() {
                info!("scheduler cancelled, not starting {video_path}");
                break;
            }

            let permit = match self.permits.clone().acquire_owned().await {
                Ok(p) => p,
                Err(_) => break,
            };

            let cancel = WatchCancellation(self.shutdown.subscribe());
            let result = index_video(&video_path, folder_path, folder_store, global_store, config, engines, &cancel).await;
            drop(permit);

            match result {
                Ok(IndexResult { requires_force_sync: rfs, .. }) if rfs => {
                    requires_force_sync = true;
                    on_outcome(&video_path, Outcome::Completed { requires_force_sync: true });
                }
                Ok(_) => on_outcome(&video_path, Outcome::Completed { requires_force_sync: false }),
                Err(crate::error::IndexerError::Cancelled) => on_outcome(&video_path, Outcome::Cancelled),
                Err(e) => {
                    warn!(video = %video_path, error = %e, "video indexing failed, continuing with remaining work");
                    on_outcome(&video_path, Outcome::Failed { error: e.to_string() });
                }
            }
        }

        if requires_force_sync {
            if let Some(global) = global_store {
                match SyncEngine::new(folder_store, global, folder_path).sync_forced() {
                    Ok(_) => {}
                    Err(e) => error!(error = %e, "consolidated forced sync failed"),
                }
            }
        }

        Ok(())
    }
}

/// Convenience wiring: spawns the resource monitor loop alongside a
/// scheduler, applying each sample to `scheduler`'s concurrency as soon as
/// that sample's tick completes.
pub fn spawn_resource_monitor_loop(
    scheduler: Arc<Scheduler>,
    monitor: Arc<ResourceMonitor>,
    sampler: Arc<dyn crate::resource_monitor::ResourceSampler>,
    shutdown: tokio::sync::watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let on_tick_scheduler = scheduler.clone();
        monitor.run(sampler.as_ref(), shutdown, move |cap| on_tick_scheduler.apply_concurrency(cap)).await;
    })
}
