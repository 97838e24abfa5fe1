//! Background task wrapper around `ZoneUpdater`: a synchronous priming
//! pass on `start()`, then a loop that re-probes every `min_interval`
//! seconds minus however long the last pass took, and a `stop()` that waits
//! at most `connection_timeout + 1` seconds before giving up and logging.
//!
//! Grounded on `dns_server_zone_updater_threated.py`: same priming-then-loop
//! shape, rendered as a spawned `tokio` task instead of a daemon thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::dns::zone_updater::{Zone, ZoneUpdater, ZoneUpdaterError};

pub struct ZoneUpdaterWorker {
    updater: Arc<tokio::sync::Mutex<ZoneUpdater>>,
    snapshot: Arc<Mutex<Arc<Zone>>>,
    min_interval: u32,
    connection_timeout: u32,
    should_abort: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ZoneUpdaterWorker {
    pub fn new(updater: ZoneUpdater, min_interval: u32, connection_timeout: u32) -> Self {
        let snapshot = updater.snapshot_handle();
        Self {
            updater: Arc::new(tokio::sync::Mutex::new(updater)),
            snapshot,
            min_interval,
            connection_timeout,
            should_abort: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Cheap, cloneable read handle. Reads the snapshot pointer directly and
    /// never contends with the background loop's `updater` lock, which it
    /// holds for the full duration of a probe pass.
    pub fn reader(&self) -> ReaderHandle {
        ReaderHandle {
            snapshot: self.snapshot.clone(),
        }
    }

    /// Runs the synchronous priming pass (`check_ips = false`, so the zone
    /// is published immediately without waiting on TCP probes), then spawns
    /// the background loop. Calling `start()` twice is a no-op on the
    /// second call.
    pub async fn start(&mut self) -> Result<(), ZoneUpdaterError> {
        if self.handle.is_some() {
            return Ok(());
        }

        {
            let mut updater = self.updater.lock().await;
            updater.update(false, self.should_abort.clone()).await?;
        }

        let updater = self.updater.clone();
        let min_interval = self.min_interval;
        let should_abort = self.should_abort.clone();

        self.handle = Some(tokio::spawn(async move {
            loop {
                if should_abort.load(Ordering::Relaxed) {
                    break;
                }

                let pass_started = Instant::now();
                {
                    let mut updater = updater.lock().await;
                    if let Err(e) = updater.update(true, should_abort.clone()).await {
                        warn!("zone update pass failed: {e}");
                    }
                }

                if should_abort.load(Ordering::Relaxed) {
                    break;
                }

                let elapsed = pass_started.elapsed();
                let sleep_for = Duration::from_secs(min_interval as u64).saturating_sub(elapsed);
                tokio::time::sleep(sleep_for).await;
            }
            info!("zone updater background loop stopped");
        }));

        Ok(())
    }

    /// Signals the background loop to stop and waits up to
    /// `connection_timeout + 1` seconds for it to exit. Returns `false`
    /// (and logs a warning) if the loop is still running after the
    /// deadline — mirroring the Python wrapper's non-fatal join timeout.
    pub async fn stop(&mut self) -> bool {
        self.should_abort.store(true, Ordering::Relaxed);

        let Some(handle) = self.handle.take() else {
            return true;
        };

        let deadline = Duration::from_secs(self.connection_timeout as u64 + 1);
        match tokio::time::timeout(deadline, handle).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!("zone updater task panicked: {e}");
                false
            }
            Err(_) => {
                warn!("zone updater did not stop within {deadline:?}");
                false
            }
        }
    }
}

/// Cheap, cloneable handle the UDP server holds to read the current
/// snapshot without taking part in the update lifecycle. Holds only the
/// snapshot pointer itself, not `ZoneUpdater`'s outer lock, so a query never
/// waits behind an in-progress probe pass.
#[derive(Clone)]
pub struct ReaderHandle {
    snapshot: Arc<Mutex<Arc<Zone>>>,
}

impl ReaderHandle {
    pub async fn zone(&self) -> Arc<Zone> {
        self.snapshot.lock().expect("snapshot mutex poisoned").clone()
    }
}
