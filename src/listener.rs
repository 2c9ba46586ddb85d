use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use futures::StreamExt;
use stream_cancel::{Trigger, Tripwire};
use tokio::task::JoinHandle;

use crate::advertisement::Observation;
use crate::transport::{DeviceFilter, Transport};
use crate::TransportError;

/// Clears the scanning flag when the scan task ends, however it ends.
struct ScanningGuard(Arc<AtomicBool>);

impl Drop for ScanningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct ScanTask {
    stopper: Trigger,
    handle: JoinHandle<()>,
}

/// Background scan that keeps an [`Observation`] of the device's broadcast
/// status up to date.
pub struct AdvertisementListener<T: Transport> {
    transport: Arc<T>,
    filter: DeviceFilter,
    /// How long one background scan runs before stopping by itself.
    duration: Duration,
    scanning: Arc<AtomicBool>,
    task: Mutex<Option<ScanTask>>,
    observation: Arc<RwLock<Observation>>,
}

impl<T: Transport> AdvertisementListener<T> {
    pub fn new(transport: Arc<T>, filter: DeviceFilter, duration: Duration) -> Self {
        Self {
            transport,
            filter,
            duration,
            scanning: Arc::new(AtomicBool::new(false)),
            task: Mutex::new(None),
            observation: Arc::new(RwLock::new(Observation::default())),
        }
    }

    /// Start a background scan unless one is already running.
    ///
    /// Returns `true` if a new scan was started.
    pub fn start_if_idle(&self) -> bool {
        if self
            .scanning
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::debug!("Advertisement scan for {} already running", self.filter.address);
            return false;
        }

        let guard = ScanningGuard(self.scanning.clone());
        let (stopper, tripwire) = Tripwire::new();
        let transport = self.transport.clone();
        let observation = self.observation.clone();
        let filter = self.filter;
        let duration = self.duration;

        let handle = tokio::spawn(async move {
            let address = filter.address;
            let result = listen(guard, transport, filter, duration, observation, tripwire).await;
            if let Err(e) = result {
                log::warn!("Advertisement scan for {} failed: {}", address, e);
            }
        });

        // A finished task's stopper is simply replaced.
        *self.task.lock().unwrap() = Some(ScanTask { stopper, handle });
        true
    }

    /// Stop the background scan, if any, and wait for it to wind down.
    pub async fn stop(&self) {
        let task = self.task.lock().unwrap().take();

        if let Some(ScanTask { stopper, handle }) = task {
            stopper.cancel();
            if let Err(e) = handle.await {
                log::error!("Advertisement scan task ended abnormally: {:?}", e);
            }
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::Acquire)
    }

    pub fn observation(&self) -> Observation {
        *self.observation.read().unwrap()
    }
}

async fn listen<T: Transport>(
    guard: ScanningGuard,
    transport: Arc<T>,
    filter: DeviceFilter,
    duration: Duration,
    observation: Arc<RwLock<Observation>>,
    tripwire: Tripwire,
) -> Result<(), TransportError> {
    let _guard = guard;

    log::info!("Listening for advertisements from {}", filter.address);
    let mut advertisements = transport.start_scan(&filter).await?;

    let deadline = tokio::time::sleep(duration);
    tokio::pin!(deadline);
    tokio::pin!(tripwire);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = &mut tripwire => break,
            advertisement = advertisements.next() => match advertisement {
                Some(adv) if adv.address == filter.address && adv.model == filter.model => {
                    log::trace!(
                        "Advertisement from {}: mode {:?}, state {}, battery {}%",
                        adv.address, adv.mode, adv.state, adv.battery
                    );
                    observation.write().unwrap().record(&adv);
                }
                Some(_) => {}
                None => break,
            },
        }
    }

    transport.stop_scan().await?;
    log::info!("Stopped listening for advertisements from {}", filter.address);
    Ok(())
}
