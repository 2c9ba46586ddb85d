//! Scripted in-memory transport for unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use btleplug::api::BDAddr;
use futures::StreamExt;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::advertisement::{Advertisement, AdvertisementStream, BotMode};
use crate::common::BOT_MODEL;
use crate::transport::{BotHandle, DeviceFilter, Transport};
use crate::TransportError;

pub(crate) fn address() -> BDAddr {
    BDAddr::from([0xc1, 0x22, 0x33, 0x44, 0x55, 0x66])
}

pub(crate) fn other_address() -> BDAddr {
    BDAddr::from([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff])
}

pub(crate) fn advertisement(mode: BotMode, state: bool, battery: u8) -> Advertisement {
    Advertisement {
        address: address(),
        model: BOT_MODEL,
        mode,
        state,
        battery,
    }
}

#[derive(Debug, Default)]
struct Actuations {
    on: AtomicUsize,
    off: AtomicUsize,
    /// Writes that fail before writes start succeeding again.
    failures: AtomicUsize,
}

#[derive(Clone, Debug)]
pub(crate) struct FakeDevice {
    address: BDAddr,
    /// Distinguishes handles returned by different discoveries.
    pub(crate) generation: usize,
    actuations: Arc<Actuations>,
}

impl FakeDevice {
    fn write(&self, counter: &AtomicUsize) -> Result<(), TransportError> {
        counter.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .actuations
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();

        if failing {
            Err(TransportError::Other("write failed".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BotHandle for FakeDevice {
    fn address(&self) -> BDAddr {
        self.address
    }

    async fn turn_on(&self) -> Result<(), TransportError> {
        self.write(&self.actuations.on)
    }

    async fn turn_off(&self) -> Result<(), TransportError> {
        self.write(&self.actuations.off)
    }
}

pub(crate) struct FakeTransport {
    actuations: Arc<Actuations>,
    /// Discoveries that come back empty before the device answers.
    misses: AtomicUsize,
    discover_calls: AtomicUsize,
    discoveries_in_flight: AtomicUsize,
    max_discoveries_in_flight: AtomicUsize,
    start_scan_calls: AtomicUsize,
    stop_scan_calls: AtomicUsize,
    fail_next_scan: AtomicBool,
    advertisements: broadcast::Sender<Advertisement>,
}

impl FakeTransport {
    pub(crate) fn new() -> Self {
        let (advertisements, _) = broadcast::channel(16);

        Self {
            actuations: Arc::default(),
            misses: AtomicUsize::new(0),
            discover_calls: AtomicUsize::new(0),
            discoveries_in_flight: AtomicUsize::new(0),
            max_discoveries_in_flight: AtomicUsize::new(0),
            start_scan_calls: AtomicUsize::new(0),
            stop_scan_calls: AtomicUsize::new(0),
            fail_next_scan: AtomicBool::new(false),
            advertisements,
        }
    }

    pub(crate) fn miss_next_discoveries(&self, count: usize) {
        self.misses.store(count, Ordering::SeqCst);
    }

    pub(crate) fn fail_next_writes(&self, count: usize) {
        self.actuations.failures.store(count, Ordering::SeqCst);
    }

    pub(crate) fn fail_next_scan(&self) {
        self.fail_next_scan.store(true, Ordering::SeqCst);
    }

    pub(crate) fn advertise(&self, advertisement: Advertisement) {
        self.advertisements.send(advertisement).ok();
    }

    pub(crate) fn discover_calls(&self) -> usize {
        self.discover_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_discoveries_in_flight(&self) -> usize {
        self.max_discoveries_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn turn_on_calls(&self) -> usize {
        self.actuations.on.load(Ordering::SeqCst)
    }

    pub(crate) fn turn_off_calls(&self) -> usize {
        self.actuations.off.load(Ordering::SeqCst)
    }

    pub(crate) fn start_scan_calls(&self) -> usize {
        self.start_scan_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn stop_scan_calls(&self) -> usize {
        self.stop_scan_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    type Device = FakeDevice;

    async fn discover(&self, filter: &DeviceFilter) -> Result<Vec<FakeDevice>, TransportError> {
        let generation = self.discover_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let in_flight = self.discoveries_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_discoveries_in_flight
            .fetch_max(in_flight, Ordering::SeqCst);

        tokio::time::sleep(filter.duration).await;
        self.discoveries_in_flight.fetch_sub(1, Ordering::SeqCst);

        let missed = self
            .misses
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();

        if missed {
            Ok(Vec::new())
        } else {
            Ok(vec![FakeDevice {
                address: filter.address,
                generation,
                actuations: self.actuations.clone(),
            }])
        }
    }

    async fn start_scan(
        &self,
        _filter: &DeviceFilter,
    ) -> Result<AdvertisementStream, TransportError> {
        self.start_scan_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_next_scan.swap(false, Ordering::SeqCst) {
            return Err(TransportError::Other("scan failed".into()));
        }

        let receiver = self.advertisements.subscribe();
        Ok(Box::pin(
            BroadcastStream::new(receiver).filter_map(|x| async move { x.ok() }),
        ))
    }

    async fn stop_scan(&self) -> Result<(), TransportError> {
        self.stop_scan_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
