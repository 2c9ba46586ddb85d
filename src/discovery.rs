use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::cache::DeviceCache;
use crate::delay::delay;
use crate::listener::AdvertisementListener;
use crate::transport::{DeviceFilter, Transport};
use crate::{Error, Result};

/// Finds the Bot, one scan at a time, and remembers it for a while.
///
/// Empty scans are retried up to `attempts` times with a fixed `cooldown`
/// between them. A caller arriving while a scan is running gets
/// [`Error::DiscoveryBusy`] instead of waiting for it.
pub struct Discovery<T: Transport> {
    transport: Arc<T>,
    filter: DeviceFilter,
    attempts: u32,
    cooldown: Duration,
    cache: DeviceCache<T::Device>,
    in_flight: Mutex<()>,
    listener: Arc<AdvertisementListener<T>>,
}

impl<T: Transport> Discovery<T> {
    pub fn new(
        transport: Arc<T>,
        filter: DeviceFilter,
        attempts: u32,
        cooldown: Duration,
        cache_ttl: Duration,
        listener: Arc<AdvertisementListener<T>>,
    ) -> Self {
        Self {
            transport,
            filter,
            attempts: attempts.max(1),
            cooldown,
            cache: DeviceCache::new(cache_ttl),
            in_flight: Mutex::new(()),
            listener,
        }
    }

    pub async fn find_device(&self) -> Result<T::Device> {
        if let Some(device) = self.cache.get() {
            return Ok(device);
        }

        let _in_flight = self.in_flight.try_lock().map_err(|_| {
            log::debug!("Discovery for {} already in progress", self.filter.address);
            Error::DiscoveryBusy
        })?;

        // A discovery may have finished between the cache check and the lock.
        if let Some(device) = self.cache.get() {
            return Ok(device);
        }

        for attempt in 1..=self.attempts {
            log::debug!(
                "Scanning for {} (attempt {}/{})",
                self.filter.address,
                attempt,
                self.attempts
            );

            let found = match self.transport.discover(&self.filter).await {
                Ok(found) => found,
                Err(e) => {
                    log::warn!("Discovery of {} failed: {}", self.filter.address, e);
                    Vec::new()
                }
            };

            if let Some(device) = found.into_iter().next() {
                log::info!("Found device {}", self.filter.address);
                self.cache.set(device.clone());
                self.listener.start_if_idle();
                return Ok(device);
            }

            if attempt < self.attempts {
                delay(self.cooldown).await;
            }
        }

        log::warn!(
            "Device {} not found after {} attempt(s)",
            self.filter.address,
            self.attempts
        );
        Err(Error::DeviceNotFound {
            address: self.filter.address,
            attempts: self.attempts,
        })
    }

    /// The cached handle, without scanning.
    pub fn cached(&self) -> Option<T::Device> {
        self.cache.get()
    }

    /// Forget the cached handle so the next lookup scans again.
    pub fn invalidate(&self) {
        self.cache.invalidate();
    }

    pub fn listener(&self) -> &Arc<AdvertisementListener<T>> {
        &self.listener
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::BOT_MODEL;
    use crate::testing::{address, FakeTransport};
    use tokio::time::Instant;

    const SCAN: Duration = Duration::from_millis(100);
    const COOLDOWN: Duration = Duration::from_millis(50);
    const TTL: Duration = Duration::from_secs(60);

    fn discovery(transport: &Arc<FakeTransport>, attempts: u32) -> Arc<Discovery<FakeTransport>> {
        let filter = DeviceFilter {
            address: address(),
            model: BOT_MODEL,
            duration: SCAN,
        };
        let listener = Arc::new(AdvertisementListener::new(
            transport.clone(),
            filter,
            Duration::from_secs(60),
        ));
        Arc::new(Discovery::new(
            transport.clone(),
            filter,
            attempts,
            COOLDOWN,
            TTL,
            listener,
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn retries_empty_scans_until_found() {
        let transport = Arc::new(FakeTransport::new());
        transport.miss_next_discoveries(2);
        let discovery = discovery(&transport, 3);

        let start = Instant::now();
        let device = discovery.find_device().await.unwrap();

        assert_eq!(device.generation, 3);
        assert_eq!(transport.discover_calls(), 3);
        assert!(start.elapsed() >= SCAN * 3 + COOLDOWN * 2);
        discovery.listener().stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_attempts() {
        let transport = Arc::new(FakeTransport::new());
        transport.miss_next_discoveries(10);
        let discovery = discovery(&transport, 3);

        let err = discovery.find_device().await.unwrap_err();

        assert!(matches!(err, Error::DeviceNotFound { attempts: 3, .. }));
        assert_eq!(transport.discover_calls(), 3);
        assert!(discovery.cached().is_none());
        assert!(!discovery.listener().is_scanning());

        // The guard was released, so a later lookup scans again.
        transport.miss_next_discoveries(0);
        assert!(discovery.find_device().await.is_ok());
        discovery.listener().stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_lookup_fails_fast() {
        let transport = Arc::new(FakeTransport::new());
        let discovery = discovery(&transport, 3);

        let first = tokio::spawn({
            let discovery = discovery.clone();
            async move { discovery.find_device().await }
        });
        tokio::time::sleep(SCAN / 2).await;

        let second = discovery.find_device().await;
        assert!(matches!(second, Err(Error::DiscoveryBusy)));

        assert!(first.await.unwrap().is_ok());
        assert_eq!(transport.discover_calls(), 1);
        assert_eq!(transport.max_discoveries_in_flight(), 1);
        discovery.listener().stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn cached_device_is_reused_until_ttl() {
        let transport = Arc::new(FakeTransport::new());
        let discovery = discovery(&transport, 1);

        let first = discovery.find_device().await.unwrap();
        let second = discovery.find_device().await.unwrap();
        assert_eq!(first.generation, second.generation);
        assert_eq!(transport.discover_calls(), 1);

        tokio::time::sleep(TTL).await;
        let third = discovery.find_device().await.unwrap();
        assert_eq!(third.generation, 2);
        discovery.listener().stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_forces_new_scan() {
        let transport = Arc::new(FakeTransport::new());
        let discovery = discovery(&transport, 1);

        discovery.find_device().await.unwrap();
        discovery.invalidate();
        discovery.find_device().await.unwrap();

        assert_eq!(transport.discover_calls(), 2);
        discovery.listener().stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn success_starts_listener_once() {
        let transport = Arc::new(FakeTransport::new());
        let discovery = discovery(&transport, 1);

        discovery.find_device().await.unwrap();
        discovery.invalidate();
        discovery.find_device().await.unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert!(discovery.listener().is_scanning());
        assert_eq!(transport.start_scan_calls(), 1);
        discovery.listener().stop().await;
    }
}
