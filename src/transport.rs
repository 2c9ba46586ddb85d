use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::BDAddr;

use crate::advertisement::AdvertisementStream;
use crate::TransportError;

/// Identifies the one device a scan is looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceFilter {
    pub address: BDAddr,
    pub model: u8,
    /// How long a discovery scan may run.
    pub duration: Duration,
}

/// A connectable Bot.
#[async_trait]
pub trait BotHandle: Clone + Send + Sync + 'static {
    fn address(&self) -> BDAddr;

    async fn turn_on(&self) -> Result<(), TransportError>;

    async fn turn_off(&self) -> Result<(), TransportError>;
}

/// The BLE capabilities the Bot needs.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    type Device: BotHandle;

    /// Scan for up to `filter.duration` and return the matching devices.
    async fn discover(&self, filter: &DeviceFilter) -> Result<Vec<Self::Device>, TransportError>;

    /// Start a scan and stream advertisements from the filtered device.
    async fn start_scan(
        &self,
        filter: &DeviceFilter,
    ) -> Result<AdvertisementStream, TransportError>;

    /// Release a scan started with [`Transport::start_scan`].
    async fn stop_scan(&self) -> Result<(), TransportError>;
}
