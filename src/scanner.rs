use std::sync::Arc;

use async_trait::async_trait;
use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::StreamExt;
use tokio::sync::{Mutex, OnceCell};

use crate::advertisement::{Advertisement, AdvertisementStream};
use crate::device::BotDevice;
use crate::transport::{DeviceFilter, Transport};
use crate::TransportError;

pub(crate) struct Session {
    pub(crate) _manager: Manager,
    pub(crate) adapter: Adapter,
}

/// [`Transport`] backed by the host Bluetooth adapter.
///
/// The adapter session is opened on first use. Scans are reference counted,
/// so a discovery finishing does not stop a running advertisement scan.
pub struct BleTransport {
    /// Index of the Bluetooth adapter to use.
    adapter_index: usize,
    session: OnceCell<Arc<Session>>,
    /// Number of callers currently holding the adapter in scanning state.
    active_scans: Mutex<usize>,
}

impl Default for BleTransport {
    fn default() -> Self {
        BleTransport::new()
    }
}

impl BleTransport {
    pub fn new() -> Self {
        Self {
            adapter_index: 0,
            session: OnceCell::new(),
            active_scans: Mutex::new(0),
        }
    }

    /// Index of bluetooth adapter to use
    pub fn adapter_index(mut self, index: usize) -> Self {
        self.adapter_index = index;
        self
    }

    async fn session(&self) -> Result<Arc<Session>, TransportError> {
        self.session
            .get_or_try_init(|| async {
                let manager = Manager::new().await?;
                let mut adapters = manager.adapters().await?;

                if self.adapter_index >= adapters.len() {
                    return Err(TransportError::AdapterNotAvailable);
                }

                let adapter = adapters.swap_remove(self.adapter_index);
                log::trace!("Using adapter: {:?}", adapter);

                Ok::<_, TransportError>(Arc::new(Session {
                    _manager: manager,
                    adapter,
                }))
            })
            .await
            .cloned()
    }

    async fn acquire_scan(&self, session: &Session) -> Result<(), TransportError> {
        let mut active = self.active_scans.lock().await;
        if *active == 0 {
            log::info!("Starting the scan");
            session.adapter.start_scan(ScanFilter::default()).await?;
        }
        *active += 1;
        Ok(())
    }

    async fn release_scan(&self, session: &Session) -> Result<(), TransportError> {
        let mut active = self.active_scans.lock().await;
        match *active {
            0 => log::info!("Scanner is already stopped"),
            1 => {
                *active = 0;
                session.adapter.stop_scan().await?;
                log::info!("Scanner was stopped.");
            }
            _ => *active -= 1,
        }
        Ok(())
    }

    /// Checks if the peripheral is the filtered device. Waits for service data
    /// before accepting it, so the model can be verified.
    async fn matches(peripheral: &Peripheral, filter: &DeviceFilter) -> bool {
        if peripheral.address() != filter.address {
            return false;
        }

        match peripheral.properties().await {
            Ok(Some(props)) => {
                Advertisement::from_service_data(filter.address, &props.service_data)
                    .map(|adv| adv.model == filter.model)
                    .unwrap_or(false)
            }
            _ => false,
        }
    }

    async fn matching_peripheral(
        session: &Arc<Session>,
        peripheral_id: &PeripheralId,
        filter: &DeviceFilter,
    ) -> Option<BotDevice> {
        let peripheral = session.adapter.peripheral(peripheral_id).await.ok()?;
        log::trace!("Device updated: {:?}", peripheral);

        if Self::matches(&peripheral, filter).await {
            Some(BotDevice::new(session.clone(), peripheral))
        } else {
            None
        }
    }

    async fn scan_for(
        &self,
        session: &Arc<Session>,
        filter: &DeviceFilter,
    ) -> Result<Vec<BotDevice>, TransportError> {
        let mut events = session.adapter.events().await?;
        let deadline = tokio::time::sleep(filter.duration);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    log::debug!("Scan for {} timed out", filter.address);
                    return Ok(Vec::new());
                }
                event = events.next() => match event {
                    Some(CentralEvent::DeviceDiscovered(id))
                    | Some(CentralEvent::DeviceUpdated(id))
                    | Some(CentralEvent::ServiceDataAdvertisement { id, .. }) => {
                        let device = Self::matching_peripheral(session, &id, filter).await;
                        if let Some(device) = device {
                            return Ok(vec![device]);
                        }
                    }
                    Some(_) => {}
                    None => return Ok(Vec::new()),
                },
            }
        }
    }
}

#[async_trait]
impl Transport for BleTransport {
    type Device = BotDevice;

    async fn discover(&self, filter: &DeviceFilter) -> Result<Vec<BotDevice>, TransportError> {
        let session = self.session().await?;

        // The adapter may already know the device from an earlier scan.
        for peripheral in session.adapter.peripherals().await? {
            if Self::matches(&peripheral, filter).await {
                log::info!("Found known device: {}", filter.address);
                return Ok(vec![BotDevice::new(session.clone(), peripheral)]);
            }
        }

        self.acquire_scan(&session).await?;
        let found = self.scan_for(&session, filter).await;
        self.release_scan(&session).await?;

        let found = found?;
        for device in &found {
            log::info!("Found device: {:?} (rssi {:?})", device, device.rssi().await);
        }
        Ok(found)
    }

    async fn start_scan(
        &self,
        filter: &DeviceFilter,
    ) -> Result<AdvertisementStream, TransportError> {
        let session = self.session().await?;
        let events = session.adapter.events().await?;
        self.acquire_scan(&session).await?;

        let address = filter.address;
        let model = filter.model;

        Ok(Box::pin(events.filter_map(move |event| {
            let session = session.clone();
            async move {
                let CentralEvent::ServiceDataAdvertisement { id, service_data } = event else {
                    return None;
                };
                let peripheral = session.adapter.peripheral(&id).await.ok()?;
                if peripheral.address() != address {
                    return None;
                }
                Advertisement::from_service_data(address, &service_data)
                    .filter(|adv| adv.model == model)
            }
        })))
    }

    async fn stop_scan(&self) -> Result<(), TransportError> {
        match self.session.get() {
            Some(session) => self.release_scan(session).await,
            None => Ok(()),
        }
    }
}
