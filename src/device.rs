use std::sync::Arc;

use async_trait::async_trait;
use btleplug::api::{BDAddr, Peripheral as _};
use btleplug::platform::Peripheral;

use crate::characteristic::Characteristic;
use crate::common::{characteristics, commands, services};
use crate::scanner::Session;
use crate::transport::BotHandle;
use crate::TransportError;

/// A Bot found by [`BleTransport`](crate::BleTransport).
#[derive(Clone)]
pub struct BotDevice {
    pub(self) _session: Arc<Session>,
    pub(crate) peripheral: Peripheral,
}

impl BotDevice {
    pub(crate) fn new(session: Arc<Session>, peripheral: Peripheral) -> Self {
        Self {
            _session: session,
            peripheral,
        }
    }

    /// Signal strength
    pub async fn rssi(&self) -> Option<i16> {
        self.peripheral
            .properties()
            .await
            .ok()
            .flatten()
            .and_then(|props| props.rssi)
    }

    /// Connect, write `command` and disconnect again.
    async fn send(&self, command: &[u8]) -> Result<(), TransportError> {
        let characteristic = self.command_characteristic().await?;

        log::debug!(
            "Writing {:02x?} to {} on {}",
            command,
            characteristic.uuid(),
            self.address()
        );
        let written = characteristic.write_request(command).await;

        if let Err(e) = self.peripheral.disconnect().await {
            log::warn!("Could not disconnect from {}: {:?}", self.address(), e);
        }

        written.map_err(TransportError::from)
    }

    async fn command_characteristic(&self) -> Result<Characteristic, TransportError> {
        if !self.peripheral.is_connected().await? {
            log::debug!("Connecting to device {}", self.address());
            self.peripheral.connect().await?;
        }

        let mut found = self.peripheral.characteristics();
        if found.is_empty() {
            self.peripheral.discover_services().await?;
            found = self.peripheral.characteristics();
        }

        found
            .into_iter()
            .find(|characteristic| {
                characteristic.uuid == characteristics::COMMAND
                    && characteristic.service_uuid == services::BOT_SERVICE
            })
            .map(|characteristic| Characteristic {
                peripheral: self.peripheral.clone(),
                characteristic,
            })
            .ok_or(TransportError::CharacteristicNotFound(characteristics::COMMAND))
    }
}

impl std::fmt::Debug for BotDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotDevice")
            .field("address", &self.address())
            .finish()
    }
}

#[async_trait]
impl BotHandle for BotDevice {
    #[inline]
    fn address(&self) -> BDAddr {
        self.peripheral.address()
    }

    async fn turn_on(&self) -> Result<(), TransportError> {
        self.send(&commands::TURN_ON).await
    }

    async fn turn_off(&self) -> Result<(), TransportError> {
        self.send(&commands::TURN_OFF).await
    }
}
