use btleplug::api::{Characteristic as BtleCharacteristic, Peripheral as _, WriteType};
use btleplug::platform::Peripheral;
use btleplug::Result;
use uuid::Uuid;

/// A characteristic on a connected Bot.
#[derive(Clone)]
pub(crate) struct Characteristic {
    pub(crate) peripheral: Peripheral,
    pub(crate) characteristic: BtleCharacteristic,
}

impl Characteristic {
    pub(crate) async fn write_request(&self, data: &[u8]) -> Result<()> {
        self.peripheral
            .write(&self.characteristic, data, WriteType::WithResponse)
            .await
    }

    pub(crate) fn uuid(&self) -> Uuid {
        self.characteristic.uuid
    }
}
