use btleplug::api::BDAddr;
use thiserror::Error;
use uuid::Uuid;

/// Failures raised by the BLE transport while talking to the device.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Ble(#[from] btleplug::Error),

    #[error("no Bluetooth adapter available")]
    AdapterNotAvailable,

    #[error("characteristic {0} not found")]
    CharacteristicNotFound(Uuid),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum Error {
    /// Discovery used up its attempts without the device answering.
    #[error("device {address} not found after {attempts} attempt(s)")]
    DeviceNotFound { address: BDAddr, attempts: u32 },

    /// Another discovery is running for this device.
    #[error("discovery already in progress")]
    DiscoveryBusy,

    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    /// Actuation retries are exhausted.
    #[error("communication with the device failed after {attempts} attempt(s)")]
    CommunicationFailure {
        attempts: u32,
        #[source]
        source: TransportError,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("accessory type {0:?} not supported")]
    UnsupportedType(String),

    #[error("deviceId is required")]
    MissingDeviceId,

    #[error("invalid deviceId {0:?}")]
    InvalidDeviceId(String),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: &'static str,
    },
}
