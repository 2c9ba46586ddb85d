//! Drive a SwitchBot Bot over BLE as a stateful on/off switch.
//!
//! The device is found by address, cached for a while, and actuated with
//! bounded retries. A background scan keeps track of the mode and battery
//! level the device advertises. Switch updates toward the bridge are
//! debounced so a burst of writes surfaces only the final value.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use switchbot_bot::{Accessory, BleTransport, BotConfig, CharacteristicSink, HapStatus};
//!
//! struct PrintSink;
//!
//! impl CharacteristicSink for PrintSink {
//!     fn update_on(&self, value: bool) {
//!         println!("On: {value}");
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     pretty_env_logger::init();
//!
//!     let config = BotConfig::from_json(r#"{"type": "bot", "deviceId": "C1:22:33:44:55:66"}"#)?;
//!     let transport = Arc::new(BleTransport::new());
//!     let accessory = Accessory::new(&config, transport, Arc::new(PrintSink))?;
//!
//!     assert_eq!(accessory.handle_set_on(true).await, HapStatus::Success);
//!     println!("Battery: {}%", accessory.handle_get_battery_level());
//!
//!     accessory.bot().shutdown().await;
//!     Ok(())
//! }
//!```

#![warn(clippy::all, future_incompatible, nonstandard_style, rust_2018_idioms)]

pub use btleplug::api::BDAddr;

pub use accessory::{Accessory, AccessoryInformation, HapStatus, StatusLowBattery};
pub use actuation::Actuator;
pub use advertisement::{Advertisement, AdvertisementStream, BotMode, Observation};
pub use bot::Bot;
pub use cache::DeviceCache;
pub use config::{BotConfig, ModeSource};
pub use debounce::{CharacteristicSink, Debouncer};
pub use device::BotDevice;
pub use discovery::Discovery;
pub use error::{ConfigError, Error, Result, TransportError};
pub use listener::AdvertisementListener;
pub use scanner::BleTransport;
pub use transport::{BotHandle, DeviceFilter, Transport};

mod accessory;
mod actuation;
mod advertisement;
mod bot;
mod cache;
mod config;
mod debounce;
mod device;
mod discovery;
mod error;
mod listener;
mod scanner;
mod transport;

mod characteristic;
pub mod common;
pub mod delay;

#[cfg(test)]
mod testing;
