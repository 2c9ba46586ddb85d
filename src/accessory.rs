//! Glue between a [`Bot`] and the bridge's switch and battery services.

use std::sync::Arc;

use crate::bot::Bot;
use crate::common::LOW_BATTERY_THRESHOLD;
use crate::config::BotConfig;
use crate::debounce::CharacteristicSink;
use crate::transport::Transport;
use crate::ConfigError;

/// Status codes the bridge understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum HapStatus {
    Success = 0,
    ServiceCommunicationFailure = -70402,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StatusLowBattery {
    Normal = 0,
    Low = 1,
}

impl StatusLowBattery {
    pub fn from_level(level: u8) -> Self {
        if level < LOW_BATTERY_THRESHOLD {
            StatusLowBattery::Low
        } else {
            StatusLowBattery::Normal
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessoryInformation {
    pub name: String,
    pub manufacturer: &'static str,
    pub model: &'static str,
    pub serial_number: String,
}

pub struct Accessory<T: Transport, S: CharacteristicSink> {
    information: AccessoryInformation,
    bot: Bot<T, S>,
}

impl<T: Transport, S: CharacteristicSink> Accessory<T, S> {
    pub fn new(config: &BotConfig, transport: Arc<T>, sink: Arc<S>) -> Result<Self, ConfigError> {
        let bot = Bot::new(config, transport, sink)?;

        Ok(Self {
            information: AccessoryInformation {
                name: config.name.clone(),
                manufacturer: "SwitchBot",
                model: "Bot",
                serial_number: bot.address().to_string(),
            },
            bot,
        })
    }

    pub fn information(&self) -> &AccessoryInformation {
        &self.information
    }

    pub fn bot(&self) -> &Bot<T, S> {
        &self.bot
    }

    pub async fn handle_get_on(&self) -> Result<bool, HapStatus> {
        self.bot.get().await.map_err(|e| {
            log::error!("{}: {}", self.information.name, e);
            HapStatus::ServiceCommunicationFailure
        })
    }

    pub async fn handle_set_on(&self, value: bool) -> HapStatus {
        match self.bot.set(value).await {
            Ok(()) => HapStatus::Success,
            Err(_) => HapStatus::ServiceCommunicationFailure,
        }
    }

    pub fn handle_get_battery_level(&self) -> u8 {
        self.bot.battery_level()
    }

    pub fn handle_get_status_low_battery(&self) -> StatusLowBattery {
        StatusLowBattery::from_level(self.bot.battery_level())
    }
}
