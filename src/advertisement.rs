use std::collections::HashMap;
use std::pin::Pin;

use btleplug::api::BDAddr;
use futures::Stream;
use serde::Deserialize;
use tokio::time::Instant;
use uuid::Uuid;

use crate::common::services::{SERVICE_DATA, SERVICE_DATA_LEGACY};

pub type AdvertisementStream = Pin<Box<dyn Stream<Item = Advertisement> + Send>>;

/// How the Bot interprets "on".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "ModeRepr")]
pub enum BotMode {
    /// Momentary: "on" presses the arm and reverts to off.
    Press,
    /// Durable on/off.
    Switch,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ModeRepr {
    Number(u8),
    Name(String),
}

impl TryFrom<ModeRepr> for BotMode {
    type Error = String;

    fn try_from(repr: ModeRepr) -> Result<Self, Self::Error> {
        match repr {
            ModeRepr::Number(1) => Ok(BotMode::Press),
            ModeRepr::Number(2) => Ok(BotMode::Switch),
            ModeRepr::Name(name) if name.eq_ignore_ascii_case("press") => Ok(BotMode::Press),
            ModeRepr::Name(name) if name.eq_ignore_ascii_case("switch") => Ok(BotMode::Switch),
            ModeRepr::Number(n) => Err(format!("unknown mode {n}")),
            ModeRepr::Name(name) => Err(format!("unknown mode {name:?}")),
        }
    }
}

/// Status broadcast by a Bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advertisement {
    pub address: BDAddr,
    pub model: u8,
    pub mode: BotMode,
    /// On/off as reported by the device.
    pub state: bool,
    /// Percent, 0-100.
    pub battery: u8,
}

impl Advertisement {
    /// Decode a Bot service data payload.
    ///
    /// Returns `None` for payloads that are too short to carry status.
    pub fn parse(address: BDAddr, data: &[u8]) -> Option<Self> {
        let &[model, flags, battery, ..] = data else {
            return None;
        };

        Some(Self {
            address,
            model: model & 0x7f,
            mode: if flags & 0x80 != 0 {
                BotMode::Switch
            } else {
                BotMode::Press
            },
            state: flags & 0x40 == 0,
            battery: (battery & 0x7f).min(100),
        })
    }

    /// Decode whichever Bot service data entry is present.
    pub fn from_service_data(
        address: BDAddr,
        service_data: &HashMap<Uuid, Vec<u8>>,
    ) -> Option<Self> {
        service_data
            .get(&SERVICE_DATA)
            .or_else(|| service_data.get(&SERVICE_DATA_LEGACY))
            .and_then(|data| Self::parse(address, data))
    }
}

/// The latest values seen in advertisements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Observation {
    pub mode: Option<BotMode>,
    pub state: Option<bool>,
    pub battery: Option<u8>,
    /// When the last advertisement was recorded.
    pub seen_at: Option<Instant>,
}

impl Observation {
    pub fn record(&mut self, advertisement: &Advertisement) {
        self.mode = Some(advertisement.mode);
        self.state = Some(advertisement.state);
        self.battery = Some(advertisement.battery);
        self.seen_at = Some(Instant::now());
    }

    /// Advertised state, if it was seen after `since`.
    pub fn state_since(&self, since: Option<Instant>) -> Option<bool> {
        match (self.seen_at, since) {
            (Some(seen), Some(since)) if seen <= since => None,
            _ => self.state,
        }
    }
}
