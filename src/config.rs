//! Accessory configuration as the bridge hands it over.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use btleplug::api::BDAddr;
use serde::Deserialize;

use crate::advertisement::BotMode;
use crate::ConfigError;

/// The only accessory type this crate drives.
pub const BOT_TYPE: &str = "bot";

/// Which source decides the operating mode when both are available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeSource {
    /// The mode the device advertises wins over the configured one.
    #[default]
    Advertisement,
    /// Only the configured mode is used.
    Config,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BotConfig {
    /// Display label
    pub name: String,
    #[serde(rename = "type")]
    pub accessory_type: String,
    /// BLE address, `AA:BB:CC:DD:EE:FF`
    pub device_id: Option<String>,
    pub mode: Option<BotMode>,
    pub mode_source: ModeSource,
    /// Total discovery attempts
    pub scan_retries: u32,
    /// Length of one discovery attempt, ms
    pub scan_duration: u64,
    /// Pause between failed discovery attempts, ms
    pub scan_cooldown: u64,
    /// How long a discovered device stays cached, ms
    pub cache_ttl: u64,
    /// Actuation retries after the first failed attempt
    pub max_retries: u32,
    /// Length of the passive advertisement scan, ms
    pub listen_duration: u64,
    /// Delay before a press reverts the switch to off, ms
    pub press_revert_delay: u64,
    /// Adopt the advertised on/off state when the switch is read.
    pub reconcile_state: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "SwitchBot".to_string(),
            accessory_type: BOT_TYPE.to_string(),
            device_id: None,
            mode: None,
            mode_source: ModeSource::default(),
            scan_retries: 3,
            scan_duration: 5_000,
            scan_cooldown: 1_000,
            cache_ttl: 60_000,
            max_retries: 3,
            listen_duration: 60_000,
            press_revert_delay: 0,
            reconcile_state: false,
        }
    }
}

impl BotConfig {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: Some(device_id.into()),
            ..Self::default()
        }
    }

    /// Parse and validate the accessory JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.accessory_type != BOT_TYPE {
            return Err(ConfigError::UnsupportedType(self.accessory_type.clone()));
        }
        self.address()?;
        if self.scan_retries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scanRetries",
                reason: "at least one attempt is needed",
            });
        }
        if self.scan_duration == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scanDuration",
                reason: "must be positive",
            });
        }
        Ok(())
    }

    pub fn address(&self) -> Result<BDAddr, ConfigError> {
        let device_id = self.device_id.as_deref().ok_or(ConfigError::MissingDeviceId)?;
        BDAddr::from_str(device_id.trim())
            .map_err(|_| ConfigError::InvalidDeviceId(device_id.to_string()))
    }

    pub fn scan_duration(&self) -> Duration {
        Duration::from_millis(self.scan_duration)
    }

    pub fn scan_cooldown(&self) -> Duration {
        Duration::from_millis(self.scan_cooldown)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl)
    }

    pub fn listen_duration(&self) -> Duration {
        Duration::from_millis(self.listen_duration)
    }

    pub fn press_revert_delay(&self) -> Duration {
        Duration::from_millis(self.press_revert_delay)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_mode(mut self, mode: BotMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_mode_source(mut self, source: ModeSource) -> Self {
        self.mode_source = source;
        self
    }

    pub fn with_scan_retries(mut self, retries: u32) -> Self {
        self.scan_retries = retries;
        self
    }

    pub fn with_scan_duration(mut self, duration: Duration) -> Self {
        self.scan_duration = duration.as_millis() as u64;
        self
    }

    pub fn with_scan_cooldown(mut self, cooldown: Duration) -> Self {
        self.scan_cooldown = cooldown.as_millis() as u64;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl.as_millis() as u64;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_listen_duration(mut self, duration: Duration) -> Self {
        self.listen_duration = duration.as_millis() as u64;
        self
    }

    pub fn with_press_revert_delay(mut self, delay: Duration) -> Self {
        self.press_revert_delay = delay.as_millis() as u64;
        self
    }

    pub fn with_reconcile_state(mut self, enabled: bool) -> Self {
        self.reconcile_state = enabled;
        self
    }
}
