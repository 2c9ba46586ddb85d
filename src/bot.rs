use std::sync::{Arc, Mutex};
use std::time::Duration;

use btleplug::api::BDAddr;
use stream_cancel::Trigger;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::actuation::Actuator;
use crate::advertisement::{BotMode, Observation};
use crate::common::{BOT_MODEL, LOW_BATTERY_THRESHOLD};
use crate::config::{BotConfig, ModeSource};
use crate::debounce::{CharacteristicSink, Debouncer, PUSH_DELAY};
use crate::delay;
use crate::discovery::Discovery;
use crate::listener::AdvertisementListener;
use crate::transport::{DeviceFilter, Transport};
use crate::{ConfigError, Result};

/// Battery level reported before the device has advertised one.
const UNKNOWN_BATTERY_LEVEL: u8 = 100;

/// A Bot presented as an on/off switch.
///
/// Holds the switch state the bridge sees and reconciles it with actuation
/// results and, optionally, with what the device advertises.
pub struct Bot<T: Transport, S: CharacteristicSink> {
    address: BDAddr,
    configured_mode: Option<BotMode>,
    mode_source: ModeSource,
    reconcile_state: bool,
    press_revert_delay: Duration,
    discovery: Arc<Discovery<T>>,
    actuator: Actuator<T>,
    switch_state: Arc<watch::Sender<bool>>,
    /// When the switch state was last set locally.
    updated_at: Mutex<Option<Instant>>,
    debouncer: Debouncer<S>,
    pending_revert: Mutex<Option<Trigger>>,
}

impl<T: Transport, S: CharacteristicSink> Bot<T, S> {
    pub fn new(config: &BotConfig, transport: Arc<T>, sink: Arc<S>) -> Result<Self, ConfigError> {
        config.validate()?;

        let filter = DeviceFilter {
            address: config.address()?,
            model: BOT_MODEL,
            duration: config.scan_duration(),
        };
        let listener = Arc::new(AdvertisementListener::new(
            transport.clone(),
            filter,
            config.listen_duration(),
        ));
        let discovery = Arc::new(Discovery::new(
            transport,
            filter,
            config.scan_retries,
            config.scan_cooldown(),
            config.cache_ttl(),
            listener,
        ));
        let (switch_state, _) = watch::channel(false);

        Ok(Self {
            address: filter.address,
            configured_mode: config.mode,
            mode_source: config.mode_source,
            reconcile_state: config.reconcile_state,
            press_revert_delay: config.press_revert_delay(),
            actuator: Actuator::new(discovery.clone(), config.max_retries),
            discovery,
            switch_state: Arc::new(switch_state),
            updated_at: Mutex::new(None),
            debouncer: Debouncer::new(sink, PUSH_DELAY),
            pending_revert: Mutex::new(None),
        })
    }

    pub fn address(&self) -> BDAddr {
        self.address
    }

    /// The mode "on" is interpreted in.
    pub fn mode(&self) -> BotMode {
        let advertised = self.observation().mode;

        let mode = match self.mode_source {
            ModeSource::Advertisement => advertised.or(self.configured_mode),
            ModeSource::Config => self.configured_mode,
        };
        mode.unwrap_or(BotMode::Switch)
    }

    pub fn switch_state(&self) -> bool {
        *self.switch_state.borrow()
    }

    /// Watch switch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.switch_state.subscribe()
    }

    pub fn observation(&self) -> Observation {
        self.discovery.listener().observation()
    }

    pub fn battery_level(&self) -> u8 {
        self.observation().battery.unwrap_or(UNKNOWN_BATTERY_LEVEL)
    }

    pub fn low_battery(&self) -> bool {
        self.battery_level() < LOW_BATTERY_THRESHOLD
    }

    /// Read the switch.
    ///
    /// Locates the device first if it is not cached; a failed lookup is
    /// returned as an error rather than a guessed state.
    pub async fn get(&self) -> Result<bool> {
        if self.discovery.cached().is_none() {
            self.discovery.find_device().await?;
        }

        if self.reconcile_state && self.mode() == BotMode::Switch {
            // Advertisements older than the last confirmed update are stale.
            let updated_at = *self.updated_at.lock().unwrap();
            if let Some(advertised) = self.observation().state_since(updated_at) {
                if advertised != self.switch_state() {
                    log::info!(
                        "Adopting advertised state of {} :: {}",
                        self.address,
                        state_name(advertised)
                    );
                    self.switch_state.send_replace(advertised);
                    self.debouncer.schedule(advertised);
                }
            }
        }

        let state = self.switch_state();
        log::debug!("Get switch state :: {} :: {}", self.address, state_name(state));
        Ok(state)
    }

    /// Set the switch.
    ///
    /// On failure the switch keeps its last confirmed state.
    pub async fn set(&self, desired: bool) -> Result<()> {
        log::debug!("Set switch state :: {} :: {}", self.address, state_name(desired));

        if desired == self.switch_state() {
            self.debouncer.schedule(desired);
            return Ok(());
        }

        let mode = self.mode();
        if mode == BotMode::Press && !desired {
            // A press has no durable off to command.
            self.cancel_revert();
            self.update(false);
            return Ok(());
        }

        if let Err(e) = self.actuator.apply(desired).await {
            log::error!("Set switch state :: {} :: {}", self.address, e);
            return Err(e);
        }

        self.update(desired);
        if mode == BotMode::Press && desired {
            self.schedule_revert();
        }
        Ok(())
    }

    /// Stop background work: the advertisement scan, a pending revert and a
    /// pending push.
    pub async fn shutdown(&self) {
        self.cancel_revert();
        self.debouncer.cancel();
        self.discovery.listener().stop().await;
    }

    fn update(&self, state: bool) {
        *self.updated_at.lock().unwrap() = Some(Instant::now());
        self.switch_state.send_replace(state);
        self.debouncer.schedule(state);
    }

    fn schedule_revert(&self) {
        let (trigger, elapsed) = delay::cancellable(self.press_revert_delay);
        if let Some(previous) = self.pending_revert.lock().unwrap().replace(trigger) {
            previous.cancel();
        }

        let switch_state = self.switch_state.clone();
        let debouncer = self.debouncer.clone();
        let address = self.address;
        tokio::spawn(async move {
            if elapsed.await {
                log::debug!("Press finished :: {} :: OFF", address);
                switch_state.send_replace(false);
                debouncer.schedule(false);
            }
        });
    }

    fn cancel_revert(&self) {
        if let Some(pending) = self.pending_revert.lock().unwrap().take() {
            pending.cancel();
        }
    }
}

fn state_name(state: bool) -> &'static str {
    if state {
        "ON"
    } else {
        "OFF"
    }
}
