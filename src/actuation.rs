use std::sync::Arc;

use crate::discovery::Discovery;
use crate::transport::{BotHandle, Transport};
use crate::{Error, Result};

/// Drives the device to a desired state, retrying transport failures with a
/// fresh discovery each time.
pub struct Actuator<T: Transport> {
    discovery: Arc<Discovery<T>>,
    max_retries: u32,
}

impl<T: Transport> Actuator<T> {
    pub fn new(discovery: Arc<Discovery<T>>, max_retries: u32) -> Self {
        Self {
            discovery,
            max_retries,
        }
    }

    /// Turn the device on or off.
    ///
    /// A failed write drops the cached handle and the whole attempt is
    /// repeated, at most `max_retries` times. Discovery errors are returned as
    /// they are.
    pub async fn apply(&self, desired: bool) -> Result<()> {
        let mut retries = 0;

        loop {
            let error = match self.attempt(desired).await {
                Ok(()) => return Ok(()),
                Err(Error::Transport(e)) => e,
                Err(e) => return Err(e),
            };

            self.discovery.invalidate();

            if retries >= self.max_retries {
                log::error!("Giving up after {} attempt(s): {}", retries + 1, error);
                return Err(Error::CommunicationFailure {
                    attempts: retries + 1,
                    source: error,
                });
            }

            retries += 1;
            log::debug!("Retrying after {} :: {}/{}", error, retries, self.max_retries);
        }
    }

    async fn attempt(&self, desired: bool) -> Result<()> {
        let device = self.discovery.find_device().await?;
        log::debug!(
            "Turning {} {}",
            device.address(),
            if desired { "ON" } else { "OFF" }
        );

        if desired {
            device.turn_on().await?;
        } else {
            device.turn_off().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::BOT_MODEL;
    use crate::listener::AdvertisementListener;
    use crate::testing::{address, FakeTransport};
    use crate::transport::DeviceFilter;
    use std::time::Duration;

    fn actuator(transport: &Arc<FakeTransport>, max_retries: u32) -> Actuator<FakeTransport> {
        let filter = DeviceFilter {
            address: address(),
            model: BOT_MODEL,
            duration: Duration::from_millis(100),
        };
        let listener = Arc::new(AdvertisementListener::new(
            transport.clone(),
            filter,
            Duration::from_secs(1),
        ));
        let discovery = Arc::new(Discovery::new(
            transport.clone(),
            filter,
            1,
            Duration::from_millis(50),
            Duration::from_secs(60),
            listener,
        ));
        Actuator::new(discovery, max_retries)
    }

    #[tokio::test(start_paused = true)]
    async fn applies_desired_state() {
        let transport = Arc::new(FakeTransport::new());
        let actuator = actuator(&transport, 3);

        actuator.apply(true).await.unwrap();
        actuator.apply(false).await.unwrap();

        assert_eq!(transport.turn_on_calls(), 1);
        assert_eq!(transport.turn_off_calls(), 1);
        assert_eq!(transport.discover_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_rediscovers_and_retries() {
        let transport = Arc::new(FakeTransport::new());
        transport.fail_next_writes(2);
        let actuator = actuator(&transport, 3);

        actuator.apply(true).await.unwrap();

        assert_eq!(transport.turn_on_calls(), 3);
        assert_eq!(transport.discover_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries() {
        let transport = Arc::new(FakeTransport::new());
        transport.fail_next_writes(100);
        let actuator = actuator(&transport, 2);

        let err = actuator.apply(true).await.unwrap_err();

        assert!(matches!(err, Error::CommunicationFailure { attempts: 3, .. }));
        assert_eq!(transport.turn_on_calls(), 3);
        assert!(actuator.discovery.cached().is_none());

        // The next request starts with a full retry budget again.
        transport.fail_next_writes(2);
        actuator.apply(true).await.unwrap();
        assert_eq!(transport.turn_on_calls(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn discovery_errors_are_not_retried() {
        let transport = Arc::new(FakeTransport::new());
        transport.miss_next_discoveries(1);
        let actuator = actuator(&transport, 3);

        let err = actuator.apply(true).await.unwrap_err();

        assert!(matches!(err, Error::DeviceNotFound { .. }));
        assert_eq!(transport.discover_calls(), 1);
        assert_eq!(transport.turn_on_calls(), 0);
    }
}
