use std::sync::{Arc, Mutex};
use std::time::Duration;

use stream_cancel::{Trigger, Tripwire};

use crate::delay::delay_unless;

/// Delay before a switch value is pushed to the bridge.
pub const PUSH_DELAY: Duration = Duration::from_millis(500);

/// Receives the switch value the bridge should display.
pub trait CharacteristicSink: Send + Sync + 'static {
    fn update_on(&self, value: bool);
}

/// Coalesces switch pushes: scheduling a new value cancels the pending one,
/// so only the last value of a burst reaches the sink.
pub struct Debouncer<S> {
    sink: Arc<S>,
    delay: Duration,
    pending: Arc<Mutex<Option<Trigger>>>,
}

impl<S> Clone for Debouncer<S> {
    fn clone(&self) -> Self {
        Self {
            sink: self.sink.clone(),
            delay: self.delay,
            pending: self.pending.clone(),
        }
    }
}

impl<S: CharacteristicSink> Debouncer<S> {
    pub fn new(sink: Arc<S>, delay: Duration) -> Self {
        Self {
            sink,
            delay,
            pending: Arc::new(Mutex::new(None)),
        }
    }

    pub fn schedule(&self, value: bool) {
        let (trigger, tripwire) = Tripwire::new();

        if let Some(previous) = self.pending.lock().unwrap().replace(trigger) {
            previous.cancel();
        }

        let sink = self.sink.clone();
        let delay = self.delay;
        tokio::spawn(async move {
            if delay_unless(delay, tripwire).await {
                log::trace!("Pushing switch value {}", value);
                sink.update_on(value);
            }
        });
    }

    /// Drop the pending push, if any.
    pub fn cancel(&self) {
        if let Some(pending) = self.pending.lock().unwrap().take() {
            pending.cancel();
        }
    }
}
