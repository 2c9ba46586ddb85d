//! Awaitable pauses, optionally cancellable through a [`Trigger`].

use std::future::Future;
use std::time::Duration;

use stream_cancel::{Trigger, Tripwire};

/// Pause for `duration`.
pub async fn delay(duration: Duration) {
    tokio::time::sleep(duration).await;
}

/// Create a pause that can be cut short.
///
/// The returned future resolves to `true` when the full duration elapsed and
/// to `false` when the trigger was cancelled or dropped first.
pub fn cancellable(duration: Duration) -> (Trigger, impl Future<Output = bool>) {
    let (trigger, tripwire) = Tripwire::new();
    (trigger, delay_unless(duration, tripwire))
}

/// Pause for `duration` unless `tripwire` fires first.
pub async fn delay_unless(duration: Duration, tripwire: Tripwire) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => true,
        _ = tripwire => false,
    }
}
