use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

struct Entry<D> {
    device: D,
    inserted: Instant,
}

/// Single-slot, time-bounded store for the discovered device handle.
///
/// Entries expire `ttl` after they were written and are dropped the next time
/// the cache is read.
pub struct DeviceCache<D> {
    ttl: Duration,
    entry: Mutex<Option<Entry<D>>>,
}

impl<D: Clone> DeviceCache<D> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: Mutex::new(None),
        }
    }

    /// Cached handle, unless absent or expired.
    pub fn get(&self) -> Option<D> {
        let mut entry = self.entry.lock().unwrap();

        match entry.as_ref() {
            Some(cached) if cached.inserted.elapsed() < self.ttl => Some(cached.device.clone()),
            Some(_) => {
                log::trace!("Cached device expired");
                entry.take();
                None
            }
            None => None,
        }
    }

    /// Store `device`, replacing any previous entry and restarting its TTL.
    pub fn set(&self, device: D) {
        *self.entry.lock().unwrap() = Some(Entry {
            device,
            inserted: Instant::now(),
        });
    }

    pub fn invalidate(&self) {
        if self.entry.lock().unwrap().take().is_some() {
            log::trace!("Cached device invalidated");
        }
    }
}
