//! Per-key change notification shared by the session store adapters.
//!
//! A store either keeps its documents in the channels themselves
//! ([`Watchers::storing`]) or only uses them to wake subscribers
//! ([`Watchers::notifying`]). Either way a key nobody watches and nothing
//! is stored under is forgotten, so the map stays bounded by live sessions.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

use crate::ports::{Persisted, StorageKey};

type Sender = watch::Sender<Option<Persisted>>;

/// One watch channel per key, each holding the latest value.
#[derive(Debug)]
pub(crate) struct Watchers {
    senders: Mutex<HashMap<StorageKey, Sender>>,
    keep_values: bool,
}

impl Default for Watchers {
    fn default() -> Self {
        Self::storing()
    }
}

impl Watchers {
    /// Channels are the storage; values survive without subscribers.
    pub(crate) fn storing() -> Self {
        Self {
            senders: Mutex::new(HashMap::new()),
            keep_values: true,
        }
    }

    /// Channels exist only while someone is subscribed.
    pub(crate) fn notifying() -> Self {
        Self {
            senders: Mutex::new(HashMap::new()),
            keep_values: false,
        }
    }

    fn senders(&self) -> MutexGuard<'_, HashMap<StorageKey, Sender>> {
        self.senders.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn worth_keeping(&self, sender: &Sender) -> bool {
        sender.receiver_count() > 0 || (self.keep_values && sender.borrow().is_some())
    }

    /// Latest value for a tracked key; `None` if the key is not tracked.
    pub(crate) fn current(&self, key: &StorageKey) -> Option<Option<Persisted>> {
        self.senders().get(key).map(|sender| sender.borrow().clone())
    }

    /// Replaces the value and wakes subscribers.
    pub(crate) fn publish(&self, key: &StorageKey, value: Option<Persisted>) {
        let mut senders = self.senders();
        let watched = senders.get(key).map(|sender| sender.receiver_count() > 0);
        match watched {
            Some(true) => {
                if let Some(sender) = senders.get(key) {
                    sender.send_replace(value);
                }
            }
            Some(false) if self.keep_values && value.is_some() => {
                if let Some(sender) = senders.get(key) {
                    sender.send_replace(value);
                }
            }
            Some(false) => {
                senders.remove(key);
            }
            None if self.keep_values && value.is_some() => {
                senders.insert(key.clone(), watch::channel(value).0);
            }
            None => {}
        }
    }

    /// Subscribes to a key. The flag is true when the channel was just
    /// created, starting from `None`, and still needs its initial value.
    pub(crate) fn subscribe(&self, key: &StorageKey) -> (watch::Receiver<Option<Persisted>>, bool) {
        let mut senders = self.senders();
        senders.retain(|_, sender| self.worth_keeping(sender));
        match senders.get(key) {
            Some(sender) => (sender.subscribe(), false),
            None => {
                let (sender, receiver) = watch::channel(None);
                senders.insert(key.clone(), sender);
                (receiver, true)
            }
        }
    }

    /// Fills a fresh channel with its initial value unless a write got there first.
    pub(crate) fn seed(&self, key: &StorageKey, loaded: Option<Persisted>) {
        if let Some(sender) = self.senders().get(key) {
            sender.send_if_modified(|current| {
                if current.is_none() && loaded.is_some() {
                    *current = loaded;
                    true
                } else {
                    false
                }
            });
        }
    }

    #[cfg(test)]
    pub(crate) fn tracked(&self) -> usize {
        self.senders().len()
    }
}
