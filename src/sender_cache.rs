//! Per-sender memo of resolved receiver handles.
//!
//! The cache stores handles, never resolved receivers, so weak receivers stay
//! weak while cached. Slots for instance senders hold the sender only weakly
//! and stop matching once it is dropped. Every structural change to the
//! receiver table clears the whole cache.
//!
//! Evicted values are returned rather than dropped, so the signal can let go
//! of them after releasing its table lock.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::receiver::Handle;
use crate::signal_key::{Sender, SenderId};

/// A cached resolution.
pub(crate) enum Cached<A, R> {
    /// The sender resolved to no receivers at all.
    NoReceivers,
    Receivers(Arc<[Handle<A, R>]>),
}

impl<A, R> Clone for Cached<A, R> {
    fn clone(&self) -> Self {
        match self {
            Cached::NoReceivers => Cached::NoReceivers,
            Cached::Receivers(handles) => Cached::Receivers(handles.clone()),
        }
    }
}

struct Slot<A, R> {
    anchor: Option<Weak<dyn Any + Send + Sync>>,
    value: Cached<A, R>,
}

impl<A, R> Slot<A, R> {
    fn is_live(&self) -> bool {
        self.anchor
            .as_ref()
            .map_or(true, |anchor| anchor.strong_count() > 0)
    }
}

pub(crate) struct SenderCache<A, R> {
    enabled: bool,
    slots: RwLock<HashMap<SenderId, Slot<A, R>>>,
}

impl<A, R> SenderCache<A, R> {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            enabled,
            slots: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn get(&self, sender: &Sender) -> Option<Cached<A, R>> {
        if !self.enabled {
            return None;
        }
        let slots = self.slots.read();
        let slot = slots.get(&sender.id())?;
        slot.is_live().then(|| slot.value.clone())
    }

    /// Whether the cache already knows `sender` has no receivers.
    pub(crate) fn is_known_empty(&self, sender: &Sender) -> bool {
        matches!(self.get(sender), Some(Cached::NoReceivers))
    }

    /// Records a resolution. Slots of dropped senders are purged on the way
    /// and handed back.
    #[must_use]
    pub(crate) fn store(&self, sender: &Sender, handles: Arc<[Handle<A, R>]>) -> Vec<Cached<A, R>> {
        if !self.enabled {
            return Vec::new();
        }
        let value = if handles.is_empty() {
            Cached::NoReceivers
        } else {
            Cached::Receivers(handles)
        };
        let mut slots = self.slots.write();
        let expired: Vec<SenderId> = slots
            .iter()
            .filter(|(_, slot)| !slot.is_live())
            .map(|(id, _)| *id)
            .collect();
        let mut evicted: Vec<Cached<A, R>> = expired
            .iter()
            .filter_map(|id| slots.remove(id))
            .map(|slot| slot.value)
            .collect();
        let replaced = slots.insert(
            sender.id(),
            Slot {
                anchor: sender.anchor().cloned(),
                value,
            },
        );
        evicted.extend(replaced.map(|slot| slot.value));
        evicted
    }

    /// Empties the cache, handing back everything it held.
    #[must_use]
    pub(crate) fn invalidate_all(&self) -> Vec<Cached<A, R>> {
        let slots = std::mem::take(&mut *self.slots.write());
        slots.into_values().map(|slot| slot.value).collect()
    }

    /// Number of slots, live or not. Exposed for diagnostics.
    pub(crate) fn len(&self) -> usize {
        self.slots.read().len()
    }
}
