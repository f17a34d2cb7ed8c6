//! Ordered receiver table.
//!
//! Entries keep registration order, which is also dispatch order. The table
//! itself is not synchronised; [`Signal`](crate::Signal) wraps it in a mutex.
//!
//! Removal hands entries back to the caller instead of dropping them. Dropping
//! a strong handle can run a receiver's destructor, and that destructor may
//! call into the same signal, so the caller drops them after unlocking.

use std::any::Any;
use std::sync::Weak;

use crate::receiver::Handle;
use crate::signal_key::{LookupKey, SenderId};

pub(crate) struct Entry<A, R> {
    key: LookupKey,
    handle: Handle<A, R>,
    /// Pins an instance sender's allocation so its address stays unique
    /// while this entry exists.
    sender_anchor: Option<Weak<dyn Any + Send + Sync>>,
}

impl<A: 'static, R: 'static> Entry<A, R> {
    /// An entry is dead once its receiver or its instance sender is gone.
    /// Neither can fire again.
    fn is_dead(&self) -> bool {
        self.handle.is_dead()
            || self
                .sender_anchor
                .as_ref()
                .is_some_and(|anchor| anchor.strong_count() == 0)
    }
}

pub(crate) struct ReceiverTable<A, R> {
    entries: Vec<Entry<A, R>>,
}

impl<A: 'static, R: 'static> ReceiverTable<A, R> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Appends an entry unless one with the same key exists.
    /// Returns `false` for the duplicate case.
    pub(crate) fn insert(
        &mut self,
        key: LookupKey,
        handle: Handle<A, R>,
        sender_anchor: Option<Weak<dyn Any + Send + Sync>>,
    ) -> bool {
        if self.entries.iter().any(|entry| entry.key == key) {
            return false;
        }
        self.entries.push(Entry {
            key,
            handle,
            sender_anchor,
        });
        true
    }

    /// Takes out the first entry with `key`.
    pub(crate) fn remove(&mut self, key: &LookupKey) -> Option<Entry<A, R>> {
        let index = self.entries.iter().position(|entry| &entry.key == key)?;
        Some(self.entries.remove(index))
    }

    /// Whether any entry's receiver or instance sender is gone.
    pub(crate) fn has_dead(&self) -> bool {
        self.entries.iter().any(Entry::is_dead)
    }

    /// Takes out every dead entry, keeping the order of the rest.
    pub(crate) fn compact(&mut self) -> Vec<Entry<A, R>> {
        let (live, dead): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|entry| !entry.is_dead());
        self.entries = live;
        dead
    }

    /// Handles of every entry that hears `sender`, in table order.
    pub(crate) fn matching(&self, sender: SenderId) -> Vec<Handle<A, R>> {
        self.entries
            .iter()
            .filter(|entry| entry.key.matches(sender))
            .map(|entry| entry.handle.clone())
            .collect()
    }
}
