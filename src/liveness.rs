//! Dead-receiver tracking.
//!
//! A signal keeps one flag saying "some weakly held receiver may have died".
//! Setting it never takes the receiver table lock, so it is safe from drop
//! glue and from any thread. Structural operations consume the flag and
//! compact the table while they already hold the lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

#[derive(Debug, Default)]
pub(crate) struct Liveness {
    dead: Arc<AtomicBool>,
}

impl Liveness {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn mark_dead(&self) {
        self.dead.store(true, Ordering::Release);
    }

    pub(crate) fn is_flagged(&self) -> bool {
        self.dead.load(Ordering::Acquire)
    }

    /// Clears the flag, returning whether it was set.
    pub(crate) fn take(&self) -> bool {
        self.dead.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn finalizer(&self) -> Finalizer {
        Finalizer {
            flag: Arc::downgrade(&self.dead),
        }
    }
}

/// Death notice for a receiver's owner.
///
/// Embed a `Finalizer` (from [`Signal::finalizer`](crate::Signal::finalizer))
/// in an object whose methods or closures are connected weakly. When the
/// object is dropped the finalizer tells the signal that its table holds a
/// dead entry, and the next connect, disconnect or send compacts it away.
///
/// Without a finalizer dead entries are still skipped at dispatch and noticed
/// lazily; the finalizer only makes the cleanup prompt.
///
/// ```rust
/// use signal_registry::{Finalizer, Signal};
///
/// struct Listener {
///     _finalizer: Finalizer,
/// }
///
/// let signal: Signal<()> = Signal::new();
/// let listener = Listener { _finalizer: signal.finalizer() };
/// drop(listener);
/// ```
#[derive(Debug)]
pub struct Finalizer {
    flag: Weak<AtomicBool>,
}

impl Finalizer {
    /// Raises the flag now instead of waiting for drop.
    pub fn notify(&self) {
        if let Some(flag) = self.flag.upgrade() {
            flag.store(true, Ordering::Release);
        }
    }
}

impl Drop for Finalizer {
    fn drop(&mut self) {
        self.notify();
    }
}
