//! Receivers and the handles a signal keeps for them.
//!
//! A receiver is anything implementing [`Receiver`]. Closures with the right
//! signature qualify through a blanket impl, plain `fn` items qualify as
//! function pointers, and methods are bound to an owner object with
//! [`Signal::connect_method`](crate::Signal::connect_method).
//!
//! The table stores each receiver behind a [`Handle`]: a strong `Arc`, or a
//! weak handle that resolves to the receiver while it is alive and to nothing
//! afterwards.

use std::fmt;
use std::sync::{Arc, Weak};

use crate::{Sender, Signal};

/// Something that can be called when a signal fires.
pub trait Receiver<A, R>: Send + Sync + 'static {
    fn receive(&self, signal: &Signal<A, R>, sender: &Sender, args: &A) -> anyhow::Result<R>;
}

impl<A, R, F> Receiver<A, R> for F
where
    F: Fn(&Signal<A, R>, &Sender, &A) -> anyhow::Result<R> + Send + Sync + 'static,
{
    fn receive(&self, signal: &Signal<A, R>, sender: &Sender, args: &A) -> anyhow::Result<R> {
        self(signal, sender, args)
    }
}

impl<A, R> fmt::Debug for dyn Receiver<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Receiver")
    }
}

/// A plain function usable as a receiver.
pub type ReceiverFn<A, R> = fn(&Signal<A, R>, &Sender, &A) -> anyhow::Result<R>;

/// A method that becomes a receiver once bound to an owner of type `T`.
pub type Method<T, A, R> = fn(&T, &Signal<A, R>, &Sender, &A) -> anyhow::Result<R>;

/// A receiver resolved from the table and ready to call.
pub type LiveReceiver<A, R> = Arc<dyn Receiver<A, R>>;

/// Wraps a closure into an `Arc` receiver, letting the compiler infer the
/// closure's argument types from the receiver signature.
///
/// ```rust
/// use signal_registry::{handler, ConnectOptions, Sender, Signal};
///
/// let signal: Signal<u32, u32> = Signal::new();
/// let double = handler(|_signal, _sender, value: &u32| Ok(value * 2));
/// signal.connect(&double, ConnectOptions::new());
///
/// let responses = signal.send(&Sender::none(), &21).unwrap();
/// assert_eq!(responses[0].1, 42);
/// ```
pub fn handler<A, R, F>(f: F) -> Arc<F>
where
    F: Fn(&Signal<A, R>, &Sender, &A) -> anyhow::Result<R> + Send + Sync + 'static,
{
    Arc::new(f)
}

// -------------------------------------------------------------------------------------------------
// Bound methods
// -------------------------------------------------------------------------------------------------

/// A method bound to a live owner.
pub(crate) struct BoundMethod<T, A, R> {
    owner: Arc<T>,
    method: Method<T, A, R>,
}

impl<T, A, R> BoundMethod<T, A, R> {
    pub(crate) fn new(owner: Arc<T>, method: Method<T, A, R>) -> Self {
        Self { owner, method }
    }
}

impl<T, A, R> Receiver<A, R> for BoundMethod<T, A, R>
where
    T: Send + Sync + 'static,
    A: 'static,
    R: 'static,
{
    fn receive(&self, signal: &Signal<A, R>, sender: &Sender, args: &A) -> anyhow::Result<R> {
        (self.method)(&self.owner, signal, sender, args)
    }
}

/// Weak counterpart of [`BoundMethod`]: holds the owner weakly and rebinds on
/// every resolution, so the transient bound receiver never pins the owner.
pub(crate) struct WeakMethod<T, A, R> {
    owner: Weak<T>,
    method: Method<T, A, R>,
}

impl<T, A, R> WeakMethod<T, A, R> {
    pub(crate) fn new(owner: &Arc<T>, method: Method<T, A, R>) -> Self {
        Self {
            owner: Arc::downgrade(owner),
            method,
        }
    }
}

// -------------------------------------------------------------------------------------------------
// Handles
// -------------------------------------------------------------------------------------------------

/// A non-owning reference to a receiver.
pub(crate) trait WeakReceiver<A, R>: Send + Sync {
    fn upgrade(&self) -> Option<LiveReceiver<A, R>>;

    fn is_dead(&self) -> bool;
}

impl<A: 'static, R: 'static> WeakReceiver<A, R> for Weak<dyn Receiver<A, R>> {
    fn upgrade(&self) -> Option<LiveReceiver<A, R>> {
        Weak::upgrade(self)
    }

    fn is_dead(&self) -> bool {
        self.strong_count() == 0
    }
}

impl<T, A, R> WeakReceiver<A, R> for WeakMethod<T, A, R>
where
    T: Send + Sync + 'static,
    A: 'static,
    R: 'static,
{
    fn upgrade(&self) -> Option<LiveReceiver<A, R>> {
        let owner = self.owner.upgrade()?;
        Some(Arc::new(BoundMethod::new(owner, self.method)))
    }

    fn is_dead(&self) -> bool {
        self.owner.strong_count() == 0
    }
}

/// How the receiver table holds on to a receiver.
pub(crate) enum Handle<A, R> {
    Strong(LiveReceiver<A, R>),
    Weak(Arc<dyn WeakReceiver<A, R>>),
}

impl<A: 'static, R: 'static> Handle<A, R> {
    /// Weak handle to an `Arc` receiver.
    pub(crate) fn weak<F: Receiver<A, R>>(receiver: &Arc<F>) -> Self {
        let erased: LiveReceiver<A, R> = receiver.clone();
        let weak: Weak<dyn Receiver<A, R>> = Arc::downgrade(&erased);
        Handle::Weak(Arc::new(weak))
    }

    /// `None` when a weak handle's target has been dropped.
    pub(crate) fn resolve(&self) -> Option<LiveReceiver<A, R>> {
        match self {
            Handle::Strong(receiver) => Some(receiver.clone()),
            Handle::Weak(weak) => weak.upgrade(),
        }
    }

    pub(crate) fn is_dead(&self) -> bool {
        match self {
            Handle::Strong(_) => false,
            Handle::Weak(weak) => weak.is_dead(),
        }
    }

    pub(crate) fn is_weak(&self) -> bool {
        matches!(self, Handle::Weak(_))
    }
}

impl<A, R> Clone for Handle<A, R> {
    fn clone(&self) -> Self {
        match self {
            Handle::Strong(receiver) => Handle::Strong(receiver.clone()),
            Handle::Weak(weak) => Handle::Weak(weak.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        step: u32,
    }

    impl Counter {
        fn add(&self, _signal: &Signal<u32, u32>, _sender: &Sender, args: &u32) -> anyhow::Result<u32> {
            Ok(args + self.step)
        }
    }

    #[test]
    fn test_weak_handle_follows_receiver_lifetime() {
        let receiver = handler(|_: &Signal<u32, u32>, _: &Sender, args: &u32| Ok(*args));
        let handle = Handle::weak(&receiver);

        assert!(handle.is_weak());
        assert!(!handle.is_dead());
        assert!(handle.resolve().is_some());

        drop(receiver);
        assert!(handle.is_dead());
        assert!(handle.resolve().is_none());
    }

    #[test]
    fn test_strong_handle_keeps_receiver() {
        let receiver = handler(|_: &Signal<u32, u32>, _: &Sender, args: &u32| Ok(*args));
        let handle: Handle<u32, u32> = Handle::Strong(receiver.clone());
        drop(receiver);

        assert!(!handle.is_dead());
        assert!(handle.resolve().is_some());
    }

    #[test]
    fn test_weak_method_rebinds_while_owner_lives() {
        let owner = Arc::new(Counter { step: 5 });
        let weak = WeakMethod::new(&owner, Counter::add);
        let signal: Signal<u32, u32> = Signal::new();

        let bound = weak.upgrade().expect("owner is alive");
        assert_eq!(bound.receive(&signal, &Sender::none(), &1).unwrap(), 6);

        // The bound receiver is transient; once released only the owner counts.
        drop(bound);
        assert!(!weak.is_dead());

        drop(owner);
        assert!(weak.is_dead());
        assert!(weak.upgrade().is_none());
    }
}
