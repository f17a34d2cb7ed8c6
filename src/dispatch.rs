//! Receiver invocation shared by `send` and `send_robust`.

use std::cell::{Cell, RefCell};
use std::panic::{self, catch_unwind, AssertUnwindSafe};
use std::sync::Once;

use crate::receiver::LiveReceiver;
use crate::{Sender, Signal, SignalError};

/// Responses of a successful [`Signal::send`](crate::Signal::send), in dispatch order.
pub type Responses<A, R> = Vec<(LiveReceiver<A, R>, R)>;

/// Responses of [`Signal::send_robust`](crate::Signal::send_robust), one per
/// receiver attempted, each holding the value or the error it produced.
pub type RobustResponses<A, R> = Vec<(LiveReceiver<A, R>, anyhow::Result<R>)>;

/// What to do when a receiver fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorPolicy {
    /// Stop at the first error and hand it back unchanged.
    Propagate,
    /// Record the error (or caught panic) and carry on.
    Capture,
}

pub(crate) struct Dispatch<A, R> {
    pub(crate) responses: RobustResponses<A, R>,
    /// Set when `Propagate` stopped at a failing receiver.
    pub(crate) aborted: Option<anyhow::Error>,
}

impl<A, R> Dispatch<A, R> {
    pub(crate) fn invoked(&self) -> usize {
        self.responses.len() + usize::from(self.aborted.is_some())
    }

    pub(crate) fn failed(&self) -> usize {
        self.responses.iter().filter(|(_, result)| result.is_err()).count()
            + usize::from(self.aborted.is_some())
    }
}

// -------------------------------------------------------------------------------------------------
// Panic locations
// -------------------------------------------------------------------------------------------------

static LOCATION_HOOK: Once = Once::new();

thread_local! {
    /// Nesting depth of robust receiver calls on this thread.
    static CATCHING: Cell<usize> = const { Cell::new(0) };
    static LAST_LOCATION: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Chains a hook in front of the current one that remembers where a caught
/// receiver panicked. Panics outside a robust send pass straight through.
fn install_location_hook() {
    // The hook cannot be swapped while this thread is unwinding.
    if std::thread::panicking() {
        return;
    }
    LOCATION_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if CATCHING.try_with(Cell::get).unwrap_or(0) > 0 {
                let location = info.location().map(ToString::to_string);
                let _ = LAST_LOCATION.try_with(|slot| *slot.borrow_mut() = location);
            }
            previous(info);
        }));
    });
}

/// Marks the current thread as catching a receiver's panic until dropped.
struct PanicSite;

impl PanicSite {
    fn enter() -> Self {
        install_location_hook();
        CATCHING.with(|depth| depth.set(depth.get() + 1));
        LAST_LOCATION.with(|slot| slot.borrow_mut().take());
        PanicSite
    }

    fn take_location(&self) -> Option<String> {
        LAST_LOCATION.with(|slot| slot.borrow_mut().take())
    }
}

impl Drop for PanicSite {
    fn drop(&mut self) {
        CATCHING.with(|depth| depth.set(depth.get() - 1));
    }
}

/// Calls `receivers` in order under `policy`.
pub(crate) fn invoke<A: 'static, R: 'static>(
    signal: &Signal<A, R>,
    sender: &Sender,
    args: &A,
    receivers: Vec<LiveReceiver<A, R>>,
    policy: ErrorPolicy,
) -> Dispatch<A, R> {
    let mut responses = Vec::with_capacity(receivers.len());

    for (index, receiver) in receivers.into_iter().enumerate() {
        let result = match policy {
            ErrorPolicy::Propagate => receiver.receive(signal, sender, args),
            ErrorPolicy::Capture => {
                let site = PanicSite::enter();
                catch_unwind(AssertUnwindSafe(|| receiver.receive(signal, sender, args)))
                    .unwrap_or_else(|payload| {
                        Err(SignalError::from_panic(payload, site.take_location()).into())
                    })
            }
        };

        match result {
            Ok(value) => responses.push((receiver, Ok(value))),
            Err(err) if policy == ErrorPolicy::Propagate => {
                tracing::debug!(
                    target: "signal_registry",
                    signal = %signal.name(),
                    %sender,
                    index,
                    error = %err,
                    "receiver failed, aborting send"
                );
                return Dispatch {
                    responses,
                    aborted: Some(err),
                };
            }
            Err(err) => {
                tracing::warn!(
                    target: "signal_registry",
                    signal = %signal.name(),
                    %sender,
                    index,
                    error = %err,
                    "receiver failed during send_robust"
                );
                responses.push((receiver, Err(err)));
            }
        }
    }

    Dispatch {
        responses,
        aborted: None,
    }
}
