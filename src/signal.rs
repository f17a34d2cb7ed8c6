//! The signal: a receiver table plus the machinery to dispatch through it.
//!
//! # Locking
//!
//! One mutex guards the receiver table. It is held only while the table is
//! compacted, scanned or mutated, never while a receiver or the trace
//! callback runs, so receivers may connect, disconnect or send on the same
//! signal. The sender cache sits behind its own lock and is written only
//! while the table lock is held, which keeps invalidation ordered with
//! table changes. The dead-receiver flag is an atomic and needs no lock.
//!
//! Nothing a receiver owns is dropped under either lock. Entries and cache
//! contents taken out of the table are collected in a `Released` and
//! dropped once the lock guard is gone, since a receiver's destructor may
//! itself connect or disconnect.

use std::borrow::Cow;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::dispatch::{self, Dispatch, ErrorPolicy, Responses, RobustResponses};
use crate::liveness::{Finalizer, Liveness};
use crate::receiver::{
    BoundMethod, Handle, LiveReceiver, Method, Receiver, ReceiverFn, WeakMethod,
};
use crate::receiver_table::{Entry, ReceiverTable};
use crate::sender_cache::{Cached, SenderCache};
use crate::signal_key::{DispatchUid, LookupKey, ReceiverKey, Sender};
use crate::{ConnectOptions, SignalBuilder, SignalEvent};

/// Type alias for the user-supplied tracing callback.
///
/// The callback receives a reference to a [`SignalEvent`] every time the
/// signal's table changes or a send completes. It must be thread-safe
/// because a signal is usually shared between threads.
pub type TraceCallback = dyn Fn(&SignalEvent) + Send + Sync + 'static;

/// What a locked section took out of the table and the cache.
struct Released<A, R> {
    entries: Vec<Entry<A, R>>,
    cached: Vec<Cached<A, R>>,
}

impl<A, R> Released<A, R> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            cached: Vec::new(),
        }
    }
}

/// A broadcast point that receivers connect to and senders fire through.
///
/// `A` is the payload handed to every receiver and `R` is what receivers
/// return. Receivers are called synchronously on the sender's thread, in the
/// order they were connected.
///
/// # Examples
///
/// ```rust
/// use signal_registry::{handler, ConnectOptions, Sender, Signal};
///
/// struct Order;
///
/// let order_placed: Signal<u64, String> = Signal::new();
///
/// let mailer = handler(|_signal, _sender, id: &u64| Ok(format!("mail for #{id}")));
/// order_placed.connect(&mailer, ConnectOptions::new().sender(Sender::of::<Order>()));
///
/// let responses = order_placed.send(&Sender::of::<Order>(), &7).unwrap();
/// assert_eq!(responses[0].1, "mail for #7");
///
/// // Other senders are not heard by the scoped receiver.
/// assert!(order_placed.send(&Sender::none(), &7).unwrap().is_empty());
/// ```
pub struct Signal<A, R = ()> {
    name: Cow<'static, str>,
    table: Mutex<ReceiverTable<A, R>>,
    /// Entry count as of the last table mutation, readable without the lock.
    occupancy: AtomicUsize,
    cache: SenderCache<A, R>,
    liveness: Liveness,
    trace: Mutex<Option<Arc<TraceCallback>>>,
}

impl<A: 'static, R: 'static> Signal<A, R> {
    /// A signal without sender caching.
    pub fn new() -> Self {
        SignalBuilder::new().build()
    }

    /// A signal that memoises resolved receivers per sender.
    pub fn with_caching() -> Self {
        SignalBuilder::new().use_caching(true).build()
    }

    /// Starts a [`SignalBuilder`] for a named or cached signal.
    pub fn builder() -> SignalBuilder {
        SignalBuilder::new()
    }

    pub(crate) fn from_builder(name: Cow<'static, str>, use_caching: bool) -> Self {
        Self {
            name,
            table: Mutex::new(ReceiverTable::new()),
            occupancy: AtomicUsize::new(0),
            cache: SenderCache::new(use_caching),
            liveness: Liveness::new(),
            trace: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn use_caching(&self) -> bool {
        self.cache.is_enabled()
    }

    // ---------------------------------------------------------------------------------------------
    // Tracing
    // ---------------------------------------------------------------------------------------------

    /// Set a tracing callback for this signal's operations.
    ///
    /// The callback runs outside the receiver table lock, so it may call back
    /// into the signal.
    pub fn set_trace_callback(&self, callback: impl Fn(&SignalEvent) + Send + Sync + 'static) {
        let previous = self.trace.lock().replace(Arc::new(callback));
        drop(previous);
    }

    /// Clear the tracing callback.
    pub fn clear_trace_callback(&self) {
        let previous = self.trace.lock().take();
        drop(previous);
    }

    fn emit_event(&self, event: SignalEvent) {
        let callback = self.trace.lock().clone();
        if let Some(callback) = callback {
            callback(&event);
        }
    }

    // ---------------------------------------------------------------------------------------------
    // Connect / disconnect
    // ---------------------------------------------------------------------------------------------

    /// Connects `receiver`.
    ///
    /// Connecting a key that is already present is a no-op: the first
    /// registration stays where it is. With `weak` set (the default) the
    /// signal does not keep `receiver` alive; once every other `Arc` to it is
    /// dropped it stops being called.
    pub fn connect<F: Receiver<A, R>>(&self, receiver: &Arc<F>, options: ConnectOptions) {
        let handle: Handle<A, R> = if options.weak {
            Handle::weak(receiver)
        } else {
            Handle::Strong(receiver.clone())
        };
        self.insert(ReceiverKey::of_arc(receiver), handle, options);
    }

    /// Connects `method` bound to `owner`.
    ///
    /// The connection is identified by the owner and the method together, so
    /// several methods of one owner can be connected side by side and binding
    /// the same pair again is a duplicate. Weak connections hold only the
    /// owner weakly.
    ///
    /// The method is identified by its function address. The compiler may
    /// give one function different addresses in different crates or codegen
    /// units, so a connection made in one crate might not be found by a
    /// [`disconnect_method`](Self::disconnect_method) in another. Pass a
    /// [`dispatch_uid`](ConnectOptions::dispatch_uid) when the disconnect
    /// happens elsewhere.
    pub fn connect_method<T>(&self, owner: &Arc<T>, method: Method<T, A, R>, options: ConnectOptions)
    where
        T: Send + Sync + 'static,
    {
        let handle: Handle<A, R> = if options.weak {
            Handle::Weak(Arc::new(WeakMethod::new(owner, method)))
        } else {
            Handle::Strong(Arc::new(BoundMethod::new(owner.clone(), method)))
        };
        self.insert(ReceiverKey::of_method(owner, method as usize), handle, options);
    }

    /// Connects a plain function.
    ///
    /// A function can never go away, so it is always held strongly and the
    /// `weak` option is ignored.
    ///
    /// Functions are identified by address, which is not guaranteed to be
    /// the same for one function across crates or codegen units. Connect
    /// with a [`dispatch_uid`](ConnectOptions::dispatch_uid) and disconnect
    /// with [`disconnect_uid`](Self::disconnect_uid) when the two calls live
    /// in different crates.
    pub fn connect_fn(&self, receiver: ReceiverFn<A, R>, options: ConnectOptions) {
        let handle = Handle::Strong(Arc::new(receiver));
        self.insert(ReceiverKey::Callable(receiver as usize), handle, options);
    }

    fn insert(&self, receiver: ReceiverKey, handle: Handle<A, R>, options: ConnectOptions) {
        let key = LookupKey::new(receiver, options.dispatch_uid.as_ref(), &options.sender);
        let weak = handle.is_weak();

        let mut released = Released::new();
        let (added, removed) = {
            let mut table = self.table.lock();
            let removed = self.sweep(&mut table, &mut released);
            // A rejected duplicate is dropped here, but the caller still
            // holds the receiver, so this is never its last reference.
            let added = table.insert(key.clone(), handle, options.sender.anchor().cloned());
            self.occupancy.store(table.len(), Ordering::Release);
            // Cleared even for a duplicate.
            released.cached.extend(self.cache.invalidate_all());
            (added, removed)
        };
        drop(released);

        self.emit_compaction(removed);
        tracing::debug!(
            target: "signal_registry",
            signal = %self.name,
            receiver = %key.receiver,
            sender = %options.sender,
            weak,
            added,
            "connect"
        );
        self.emit_event(SignalEvent::Connect {
            receiver: key.receiver,
            sender: options.sender,
            weak,
            added,
        });
    }

    /// Disconnects `receiver` from the sender given in `options`.
    ///
    /// Returns `true` if an entry was removed. A weak receiver that has
    /// already been dropped and swept from the table yields `false`.
    pub fn disconnect<F: Receiver<A, R>>(&self, receiver: &Arc<F>, options: ConnectOptions) -> bool {
        self.remove(ReceiverKey::of_arc(receiver), options)
    }

    /// Disconnects `method` bound to `owner`, as connected by
    /// [`connect_method`](Self::connect_method).
    ///
    /// Returns `true` if an entry was removed. The same address caveat as
    /// `connect_method` applies.
    pub fn disconnect_method<T>(
        &self,
        owner: &Arc<T>,
        method: Method<T, A, R>,
        options: ConnectOptions,
    ) -> bool {
        self.remove(ReceiverKey::of_method(owner, method as usize), options)
    }

    /// Disconnects a function connected with [`connect_fn`](Self::connect_fn).
    ///
    /// Returns `true` if an entry was removed. A function connected from
    /// another crate may not be found here; see `connect_fn`.
    pub fn disconnect_fn(&self, receiver: ReceiverFn<A, R>, options: ConnectOptions) -> bool {
        self.remove(ReceiverKey::Callable(receiver as usize), options)
    }

    /// Disconnects whatever was connected under `uid` for `sender`.
    pub fn disconnect_uid(&self, uid: impl Into<DispatchUid>, sender: &Sender) -> bool {
        let uid = uid.into();
        self.remove(
            ReceiverKey::Uid(uid.clone()),
            ConnectOptions::new().sender(sender.clone()).dispatch_uid(uid),
        )
    }

    fn remove(&self, receiver: ReceiverKey, options: ConnectOptions) -> bool {
        let key = LookupKey::new(receiver, options.dispatch_uid.as_ref(), &options.sender);

        let mut released = Released::new();
        let (removed_entry, compacted) = {
            let mut table = self.table.lock();
            let compacted = self.sweep(&mut table, &mut released);
            let entry = table.remove(&key);
            let removed_entry = entry.is_some();
            released.entries.extend(entry);
            self.occupancy.store(table.len(), Ordering::Release);
            released.cached.extend(self.cache.invalidate_all());
            (removed_entry, compacted)
        };
        drop(released);

        self.emit_compaction(compacted);
        tracing::debug!(
            target: "signal_registry",
            signal = %self.name,
            receiver = %key.receiver,
            sender = %options.sender,
            removed = removed_entry,
            "disconnect"
        );
        self.emit_event(SignalEvent::Disconnect {
            receiver: key.receiver,
            sender: options.sender,
            removed: removed_entry,
        });
        removed_entry
    }

    // ---------------------------------------------------------------------------------------------
    // Liveness
    // ---------------------------------------------------------------------------------------------

    /// A guard that marks this signal's table as holding dead entries when
    /// it is dropped. See [`Finalizer`].
    pub fn finalizer(&self) -> Finalizer {
        self.liveness.finalizer()
    }

    /// Number of entries in the receiver table after sweeping dead ones.
    pub fn receiver_count(&self) -> usize {
        let mut released = Released::new();
        let (len, removed) = {
            let mut table = self.table.lock();
            let removed = self.sweep(&mut table, &mut released);
            self.occupancy.store(table.len(), Ordering::Release);
            (table.len(), removed)
        };
        drop(released);
        self.emit_compaction(removed);
        len
    }

    /// Sweeps dead entries if a death has been flagged. Caller holds the table
    /// lock and drops `released` after letting go of it.
    fn compact(&self, table: &mut ReceiverTable<A, R>, released: &mut Released<A, R>) -> usize {
        if !self.liveness.take() {
            return 0;
        }
        let dead = table.compact();
        let removed = dead.len();
        if removed > 0 {
            released.cached.extend(self.cache.invalidate_all());
        }
        released.entries.extend(dead);
        removed
    }

    /// Like [`compact`](Self::compact), but for structural operations that
    /// scan the table anyway. Dead entries are found by looking rather than
    /// by waiting for a finalizer or a send to raise the flag, so receivers
    /// scoped to instance senders that were never sent from again still go.
    fn sweep(&self, table: &mut ReceiverTable<A, R>, released: &mut Released<A, R>) -> usize {
        if table.has_dead() {
            self.liveness.mark_dead();
        }
        self.compact(table, released)
    }

    fn emit_compaction(&self, removed: usize) {
        if removed == 0 {
            return;
        }
        tracing::trace!(
            target: "signal_registry",
            signal = %self.name,
            removed,
            "dropped dead receivers"
        );
        self.emit_event(SignalEvent::Compact { removed });
    }

    // ---------------------------------------------------------------------------------------------
    // Resolution
    // ---------------------------------------------------------------------------------------------

    /// Whether any live receiver would hear a send from `sender`.
    pub fn has_listeners(&self, sender: &Sender) -> bool {
        !self.live_receivers(sender).is_empty()
    }

    /// Resolves the live receivers for `sender`, in table order.
    fn live_receivers(&self, sender: &Sender) -> Vec<LiveReceiver<A, R>> {
        let cached = if self.cache.is_enabled() && !self.liveness.is_flagged() {
            self.cache.get(sender)
        } else {
            None
        };

        let handles = match cached {
            Some(Cached::NoReceivers) => return Vec::new(),
            Some(Cached::Receivers(handles)) => handles,
            None => {
                let mut released = Released::new();
                let (handles, removed) = {
                    let mut table = self.table.lock();
                    let removed = self.compact(&mut table, &mut released);
                    self.occupancy.store(table.len(), Ordering::Release);
                    let handles: Arc<[Handle<A, R>]> = table.matching(sender.id()).into();
                    released.cached.extend(self.cache.store(sender, handles.clone()));
                    (handles, removed)
                };
                drop(released);
                self.emit_compaction(removed);
                handles
            }
        };

        let mut live = Vec::with_capacity(handles.len());
        for handle in handles.iter() {
            match handle.resolve() {
                Some(receiver) => live.push(receiver),
                // Died after the scan; sweep it next time round.
                None => self.liveness.mark_dead(),
            }
        }
        live
    }

    // ---------------------------------------------------------------------------------------------
    // Dispatch
    // ---------------------------------------------------------------------------------------------

    /// Nothing connected at all, or the cache already knows `sender` is unheard.
    fn nothing_to_send(&self, sender: &Sender) -> bool {
        self.occupancy.load(Ordering::Acquire) == 0 || self.cache.is_known_empty(sender)
    }

    /// Sends `args` from `sender` to every matching receiver.
    ///
    /// Receivers run in connection order. The first receiver that fails ends
    /// the send and its error is returned as-is; receivers after it are not
    /// called. Use [`send_robust`](Self::send_robust) to reach every receiver
    /// regardless.
    pub fn send(&self, sender: &Sender, args: &A) -> anyhow::Result<Responses<A, R>> {
        if self.nothing_to_send(sender) {
            return Ok(Vec::new());
        }

        let receivers = self.live_receivers(sender);
        let Dispatch { responses, aborted } =
            self.dispatch(sender, args, receivers, ErrorPolicy::Propagate);
        if let Some(err) = aborted {
            return Err(err);
        }

        responses
            .into_iter()
            .map(|(receiver, result)| result.map(|value| (receiver, value)))
            .collect()
    }

    /// Sends `args` from `sender` to every matching receiver, catching failures.
    ///
    /// Every receiver is attempted. A receiver's error, or a panic caught as
    /// [`SignalError::ReceiverPanicked`](crate::SignalError::ReceiverPanicked),
    /// takes the place of its value in the result.
    pub fn send_robust(&self, sender: &Sender, args: &A) -> RobustResponses<A, R> {
        if self.nothing_to_send(sender) {
            return Vec::new();
        }

        let receivers = self.live_receivers(sender);
        self.dispatch(sender, args, receivers, ErrorPolicy::Capture)
            .responses
    }

    fn dispatch(
        &self,
        sender: &Sender,
        args: &A,
        receivers: Vec<LiveReceiver<A, R>>,
        policy: ErrorPolicy,
    ) -> Dispatch<A, R> {
        let dispatch = dispatch::invoke(self, sender, args, receivers, policy);
        let robust = policy == ErrorPolicy::Capture;

        tracing::trace!(
            target: "signal_registry",
            signal = %self.name,
            %sender,
            invoked = dispatch.invoked(),
            failed = dispatch.failed(),
            robust,
            "send"
        );
        self.emit_event(SignalEvent::Send {
            sender: sender.clone(),
            invoked: dispatch.invoked(),
            failed: dispatch.failed(),
            robust,
        });
        dispatch
    }
}

impl<A: 'static, R: 'static> Default for Signal<A, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A, R> fmt::Debug for Signal<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("name", &self.name)
            .field("receivers", &self.occupancy.load(Ordering::Relaxed))
            .field("use_caching", &self.cache.is_enabled())
            .field("cached_senders", &self.cache.len())
            .finish_non_exhaustive()
    }
}
