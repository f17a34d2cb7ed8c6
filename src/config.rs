//! Signal construction and per-connection options.

use std::borrow::Cow;

use crate::{DispatchUid, Sender, Signal};

/// Builder for a [`Signal`].
///
/// ```rust
/// use signal_registry::{Signal, SignalBuilder};
///
/// let signal: Signal<String> = SignalBuilder::new()
///     .name("user_saved")
///     .use_caching(true)
///     .build();
/// assert_eq!(signal.name(), "user_saved");
/// assert!(signal.use_caching());
/// ```
#[derive(Debug, Clone)]
pub struct SignalBuilder {
    name: Cow<'static, str>,
    use_caching: bool,
}

impl SignalBuilder {
    /// An unnamed (`"signal"`), uncached builder.
    pub fn new() -> Self {
        Self {
            name: Cow::Borrowed("signal"),
            use_caching: false,
        }
    }

    /// Name used in log records and `Debug` output.
    pub fn name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Memoise the resolved receivers per sender.
    ///
    /// Worth enabling for signals that are sent far more often than receivers
    /// are connected or disconnected.
    pub fn use_caching(mut self, enabled: bool) -> Self {
        self.use_caching = enabled;
        self
    }

    pub fn build<A: 'static, R: 'static>(self) -> Signal<A, R> {
        Signal::from_builder(self.name, self.use_caching)
    }
}

impl Default for SignalBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Options for `connect*` and `disconnect*`.
///
/// The defaults match a bare `connect`: any sender, weak reference, no
/// dispatch uid. `weak` has no effect on disconnect.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub(crate) sender: Sender,
    pub(crate) weak: bool,
    pub(crate) dispatch_uid: Option<DispatchUid>,
}

impl ConnectOptions {
    pub fn new() -> Self {
        Self {
            sender: Sender::none(),
            weak: true,
            dispatch_uid: None,
        }
    }

    /// Only hear sends from `sender`.
    pub fn sender(mut self, sender: Sender) -> Self {
        self.sender = sender;
        self
    }

    /// Whether the signal holds the receiver weakly. Defaults to `true`.
    ///
    /// A weakly held receiver stops being called once the caller drops its
    /// last `Arc` to it. Plain functions are always held strongly.
    ///
    /// ```rust
    /// use signal_registry::{handler, ConnectOptions, Sender, Signal};
    ///
    /// let signal: Signal<()> = Signal::new();
    /// let receiver = handler(|_, _, _: &()| Ok(()));
    /// signal.connect(&receiver, ConnectOptions::new().weak(true));
    /// drop(receiver);
    /// assert!(!signal.has_listeners(&Sender::none()));
    /// ```
    pub fn weak(mut self, weak: bool) -> Self {
        self.weak = weak;
        self
    }

    /// Shorthand for `weak(false)`: the signal keeps the receiver alive.
    pub fn strong(self) -> Self {
        self.weak(false)
    }

    /// Identify the connection by `uid` instead of by the receiver's address.
    pub fn dispatch_uid(mut self, uid: impl Into<DispatchUid>) -> Self {
        self.dispatch_uid = Some(uid.into());
        self
    }
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self::new()
    }
}
