use crate::{ReceiverKey, Sender};

/// Events emitted by a signal during operations.
///
/// These events are passed to the tracing callback set via
/// [`Signal::set_trace_callback`](crate::Signal::set_trace_callback).
/// The `Clone` derive allows callbacks to store or forward events if needed.
///
/// # Examples
///
/// ```rust
/// use signal_registry::{ReceiverKey, Sender, SignalEvent};
///
/// let event = SignalEvent::Disconnect {
///     receiver: ReceiverKey::Uid("audit".into()),
///     sender: Sender::none(),
///     removed: true,
/// };
/// assert_eq!(
///     event.to_string(),
///     "disconnect { receiver: uid:audit, sender: None, removed: true }"
/// );
/// ```
#[derive(Debug, Clone)]
pub enum SignalEvent {
    /// A receiver was connected, or the connection was ignored as a duplicate.
    Connect {
        receiver: ReceiverKey,
        sender: Sender,
        weak: bool,
        /// `false` when an entry with the same key already existed.
        added: bool,
    },

    /// A disconnect was attempted.
    Disconnect {
        receiver: ReceiverKey,
        sender: Sender,
        /// Whether an entry was actually removed.
        removed: bool,
    },

    /// A broadcast finished (or was aborted by a failing receiver).
    Send {
        sender: Sender,
        /// Number of receivers called, including one that failed.
        invoked: usize,
        /// Number of receivers that returned an error or panicked.
        failed: usize,
        /// `true` for `send_robust`.
        robust: bool,
    },

    /// Dead entries were dropped from the receiver table.
    Compact { removed: usize },
}

impl std::fmt::Display for SignalEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalEvent::Connect {
                receiver,
                sender,
                weak,
                added,
            } => write!(
                f,
                "connect {{ receiver: {receiver}, sender: {sender}, weak: {weak}, added: {added} }}"
            ),
            SignalEvent::Disconnect {
                receiver,
                sender,
                removed,
            } => write!(
                f,
                "disconnect {{ receiver: {receiver}, sender: {sender}, removed: {removed} }}"
            ),
            SignalEvent::Send {
                sender,
                invoked,
                failed,
                robust,
            } => {
                let kind = if *robust { "send_robust" } else { "send" };
                write!(
                    f,
                    "{kind} {{ sender: {sender}, invoked: {invoked}, failed: {failed} }}"
                )
            }
            SignalEvent::Compact { removed } => {
                write!(f, "compact {{ removed: {removed} }}")
            }
        }
    }
}
