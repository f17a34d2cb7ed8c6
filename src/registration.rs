//! Connecting one handler to several signals at once.

use std::sync::Arc;

use crate::{ConnectOptions, Receiver, Signal};

/// Connects `handler` to every signal in `signals` with the same options and
/// hands the handler back, so the caller can keep it alive for weak
/// connections.
///
/// # Examples
///
/// ```rust
/// use signal_registry::{handler, receiver, ConnectOptions, Sender, Signal};
///
/// let pre_save: Signal<String> = Signal::new();
/// let post_save: Signal<String> = Signal::new();
///
/// let audit = receiver(
///     [&pre_save, &post_save],
///     handler(|_signal, _sender, _name: &String| Ok(())),
///     ConnectOptions::new(),
/// );
///
/// assert!(pre_save.has_listeners(&Sender::none()));
/// assert!(post_save.has_listeners(&Sender::none()));
/// drop(audit);
/// assert!(!post_save.has_listeners(&Sender::none()));
/// ```
pub fn receiver<'s, A, R, F, I>(signals: I, handler: Arc<F>, options: ConnectOptions) -> Arc<F>
where
    A: 'static,
    R: 'static,
    F: Receiver<A, R>,
    I: IntoIterator<Item = &'s Signal<A, R>>,
{
    for signal in signals {
        signal.connect(&handler, options.clone());
    }
    handler
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{handler, Sender};

    #[test]
    fn test_receiver_connects_to_each_signal() {
        let first: Signal<u8, u8> = Signal::new();
        let second: Signal<u8, u8> = Signal::new();
        let third: Signal<u8, u8> = Signal::new();

        let doubled = receiver(
            vec![&first, &second],
            handler(|_: &Signal<u8, u8>, _: &Sender, value: &u8| Ok(value * 2)),
            ConnectOptions::new().sender(Sender::of::<u8>()),
        );

        assert_eq!(first.send(&Sender::of::<u8>(), &4).unwrap()[0].1, 8);
        assert_eq!(second.send(&Sender::of::<u8>(), &5).unwrap()[0].1, 10);
        assert!(first.send(&Sender::none(), &4).unwrap().is_empty());
        assert!(!third.has_listeners(&Sender::of::<u8>()));

        assert!(first.disconnect(&doubled, ConnectOptions::new().sender(Sender::of::<u8>())));
    }

    #[test]
    fn test_receiver_with_no_signals_is_noop() {
        let signals: [&Signal<()>; 0] = [];
        let handle = receiver(
            signals,
            handler(|_: &Signal<()>, _: &Sender, _: &()| Ok(())),
            ConnectOptions::new(),
        );
        assert_eq!(Arc::strong_count(&handle), 1);
    }
}
