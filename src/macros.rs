//! Macros for declaring signals.

/// Declares a lazily initialised `static` signal.
///
/// The signal's name (used in logs) is the static's identifier. Append
/// `use_caching = true` to memoise receivers per sender.
///
/// # Examples
///
/// ```rust
/// use signal_registry::{define_signal, handler, ConnectOptions, Sender, Signal};
///
/// pub struct Article;
///
/// define_signal!(pub POST_SAVE: u64);
/// define_signal!(REQUEST_FINISHED: () => usize, use_caching = true);
///
/// let indexer = handler(|_signal: &Signal<u64>, _sender: &Sender, _id: &u64| Ok(()));
/// POST_SAVE.connect(&indexer, ConnectOptions::new().sender(Sender::of::<Article>()));
///
/// POST_SAVE.send(&Sender::of::<Article>(), &42).unwrap();
/// assert_eq!(POST_SAVE.name(), "POST_SAVE");
/// assert!(REQUEST_FINISHED.use_caching());
/// ```
#[macro_export]
macro_rules! define_signal {
    (
        $(#[$meta:meta])*
        $vis:vis $name:ident : $args:ty $(=> $ret:ty)? $(, use_caching = $caching:expr)? $(,)?
    ) => {
        $(#[$meta])*
        $vis static $name: ::std::sync::LazyLock<$crate::Signal<$args $(, $ret)?>> =
            ::std::sync::LazyLock::new(|| {
                #[allow(unused_mut)]
                let mut builder = $crate::SignalBuilder::new().name(stringify!($name));
                $(builder = builder.use_caching($caching);)?
                builder.build()
            });
    };
}
