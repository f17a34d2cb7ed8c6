//! # Signal Registry
//!
//! A thread-safe, in-process signal dispatcher. Receivers connect to a
//! [`Signal`], optionally scoped to one sender, and a sender broadcasts to
//! every matching receiver synchronously.
//!
//! ## Quick Start
//!
//! ```rust
//! use signal_registry::{handler, ConnectOptions, Sender, Signal};
//!
//! struct User;
//!
//! let user_saved: Signal<String> = Signal::new();
//!
//! let greeter = handler(|_signal, _sender, name: &String| {
//!     println!("welcome, {name}");
//!     Ok(())
//! });
//! user_saved.connect(&greeter, ConnectOptions::new().sender(Sender::of::<User>()));
//!
//! let responses = user_saved.send(&Sender::of::<User>(), &"ada".to_string()).unwrap();
//! assert_eq!(responses.len(), 1);
//! ```
//!
//! ## Features
//!
//! - **Weak receivers**: by default a signal does not keep receivers alive.
//!   Dropped receivers stop being called and are swept from the table lazily.
//! - **Sender scoping**: a receiver can listen to one sender or to all of them.
//! - **Idempotent connect**: connecting the same receiver (or dispatch uid)
//!   twice keeps one entry.
//! - **Two dispatch modes**: [`Signal::send`] stops at the first failing
//!   receiver, [`Signal::send_robust`] reaches every receiver and records
//!   failures.
//! - **Per-sender caching**: opt in with [`Signal::with_caching`] or
//!   [`SignalBuilder::use_caching`].
//! - **Tracing support**: per-signal callback receiving [`SignalEvent`]s, and
//!   `tracing` records under the `signal_registry` target.
//!
//! ## Main Types
//!
//! - [`Signal`] - the registry and dispatcher
//! - [`Sender`] - who fires a signal: [`Sender::none`], [`Sender::of`] or [`Sender::instance`]
//! - [`ConnectOptions`] - sender, weak/strong and dispatch uid for a connection
//! - [`Receiver`] - anything callable by a signal; see also [`handler`]
//! - [`Finalizer`] - prompt cleanup when a receiver's owner is dropped
//! - [`receiver`] and [`define_signal!`] - registration sugar

mod config;
mod dispatch;
mod liveness;
mod macros;
mod receiver;
mod receiver_table;
mod registration;
mod sender_cache;
mod signal;
mod signal_error;
mod signal_event;
mod signal_key;

// Re-export the main public API
pub use config::{ConnectOptions, SignalBuilder};
pub use dispatch::{Responses, RobustResponses};
pub use liveness::Finalizer;
pub use receiver::{handler, LiveReceiver, Method, Receiver, ReceiverFn};
pub use registration::receiver;
pub use signal::{Signal, TraceCallback};
pub use signal_error::SignalError;
pub use signal_event::SignalEvent;
pub use signal_key::{DispatchUid, ReceiverKey, Sender, SenderId};
