//! Integration tests for connecting and disconnecting receivers.
//!
//! Covers the identity rules: closures are keyed by their `Arc`, methods by
//! owner and function together, plain functions by address, and a dispatch
//! uid overrides all of those.

use signal_registry::{handler, ConnectOptions, Sender, Signal};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

struct Article;

fn hits(signal: &Signal<u32, u32>) -> Vec<u32> {
    signal
        .send(&Sender::none(), &0)
        .unwrap()
        .into_iter()
        .map(|(_, value)| value)
        .collect()
}

#[test]
fn test_connect_twice_keeps_one_entry() {
    let signal: Signal<u32, u32> = Signal::new();
    let receiver = handler(|_, _, _: &u32| Ok(1));

    signal.connect(&receiver, ConnectOptions::new());
    signal.connect(&receiver, ConnectOptions::new());
    signal.connect(&receiver, ConnectOptions::new().strong());

    assert_eq!(signal.receiver_count(), 1);
    assert_eq!(hits(&signal), vec![1]);
}

#[test]
fn test_disconnect_reports_removal_once() {
    let signal: Signal<u32, u32> = Signal::new();
    let receiver = handler(|_, _, _: &u32| Ok(1));
    signal.connect(&receiver, ConnectOptions::new());

    assert!(signal.disconnect(&receiver, ConnectOptions::new()));
    assert!(!signal.disconnect(&receiver, ConnectOptions::new()));
    assert!(hits(&signal).is_empty());
}

#[test]
fn test_disconnect_never_connected() {
    let signal: Signal<u32, u32> = Signal::new();
    let receiver = handler(|_, _, _: &u32| Ok(1));

    assert!(!signal.disconnect(&receiver, ConnectOptions::new()));
    assert!(!signal.disconnect_uid("missing", &Sender::none()));
}

#[test]
fn test_disconnect_must_name_the_same_sender() {
    let signal: Signal<u32, u32> = Signal::new();
    let receiver = handler(|_, _, _: &u32| Ok(1));
    signal.connect(&receiver, ConnectOptions::new().sender(Sender::of::<Article>()));

    // Scoped to Article, so disconnecting from "any sender" misses it.
    assert!(!signal.disconnect(&receiver, ConnectOptions::new()));
    assert!(signal.disconnect(&receiver, ConnectOptions::new().sender(Sender::of::<Article>())));
}

#[test]
fn test_reconnect_moves_receiver_to_the_end() {
    let signal: Signal<u32, u32> = Signal::new();
    let first = handler(|_, _, _: &u32| Ok(1));
    let second = handler(|_, _, _: &u32| Ok(2));

    signal.connect(&first, ConnectOptions::new());
    signal.connect(&second, ConnectOptions::new());
    assert_eq!(hits(&signal), vec![1, 2]);

    signal.disconnect(&first, ConnectOptions::new());
    signal.connect(&first, ConnectOptions::new());
    assert_eq!(hits(&signal), vec![2, 1]);
}

#[test]
fn test_dispatch_uid_identity() {
    let signal: Signal<u32, u32> = Signal::new();
    let first = handler(|_, _, _: &u32| Ok(1));
    let second = handler(|_, _, _: &u32| Ok(2));

    signal.connect(&first, ConnectOptions::new().dispatch_uid("search-index"));
    // Same uid, different receiver: ignored.
    signal.connect(&second, ConnectOptions::new().dispatch_uid("search-index"));
    assert_eq!(hits(&signal), vec![1]);

    // Disconnecting by the receiver itself does not find a uid entry.
    assert!(!signal.disconnect(&first, ConnectOptions::new()));
    // Any receiver reference works once the uid is given.
    assert!(signal.disconnect(&second, ConnectOptions::new().dispatch_uid("search-index")));
    assert!(hits(&signal).is_empty());
}

#[test]
fn test_uid_is_scoped_per_sender() {
    let signal: Signal<u32, u32> = Signal::new();
    let receiver = handler(|_, _, _: &u32| Ok(1));

    signal.connect(&receiver, ConnectOptions::new().dispatch_uid("audit"));
    signal.connect(
        &receiver,
        ConnectOptions::new()
            .dispatch_uid("audit")
            .sender(Sender::of::<Article>()),
    );

    assert_eq!(signal.receiver_count(), 2);
    assert!(signal.disconnect_uid("audit", &Sender::of::<Article>()));
    assert_eq!(signal.receiver_count(), 1);
}

// -------------------------------------------------------------------------------------------------
// Methods
// -------------------------------------------------------------------------------------------------

struct Inventory {
    stock: AtomicU32,
}

impl Inventory {
    fn reserve(&self, _: &Signal<u32, u32>, _: &Sender, amount: &u32) -> anyhow::Result<u32> {
        Ok(self.stock.fetch_sub(*amount, Ordering::SeqCst) - amount)
    }

    fn report(&self, _: &Signal<u32, u32>, _: &Sender, _: &u32) -> anyhow::Result<u32> {
        Ok(self.stock.load(Ordering::SeqCst))
    }
}

#[test]
fn test_two_methods_of_one_owner_are_distinct() {
    let signal: Signal<u32, u32> = Signal::new();
    let inventory = Arc::new(Inventory {
        stock: AtomicU32::new(10),
    });

    signal.connect_method(&inventory, Inventory::reserve, ConnectOptions::new());
    signal.connect_method(&inventory, Inventory::report, ConnectOptions::new());
    signal.connect_method(&inventory, Inventory::reserve, ConnectOptions::new());
    assert_eq!(signal.receiver_count(), 2);

    let responses = signal.send(&Sender::none(), &3).unwrap();
    let values: Vec<u32> = responses.into_iter().map(|(_, value)| value).collect();
    assert_eq!(values, vec![7, 7]);

    assert!(signal.disconnect_method(&inventory, Inventory::reserve, ConnectOptions::new()));
    assert!(!signal.disconnect_method(&inventory, Inventory::reserve, ConnectOptions::new()));
    assert_eq!(signal.receiver_count(), 1);
}

#[test]
fn test_same_method_on_two_owners() {
    let signal: Signal<u32, u32> = Signal::new();
    let north = Arc::new(Inventory {
        stock: AtomicU32::new(5),
    });
    let south = Arc::new(Inventory {
        stock: AtomicU32::new(8),
    });

    signal.connect_method(&north, Inventory::report, ConnectOptions::new());
    signal.connect_method(&south, Inventory::report, ConnectOptions::new());

    assert_eq!(hits(&signal), vec![5, 8]);
}

#[test]
fn test_weak_method_does_not_keep_owner_alive() {
    let signal: Signal<u32, u32> = Signal::new();
    let inventory = Arc::new(Inventory {
        stock: AtomicU32::new(1),
    });
    signal.connect_method(&inventory, Inventory::report, ConnectOptions::new());

    assert_eq!(Arc::strong_count(&inventory), 1);
    drop(inventory);
    assert!(hits(&signal).is_empty());
}

#[test]
fn test_strong_method_keeps_owner_alive() {
    let signal: Signal<u32, u32> = Signal::new();
    let inventory = Arc::new(Inventory {
        stock: AtomicU32::new(4),
    });
    let observer = Arc::downgrade(&inventory);
    signal.connect_method(&inventory, Inventory::report, ConnectOptions::new().strong());

    drop(inventory);
    assert!(observer.upgrade().is_some());
    assert_eq!(hits(&signal), vec![4]);
}

// -------------------------------------------------------------------------------------------------
// Plain functions
// -------------------------------------------------------------------------------------------------

fn answer(_: &Signal<u32, u32>, _: &Sender, _: &u32) -> anyhow::Result<u32> {
    Ok(42)
}

fn echo(_: &Signal<u32, u32>, _: &Sender, value: &u32) -> anyhow::Result<u32> {
    Ok(*value)
}

#[test]
fn test_function_receivers() {
    let signal: Signal<u32, u32> = Signal::new();

    signal.connect_fn(answer, ConnectOptions::new());
    signal.connect_fn(answer, ConnectOptions::new());
    // Functions are always held strongly, even when asked for weak.
    signal.connect_fn(echo, ConnectOptions::new().weak(true));
    assert_eq!(signal.receiver_count(), 2);

    let values: Vec<u32> = signal
        .send(&Sender::none(), &9)
        .unwrap()
        .into_iter()
        .map(|(_, value)| value)
        .collect();
    assert_eq!(values, vec![42, 9]);

    assert!(signal.disconnect_fn(answer, ConnectOptions::new()));
    assert!(!signal.disconnect_fn(answer, ConnectOptions::new()));
    assert_eq!(hits(&signal), vec![0]);
}

#[test]
fn test_function_and_method_receivers_by_uid() {
    let signal: Signal<u32, u32> = Signal::new();
    let inventory = Arc::new(Inventory {
        stock: AtomicU32::new(4),
    });

    signal.connect_fn(answer, ConnectOptions::new().dispatch_uid("answer"));
    signal.connect_method(
        &inventory,
        Inventory::report,
        ConnectOptions::new().dispatch_uid("stock-report"),
    );
    // The uid stands in for the address, so the same function under another
    // uid is a separate connection.
    signal.connect_fn(answer, ConnectOptions::new().dispatch_uid("answer-again"));
    assert_eq!(signal.receiver_count(), 3);

    // The address alone no longer names these connections.
    assert!(!signal.disconnect_fn(answer, ConnectOptions::new()));
    assert!(!signal.disconnect_method(&inventory, Inventory::report, ConnectOptions::new()));

    assert!(signal.disconnect_uid("answer", &Sender::none()));
    assert!(signal.disconnect_uid("stock-report", &Sender::none()));
    assert_eq!(hits(&signal), vec![42]);
    assert!(signal.disconnect_uid("answer-again", &Sender::none()));
    assert_eq!(signal.receiver_count(), 0);
}
