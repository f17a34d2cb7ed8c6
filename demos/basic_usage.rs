//! Basic usage example for signal-registry.
//!
//! Demonstrates:
//! - Declaring signals with `define_signal!` and `Signal::new()`
//! - Connecting closures, methods and plain functions
//! - Scoping receivers to a sender
//! - `send()` versus `send_robust()` when a receiver fails
//! - Weak receivers disappearing when dropped
//!
//! Run with: `cargo run --example basic_usage`
//! Set `RUST_LOG=signal_registry=trace` to see the library's log records.

use signal_registry::{
    define_signal, handler, ConnectOptions, Finalizer, Sender, Signal, SignalEvent,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct Order {
    id: u64,
    total_cents: u64,
}

define_signal!(
    /// Fired once an order has been paid.
    ORDER_PAID: u64 => String
);

struct Warehouse {
    name: &'static str,
    _finalizer: Finalizer,
}

impl Warehouse {
    fn ship(&self, _: &Signal<u64, String>, sender: &Sender, id: &u64) -> anyhow::Result<String> {
        let order = sender
            .downcast::<Order>()
            .ok_or_else(|| anyhow::anyhow!("order {id} is gone"))?;
        Ok(format!("{} ships order #{} ({} cents)", self.name, order.id, order.total_cents))
    }
}

fn receipt(_: &Signal<u64, String>, _: &Sender, id: &u64) -> anyhow::Result<String> {
    Ok(format!("receipt for #{id}"))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    println!("=== signal-registry: Basic Usage ===\n");

    // -------------------------------------------------------------------------
    // 1. Connect receivers
    // -------------------------------------------------------------------------
    println!("1. Connecting receivers to ORDER_PAID...");

    let audit = handler(|_: &Signal<u64, String>, _: &Sender, id: &u64| Ok(format!("audit #{id}")));
    let fraud_check = handler(|_: &Signal<u64, String>, _: &Sender, id: &u64| {
        if *id % 2 == 0 {
            anyhow::bail!("order #{id} flagged for review");
        }
        Ok(format!("order #{id} looks fine"))
    });
    ORDER_PAID.connect(&audit, ConnectOptions::new());
    ORDER_PAID.connect_fn(receipt, ConnectOptions::new());
    ORDER_PAID.connect(&fraud_check, ConnectOptions::new().dispatch_uid("fraud-check"));

    // The warehouse only cares about one particular order.
    let order = Arc::new(Order {
        id: 2,
        total_cents: 4_250,
    });
    let warehouse = Arc::new(Warehouse {
        name: "north",
        _finalizer: ORDER_PAID.finalizer(),
    });
    ORDER_PAID.connect_method(
        &warehouse,
        Warehouse::ship,
        ConnectOptions::new().sender(Sender::instance(&order)),
    );

    // Connecting again is a no-op.
    ORDER_PAID.connect(&audit, ConnectOptions::new());

    println!("   receivers connected: {}", ORDER_PAID.receiver_count());

    // -------------------------------------------------------------------------
    // 2. Trace what the signal does
    // -------------------------------------------------------------------------
    println!("\n2. Installing a trace callback...");

    ORDER_PAID.set_trace_callback(|event: &SignalEvent| println!("   [trace] {event}"));

    // -------------------------------------------------------------------------
    // 3. Send from an anonymous sender
    // -------------------------------------------------------------------------
    println!("\n3. Sending order #1 from Sender::none()...");

    match ORDER_PAID.send(&Sender::none(), &1) {
        Ok(replies) => {
            for (_, reply) in replies {
                println!("   reply: {reply}");
            }
        }
        Err(err) => println!("   send failed: {err}"),
    }

    // -------------------------------------------------------------------------
    // 4. send() stops at the first failure
    // -------------------------------------------------------------------------
    println!("\n4. Sending order #2 from the order itself...");

    let from_order = Sender::instance(&order);
    println!("   Order type has listeners:  {}", ORDER_PAID.has_listeners(&Sender::of::<Order>()));
    println!("   this order has listeners:  {}", ORDER_PAID.has_listeners(&from_order));
    if let Err(err) = ORDER_PAID.send(&from_order, &order.id) {
        println!("   send stopped (expected): {err}");
    }

    // -------------------------------------------------------------------------
    // 5. send_robust() reaches everyone
    // -------------------------------------------------------------------------
    println!("\n5. send_robust collects every outcome...");

    for (_, outcome) in ORDER_PAID.send_robust(&from_order, &order.id) {
        match outcome {
            Ok(reply) => println!("   ok:  {reply}"),
            Err(err) => println!("   err: {err}"),
        }
    }

    // -------------------------------------------------------------------------
    // 6. Weak receivers go away with their owner
    // -------------------------------------------------------------------------
    println!("\n6. Dropping the warehouse and the audit closure...");

    drop(warehouse);
    drop(audit);
    println!("   receivers left: {}", ORDER_PAID.receiver_count());

    ORDER_PAID.clear_trace_callback();
    ORDER_PAID.disconnect_uid("fraud-check", &Sender::none());
    drop(fraud_check);

    // -------------------------------------------------------------------------
    // Summary
    // -------------------------------------------------------------------------
    println!("\n=== Example Complete ===");
    println!("Only the plain function receiver is still connected.");
}
