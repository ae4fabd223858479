//! Property-based invariant tests for reactive cells and the dispatcher.
//!
//! **Property:**
//! 1. Version counts exactly the value-changing writes.
//! 2. Every observer sees every change, in order, as `(old, new)` pairs.
//! 3. Observers are called in subscription order.
//! 4. Dropping a subscription stops delivery.
//!
//! **Dispatcher:**
//! 5. Closures run in enqueue order.
//! 6. Cancelled delayed closures never run; the rest run exactly once.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use proptest::prelude::*;
use tether_runtime::{Dispatcher, DispatcherConfig, Property};

// ── Strategies ────────────────────────────────────────────────────────────

fn writes_strategy(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    // Small domain so repeated values (no-op writes) are common.
    proptest::collection::vec(0u8..4, 0..=max_len)
}

fn changes(initial: u8, writes: &[u8]) -> Vec<(u8, u8)> {
    let mut current = initial;
    let mut out = Vec::new();
    for &w in writes {
        if w != current {
            out.push((current, w));
            current = w;
        }
    }
    out
}

// ── Property ──────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn version_counts_value_changes(initial in 0u8..4, writes in writes_strategy(64)) {
        let prop = Property::new(initial);
        for &w in &writes {
            prop.set(w);
        }
        prop_assert_eq!(prop.version(), changes(initial, &writes).len() as u64);
        prop_assert_eq!(prop.get(), writes.last().copied().unwrap_or(initial));
    }

    #[test]
    fn observers_see_every_change_in_order(
        initial in 0u8..4,
        writes in writes_strategy(64),
        observers in 1usize..5,
    ) {
        let prop = Property::new(initial);
        let logs: Vec<Arc<Mutex<Vec<(u8, u8)>>>> =
            (0..observers).map(|_| Arc::new(Mutex::new(Vec::new()))).collect();
        let _subs: Vec<_> = logs
            .iter()
            .map(|log| {
                let log = Arc::clone(log);
                prop.subscribe(move |old, new| log.lock().unwrap().push((*old, *new)))
            })
            .collect();

        for &w in &writes {
            prop.set(w);
        }

        let expected = changes(initial, &writes);
        for log in &logs {
            prop_assert_eq!(&*log.lock().unwrap(), &expected);
        }
    }

    #[test]
    fn observers_run_in_subscription_order(observers in 1usize..8, value in 1u8..=255) {
        let prop = Property::new(0u8);
        let order = Arc::new(Mutex::new(Vec::new()));
        let _subs: Vec<_> = (0..observers)
            .map(|i| {
                let order = Arc::clone(&order);
                prop.subscribe(move |_, _| order.lock().unwrap().push(i))
            })
            .collect();
        prop.set(value);
        prop_assert_eq!(order.lock().unwrap().clone(), (0..observers).collect::<Vec<_>>());
    }

    #[test]
    fn dropped_subscription_stops_delivery(
        before in writes_strategy(16),
        after in writes_strategy(16),
    ) {
        let prop = Property::new(0u8);
        let hits = Arc::new(Mutex::new(0usize));
        let h = Arc::clone(&hits);
        let sub = prop.subscribe(move |_, _| *h.lock().unwrap() += 1);
        for &w in &before {
            prop.set(w);
        }
        let seen = *hits.lock().unwrap();
        prop_assert_eq!(seen, changes(0, &before).len());

        drop(sub);
        for &w in &after {
            prop.set(w);
        }
        prop_assert_eq!(*hits.lock().unwrap(), seen);
        prop_assert_eq!(prop.subscriber_count(), 0);
    }
}

// ── Dispatcher ────────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn dispatcher_preserves_fifo(count in 0usize..200) {
        let d = Dispatcher::for_current_thread(
            DispatcherConfig::named("fifo").with_max_batch(1024),
        );
        let log = Arc::new(Mutex::new(Vec::new()));
        for i in 0..count {
            let log = Arc::clone(&log);
            d.enqueue(move || log.lock().unwrap().push(i)).unwrap();
        }
        prop_assert_eq!(d.run_pending().unwrap(), count);
        prop_assert_eq!(log.lock().unwrap().clone(), (0..count).collect::<Vec<_>>());
    }

    #[test]
    fn cancelled_delayed_closures_never_run(
        cancel_mask in proptest::collection::vec(any::<bool>(), 0..32)
    ) {
        let d = Dispatcher::for_current_thread(DispatcherConfig::named("cancel"));
        let ran = Arc::new(Mutex::new(Vec::new()));
        let handles: Vec<_> = (0..cancel_mask.len())
            .map(|i| {
                let ran = Arc::clone(&ran);
                d.enqueue_delayed(Duration::ZERO, move || ran.lock().unwrap().push(i)).unwrap()
            })
            .collect();
        for (handle, &cancel) in handles.iter().zip(&cancel_mask) {
            if cancel {
                prop_assert!(d.cancel(*handle));
            }
        }
        d.run_pending().unwrap();

        let expected: Vec<usize> = cancel_mask
            .iter()
            .enumerate()
            .filter(|(_, cancel)| !**cancel)
            .map(|(i, _)| i)
            .collect();
        prop_assert_eq!(ran.lock().unwrap().clone(), expected);
        prop_assert_eq!(d.pending_count(), 0);
    }
}
