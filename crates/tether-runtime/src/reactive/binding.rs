#![forbid(unsafe_code)]

//! Bindings that keep two [`Property`] cells in sync.
//!
//! A view and its core each own a property for the same piece of state (a
//! label, an on/off flag). [`Binding`] connects them so a write on one side
//! reaches the other.
//!
//! # Modes
//!
//! - [`BindMode::OneWay`]: `source` → `target` only.
//! - [`BindMode::TwoWay`]: changes to either side propagate to the other.
//!
//! Either mode starts by copying `source`'s current value into `target`.
//!
//! # Invariants
//!
//! 1. A re-entrancy guard stops a propagated write from bouncing back within
//!    the same notification; equality gating stops it on later writes.
//! 2. Dropping a `Binding` disconnects every direction it created.
//! 3. While connected, an observed cell holds the cell it writes to. Dropping
//!    the binding removes those references.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::property::{Property, Subscription};

/// Direction of a [`Binding`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindMode {
    /// `source` drives `target`.
    OneWay,
    /// Either side drives the other.
    TwoWay,
}

/// A live connection between two properties. Drop to disconnect.
#[must_use = "dropping a Binding disconnects it"]
pub struct Binding {
    mode: BindMode,
    _subscriptions: Vec<Subscription>,
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl Binding {
    /// Connect `source` and `target` in the given mode.
    pub fn new<T>(source: &Property<T>, target: &Property<T>, mode: BindMode) -> Self
    where
        T: Clone + PartialEq + Send + 'static,
    {
        target.set(source.get());

        let syncing = Arc::new(AtomicBool::new(false));
        let mut subscriptions = vec![forward(source, target, &syncing)];
        if mode == BindMode::TwoWay {
            subscriptions.push(forward(target, source, &syncing));
        }

        Self {
            mode,
            _subscriptions: subscriptions,
        }
    }

    /// `source` → `target`.
    pub fn one_way<T>(source: &Property<T>, target: &Property<T>) -> Self
    where
        T: Clone + PartialEq + Send + 'static,
    {
        Self::new(source, target, BindMode::OneWay)
    }

    /// `a` ↔ `b`, initially syncing `b` to `a`.
    pub fn two_way<T>(a: &Property<T>, b: &Property<T>) -> Self
    where
        T: Clone + PartialEq + Send + 'static,
    {
        Self::new(a, b, BindMode::TwoWay)
    }

    /// The binding direction.
    #[must_use]
    pub fn mode(&self) -> BindMode {
        self.mode
    }
}

fn forward<T>(from: &Property<T>, to: &Property<T>, syncing: &Arc<AtomicBool>) -> Subscription
where
    T: Clone + PartialEq + Send + 'static,
{
    let to = to.clone();
    let syncing = Arc::clone(syncing);
    from.subscribe(move |_old, new| {
        if syncing.swap(true, Ordering::AcqRel) {
            return;
        }
        let _reset = SyncGuard(&syncing);
        to.set(new.clone());
    })
}

/// Clears the re-entrancy flag when propagation ends, including by unwinding.
struct SyncGuard<'a>(&'a AtomicBool);

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn initial_sync_copies_source() {
        let source = Property::new(7);
        let target = Property::new(0);
        let _b = Binding::one_way(&source, &target);
        assert_eq!(target.get(), 7);
    }

    #[test]
    fn one_way_ignores_target_writes() {
        let source = Property::new(1);
        let target = Property::new(0);
        let _b = Binding::one_way(&source, &target);

        source.set(2);
        assert_eq!(target.get(), 2);

        target.set(99);
        assert_eq!(source.get(), 2);
    }

    #[test]
    fn two_way_propagates_both_directions() {
        let a = Property::new(String::from("view"));
        let b = Property::new(String::new());
        let binding = Binding::two_way(&a, &b);
        assert_eq!(binding.mode(), BindMode::TwoWay);
        assert_eq!(b.get(), "view");

        a.set("from view".into());
        assert_eq!(b.get(), "from view");

        b.set("from core".into());
        assert_eq!(a.get(), "from core");
    }

    #[test]
    fn two_way_notifies_each_side_once_per_write() {
        let a = Property::new(0);
        let b = Property::new(0);
        let _binding = Binding::two_way(&a, &b);

        let log = Arc::new(Mutex::new(Vec::new()));
        let log_a = Arc::clone(&log);
        let _sa = a.subscribe(move |_, new| log_a.lock().unwrap().push(('a', *new)));
        let log_b = Arc::clone(&log);
        let _sb = b.subscribe(move |_, new| log_b.lock().unwrap().push(('b', *new)));

        a.set(5);
        assert_eq!(*log.lock().unwrap(), vec![('b', 5), ('a', 5)]);
        assert_eq!(a.version(), 1);
        assert_eq!(b.version(), 1);
    }

    #[test]
    fn panicking_propagation_leaves_binding_usable() {
        let source = Property::new(0);
        let target = Property::new(0);
        let _binding = Binding::two_way(&source, &target);
        let armed = Arc::new(AtomicBool::new(true));
        let trap = Arc::clone(&armed);
        let _sub = target.subscribe(move |_, _| {
            if trap.swap(false, Ordering::SeqCst) {
                panic!("observer failed");
            }
        });

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| source.set(1)));
        assert!(outcome.is_err());
        assert_eq!(target.get(), 1);

        source.set(2);
        assert_eq!(target.get(), 2);
        target.set(3);
        assert_eq!(source.get(), 3);
    }

    #[test]
    fn drop_disconnects() {
        let a = Property::new(0);
        let b = Property::new(0);
        let binding = Binding::two_way(&a, &b);
        drop(binding);

        a.set(3);
        b.set(4);
        assert_eq!(a.get(), 3);
        assert_eq!(b.get(), 4);
        assert_eq!(a.subscriber_count(), 0);
        assert_eq!(b.subscriber_count(), 0);
    }
}
