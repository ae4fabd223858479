#![forbid(unsafe_code)]

//! Observable property cell with change notification and version tracking.
//!
//! # Design
//!
//! [`Property<T>`] wraps a value of type `T` in shared, reference-counted
//! storage (`Arc<Mutex<..>>`). When a write changes the value (determined by
//! `PartialEq`), every observer subscribed at the time of the write is called
//! with `(old, new)` in subscription order.
//!
//! The mutex only protects the cell's own bookkeeping. Properties that drive
//! native calls are single-writer: they must only be written on the UI-affine
//! thread, which a property created [`with_affinity`](Property::with_affinity)
//! checks in debug builds. Cross-thread writers route through the dispatcher.
//!
//! # Performance
//!
//! | Operation       | Complexity                  |
//! |-----------------|-----------------------------|
//! | `get()`         | O(1) + clone                |
//! | `set()`         | O(S) where S = observers    |
//! | `subscribe()`   | O(1) amortized              |
//! | `unsubscribe()` | O(S)                        |
//!
//! # Failure Modes
//!
//! - **Re-entrant set**: observers run outside the lock, so an observer may
//!   write this or another property. The nested write notifies immediately
//!   (depth-first); equality gating stops ping-pong between bound cells.
//! - **Subscriber leak**: a [`Subscription`] that is [`detach`]ed stays
//!   registered for the lifetime of the property.
//!
//! [`detach`]: Subscription::detach

use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tether_core::ThreadAffinity;

type Observer<T> = Arc<dyn Fn(&T, &T) + Send + Sync>;

/// Opaque handle identifying one observer of one property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

struct Entry<T> {
    id: SubscriptionId,
    observer: Observer<T>,
}

struct PropertyState<T> {
    value: T,
    version: u64,
    next_id: u64,
    observers: Vec<Entry<T>>,
}

struct Shared<T> {
    name: Cow<'static, str>,
    affinity: Option<ThreadAffinity>,
    state: Mutex<PropertyState<T>>,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, PropertyState<T>> {
        // Observers never run under the lock, so a poisoned lock still holds
        // consistent state.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Type-erased removal used by [`Subscription`].
trait Unsubscribe: Send + Sync {
    fn remove(&self, id: SubscriptionId) -> bool;
}

impl<T: Send> Unsubscribe for Shared<T> {
    fn remove(&self, id: SubscriptionId) -> bool {
        let mut state = self.lock();
        let before = state.observers.len();
        state.observers.retain(|entry| entry.id != id);
        state.observers.len() != before
    }
}

/// A shared, version-tracked value with change notification.
///
/// Cloning a `Property` creates a new handle to the **same** cell: both
/// handles see the same value and share observers.
///
/// # Invariants
///
/// 1. `version` increments by exactly 1 on each value-changing write.
/// 2. `set(v)` where `v == current` is a no-op.
/// 3. Observers are notified in subscription order.
/// 4. The observer set used for a notification is fixed when the write
///    happens: observers added or removed while it runs take effect on the
///    next write.
pub struct Property<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("Property")
            .field("name", &self.shared.name)
            .field("value", &state.value)
            .field("version", &state.version)
            .field("observer_count", &state.observers.len())
            .finish()
    }
}

impl<T: Clone + PartialEq + Default + Send + 'static> Default for Property<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + PartialEq + Send + 'static> Property<T> {
    /// Create a property with the given initial value.
    ///
    /// The initial version is 0 and no observers are registered.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self::build(Cow::Borrowed("property"), value, None)
    }

    /// Create a property with a diagnostic name.
    #[must_use]
    pub fn named(name: impl Into<Cow<'static, str>>, value: T) -> Self {
        Self::build(name.into(), value, None)
    }

    /// Create a property whose writes must happen on `affinity`'s thread.
    ///
    /// Wrong-thread writes panic in debug builds.
    #[must_use]
    pub fn with_affinity(
        name: impl Into<Cow<'static, str>>,
        value: T,
        affinity: ThreadAffinity,
    ) -> Self {
        Self::build(name.into(), value, Some(affinity))
    }

    fn build(name: Cow<'static, str>, value: T, affinity: Option<ThreadAffinity>) -> Self {
        Self {
            shared: Arc::new(Shared {
                name,
                affinity,
                state: Mutex::new(PropertyState {
                    value,
                    version: 0,
                    next_id: 0,
                    observers: Vec::new(),
                }),
            }),
        }
    }

    /// Diagnostic name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// The thread affinity writes are checked against, if any.
    #[must_use]
    pub fn affinity(&self) -> Option<&ThreadAffinity> {
        self.shared.affinity.as_ref()
    }

    /// Get a clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.shared.lock().value.clone()
    }

    /// Access the current value by reference without cloning.
    ///
    /// `f` runs under the internal lock and must not touch this property.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.shared.lock().value)
    }

    /// Write a new value. If it differs from the current value (by
    /// `PartialEq`), the version is incremented and observers are called with
    /// `(old, new)` before this returns.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if the property has a thread affinity and the
    /// calling thread is not its bound thread.
    #[track_caller]
    pub fn set(&self, value: T) {
        self.check_affinity();
        let notification = {
            let mut state = self.shared.lock();
            if state.value == value {
                return;
            }
            let old = std::mem::replace(&mut state.value, value);
            state.version += 1;
            (old, state.value.clone(), snapshot(&state.observers))
        };
        let (old, new, observers) = notification;
        for observer in &observers {
            observer(&old, &new);
        }
    }

    /// Modify the value in place. If the value changes (compared against a
    /// snapshot), the version is incremented and observers are notified.
    #[track_caller]
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.check_affinity();
        let notification = {
            let mut state = self.shared.lock();
            let old = state.value.clone();
            f(&mut state.value);
            if state.value == old {
                return;
            }
            state.version += 1;
            (old, state.value.clone(), snapshot(&state.observers))
        };
        let (old, new, observers) = notification;
        for observer in &observers {
            observer(&old, &new);
        }
    }

    /// Subscribe to value changes. The observer receives `(old, new)`.
    ///
    /// Dropping the returned [`Subscription`] unsubscribes.
    pub fn subscribe(&self, observer: impl Fn(&T, &T) + Send + Sync + 'static) -> Subscription {
        let id = {
            let mut state = self.shared.lock();
            let id = SubscriptionId(state.next_id);
            state.next_id += 1;
            state.observers.push(Entry {
                id,
                observer: Arc::new(observer),
            });
            id
        };
        let weak: Weak<Shared<T>> = Arc::downgrade(&self.shared);
        let source: Weak<dyn Unsubscribe> = weak;
        Subscription {
            id,
            source: Some(source),
        }
    }

    /// Remove an observer by id. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.remove(id)
    }

    /// Current version number.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.shared.lock().version
    }

    /// Number of registered observers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.shared.lock().observers.len()
    }

    /// Read-only view of the same cell.
    #[must_use]
    pub fn read_only(&self) -> ReadProperty<T> {
        ReadProperty {
            inner: self.clone(),
        }
    }

    /// True if both handles refer to the same cell.
    #[must_use]
    pub fn ptr_eq(&self, other: &Property<T>) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    #[track_caller]
    fn check_affinity(&self) {
        if let Some(affinity) = &self.shared.affinity {
            affinity.debug_check(&format_args!("property '{}'", self.shared.name));
        }
    }
}

fn snapshot<T>(observers: &[Entry<T>]) -> Vec<Observer<T>> {
    observers
        .iter()
        .map(|entry| Arc::clone(&entry.observer))
        .collect()
}

// ---------------------------------------------------------------------------
// ReadProperty
// ---------------------------------------------------------------------------

/// Read-only view of a [`Property`] cell.
///
/// Same notification contract as the property; no write access.
pub struct ReadProperty<T> {
    inner: Property<T>,
}

impl<T> Clone for ReadProperty<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ReadProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReadProperty").field(&self.inner).finish()
    }
}

impl<T: Clone + PartialEq + Send + 'static> ReadProperty<T> {
    /// Get a clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.get()
    }

    /// Access the current value by reference without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.with(f)
    }

    /// Subscribe to value changes.
    pub fn subscribe(&self, observer: impl Fn(&T, &T) + Send + Sync + 'static) -> Subscription {
        self.inner.subscribe(observer)
    }

    /// Remove an observer by id.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.unsubscribe(id)
    }

    /// Current version number.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version()
    }

    /// Diagnostic name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.inner.name()
    }
}

impl<T: Clone + PartialEq + Send + 'static> From<&Property<T>> for ReadProperty<T> {
    fn from(property: &Property<T>) -> Self {
        property.read_only()
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// RAII guard for a property observer.
///
/// Dropping the `Subscription` removes the observer from its property. A
/// notification pass that already started still completes with the observer
/// set it captured.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: SubscriptionId,
    source: Option<Weak<dyn Unsubscribe>>,
}

impl Subscription {
    /// The handle of the registered observer.
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Keep the observer registered for the lifetime of the property.
    pub fn detach(mut self) -> SubscriptionId {
        self.source = None;
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(source) = self.source.take().and_then(|weak| weak.upgrade()) {
            source.remove(self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counter() -> (Arc<AtomicU32>, Arc<AtomicU32>) {
        let c = Arc::new(AtomicU32::new(0));
        (Arc::clone(&c), c)
    }

    #[test]
    fn get_set_basic() {
        let prop = Property::new(42);
        assert_eq!(prop.get(), 42);
        assert_eq!(prop.version(), 0);

        prop.set(99);
        assert_eq!(prop.get(), 99);
        assert_eq!(prop.version(), 1);
    }

    #[test]
    fn no_change_no_version_bump() {
        let prop = Property::new(42);
        prop.set(42);
        assert_eq!(prop.version(), 0);
    }

    #[test]
    fn with_access() {
        let prop = Property::new(vec![1, 2, 3]);
        let sum = prop.with(|v| v.iter().sum::<i32>());
        assert_eq!(sum, 6);
    }

    #[test]
    fn update_mutates_in_place() {
        let prop = Property::new(vec![1, 2, 3]);
        prop.update(|v| v.push(4));
        assert_eq!(prop.get(), vec![1, 2, 3, 4]);
        assert_eq!(prop.version(), 1);
    }

    #[test]
    fn update_no_change_no_bump() {
        let prop = Property::new(10);
        prop.update(|v| *v = 10);
        assert_eq!(prop.version(), 0);
    }

    #[test]
    fn observer_receives_old_and_new() {
        let prop = Property::new(String::from("a"));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let _sub = prop.subscribe(move |old, new| {
            seen_clone.lock().unwrap().push((old.clone(), new.clone()));
        });

        prop.set("b".into());
        prop.set("b".into());
        prop.set("c".into());

        let seen = seen.lock().unwrap();
        let expected = vec![
            (String::from("a"), String::from("b")),
            (String::from("b"), String::from("c")),
        ];
        assert_eq!(*seen, expected);
    }

    #[test]
    fn subscription_drop_unsubscribes() {
        let prop = Property::new(0);
        let (count, count_clone) = counter();
        let sub = prop.subscribe(move |_, _| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        prop.set(1);
        drop(sub);
        prop.set(2);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(prop.subscriber_count(), 0);
    }

    #[test]
    fn explicit_unsubscribe_by_id() {
        let prop = Property::new(0);
        let (count, count_clone) = counter();
        let id = prop
            .subscribe(move |_, _| {
                count_clone.fetch_add(1, Ordering::SeqCst);
            })
            .detach();

        prop.set(1);
        assert!(prop.unsubscribe(id));
        assert!(!prop.unsubscribe(id));
        prop.set(2);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn detached_subscription_survives_guard() {
        let prop = Property::new(0);
        let (count, count_clone) = counter();
        let _id = prop
            .subscribe(move |_, _| {
                count_clone.fetch_add(1, Ordering::SeqCst);
            })
            .detach();

        prop.set(5);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(prop.subscriber_count(), 1);
    }

    #[test]
    fn notification_order_is_subscription_order() {
        let prop = Property::new(0);
        let log = Arc::new(Mutex::new(Vec::new()));

        let subs: Vec<_> = ['A', 'B', 'C']
            .into_iter()
            .map(|tag| {
                let log = Arc::clone(&log);
                prop.subscribe(move |_, _| log.lock().unwrap().push(tag))
            })
            .collect();

        prop.set(1);
        assert_eq!(*log.lock().unwrap(), vec!['A', 'B', 'C']);
        drop(subs);
    }

    #[test]
    fn unsubscribe_during_notification_keeps_others_intact() {
        let prop = Property::new(0);
        let log = Arc::new(Mutex::new(Vec::new()));
        let victim: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));

        let prop_a = prop.clone();
        let victim_a = Arc::clone(&victim);
        let log_a = Arc::clone(&log);
        let _a = prop.subscribe(move |_, _| {
            log_a.lock().unwrap().push('A');
            if let Some(id) = victim_a.lock().unwrap().take() {
                prop_a.unsubscribe(id);
            }
        });
        let log_b = Arc::clone(&log);
        let b = prop.subscribe(move |_, _| log_b.lock().unwrap().push('B'));
        let log_c = Arc::clone(&log);
        let _c = prop.subscribe(move |_, _| log_c.lock().unwrap().push('C'));

        *victim.lock().unwrap() = Some(b.id());
        prop.set(1);
        // B was captured before it was removed; C is neither skipped nor doubled.
        assert_eq!(*log.lock().unwrap(), vec!['A', 'B', 'C']);

        log.lock().unwrap().clear();
        prop.set(2);
        assert_eq!(*log.lock().unwrap(), vec!['A', 'C']);
        drop(b);
    }

    #[test]
    fn subscribe_during_notification_applies_next_cycle() {
        let prop = Property::new(0);
        let (count, count_clone) = counter();
        let late: Arc<Mutex<Vec<Subscription>>> = Arc::new(Mutex::new(Vec::new()));

        let prop_clone = prop.clone();
        let late_clone = Arc::clone(&late);
        let _sub = prop.subscribe(move |_, _| {
            let count = Arc::clone(&count_clone);
            let sub = prop_clone.subscribe(move |_, _| {
                count.fetch_add(1, Ordering::SeqCst);
            });
            late_clone.lock().unwrap().push(sub);
        });

        prop.set(1);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        prop.set(2);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn observer_may_write_other_property() {
        let source = Property::new(0);
        let mirror = Property::new(0);
        let mirror_clone = mirror.clone();
        let _sub = source.subscribe(move |_, new| mirror_clone.set(*new * 2));

        source.set(21);
        assert_eq!(mirror.get(), 42);
    }

    #[test]
    fn clone_shares_state_and_observers() {
        let p1 = Property::new(0);
        let (count, count_clone) = counter();
        let _sub = p1.subscribe(move |_, _| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        let p2 = p1.clone();
        p2.set(42);
        assert_eq!(p1.get(), 42);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(p1.ptr_eq(&p2));
    }

    #[test]
    fn read_only_view_tracks_writes() {
        let prop = Property::named("title", String::from("x"));
        let view = prop.read_only();
        let (count, count_clone) = counter();
        let _sub = view.subscribe(move |_, _| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        prop.set("y".into());
        assert_eq!(view.get(), "y");
        assert_eq!(view.version(), 1);
        assert_eq!(view.name(), "title");
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn subscription_outliving_property_is_harmless() {
        let prop = Property::new(0);
        let sub = prop.subscribe(|_, _| {});
        drop(prop);
        drop(sub);
    }

    #[test]
    fn affine_write_on_bound_thread() {
        let affinity = ThreadAffinity::for_current_thread("ui");
        let prop = Property::with_affinity("label", String::new(), affinity);
        prop.set("OK".into());
        assert_eq!(prop.get(), "OK");
        assert!(prop.affinity().is_some());
    }

    #[cfg(debug_assertions)]
    #[test]
    fn affine_write_off_thread_panics_in_debug() {
        let affinity = ThreadAffinity::for_current_thread("ui");
        let prop = Property::with_affinity("label", String::new(), affinity);
        let remote = prop.clone();
        let result = std::thread::spawn(move || remote.set("nope".into())).join();
        assert!(result.is_err());
        assert_eq!(prop.get(), "");
    }

    #[test]
    fn reads_are_allowed_off_thread() {
        let affinity = ThreadAffinity::for_current_thread("ui");
        let prop = Property::with_affinity("on", true, affinity);
        let remote = prop.clone();
        let value = std::thread::spawn(move || remote.get()).join().unwrap();
        assert!(value);
    }

    #[test]
    fn debug_format() {
        let prop = Property::named("count", 42);
        let dbg = format!("{prop:?}");
        assert!(dbg.contains("Property"));
        assert!(dbg.contains("count"));
        assert!(dbg.contains("42"));
        assert!(dbg.contains("version"));
    }

    #[test]
    fn many_set_calls_version_monotonic() {
        let prop = Property::new(0);
        for i in 1..=100 {
            prop.set(i);
        }
        assert_eq!(prop.version(), 100);
        assert_eq!(prop.get(), 100);
    }
}
