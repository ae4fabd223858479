#![forbid(unsafe_code)]

//! Non-owning, revocable callback slots.
//!
//! A view strongly owns its core. The core still has to notify the view when
//! native events arrive (a click, a submitted text field). [`WeakCallback`]
//! lets the core hold such a notification path without owning the view: the
//! slot stores a `Weak` reference to the target, and invocation upgrades it
//! for the duration of the call only.
//!
//! # Invariants
//!
//! 1. The slot never keeps its target alive.
//! 2. Invoking a slot whose target has been dropped (or that was never
//!    bound, or was reset) does nothing and reports `false`.
//! 3. Clones share one slot: binding or resetting through any clone is seen
//!    by all of them. This lets a core move a clone into a dispatched closure.
//! 4. The internal lock is released before the target function runs, so the
//!    function may re-bind or reset the slot.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};

type Deliver<A> = Arc<dyn Fn(&(dyn Any + Send + Sync), A) + Send + Sync>;

struct Bound<A> {
    target: Weak<dyn Any + Send + Sync>,
    deliver: Deliver<A>,
}

impl<A> Clone for Bound<A> {
    fn clone(&self) -> Self {
        Self {
            target: Weak::clone(&self.target),
            deliver: Arc::clone(&self.deliver),
        }
    }
}

/// A callback slot holding a non-owning reference to its target.
pub struct WeakCallback<A = ()> {
    slot: Arc<Mutex<Option<Bound<A>>>>,
}

impl<A> Clone for WeakCallback<A> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<A> Default for WeakCallback<A> {
    fn default() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
        }
    }
}

impl<A> fmt::Debug for WeakCallback<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*lock(&self.slot) {
            None => "unbound",
            Some(bound) if bound.target.strong_count() == 0 => "dangling",
            Some(_) => "bound",
        };
        f.debug_struct("WeakCallback")
            .field("state", &state)
            .finish()
    }
}

impl<A: 'static> WeakCallback<A> {
    /// Create an unbound slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the slot to `target`, replacing any previous binding.
    ///
    /// Only a `Weak` reference to `target` is retained.
    pub fn bind<T>(&self, target: &Arc<T>, func: impl Fn(&T, A) + Send + Sync + 'static)
    where
        T: Send + Sync + 'static,
    {
        let weak: Weak<T> = Arc::downgrade(target);
        let target: Weak<dyn Any + Send + Sync> = weak;
        let deliver: Deliver<A> = Arc::new(move |any: &(dyn Any + Send + Sync), args: A| {
            if let Some(target) = any.downcast_ref::<T>() {
                func(target, args);
            }
        });
        *lock(&self.slot) = Some(Bound { target, deliver });
    }

    /// Invoke the bound function if the target is still alive.
    ///
    /// Returns `true` if the call was delivered.
    pub fn invoke(&self, args: A) -> bool {
        let Some(bound) = lock(&self.slot).clone() else {
            return false;
        };
        match bound.target.upgrade() {
            Some(target) => {
                (bound.deliver)(&*target, args);
                true
            }
            None => {
                tracing::trace!("weak callback target dropped; invocation ignored");
                false
            }
        }
    }

    /// Clear the binding.
    pub fn reset(&self) {
        lock(&self.slot).take();
    }

    /// True if bound to a target that is still alive.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        lock(&self.slot)
            .as_ref()
            .is_some_and(|bound| bound.target.strong_count() > 0)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
