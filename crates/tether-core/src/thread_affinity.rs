#![forbid(unsafe_code)]

//! UI-thread affinity tracking.
//!
//! Every native toolkit requires its calls to happen on one designated
//! thread. A [`ThreadAffinity`] records which thread that is (once known) and
//! lets property writes and core calls check that they run there.
//!
//! # Overview
//!
//! - **Shared record**: clones of a `ThreadAffinity` share one binding. The
//!   dispatcher binds it the first time it drains work; properties created
//!   for that dispatcher check against the same record.
//! - **Thread-local stack**: [`enter`] pushes an affinity onto a per-thread
//!   stack for the lifetime of the returned guard, so code running inside a
//!   dispatched closure can find the affinity it runs under via [`current`].
//! - **Debug-only enforcement**: [`ThreadAffinity::debug_check`] panics on a
//!   wrong-thread access in debug builds and compiles to a no-op check in
//!   release builds.
//!
//! # Invariants
//!
//! 1. **Bind once**: an affinity binds to at most one thread for its whole
//!    lifetime; re-binding to another thread is an error.
//! 2. **Unbound permits all**: before binding there is no UI thread to
//!    violate, so checks pass.
//! 3. **Stack ordering**: later [`enter`] calls shadow earlier ones; dropping
//!    the guard restores the previous top.
//!
//! # Failure Modes
//!
//! | Mode | Condition | Behavior |
//! |------|-----------|----------|
//! | Wrong thread | Check runs off the bound thread | Panics (debug) or no-op (release) |
//! | Guard leaked | Guard moved without dropping | Entry persists until thread exit |
//! | Rebind | `bind_current` from a second thread | `AffinityError::AlreadyBound` |

use std::cell::RefCell;
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};

/// Errors from affinity binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AffinityError {
    /// The affinity is already bound to a different thread.
    AlreadyBound { label: String, thread: ThreadId },
}

impl fmt::Display for AffinityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyBound { label, thread } => {
                write!(f, "affinity '{label}' is already bound to {thread:?}")
            }
        }
    }
}

impl std::error::Error for AffinityError {}

struct AffinityInner {
    label: String,
    thread: OnceLock<ThreadId>,
}

/// Shared record of the UI-affine thread for one dispatcher / UI context.
#[derive(Clone)]
pub struct ThreadAffinity {
    inner: Arc<AffinityInner>,
}

impl fmt::Debug for ThreadAffinity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadAffinity")
            .field("label", &self.inner.label)
            .field("thread", &self.inner.thread.get())
            .finish()
    }
}

impl ThreadAffinity {
    /// Create an affinity that is not yet bound to any thread.
    #[must_use]
    pub fn unbound(label: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(AffinityInner {
                label: label.into(),
                thread: OnceLock::new(),
            }),
        }
    }

    /// Create an affinity bound to the calling thread.
    #[must_use]
    pub fn for_current_thread(label: impl Into<String>) -> Self {
        let affinity = Self::unbound(label);
        let _ = affinity.inner.thread.set(thread::current().id());
        affinity
    }

    /// Diagnostic label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// The bound thread, if any.
    #[must_use]
    pub fn thread_id(&self) -> Option<ThreadId> {
        self.inner.thread.get().copied()
    }

    /// Bind to the calling thread. Idempotent on the bound thread.
    pub fn bind_current(&self) -> Result<(), AffinityError> {
        let me = thread::current().id();
        let bound = *self.inner.thread.get_or_init(|| me);
        if bound == me {
            Ok(())
        } else {
            Err(AffinityError::AlreadyBound {
                label: self.inner.label.clone(),
                thread: bound,
            })
        }
    }

    /// True if bound to the calling thread.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.thread_id() == Some(thread::current().id())
    }

    /// True if the calling thread may touch state guarded by this affinity.
    #[must_use]
    pub fn permits_current(&self) -> bool {
        match self.thread_id() {
            None => true,
            Some(id) => id == thread::current().id(),
        }
    }

    /// True if both handles share one record.
    #[must_use]
    pub fn same_as(&self, other: &ThreadAffinity) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Panic in debug builds if the calling thread is not the bound thread.
    #[track_caller]
    pub fn debug_check(&self, what: &dyn fmt::Display) {
        if cfg!(debug_assertions) && !self.permits_current() {
            panic!(
                "{what} accessed from {:?}, but '{}' is affine to {:?}",
                thread::current().id(),
                self.inner.label,
                self.thread_id()
            );
        }
    }
}

// ============================================================================
// Thread-Local Affinity Stack
// ============================================================================

thread_local! {
    /// Affinities entered on this thread, innermost last.
    static AFFINITY_STACK: RefCell<Vec<ThreadAffinity>> = const { RefCell::new(Vec::new()) };
}

/// RAII guard that pops an entered affinity when dropped.
#[must_use]
pub struct AffinityGuard {
    /// Marker to prevent Send/Sync (thread-local data)
    _marker: std::marker::PhantomData<*const ()>,
}

impl Drop for AffinityGuard {
    fn drop(&mut self) {
        AFFINITY_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

impl fmt::Debug for AffinityGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AffinityGuard")
            .field("depth", &depth())
            .finish()
    }
}

/// Enter `affinity` on the calling thread, binding it if unbound.
pub fn enter(affinity: &ThreadAffinity) -> Result<AffinityGuard, AffinityError> {
    affinity.bind_current()?;
    AFFINITY_STACK.with(|stack| stack.borrow_mut().push(affinity.clone()));
    Ok(AffinityGuard {
        _marker: std::marker::PhantomData,
    })
}

/// The innermost affinity entered on the calling thread.
#[must_use]
pub fn current() -> Option<ThreadAffinity> {
    AFFINITY_STACK.with(|stack| stack.borrow().last().cloned())
}

/// Number of affinities entered on the calling thread.
#[must_use]
pub fn depth() -> usize {
    AFFINITY_STACK.with(|stack| stack.borrow().len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbound_permits_any_thread() {
        let affinity = ThreadAffinity::unbound("ui");
        assert!(affinity.permits_current());
        assert!(!affinity.is_current());
        let clone = affinity.clone();
        let permitted = thread::spawn(move || clone.permits_current())
            .join()
            .unwrap();
        assert!(permitted);
    }

    #[test]
    fn bound_rejects_other_threads() {
        let affinity = ThreadAffinity::for_current_thread("ui");
        assert!(affinity.is_current());
        let clone = affinity.clone();
        let (permitted, rebind) = thread::spawn(move || {
            (clone.permits_current(), clone.bind_current())
        })
        .join()
        .unwrap();
        assert!(!permitted);
        assert!(matches!(rebind, Err(AffinityError::AlreadyBound { .. })));
    }

    #[test]
    fn bind_current_is_idempotent() {
        let affinity = ThreadAffinity::unbound("ui");
        affinity.bind_current().unwrap();
        affinity.bind_current().unwrap();
        assert_eq!(affinity.thread_id(), Some(thread::current().id()));
    }

    #[test]
    fn clones_share_binding() {
        let affinity = ThreadAffinity::unbound("ui");
        let clone = affinity.clone();
        affinity.bind_current().unwrap();
        assert!(clone.is_current());
        assert!(clone.same_as(&affinity));
        assert!(!clone.same_as(&ThreadAffinity::unbound("ui")));
    }

    #[test]
    fn enter_stacks_and_restores() {
        assert_eq!(depth(), 0);
        assert!(current().is_none());

        let outer = ThreadAffinity::unbound("outer");
        let inner = ThreadAffinity::unbound("inner");
        {
            let _g1 = enter(&outer).unwrap();
            assert_eq!(current().unwrap().label(), "outer");
            {
                let _g2 = enter(&inner).unwrap();
                assert_eq!(depth(), 2);
                assert_eq!(current().unwrap().label(), "inner");
            }
            assert_eq!(current().unwrap().label(), "outer");
        }
        assert_eq!(depth(), 0);
        assert!(outer.is_current());
    }

    #[test]
    fn stacks_are_thread_local() {
        let affinity = ThreadAffinity::unbound("ui");
        let _guard = enter(&affinity).unwrap();
        let other_depth = thread::spawn(depth).join().unwrap();
        assert_eq!(other_depth, 0);
        assert_eq!(depth(), 1);
    }

    #[test]
    fn debug_check_passes_on_bound_thread() {
        let affinity = ThreadAffinity::for_current_thread("ui");
        affinity.debug_check(&"label property");
    }

    #[cfg(debug_assertions)]
    #[test]
    fn debug_check_panics_off_thread() {
        let affinity = ThreadAffinity::for_current_thread("ui");
        let result = thread::spawn(move || affinity.debug_check(&"label property")).join();
        assert!(result.is_err());
    }

    #[test]
    fn error_display() {
        let affinity = ThreadAffinity::for_current_thread("main-ui");
        let clone = affinity.clone();
        let err = thread::spawn(move || clone.bind_current())
            .join()
            .unwrap()
            .unwrap_err();
        assert!(err.to_string().contains("main-ui"));
    }
}
