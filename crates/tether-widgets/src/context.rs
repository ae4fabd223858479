#![forbid(unsafe_code)]

//! Handle to one platform environment.
//!
//! A [`UiContext`] tells a view *where* it is being realized: which kind of
//! platform, which registry builds its cores, and which dispatcher owns the
//! UI-affine thread. It is immutable and cheap to clone. It does not own the
//! cores built through it; views do.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use tether_runtime::Dispatcher;

use crate::registry::CoreRegistry;

/// Identifies a family of core implementations (a platform or a test
/// double). Registry entries are keyed by kind and capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UiContextKind(&'static str);

impl UiContextKind {
    /// The host platform's native toolkit.
    pub const NATIVE: Self = Self("native");

    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for UiContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

struct ContextInner {
    kind: UiContextKind,
    dispatcher: Dispatcher,
    registry: Arc<CoreRegistry>,
    environment: Arc<dyn Any + Send + Sync>,
}

/// Immutable, clonable handle to a platform environment.
#[derive(Clone)]
pub struct UiContext {
    inner: Arc<ContextInner>,
}

impl fmt::Debug for UiContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiContext")
            .field("kind", &self.inner.kind)
            .field("dispatcher", &self.inner.dispatcher.name())
            .finish_non_exhaustive()
    }
}

impl UiContext {
    /// Create a context with no platform environment attached.
    #[must_use]
    pub fn new(kind: UiContextKind, dispatcher: Dispatcher, registry: Arc<CoreRegistry>) -> Self {
        Self::with_environment(kind, dispatcher, registry, Arc::new(()))
    }

    /// Create a context carrying platform-specific state for constructors
    /// (an application handle, a display connection).
    #[must_use]
    pub fn with_environment(
        kind: UiContextKind,
        dispatcher: Dispatcher,
        registry: Arc<CoreRegistry>,
        environment: Arc<dyn Any + Send + Sync>,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                kind,
                dispatcher,
                registry,
                environment,
            }),
        }
    }

    #[must_use]
    pub fn kind(&self) -> UiContextKind {
        self.inner.kind
    }

    /// The dispatcher that owns this context's UI-affine thread.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<CoreRegistry> {
        &self.inner.registry
    }

    /// The platform environment, if it is of type `E`.
    #[must_use]
    pub fn environment<E: Any + Send + Sync>(&self) -> Option<&E> {
        self.inner.environment.downcast_ref::<E>()
    }

    /// True if both handles refer to the same context.
    #[must_use]
    pub fn same_as(&self, other: &UiContext) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
