#![forbid(unsafe_code)]

//! Platform-independent views and their binding to cores.
//!
//! A [`View`] is the application-facing description of one element. It owns
//! its own properties and handler lists and, once bound to a [`UiContext`],
//! exactly one [`Core`] held in its [`CoreSlot`].
//!
//! # Binding
//!
//! [`bind`] (or [`bind_dyn`]) performs, on the UI thread:
//!
//! 1. Release the previously bound core, if any. Binding again to the same
//!    context is a no-op.
//! 2. Ask the context's registry for a core for
//!    [`View::capability_for_core_creation`].
//! 3. Wire the base visibility, then call [`View::wire_core`] to connect the
//!    view's properties and callbacks to the core's interface.
//! 4. Store the core and the returned [`WireGuard`]s in the slot.
//!
//! # Release
//!
//! [`unbind`] (or dropping the view) drops the guards first, disconnecting
//! every binding and detaching child views, then drops the core, which
//! releases its native handle.
//!
//! # Invariants
//!
//! 1. At most one core per view.
//! 2. The view is the only strong owner of its core; cores see the view
//!    through a [`WeakView`].
//! 3. Views wire what the resolved core offers: a fallback core that lacks
//!    the view's interface gets base visibility only.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use tether_core::Capability;
use tether_runtime::{Binding, Property, Subscription};
use tracing::{debug, trace};

use crate::context::UiContext;
use crate::core::{Core, WeakView};
use crate::registry::CoreError;

/// An application-facing element that can be realized by a core.
pub trait View: Send + Sync + 'static {
    /// The capability to request from the registry. Queried once per bind.
    fn capability_for_core_creation(&self) -> &'static Capability;

    /// Shared per-view state.
    fn view_base(&self) -> &ViewBase;

    /// Connect this view to a freshly created core.
    ///
    /// Returned guards stay alive as long as the core is bound. Child views
    /// are bound here, through `context`.
    fn wire_core(
        self: Arc<Self>,
        core: &dyn Core,
        context: &UiContext,
    ) -> Result<Vec<WireGuard>, CoreError>;
}

impl fmt::Debug for dyn View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("capability", &self.capability_for_core_creation().name())
            .field("bound", &self.view_base().slot().is_bound())
            .finish()
    }
}

/// State every view carries.
#[derive(Debug)]
pub struct ViewBase {
    visible: Property<bool>,
    slot: CoreSlot,
}

impl Default for ViewBase {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewBase {
    #[must_use]
    pub fn new() -> Self {
        Self {
            visible: Property::named("visible", true),
            slot: CoreSlot::default(),
        }
    }

    /// Whether the element is shown. Mirrored into the core.
    #[must_use]
    pub fn visible(&self) -> &Property<bool> {
        &self.visible
    }

    /// The bound core, if any.
    #[must_use]
    pub fn slot(&self) -> &CoreSlot {
        &self.slot
    }
}

// ---------------------------------------------------------------------------
// Core slot
// ---------------------------------------------------------------------------

struct BoundCore {
    // Field order is drop order: disconnect before releasing the core.
    guards: Vec<WireGuard>,
    core: Box<dyn Core>,
    context: UiContext,
}

/// Holder of a view's bound core.
#[derive(Default)]
pub struct CoreSlot {
    bound: Mutex<Option<BoundCore>>,
}

impl fmt::Debug for CoreSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = self.lock();
        match bound.as_ref() {
            None => f.write_str("CoreSlot(unbound)"),
            Some(b) => f
                .debug_struct("CoreSlot")
                .field("core", &b.core)
                .field("guards", &b.guards.len())
                .finish(),
        }
    }
}

impl CoreSlot {
    fn lock(&self) -> MutexGuard<'_, Option<BoundCore>> {
        self.bound
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// True while a core is bound.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.lock().is_some()
    }

    /// The context the core was created in.
    #[must_use]
    pub fn context(&self) -> Option<UiContext> {
        self.lock().as_ref().map(|b| b.context.clone())
    }

    /// Run `f` with the bound core.
    ///
    /// The slot stays locked while `f` runs; `f` must not bind or release
    /// this same view.
    pub fn with_core<R>(&self, f: impl FnOnce(&dyn Core) -> R) -> Option<R> {
        self.lock().as_ref().map(|b| f(b.core.as_ref()))
    }

    /// Drop the guards and then the core. Returns `true` if a core was bound.
    pub fn release(&self) -> bool {
        let taken = self.lock().take();
        match taken {
            Some(bound) => {
                trace!(capability = bound.core.capability().name(), "releasing core");
                drop(bound);
                true
            }
            None => false,
        }
    }

    fn install(&self, bound: BoundCore) {
        let previous = self.lock().replace(bound);
        drop(previous);
    }
}

// ---------------------------------------------------------------------------
// Wire guards
// ---------------------------------------------------------------------------

enum GuardKind {
    Binding { _binding: Binding },
    Subscription { _subscription: Subscription },
    OnRelease(Option<Box<dyn FnOnce() + Send>>),
}

/// Keeps one view ↔ core connection alive. Dropping it disconnects.
#[must_use = "dropping a WireGuard disconnects it immediately"]
pub struct WireGuard {
    kind: GuardKind,
}

impl fmt::Debug for WireGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            GuardKind::Binding { .. } => "Binding",
            GuardKind::Subscription { .. } => "Subscription",
            GuardKind::OnRelease(_) => "OnRelease",
        };
        f.debug_tuple("WireGuard").field(&kind).finish()
    }
}

impl WireGuard {
    /// Run `f` when the core is released, before the core itself is dropped.
    pub fn on_release(f: impl FnOnce() + Send + 'static) -> Self {
        Self {
            kind: GuardKind::OnRelease(Some(Box::new(f))),
        }
    }
}

impl From<Binding> for WireGuard {
    fn from(binding: Binding) -> Self {
        Self {
            kind: GuardKind::Binding { _binding: binding },
        }
    }
}

impl From<Subscription> for WireGuard {
    fn from(subscription: Subscription) -> Self {
        Self {
            kind: GuardKind::Subscription {
                _subscription: subscription,
            },
        }
    }
}

impl Drop for WireGuard {
    fn drop(&mut self) {
        if let GuardKind::OnRelease(f) = &mut self.kind {
            if let Some(f) = f.take() {
                f();
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Event handlers
// ---------------------------------------------------------------------------

type Handler<A> = Arc<dyn Fn(&A) + Send + Sync>;

/// Ordered list of view-side handlers for one event.
pub struct EventHandlers<A> {
    handlers: Mutex<Vec<Handler<A>>>,
}

impl<A> Default for EventHandlers<A> {
    fn default() -> Self {
        Self {
            handlers: Mutex::new(Vec::new()),
        }
    }
}

impl<A: 'static> fmt::Debug for EventHandlers<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandlers")
            .field("len", &self.len())
            .finish()
    }
}

impl<A: 'static> EventHandlers<A> {
    fn lock(&self) -> MutexGuard<'_, Vec<Handler<A>>> {
        self.handlers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append a handler.
    pub fn add(&self, handler: impl Fn(&A) + Send + Sync + 'static) {
        self.lock().push(Arc::new(handler));
    }

    /// Call every handler in registration order. Returns how many ran.
    ///
    /// Handlers registered while emitting run from the next emit on.
    pub fn emit(&self, args: &A) -> usize {
        let snapshot: Vec<Handler<A>> = self.lock().clone();
        for handler in &snapshot {
            handler(args);
        }
        snapshot.len()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Bind / unbind
// ---------------------------------------------------------------------------

/// Bind a concrete view to `context`.
pub fn bind<V: View>(view: &Arc<V>, context: &UiContext) -> Result<(), CoreError> {
    let view: Arc<dyn View> = Arc::clone(view) as Arc<dyn View>;
    bind_dyn(&view, context)
}

/// Bind a type-erased view to `context`.
///
/// Must run on the context's UI thread (checked in debug builds).
pub fn bind_dyn(view: &Arc<dyn View>, context: &UiContext) -> Result<(), CoreError> {
    context
        .dispatcher()
        .affinity()
        .debug_check(&"view binding");

    let base = view.view_base();
    if base
        .slot()
        .context()
        .is_some_and(|current| current.same_as(context))
    {
        return Ok(());
    }
    base.slot().release();

    let capability = view.capability_for_core_creation();
    let core = context
        .registry()
        .create_core(context, capability, WeakView::new(view))?;

    let mut guards = vec![WireGuard::from(Binding::one_way(
        base.visible(),
        core.base().visible(),
    ))];
    guards.extend(Arc::clone(view).wire_core(core.as_ref(), context)?);

    debug!(
        capability = capability.name(),
        core = core.interface().name(),
        guards = guards.len(),
        "view bound"
    );
    base.slot().install(BoundCore {
        guards,
        core,
        context: context.clone(),
    });
    Ok(())
}

/// Release `view`'s core. Returns `true` if one was bound.
pub fn unbind(view: &dyn View) -> bool {
    view.view_base().slot().release()
}

/// Bind `child` and hand its core to `attach`.
pub(crate) fn bind_child(
    child: &Arc<dyn View>,
    context: &UiContext,
    attach: impl FnOnce(&dyn Core),
) -> Result<(), CoreError> {
    bind_dyn(child, context)?;
    child.view_base().slot().with_core(attach);
    Ok(())
}

/// Log that a fallback core lacks the interface a view would wire.
pub(crate) fn note_missing_interface(view: &'static str, core: &dyn Core) {
    debug!(
        view,
        core = core.interface().name(),
        "core lacks the view's interface; wiring base only"
    );
}
