#![forbid(unsafe_code)]

//! The native side of a view.
//!
//! A [`Core`] is the object a platform provides to realize one view: it owns
//! the native handle, exposes the properties the view writes into, and
//! delivers native events back through [`WeakCallback`] slots.
//!
//! # Capability interfaces
//!
//! Cores are not arranged in an inheritance chain. Each core reports which
//! capability interface it implements through [`Core::interface`], a tagged
//! borrow the view matches on:
//!
//! ```ignore
//! if let Some(button) = core.interface().as_button() {
//!     button.label().set("OK".into());
//! }
//! ```
//!
//! A core that was resolved through a capability fallback (a plain view core
//! standing in for a button, say) simply reports the narrower interface, and
//! the view wires whatever is available.
//!
//! # Ownership
//!
//! - The view is the sole strong owner of its core (through its
//!   [`CoreSlot`](crate::view::CoreSlot)).
//! - The core refers back to its view only through a [`WeakView`].
//! - Dropping the core releases its native handle.
//!
//! [`WeakCallback`]: tether_core::WeakCallback

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use tether_core::Capability;
use tether_runtime::{Dispatcher, Property};

use crate::context::UiContext;
use crate::cores::{
    ButtonCore, ContainerCore, ListViewCore, StackCore, SwitchCore, TextFieldCore, TextViewCore,
    WebViewCore, WindowCore,
};
use crate::view::View;

/// A native implementation object bound to one view.
pub trait Core: Send + Sync + 'static {
    /// Shared state every core carries.
    fn base(&self) -> &CoreBase;

    /// The capability interface this core implements.
    fn interface(&self) -> CoreInterface<'_>;

    /// Downcast hook for platform code that needs its concrete core type.
    fn as_any(&self) -> &dyn Any;

    /// The capability this core was created for.
    fn capability(&self) -> &'static Capability {
        self.base().capability()
    }
}

impl fmt::Debug for dyn Core {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Core")
            .field("capability", &self.capability().name())
            .field("interface", &self.interface().name())
            .finish()
    }
}

/// Tagged borrow of a core's capability interface.
#[derive(Clone, Copy)]
pub enum CoreInterface<'a> {
    /// Base view only: visibility and nothing else.
    View,
    Container(&'a dyn ContainerCore),
    Window(&'a dyn WindowCore),
    Stack(&'a dyn StackCore),
    Button(&'a dyn ButtonCore),
    Switch(&'a dyn SwitchCore),
    TextField(&'a dyn TextFieldCore),
    TextView(&'a dyn TextViewCore),
    ListView(&'a dyn ListViewCore),
    WebView(&'a dyn WebViewCore),
}

impl fmt::Debug for CoreInterface<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl<'a> CoreInterface<'a> {
    /// Short name of the interface variant.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::View => "View",
            Self::Container(_) => "Container",
            Self::Window(_) => "Window",
            Self::Stack(_) => "Stack",
            Self::Button(_) => "Button",
            Self::Switch(_) => "Switch",
            Self::TextField(_) => "TextField",
            Self::TextView(_) => "TextView",
            Self::ListView(_) => "ListView",
            Self::WebView(_) => "WebView",
        }
    }

    #[must_use]
    pub fn as_container(self) -> Option<&'a dyn ContainerCore> {
        match self {
            Self::Container(c) => Some(c),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_window(self) -> Option<&'a dyn WindowCore> {
        match self {
            Self::Window(c) => Some(c),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_stack(self) -> Option<&'a dyn StackCore> {
        match self {
            Self::Stack(c) => Some(c),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_button(self) -> Option<&'a dyn ButtonCore> {
        match self {
            Self::Button(c) => Some(c),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_switch(self) -> Option<&'a dyn SwitchCore> {
        match self {
            Self::Switch(c) => Some(c),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text_field(self) -> Option<&'a dyn TextFieldCore> {
        match self {
            Self::TextField(c) => Some(c),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text_view(self) -> Option<&'a dyn TextViewCore> {
        match self {
            Self::TextView(c) => Some(c),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list_view(self) -> Option<&'a dyn ListViewCore> {
        match self {
            Self::ListView(c) => Some(c),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_web_view(self) -> Option<&'a dyn WebViewCore> {
        match self {
            Self::WebView(c) => Some(c),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Back-reference
// ---------------------------------------------------------------------------

/// Non-owning reference from a core to the view it realizes.
#[derive(Clone, Default)]
pub struct WeakView {
    inner: Option<Weak<dyn View>>,
}

impl fmt::Debug for WeakView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.inner {
            None => "none",
            Some(weak) if weak.strong_count() == 0 => "dropped",
            Some(_) => "alive",
        };
        f.debug_tuple("WeakView").field(&state).finish()
    }
}

impl WeakView {
    /// Reference `view` without keeping it alive.
    #[must_use]
    pub fn new(view: &Arc<dyn View>) -> Self {
        Self {
            inner: Some(Arc::downgrade(view)),
        }
    }

    /// A reference to no view, for cores created outside a binding.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// The view, if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Arc<dyn View>> {
        self.inner.as_ref().and_then(Weak::upgrade)
    }

    /// True while the view is alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.inner
            .as_ref()
            .is_some_and(|weak| weak.strong_count() > 0)
    }
}

// ---------------------------------------------------------------------------
// Construction request and base state
// ---------------------------------------------------------------------------

/// What a core constructor is asked to build.
#[derive(Debug, Clone)]
pub struct CoreRequest {
    /// The capability the view asked for.
    pub requested: &'static Capability,
    /// The capability whose constructor was selected; equal to `requested`
    /// unless resolution fell back to an ancestor.
    pub resolved: &'static Capability,
    /// The view being realized.
    pub view: WeakView,
}

impl CoreRequest {
    /// A request with no fallback and no view attached.
    #[must_use]
    pub fn detached(capability: &'static Capability) -> Self {
        Self {
            requested: capability,
            resolved: capability,
            view: WeakView::none(),
        }
    }

    /// True if resolution fell back to an ancestor capability.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.requested != self.resolved
    }
}

/// State shared by every core: capability, back-reference, visibility and
/// the context's dispatcher.
#[derive(Debug)]
pub struct CoreBase {
    capability: &'static Capability,
    view: WeakView,
    dispatcher: Dispatcher,
    visible: Property<bool>,
}

impl CoreBase {
    /// Build the base for a core created from `request` in `context`.
    ///
    /// Properties created with [`CoreBase::property`] (and `visible`) are
    /// affine to the context's UI thread.
    #[must_use]
    pub fn new(context: &UiContext, request: &CoreRequest) -> Self {
        let dispatcher = context.dispatcher().clone();
        let visible = Property::with_affinity("visible", true, dispatcher.affinity().clone());
        Self {
            capability: request.resolved,
            view: request.view.clone(),
            dispatcher,
            visible,
        }
    }

    /// Create a property affine to this core's UI thread.
    #[must_use]
    pub fn property<T>(&self, name: &'static str, value: T) -> Property<T>
    where
        T: Clone + PartialEq + Send + 'static,
    {
        Property::with_affinity(name, value, self.dispatcher.affinity().clone())
    }

    #[must_use]
    pub fn capability(&self) -> &'static Capability {
        self.capability
    }

    /// Back-reference to the view.
    #[must_use]
    pub fn view(&self) -> &WeakView {
        &self.view
    }

    /// Dispatcher native event handlers post to.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Whether the native element is shown.
    #[must_use]
    pub fn visible(&self) -> &Property<bool> {
        &self.visible
    }
}
