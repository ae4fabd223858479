#![forbid(unsafe_code)]

use std::sync::Arc;

use tether_core::{Capability, capability};
use tether_runtime::{Binding, Property};

use crate::context::UiContext;
use crate::core::Core;
use crate::registry::CoreError;
use crate::view::{EventHandlers, View, ViewBase, WireGuard, note_missing_interface};

/// A push button.
#[derive(Debug)]
pub struct Button {
    base: ViewBase,
    label: Property<String>,
    on_click: EventHandlers<()>,
}

impl Button {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Self::with_label("")
    }

    #[must_use]
    pub fn with_label(label: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            base: ViewBase::new(),
            label: Property::named("label", label.into()),
            on_click: EventHandlers::default(),
        })
    }

    #[must_use]
    pub fn label(&self) -> &Property<String> {
        &self.label
    }

    /// Add a click handler. Handlers run on the UI thread.
    pub fn on_click(&self, handler: impl Fn() + Send + Sync + 'static) {
        self.on_click.add(move |()| handler());
    }

    fn clicked(&self) {
        self.on_click.emit(&());
    }
}

impl View for Button {
    fn capability_for_core_creation(&self) -> &'static Capability {
        &capability::BUTTON
    }

    fn view_base(&self) -> &ViewBase {
        &self.base
    }

    fn wire_core(
        self: Arc<Self>,
        core: &dyn Core,
        _context: &UiContext,
    ) -> Result<Vec<WireGuard>, CoreError> {
        let Some(button) = core.interface().as_button() else {
            note_missing_interface("Button", core);
            return Ok(Vec::new());
        };
        button.on_click().bind(&self, |view, ()| view.clicked());
        Ok(vec![Binding::one_way(&self.label, button.label()).into()])
    }
}
