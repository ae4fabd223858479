#![forbid(unsafe_code)]

use std::sync::Arc;

use tether_core::{Capability, capability};
use tether_runtime::{Binding, Property};

use crate::context::UiContext;
use crate::core::Core;
use crate::registry::CoreError;
use crate::view::{EventHandlers, View, ViewBase, WireGuard, note_missing_interface};

/// An on/off toggle.
///
/// `on` is bound both ways: the application can flip it, and a native
/// toggle updates it before click handlers run.
#[derive(Debug)]
pub struct Switch {
    base: ViewBase,
    label: Property<String>,
    on: Property<bool>,
    on_click: EventHandlers<()>,
}

impl Switch {
    #[must_use]
    pub fn new(label: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            base: ViewBase::new(),
            label: Property::named("label", label.into()),
            on: Property::named("on", false),
            on_click: EventHandlers::default(),
        })
    }

    #[must_use]
    pub fn label(&self) -> &Property<String> {
        &self.label
    }

    #[must_use]
    pub fn on(&self) -> &Property<bool> {
        &self.on
    }

    /// Add a handler called after each user toggle, on the UI thread.
    pub fn on_click(&self, handler: impl Fn() + Send + Sync + 'static) {
        self.on_click.add(move |()| handler());
    }
}

impl View for Switch {
    fn capability_for_core_creation(&self) -> &'static Capability {
        &capability::SWITCH
    }

    fn view_base(&self) -> &ViewBase {
        &self.base
    }

    fn wire_core(
        self: Arc<Self>,
        core: &dyn Core,
        _context: &UiContext,
    ) -> Result<Vec<WireGuard>, CoreError> {
        let Some(switch) = core.interface().as_switch() else {
            note_missing_interface("Switch", core);
            return Ok(Vec::new());
        };
        switch.on_click().bind(&self, |view, ()| {
            view.on_click.emit(&());
        });
        Ok(vec![
            Binding::one_way(&self.label, switch.label()).into(),
            Binding::two_way(&self.on, switch.on()).into(),
        ])
    }
}
