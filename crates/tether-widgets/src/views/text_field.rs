#![forbid(unsafe_code)]

use std::sync::Arc;

use tether_core::{Capability, capability};
use tether_runtime::{Binding, Property};

use crate::context::UiContext;
use crate::core::Core;
use crate::registry::CoreError;
use crate::view::{EventHandlers, View, ViewBase, WireGuard, note_missing_interface};

/// A single-line text input. `text` is bound both ways.
#[derive(Debug)]
pub struct TextField {
    base: ViewBase,
    text: Property<String>,
    on_submit: EventHandlers<()>,
}

impl TextField {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            base: ViewBase::new(),
            text: Property::named("text", String::new()),
            on_submit: EventHandlers::default(),
        })
    }

    #[must_use]
    pub fn text(&self) -> &Property<String> {
        &self.text
    }

    /// Add a handler for input confirmation, called on the UI thread.
    pub fn on_submit(&self, handler: impl Fn() + Send + Sync + 'static) {
        self.on_submit.add(move |()| handler());
    }
}

impl View for TextField {
    fn capability_for_core_creation(&self) -> &'static Capability {
        &capability::TEXT_FIELD
    }

    fn view_base(&self) -> &ViewBase {
        &self.base
    }

    fn wire_core(
        self: Arc<Self>,
        core: &dyn Core,
        _context: &UiContext,
    ) -> Result<Vec<WireGuard>, CoreError> {
        let Some(field) = core.interface().as_text_field() else {
            note_missing_interface("TextField", core);
            return Ok(Vec::new());
        };
        field.on_submit().bind(&self, |view, ()| {
            view.on_submit.emit(&());
        });
        Ok(vec![Binding::two_way(&self.text, field.text()).into()])
    }
}
