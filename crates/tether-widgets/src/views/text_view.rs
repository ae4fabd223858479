#![forbid(unsafe_code)]

use std::sync::Arc;

use tether_core::{Capability, capability};
use tether_runtime::{Binding, Property};

use crate::context::UiContext;
use crate::core::Core;
use crate::registry::CoreError;
use crate::view::{View, ViewBase, WireGuard, note_missing_interface};

/// Read-only text.
#[derive(Debug)]
pub struct TextView {
    base: ViewBase,
    text: Property<String>,
    wrap: Property<bool>,
}

impl TextView {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            base: ViewBase::new(),
            text: Property::named("text", text.into()),
            wrap: Property::named("wrap", true),
        })
    }

    #[must_use]
    pub fn text(&self) -> &Property<String> {
        &self.text
    }

    #[must_use]
    pub fn wrap(&self) -> &Property<bool> {
        &self.wrap
    }
}

impl View for TextView {
    fn capability_for_core_creation(&self) -> &'static Capability {
        &capability::TEXT_VIEW
    }

    fn view_base(&self) -> &ViewBase {
        &self.base
    }

    fn wire_core(
        self: Arc<Self>,
        core: &dyn Core,
        _context: &UiContext,
    ) -> Result<Vec<WireGuard>, CoreError> {
        let Some(text_view) = core.interface().as_text_view() else {
            note_missing_interface("TextView", core);
            return Ok(Vec::new());
        };
        Ok(vec![
            Binding::one_way(&self.text, text_view.text()).into(),
            Binding::one_way(&self.wrap, text_view.wrap()).into(),
        ])
    }
}
